#![deny(missing_docs)]
#![allow(clippy::result_large_err)]

//! # gorelease
//!
//! This is the library at the core of the `gorelease` CLI. It takes a release
//! config (a `global` record plus a list of `targets`), works out every
//! (target, os, arch) combination that needs compiling, compiles them with the
//! toolchain, and optionally uploads the results somewhere.
//!
//! The stages are:
//!
//! * [`resolve`][] merges `global` into each target and expands `platforms: all`
//! * [`expand`][] turns each resolved target into one [`BuildUnit`][] per platform
//! * [`build`][] runs a unit as a subprocess
//! * [`dispatch`][] sequences all of the above and hands finished artifacts to a [`host`][]
//!
//! It happily writes status lines to stderr, so it's more of a CLI with a
//! library inside than a library you'd want to embed.

use gorelease_schema::{Artifact, BuildStatus, ReleaseReport};

use build::{BuildResults, ExecutionResult, UnitFailure};
use config::{load_release, Config};
use dispatch::{DispatchOptions, Dispatcher};
use errors::ReleaseResult;
use expand::BuildPlan;
use host::{UploadedUrls, Uploader};
use platforms::ToolchainCatalog;

pub mod build;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod expand;
pub mod host;
pub mod naming;
pub mod platforms;
pub mod resolve;
#[cfg(test)]
mod tests;

/// A map where the order matters (os names, env vars, results by path)
pub type SortedMap<K, V> = std::collections::BTreeMap<K, V>;
/// A map where the order doesn't matter
pub type FastMap<K, V> = std::collections::HashMap<K, V>;
/// os => architectures
pub type PlatformMap = SortedMap<String, Vec<String>>;
/// A complete process environment, including anything that isn't utf8
pub type Environment = SortedMap<std::ffi::OsString, std::ffi::OsString>;

/// The toolchain we compile with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// The command to run (`go`)
    pub cmd: String,
    /// The env var that selects the target os (`GOOS`)
    pub os_env: String,
    /// The env var that selects the target arch (`GOARCH`)
    pub arch_env: String,
}

impl Toolchain {
    /// A go-like toolchain that's invoked as `cmd`
    pub fn new(cmd: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            ..Self::default()
        }
    }
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            cmd: "go".to_owned(),
            os_env: "GOOS".to_owned(),
            arch_env: "GOARCH".to_owned(),
        }
    }
}

/// gorelease plan -- work out what would be built, without building it
pub fn do_plan(cfg: &Config) -> ReleaseResult<ReleaseReport> {
    let release = load_release(&cfg.config_path)?;
    let plan = dispatcher(cfg).plan(&release)?;
    Ok(build_report(&plan, None, None))
}

/// gorelease build -- build every target for every platform
pub fn do_build(cfg: &Config) -> ReleaseResult<ReleaseReport> {
    let release = load_release(&cfg.config_path)?;
    let (plan, results) = dispatcher(cfg).build(&release)?;
    Ok(build_report(&plan, Some(&results), None))
}

/// gorelease release -- build everything and upload it
pub fn do_release(cfg: &Config, uploader: &dyn Uploader) -> ReleaseResult<ReleaseReport> {
    let release = load_release(&cfg.config_path)?;
    let (plan, results, urls) = dispatcher(cfg).release(&release, uploader)?;
    Ok(build_report(&plan, Some(&results), Some(&urls)))
}

fn dispatcher(cfg: &Config) -> Dispatcher<ToolchainCatalog, build::ToolchainRunner> {
    Dispatcher::new(
        ToolchainCatalog::new(cfg.toolchain.clone()),
        build::ToolchainRunner::new(cfg.toolchain.clone()),
        cfg.toolchain.clone(),
        DispatchOptions::from(cfg),
    )
}

/// Describe a plan (and how it went, if it ran) for machines
pub fn build_report(
    plan: &BuildPlan,
    results: Option<&BuildResults>,
    urls: Option<&UploadedUrls>,
) -> ReleaseReport {
    let targets = plan
        .targets
        .iter()
        .map(|planned| gorelease_schema::Target {
            id: planned.target.id.clone(),
            file: planned.target.file.to_string(),
            version: planned.target.version.clone(),
            platforms: planned.target.platforms.clone(),
        })
        .collect();

    let artifacts = plan
        .units()
        .map(|unit| {
            let status = results
                .and_then(|results| results.get(&unit.output_path))
                .map(unit_status)
                .unwrap_or(BuildStatus::Planned);
            Artifact {
                name: unit.name.clone(),
                path: unit.output_path.to_string(),
                target: unit.target.clone(),
                os: unit.os.clone(),
                arch: unit.arch.clone(),
                status,
                url: urls.and_then(|urls| urls.get(&unit.output_path)).cloned(),
            }
        })
        .collect();

    ReleaseReport::new(env!("CARGO_PKG_VERSION").to_owned(), targets, artifacts)
}

fn unit_status(result: &ExecutionResult) -> BuildStatus {
    match &result.failure {
        None => BuildStatus::Success,
        Some(UnitFailure::Cancelled) => BuildStatus::Cancelled,
        Some(failure) => BuildStatus::Failed {
            exit_code: result.exit_code,
            reason: failure.to_string(),
        },
    }
}

/// Render a report as the lines `gorelease` prints for humans
pub fn render_human(report: &ReleaseReport) -> String {
    let mut out = String::new();
    for target in &report.targets {
        out.push_str(&format!("{} (version {})\n", target.id, target.version));
        for artifact in report.artifacts.iter().filter(|a| a.target == target.id) {
            let status = match &artifact.status {
                BuildStatus::Planned => "planned".to_owned(),
                BuildStatus::Success => "built".to_owned(),
                BuildStatus::Failed { reason, .. } => format!("failed: {reason}"),
                BuildStatus::Cancelled => "cancelled".to_owned(),
                _ => "unknown".to_owned(),
            };
            out.push_str(&format!(
                "  {}/{} => {} [{status}]\n",
                artifact.os, artifact.arch, artifact.path
            ));
            if let Some(url) = &artifact.url {
                out.push_str(&format!("    {url}\n"));
            }
        }
    }
    out
}

