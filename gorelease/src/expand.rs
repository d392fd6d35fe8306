//! The build matrix: one compile per (target, os, arch)

use axoprocess::Cmd;
use camino::Utf8PathBuf;
use itertools::Itertools;

use crate::{resolve::ResolvedTarget, Environment, Toolchain};

/// One concrete compile invocation
///
/// Nothing touches this after [`expand`][] makes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildUnit {
    /// The id of the target this came from
    pub target: String,
    /// The name of the output file
    pub name: String,
    /// Where the output file goes
    pub output_path: Utf8PathBuf,
    /// The os we're compiling for
    pub os: String,
    /// The arch we're compiling for
    pub arch: String,
    /// The complete environment of the compiler
    pub env: Environment,
    /// The complete argument list of the compiler
    pub args: Vec<String>,
}

impl BuildUnit {
    /// The command that performs this unit
    pub fn command(&self, toolchain: &Toolchain) -> Cmd {
        let mut cmd = Cmd::new(
            &toolchain.cmd,
            format!("build {} for {}/{}", self.name, self.os, self.arch),
        );
        for arg in &self.args {
            cmd.arg(arg);
        }
        cmd.env_clear();
        cmd.envs(&self.env);
        cmd
    }
}

/// Expand a resolved target into its build units
///
/// This does no I/O: `base_env` is the environment the compiler would
/// otherwise inherit, captured once by the caller.
pub fn expand(
    target: &ResolvedTarget,
    toolchain: &Toolchain,
    base_env: &Environment,
) -> Vec<BuildUnit> {
    target
        .platform_pairs()
        .map(|(os, arch)| {
            let name = target.output_name(os, arch);
            let output_path = target.output_path(os, arch);

            let mut env = base_env.clone();
            env.extend(
                target
                    .env
                    .iter()
                    .map(|(key, val)| (key.into(), val.into())),
            );
            // The platform always wins over anything the user put in `env`
            env.insert((&toolchain.os_env).into(), os.into());
            env.insert((&toolchain.arch_env).into(), arch.into());

            let mut args = Vec::with_capacity(target.flags.len() + 4);
            args.push("build".to_owned());
            args.extend(target.flags.iter().cloned());
            args.push("-o".to_owned());
            args.push(output_path.to_string());
            args.push(target.file.to_string());

            BuildUnit {
                target: target.id.clone(),
                name,
                output_path,
                os: os.to_owned(),
                arch: arch.to_owned(),
                env,
                args,
            }
        })
        .collect()
}

/// A target and the units it expanded to
#[derive(Debug, Clone)]
pub struct PlannedTarget {
    /// The resolved target
    pub target: ResolvedTarget,
    /// Its units, in platform order
    pub units: Vec<BuildUnit>,
}

/// Everything a release run is going to compile
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    /// Targets in config order
    pub targets: Vec<PlannedTarget>,
}

impl BuildPlan {
    /// Expand every target
    pub fn new(
        targets: Vec<ResolvedTarget>,
        toolchain: &Toolchain,
        base_env: &Environment,
    ) -> Self {
        let targets = targets
            .into_iter()
            .map(|target| {
                let units = expand(&target, toolchain, base_env);
                PlannedTarget { target, units }
            })
            .collect();
        Self { targets }
    }

    /// Every unit of every target
    pub fn units(&self) -> impl Iterator<Item = &BuildUnit> {
        self.targets.iter().flat_map(|planned| planned.units.iter())
    }

    /// The directories outputs will be written into, without repeats
    pub fn output_dirs(&self) -> Vec<Utf8PathBuf> {
        self.units()
            .filter_map(|unit| unit.output_path.parent())
            .filter(|dir| !dir.as_str().is_empty())
            .map(|dir| dir.to_owned())
            .unique()
            .collect()
    }
}
