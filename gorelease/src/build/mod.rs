//! Compiling Things
//!
//! A [`BuildRunner`][] performs one [`BuildUnit`][]. The real one spawns the
//! toolchain; tests swap in fakes.

use std::future::Future;
use std::process::Stdio;

use camino::Utf8PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::{expand::BuildUnit, SortedMap, Toolchain};

/// Results of a build, keyed by output path
pub type BuildResults = SortedMap<Utf8PathBuf, ExecutionResult>;

/// What happened when a unit ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    /// The output path of the unit (the key results are collected under)
    pub output_path: Utf8PathBuf,
    /// Everything the compiler printed: stdout, then stderr
    pub output: Vec<u8>,
    /// The exit code, if the compiler exited normally
    pub exit_code: Option<i32>,
    /// Why the unit failed, if it did
    pub failure: Option<UnitFailure>,
}

/// Why a unit failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFailure {
    /// The compiler couldn't be started (or waited on)
    Spawn(String),
    /// The compiler exited with a non-zero code
    Exit(i32),
    /// The compiler was killed by a signal
    Signal,
    /// The run was cancelled while this unit was in flight
    Cancelled,
}

impl std::fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitFailure::Spawn(details) => write!(f, "couldn't run the compiler: {details}"),
            UnitFailure::Exit(code) => write!(f, "the compiler exited with code {code}"),
            UnitFailure::Signal => f.write_str("the compiler was killed by a signal"),
            UnitFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

impl ExecutionResult {
    /// A unit that exited cleanly
    pub fn success(unit: &BuildUnit, output: Vec<u8>) -> Self {
        Self {
            output_path: unit.output_path.clone(),
            output,
            exit_code: Some(0),
            failure: None,
        }
    }

    /// A unit that failed
    pub fn failed(
        unit: &BuildUnit,
        failure: UnitFailure,
        output: Vec<u8>,
        exit_code: Option<i32>,
    ) -> Self {
        Self {
            output_path: unit.output_path.clone(),
            output,
            exit_code,
            failure: Some(failure),
        }
    }

    /// Whether the unit produced its output
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    /// The captured output as text, for humans
    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Something that can perform build units
///
/// Runners are shared between concurrent tasks, so they can't hold per-run state
/// without their own synchronization.
pub trait BuildRunner: Send + Sync + 'static {
    /// Perform `unit`, giving up promptly once `cancel` fires
    ///
    /// This never fails outright: spawn errors and non-zero exits are
    /// described by the returned result.
    fn run(
        &self,
        unit: &BuildUnit,
        cancel: &CancellationToken,
    ) -> impl Future<Output = ExecutionResult> + Send;
}

/// Runs units by spawning the toolchain
#[derive(Debug, Clone)]
pub struct ToolchainRunner {
    toolchain: Toolchain,
}

impl ToolchainRunner {
    /// Make a runner for the given toolchain
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

impl BuildRunner for ToolchainRunner {
    async fn run(&self, unit: &BuildUnit, cancel: &CancellationToken) -> ExecutionResult {
        let cmd = unit.command(&self.toolchain);
        cmd.log_command();
        let mut command = tokio::process::Command::from(cmd.inner);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                let details = format!("{}: {e}", self.toolchain.cmd);
                return ExecutionResult::failed(unit, UnitFailure::Spawn(details), vec![], None);
            }
        };

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output,
            _ = cancel.cancelled() => {
                warn!("cancelled build of {}", unit.name);
                return ExecutionResult::failed(unit, UnitFailure::Cancelled, vec![], None);
            }
        };

        match output {
            Err(e) => ExecutionResult::failed(unit, UnitFailure::Spawn(e.to_string()), vec![], None),
            Ok(output) => {
                let mut combined = output.stdout;
                combined.extend(output.stderr);
                if output.status.success() {
                    return ExecutionResult::success(unit, combined);
                }
                let exit_code = output.status.code();
                let failure = exit_code.map(UnitFailure::Exit).unwrap_or(UnitFailure::Signal);
                ExecutionResult::failed(unit, failure, combined, exit_code)
            }
        }
    }
}
