//! Running a whole release: resolve, expand, build, upload
//!
//! The [`Dispatcher`][] owns no global state. Everything it needs (how to
//! list platforms, how to run a unit, where to upload) is handed to it, so
//! several releases can run side by side in one process.

use std::sync::Arc;

use axoasset::LocalAsset;
use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    build::{BuildResults, BuildRunner, ExecutionResult, UnitFailure},
    config::{Config, FailurePolicy, ReleaseConfig, SourceFilePolicy},
    errors::{ReleaseError, ReleaseResult},
    expand::{BuildPlan, BuildUnit},
    host::{UploadedUrls, Uploader},
    platforms::PlatformCatalog,
    resolve::{resolve_release, ResolveOptions},
    Environment, Toolchain,
};

/// How a [`Dispatcher`][] runs things
#[derive(Debug, Clone, Copy)]
pub struct DispatchOptions {
    /// Max compiles in flight (1 = one target after another, one platform after another)
    pub jobs: usize,
    /// What a failed compile does to the other targets
    pub failure_policy: FailurePolicy,
    /// Whether targets may inherit `file` from `global`
    pub file_policy: SourceFilePolicy,
    /// Cancel everything on ctrl-c
    pub handle_interrupts: bool,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            failure_policy: FailurePolicy::default(),
            file_policy: SourceFilePolicy::default(),
            handle_interrupts: false,
        }
    }
}

impl From<&Config> for DispatchOptions {
    fn from(cfg: &Config) -> Self {
        Self {
            jobs: cfg.jobs,
            failure_policy: cfg.failure_policy,
            file_policy: cfg.file_policy,
            handle_interrupts: cfg.handle_interrupts,
        }
    }
}

/// Sequences a release run
pub struct Dispatcher<C, R> {
    catalog: C,
    runner: Arc<R>,
    toolchain: Toolchain,
    options: DispatchOptions,
    base_env: Option<Environment>,
}

impl<C: PlatformCatalog, R: BuildRunner> Dispatcher<C, R> {
    /// Make a dispatcher out of its collaborators
    pub fn new(catalog: C, runner: R, toolchain: Toolchain, options: DispatchOptions) -> Self {
        Self {
            catalog,
            runner: Arc::new(runner),
            toolchain,
            options,
            base_env: None,
        }
    }

    /// Use this as the compiler's starting environment instead of our own
    pub fn with_base_env(mut self, base_env: Environment) -> Self {
        self.base_env = Some(base_env);
        self
    }

    /// The platform catalog in use
    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// The build runner in use
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolve and expand a release without running anything
    pub fn plan(&self, release: &ReleaseConfig) -> ReleaseResult<BuildPlan> {
        let options = ResolveOptions {
            file_policy: self.options.file_policy,
        };
        let targets = resolve_release(release, &self.catalog, options)?;
        if targets.is_empty() {
            warn!("the release config doesn't define any targets, so there's nothing to build");
        }
        let base_env = match &self.base_env {
            Some(base_env) => base_env.clone(),
            None => std::env::vars_os().collect(),
        };
        Ok(BuildPlan::new(targets, &self.toolchain, &base_env))
    }

    /// Plan a release and build all of it (see [`Dispatcher::execute`][])
    pub fn build(&self, release: &ReleaseConfig) -> ReleaseResult<(BuildPlan, BuildResults)> {
        let plan = self.plan(release)?;
        let results = self.execute(&plan)?;
        Ok((plan, results))
    }

    /// Build a release and hand the artifacts to `uploader`
    pub fn release(
        &self,
        release: &ReleaseConfig,
        uploader: &dyn Uploader,
    ) -> ReleaseResult<(BuildPlan, BuildResults, UploadedUrls)> {
        let (plan, results) = self.build(release)?;
        let built = results
            .iter()
            .filter(|(_, result)| result.succeeded())
            .map(|(path, result)| (path.clone(), result.clone()))
            .collect::<BuildResults>();
        eprintln!("uploading {} artifacts", built.len());
        let urls = uploader.upload(&built)?;
        Ok((plan, results, urls))
    }

    /// Run every unit of a plan
    ///
    /// Output directories are all created first. Within a target the first
    /// failure stops that target; what happens to other targets depends on
    /// [`DispatchOptions::failure_policy`][].
    ///
    /// This starts (and finishes) its own tokio runtime, so it panics if
    /// called from async code. Use [`Dispatcher::execute_async`][] there.
    pub fn execute(&self, plan: &BuildPlan) -> ReleaseResult<BuildResults> {
        let jobs = self.prepare(plan)?;
        let mut builder = if jobs > 1 {
            tokio::runtime::Builder::new_multi_thread()
        } else {
            tokio::runtime::Builder::new_current_thread()
        };
        let runtime = builder.enable_all().build()?;
        runtime.block_on(self.run_plan(plan, jobs))
    }

    /// [`Dispatcher::execute`][] on a runtime the caller already has
    ///
    /// With more than one job, targets are spawned onto the current runtime.
    pub async fn execute_async(&self, plan: &BuildPlan) -> ReleaseResult<BuildResults> {
        let jobs = self.prepare(plan)?;
        self.run_plan(plan, jobs).await
    }

    /// Make the output dirs and announce the work, returning the job count
    fn prepare(&self, plan: &BuildPlan) -> ReleaseResult<usize> {
        for dir in plan.output_dirs() {
            LocalAsset::create_dir_all(&dir)?;
        }

        eprintln!("building artifacts:");
        for unit in plan.units() {
            eprintln!("  {}", unit.output_path);
        }
        eprintln!();

        Ok(self.options.jobs.max(1))
    }

    async fn run_plan(&self, plan: &BuildPlan, jobs: usize) -> ReleaseResult<BuildResults> {
        let cancel = CancellationToken::new();
        let interrupts = self.options.handle_interrupts.then(|| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted, cancelling any builds in progress");
                    cancel.cancel();
                }
            })
        });

        let limit = Arc::new(Semaphore::new(jobs));
        let policy = self.options.failure_policy;
        let mut runs = Vec::with_capacity(plan.targets.len());
        if jobs == 1 {
            for (index, planned) in plan.targets.iter().enumerate() {
                let units = planned.units.clone();
                runs.push(run_target(&*self.runner, index, units, &limit, &cancel, policy).await);
            }
        } else {
            let mut tasks = JoinSet::new();
            for (index, planned) in plan.targets.iter().enumerate() {
                let runner = self.runner.clone();
                let units = planned.units.clone();
                let limit = limit.clone();
                let cancel = cancel.clone();
                tasks.spawn(async move {
                    run_target(&*runner, index, units, &limit, &cancel, policy).await
                });
            }
            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(run) => runs.push(run),
                    Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
                    Err(e) => warn!("a build task went missing: {e}"),
                }
            }
        }
        if let Some(interrupts) = interrupts {
            interrupts.abort();
        }

        runs.sort_by_key(|run| run.index);
        let mut results = BuildResults::new();
        let mut failures = vec![];
        for run in runs {
            for result in run.results {
                results.insert(result.output_path.clone(), result);
            }
            failures.extend(run.failure);
        }

        info!(
            "{} of {} units built successfully",
            results.values().filter(|result| result.succeeded()).count(),
            plan.units().count()
        );
        match failures.len() {
            0 if cancel.is_cancelled() => Err(ReleaseError::Cancelled),
            0 => Ok(results),
            1 => Err(failures.swap_remove(0)),
            count => Err(ReleaseError::BuildsFailed { count, failures }),
        }
    }
}

/// How one target's units went
struct TargetRun {
    index: usize,
    results: Vec<ExecutionResult>,
    failure: Option<ReleaseError>,
}

async fn run_target<R: BuildRunner>(
    runner: &R,
    index: usize,
    units: Vec<BuildUnit>,
    limit: &Semaphore,
    cancel: &CancellationToken,
    policy: FailurePolicy,
) -> TargetRun {
    let mut run = TargetRun {
        index,
        results: Vec::with_capacity(units.len()),
        failure: None,
    };
    for unit in units {
        if cancel.is_cancelled() {
            break;
        }
        let Ok(_permit) = limit.acquire().await else {
            break;
        };
        if cancel.is_cancelled() {
            break;
        }

        info!("building {} for {}/{}", unit.name, unit.os, unit.arch);
        let result = runner.run(&unit, cancel).await;
        let Some(failure) = &result.failure else {
            run.results.push(result);
            continue;
        };
        if *failure != UnitFailure::Cancelled {
            eprintln!("  failed: {} ({failure})", unit.output_path);
            run.failure = Some(ReleaseError::BuildFailed {
                target: unit.target.clone(),
                name: unit.name.clone(),
                os: unit.os.clone(),
                arch: unit.arch.clone(),
                reason: failure.to_string(),
                output: result.output_lossy(),
            });
            if policy == FailurePolicy::FailFast {
                cancel.cancel();
            }
        }
        run.results.push(result);
        break;
    }
    run
}
