//! Build driver
//!
//! Runs one build round against the evaluation engine: the main parallel
//! build of all requested artifacts, then each exclusive artifact on its own.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use meridian_core::{Artifact, BuildConfig, BuildError, ConfigError, ModifiedFileSet, Result};

use crate::evaluator::{
    ActionCacheChecker, ActionInputFileCache, EvaluationProgressListener, EvaluationRequest,
    Evaluator, ExecutionContext, ProgressReportingObjects,
};
use crate::progress::{ProgressTracker, SharedArtifactSet};
use crate::result::process_result;
use crate::status::ActionStatusReporter;
use crate::watchdog::InactivityWatchdog;

/// Something that can build a set of artifacts
pub trait Builder {
    /// Build `artifacts`, then each of `exclusive_artifacts` one at a time.
    ///
    /// Every artifact known to be up to date is added to `built_artifacts`,
    /// including on failure and cancellation.
    fn build_artifacts(
        &self,
        artifacts: &HashSet<Artifact>,
        exclusive_artifacts: &[Artifact],
        context: &ExecutionContext,
        modified_files: &ModifiedFileSet,
        built_artifacts: &mut HashSet<Artifact>,
    ) -> Result<()>;

    /// Share of actions answered from cache in the last round
    fn percentage_cached(&self) -> u32;
}

/// Options for the build driver
#[derive(Debug, Clone)]
pub struct DriverOptions {
    /// Continue past failing nodes
    pub keep_going: bool,
    /// Worker pool size handed to the evaluator
    pub jobs: usize,
    /// How long without a completed action before reporting
    pub progress_report_interval: Duration,
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self::from(&BuildConfig::default())
    }
}

impl DriverOptions {
    /// Reject options the driver cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "jobs".to_string(),
                message: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.progress_report_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "progress_report_interval".to_string(),
                message: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl From<&BuildConfig> for DriverOptions {
    fn from(config: &BuildConfig) -> Self {
        Self {
            keep_going: config.keep_going,
            jobs: config.jobs,
            progress_report_interval: config.progress_report_interval(),
        }
    }
}

/// Drives the evaluator through one build round
pub struct BuildDriver {
    evaluator: Arc<dyn Evaluator>,
    action_cache_checker: Arc<dyn ActionCacheChecker>,
    file_cache: Arc<dyn ActionInputFileCache>,
    options: DriverOptions,
}

impl BuildDriver {
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        action_cache_checker: Arc<dyn ActionCacheChecker>,
        file_cache: Arc<dyn ActionInputFileCache>,
        options: DriverOptions,
    ) -> Self {
        Self {
            evaluator,
            action_cache_checker,
            file_cache,
            options,
        }
    }

    pub fn options(&self) -> &DriverOptions {
        &self.options
    }

    /// Everything between listener attachment and cleanup.
    ///
    /// Returns whether every phase succeeded. Only reachable failures under
    /// keep-going come back as `Ok(false)`.
    #[allow(clippy::too_many_arguments)]
    fn execute(
        &self,
        artifacts: &HashSet<Artifact>,
        exclusive_artifacts: &[Artifact],
        context: &ExecutionContext,
        modified_files: &ModifiedFileSet,
        tracker: &ProgressTracker,
        built: &SharedArtifactSet,
        building_exclusive: &AtomicBool,
    ) -> Result<bool> {
        self.evaluator.find_artifact_conflicts()?;
        self.evaluator.inform_about_modified_files(modified_files);

        context.cancellation().check()?;
        let result = self.evaluator.evaluate(EvaluationRequest {
            artifacts,
            context,
            keep_going: self.options.keep_going,
            jobs: self.options.jobs,
            action_cache_checker: &*self.action_cache_checker,
            progress_listener: Some(tracker as &dyn EvaluationProgressListener),
        })?;
        built.extend(result.values.iter().cloned());
        let mut success = process_result(result, self.options.keep_going, &*self.evaluator)?;
        info!(
            success,
            completed = tracker.completed_count(),
            enqueued = tracker.enqueued_count(),
            "main build finished"
        );

        if exclusive_artifacts.is_empty() {
            return Ok(success);
        }

        building_exclusive.store(true, Ordering::SeqCst);
        for artifact in exclusive_artifacts {
            context.cancellation().check()?;
            info!(artifact = %artifact, "building exclusively");

            let single = HashSet::from([artifact.clone()]);
            let result = self.evaluator.evaluate(EvaluationRequest {
                artifacts: &single,
                context,
                keep_going: self.options.keep_going,
                jobs: self.options.jobs,
                action_cache_checker: &*self.action_cache_checker,
                progress_listener: None,
            })?;
            success = process_result(result, self.options.keep_going, &*self.evaluator)? && success;
        }
        Ok(success)
    }
}

impl Builder for BuildDriver {
    #[instrument(skip_all, fields(
        artifacts = artifacts.len(),
        exclusive = exclusive_artifacts.len(),
        keep_going = self.options.keep_going,
        jobs = self.options.jobs,
    ))]
    fn build_artifacts(
        &self,
        artifacts: &HashSet<Artifact>,
        exclusive_artifacts: &[Artifact],
        context: &ExecutionContext,
        modified_files: &ModifiedFileSet,
        built_artifacts: &mut HashSet<Artifact>,
    ) -> Result<()> {
        self.options.validate()?;
        self.evaluator.prepare_execution();
        self.evaluator.set_file_cache(Arc::clone(&self.file_cache));

        let built = SharedArtifactSet::new(std::mem::take(built_artifacts));
        let tracker = Arc::new(ProgressTracker::new(artifacts, built.clone()));
        let building_exclusive = Arc::new(AtomicBool::new(false));

        let outcome = {
            let status_reporter = ActionStatusReporter::create(self.evaluator.event_bus());
            let watchdog = InactivityWatchdog::new(
                tracker.inactivity_monitor(Arc::clone(&status_reporter)),
                tracker.inactivity_reporter(
                    Arc::clone(&status_reporter),
                    Arc::clone(&building_exclusive),
                ),
                self.options.progress_report_interval,
            );
            let mut cleanup = ExecutionCleanup {
                evaluator: &*self.evaluator,
                watchdog,
                status_reporter: Arc::clone(&status_reporter),
                built: built.clone(),
                built_artifacts,
            };

            self.evaluator
                .set_progress_reporting_objects(Some(ProgressReportingObjects {
                    progress_supplier: tracker.clone(),
                    completion_receiver: tracker.clone(),
                    status_reporter,
                }));

            let outcome = cleanup
                .watchdog
                .start()
                .map_err(|e| {
                    BuildError::Internal(
                        anyhow::Error::new(e).context("failed to start inactivity watchdog"),
                    )
                })
                .and_then(|()| {
                    self.execute(
                        artifacts,
                        exclusive_artifacts,
                        context,
                        modified_files,
                        &tracker,
                        &built,
                        &building_exclusive,
                    )
                });
            drop(cleanup);
            outcome
        };

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => Err(BuildError::build_failed()),
            Err(e) => Err(e),
        }
    }

    // TODO: derive from the action cache checker's hit statistics once it records them
    fn percentage_cached(&self) -> u32 {
        0
    }
}

/// Teardown that runs exactly once on every exit path of a build round
struct ExecutionCleanup<'a> {
    evaluator: &'a dyn Evaluator,
    watchdog: InactivityWatchdog,
    status_reporter: Arc<ActionStatusReporter>,
    built: SharedArtifactSet,
    built_artifacts: &'a mut HashSet<Artifact>,
}

impl Drop for ExecutionCleanup<'_> {
    fn drop(&mut self) {
        self.watchdog.stop();
        self.evaluator.set_progress_reporting_objects(None);
        self.status_reporter
            .unregister_from_event_bus(self.evaluator.event_bus());
        self.built_artifacts.extend(self.built.take());
        debug!(built = self.built_artifacts.len(), "build round cleaned up");
    }
}
