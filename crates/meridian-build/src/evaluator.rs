//! The contract between the build driver and the graph evaluation engine
//!
//! The engine owns the dependency graph, decides what is stale, runs actions
//! on its worker pool and caches node values. The driver only calls it
//! through [`Evaluator`], and the engine calls back into the driver through
//! the listener traits defined here.

use std::collections::HashSet;
use std::sync::Arc;

use meridian_core::{
    Action, Artifact, CycleInfo, EvaluationResult, EvaluationState, ModifiedFileSet, NodeKey,
    Result,
};

use crate::cancel::CancellationToken;
use crate::events::ActionEventBus;
use crate::status::ActionStatusReporter;

/// Observer of graph evaluation. Called concurrently from worker threads,
/// with no ordering between different nodes.
pub trait EvaluationProgressListener: Send + Sync {
    /// A node was invalidated before evaluation
    fn invalidated(&self, _key: &NodeKey) {}

    /// A node is about to be evaluated
    fn enqueueing(&self, key: &NodeKey);

    /// A node evaluated successfully
    fn evaluated(&self, key: &NodeKey, state: EvaluationState);
}

/// Source of the short progress text shown next to action status lines
pub trait ProgressSupplier: Send + Sync {
    fn progress_string(&self) -> String;
}

/// Notified by the action executor as soon as an action finishes, which is
/// before the action's node is inserted into the graph.
pub trait ActionCompletedReceiver: Send + Sync {
    fn action_completed(&self, action: &Action);
}

/// Surfaces dependency cycles to the user
pub trait CycleReporter {
    fn report_cycles(&self, cycles: &[CycleInfo], top_level_key: &NodeKey);
}

/// Decides whether an action's cached outputs can be reused
pub trait ActionCacheChecker: Send + Sync {
    fn needs_execution(&self, action: &Action) -> bool;
}

/// Per-round cache of input file digests
pub trait ActionInputFileCache: Send + Sync {
    fn digest(&self, input: &Artifact) -> Option<Vec<u8>>;
}

/// Execution-wide state handed to the evaluator
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    cancellation: CancellationToken,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an existing cancellation signal
    pub fn with_cancellation(cancellation: CancellationToken) -> Self {
        Self { cancellation }
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// Listeners installed on the evaluator while the main build runs
#[derive(Clone)]
pub struct ProgressReportingObjects {
    pub progress_supplier: Arc<dyn ProgressSupplier>,
    pub completion_receiver: Arc<dyn ActionCompletedReceiver>,
    pub status_reporter: Arc<ActionStatusReporter>,
}

impl std::fmt::Debug for ProgressReportingObjects {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReportingObjects")
            .field("progress", &self.progress_supplier.progress_string())
            .field("pending", &self.status_reporter.count())
            .finish()
    }
}

/// Arguments of one evaluation call
#[derive(Clone, Copy)]
pub struct EvaluationRequest<'a> {
    /// Top-level artifacts to build
    pub artifacts: &'a HashSet<Artifact>,
    pub context: &'a ExecutionContext,
    /// Continue past failing nodes
    pub keep_going: bool,
    /// Worker pool size
    pub jobs: usize,
    pub action_cache_checker: &'a dyn ActionCacheChecker,
    pub progress_listener: Option<&'a dyn EvaluationProgressListener>,
}

/// The graph evaluation engine
pub trait Evaluator: CycleReporter + Send + Sync {
    /// Reset per-round state
    fn prepare_execution(&self);

    /// Install the file cache used for this round
    fn set_file_cache(&self, cache: Arc<dyn ActionInputFileCache>);

    /// Detect artifacts generated by more than one action
    fn find_artifact_conflicts(&self) -> Result<()>;

    /// Tell the engine which inputs changed since the last build
    fn inform_about_modified_files(&self, modified: &ModifiedFileSet);

    /// Evaluate the requested artifacts.
    ///
    /// Node failures are part of the returned result. `Err` is reserved for
    /// failures of the evaluation itself, including cancellation.
    fn evaluate(&self, request: EvaluationRequest<'_>) -> Result<EvaluationResult>;

    /// Install or clear (`None`) the progress reporting listeners
    fn set_progress_reporting_objects(&self, objects: Option<ProgressReportingObjects>);

    /// Bus on which action execution events are broadcast
    fn event_bus(&self) -> &ActionEventBus;
}
