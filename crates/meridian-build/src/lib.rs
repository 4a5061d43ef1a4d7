//! Meridian Build - build execution driver
//!
//! This crate runs one build round against a graph evaluation engine,
//! tracks which artifacts were built, reports stalled builds and maps
//! evaluation failures to build errors under the keep-going policy.

pub mod cancel;
pub mod driver;
pub mod evaluator;
pub mod events;
pub mod progress;
pub mod result;
pub mod status;
pub mod watchdog;

#[cfg(test)]
pub(crate) mod testing;

pub use cancel::CancellationToken;
pub use driver::{BuildDriver, Builder, DriverOptions};
pub use evaluator::{
    ActionCacheChecker, ActionCompletedReceiver, ActionInputFileCache, CycleReporter,
    EvaluationProgressListener, EvaluationRequest, Evaluator, ExecutionContext,
    ProgressReportingObjects, ProgressSupplier,
};
pub use events::{ActionEvent, ActionEventBus, ActionEventListener, ListenerId};
pub use progress::{ProgressTracker, SharedArtifactSet};
pub use result::process_result;
pub use status::ActionStatusReporter;
pub use watchdog::{
    InactivityMonitor, InactivityReporter, InactivityWatchdog, Interrupted, MIN_REPORT_INTERVAL,
};
