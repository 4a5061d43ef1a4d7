//! Progress tracking for one build invocation
//!
//! [`ProgressTracker`] listens to graph evaluation and action completion so
//! that the set of built artifacts is accurate at every instant, even if the
//! build is interrupted. An action's completion and the insertion of its
//! artifact node into the graph are not atomic, and their order is not
//! guaranteed, so built status is recorded at both events. Set semantics make
//! the second insertion harmless.
//!
//! Clean artifacts and source artifacts never see an action complete; they
//! are only caught when their artifact node is evaluated.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use meridian_core::{Action, ActionId, Artifact, EvaluationState, NodeKey};

use crate::evaluator::{ActionCompletedReceiver, EvaluationProgressListener, ProgressSupplier};
use crate::status::ActionStatusReporter;
use crate::watchdog::{InactivityMonitor, InactivityReporter, Interrupted};

/// Artifact set written concurrently by the tracker while a build runs.
///
/// The driver moves the caller's set in before evaluation starts and takes it
/// back out once every writer is detached; until then the caller has no
/// access at all.
#[derive(Debug, Clone, Default)]
pub struct SharedArtifactSet {
    inner: Arc<Mutex<HashSet<Artifact>>>,
}

impl SharedArtifactSet {
    pub fn new(initial: HashSet<Artifact>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(initial)),
        }
    }

    pub fn insert(&self, artifact: Artifact) -> bool {
        self.lock().insert(artifact)
    }

    pub fn extend<I: IntoIterator<Item = Artifact>>(&self, artifacts: I) {
        self.lock().extend(artifacts);
    }

    pub fn contains(&self, artifact: &Artifact) -> bool {
        self.lock().contains(artifact)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Move the contents out, leaving the shared set empty
    pub fn take(&self) -> HashSet<Artifact> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<Artifact>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Default)]
struct Activity {
    completed: HashSet<ActionId>,
    interrupted: bool,
}

/// Listener for enqueued and executed actions and built artifacts
#[derive(Debug)]
pub struct ProgressTracker {
    requested: HashSet<Artifact>,
    built_artifacts: SharedArtifactSet,
    enqueued_actions: Mutex<HashSet<NodeKey>>,
    activity: Mutex<Activity>,
    activity_signal: Condvar,
}

impl ProgressTracker {
    /// Track progress towards `requested`, recording built ones into `built_artifacts`
    pub fn new(requested: &HashSet<Artifact>, built_artifacts: SharedArtifactSet) -> Self {
        Self {
            requested: requested.clone(),
            built_artifacts,
            enqueued_actions: Mutex::new(HashSet::new()),
            activity: Mutex::new(Activity::default()),
            activity_signal: Condvar::new(),
        }
    }

    pub fn enqueued_count(&self) -> usize {
        self.enqueued_actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn completed_count(&self) -> usize {
        self.lock_activity().completed.len()
    }

    /// Whether any report-worthy action has been enqueued yet
    pub fn has_started(&self) -> bool {
        self.enqueued_count() > 0
    }

    /// Wait up to `timeout` for at least one action to complete.
    ///
    /// Returns how many completed during the wait, or zero once the whole
    /// timeout has passed on the monotonic clock. Wakeups that bring no new
    /// completion re-arm the wait with whatever time is left.
    pub fn wait_for_next_completion(&self, timeout: Duration) -> Result<usize, Interrupted> {
        let mut activity = self.lock_activity();
        let before = activity.completed.len();
        let start = Instant::now();
        loop {
            if activity.interrupted {
                return Err(Interrupted);
            }
            let completed = activity.completed.len() - before;
            if completed > 0 {
                return Ok(completed);
            }
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(0);
            }
            activity = self
                .activity_signal
                .wait_timeout(activity, timeout - elapsed)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }

    /// Make current and future waits fail with [`Interrupted`]
    pub fn interrupt_waiters(&self) {
        self.lock_activity().interrupted = true;
        self.activity_signal.notify_all();
    }

    /// Monitor view for the inactivity watchdog
    pub fn inactivity_monitor(
        self: &Arc<Self>,
        status_reporter: Arc<ActionStatusReporter>,
    ) -> Arc<dyn InactivityMonitor> {
        Arc::new(TrackerInactivityMonitor {
            tracker: Arc::clone(self),
            status_reporter,
        })
    }

    /// Reporter view for the inactivity watchdog. Stays silent while
    /// `building_exclusive` is set, since exclusive work is expected to show
    /// no parallel throughput.
    pub fn inactivity_reporter(
        self: &Arc<Self>,
        status_reporter: Arc<ActionStatusReporter>,
        building_exclusive: Arc<AtomicBool>,
    ) -> Arc<dyn InactivityReporter> {
        Arc::new(TrackerInactivityReporter {
            tracker: Arc::clone(self),
            status_reporter,
            building_exclusive,
        })
    }

    fn lock_activity(&self) -> MutexGuard<'_, Activity> {
        self.activity.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl EvaluationProgressListener for ProgressTracker {
    fn enqueueing(&self, key: &NodeKey) {
        if key.is_report_worthy_action() {
            self.enqueued_actions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(key.clone());
        }
    }

    fn evaluated(&self, key: &NodeKey, state: EvaluationState) {
        match key {
            NodeKey::Artifact(artifact) => {
                // Artifacts built this run were already added by their
                // generating action.
                if (state == EvaluationState::Clean || artifact.is_source())
                    && self.requested.contains(artifact)
                {
                    debug!(artifact = %artifact, ?state, "requested artifact up to date");
                    self.built_artifacts.insert(artifact.clone());
                }
            }
            NodeKey::ActionExecution(action) => {
                // The action may finish without its output's node ever being
                // created if the build is interrupted right now.
                let outputs = action
                    .outputs
                    .iter()
                    .filter(|output| self.requested.contains(*output))
                    .cloned();
                self.built_artifacts.extend(outputs);
            }
            NodeKey::Other { .. } => {}
        }
    }
}

impl ActionCompletedReceiver for ProgressTracker {
    fn action_completed(&self, action: &Action) {
        if action.is_report_worthy() {
            self.lock_activity().completed.insert(action.id.clone());
            self.activity_signal.notify_all();
        }
    }
}

impl ProgressSupplier for ProgressTracker {
    fn progress_string(&self) -> String {
        format!("[{}/{}]", self.completed_count(), self.enqueued_count())
    }
}

struct TrackerInactivityMonitor {
    tracker: Arc<ProgressTracker>,
    status_reporter: Arc<ActionStatusReporter>,
}

impl InactivityMonitor for TrackerInactivityMonitor {
    fn has_started(&self) -> bool {
        self.tracker.has_started()
    }

    fn pending(&self) -> usize {
        self.status_reporter.count()
    }

    fn wait_for_next_completion(&self, timeout: Duration) -> Result<usize, Interrupted> {
        self.tracker.wait_for_next_completion(timeout)
    }

    fn interrupt(&self) {
        self.tracker.interrupt_waiters();
    }
}

struct TrackerInactivityReporter {
    tracker: Arc<ProgressTracker>,
    status_reporter: Arc<ActionStatusReporter>,
    building_exclusive: Arc<AtomicBool>,
}

impl InactivityReporter for TrackerInactivityReporter {
    fn maybe_report_inactivity(&self) -> bool {
        if self.building_exclusive.load(Ordering::SeqCst) {
            return false;
        }
        let progress = format!("{} ", self.tracker.progress_string());
        self.status_reporter
            .show_currently_executing_actions(&progress)
    }
}
