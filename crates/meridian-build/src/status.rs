//! Reporting of currently executing actions

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use tracing::warn;

use meridian_core::ActionId;

use crate::events::{ActionEvent, ActionEventBus, ActionEventListener, ListenerId};

/// Maximum number of running actions listed in one report
const MAX_REPORTED_ACTIONS: usize = 5;

#[derive(Debug)]
struct RunningAction {
    description: String,
    started: Instant,
}

/// Tracks in-flight actions from the event bus and renders "still waiting"
/// reports on request.
#[derive(Debug, Default)]
pub struct ActionStatusReporter {
    running: Mutex<HashMap<ActionId, RunningAction>>,
    registration: Mutex<Option<ListenerId>>,
    reports_shown: AtomicUsize,
}

impl ActionStatusReporter {
    /// Create a reporter and register it on `bus`
    pub fn create(bus: &ActionEventBus) -> Arc<Self> {
        let reporter = Arc::new(Self::default());
        let id = bus.register(reporter.clone());
        *reporter
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(id);
        reporter
    }

    /// Detach from `bus`. Only the first call has an effect.
    pub fn unregister_from_event_bus(&self, bus: &ActionEventBus) {
        let registration = self
            .registration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(id) = registration {
            bus.unregister(id);
        }
    }

    /// Number of actions started but not yet finished
    pub fn count(&self) -> usize {
        self.lock_running().len()
    }

    /// Number of "still waiting" reports emitted so far
    pub fn reports_shown(&self) -> usize {
        self.reports_shown.load(Ordering::SeqCst)
    }

    /// Log the actions still running, prefixed by `progress`. Returns false
    /// when nothing is running and no report was emitted.
    pub fn show_currently_executing_actions(&self, progress: &str) -> bool {
        match self.render_currently_executing(progress, Instant::now()) {
            Some(report) => {
                warn!("{}", report);
                self.reports_shown.fetch_add(1, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Render the running actions, longest-running first. `None` when idle.
    pub fn render_currently_executing(&self, progress: &str, now: Instant) -> Option<String> {
        let running = self.lock_running();
        if running.is_empty() {
            return None;
        }

        let mut actions: Vec<&RunningAction> = running.values().collect();
        actions.sort_by_key(|action| action.started);

        let noun = if actions.len() == 1 { "action" } else { "actions" };
        let mut report = format!(
            "{}Still waiting for {} {} to complete:",
            progress,
            actions.len(),
            noun
        );
        for action in actions.iter().take(MAX_REPORTED_ACTIONS) {
            let elapsed = now.saturating_duration_since(action.started);
            report.push_str(&format!(
                "\n  {}, {} s",
                action.description,
                elapsed.as_secs()
            ));
        }
        if actions.len() > MAX_REPORTED_ACTIONS {
            report.push_str(&format!(
                "\n  ... {} more",
                actions.len() - MAX_REPORTED_ACTIONS
            ));
        }
        Some(report)
    }

    fn started(&self, id: ActionId, description: String, started: Instant) {
        self.lock_running().insert(
            id,
            RunningAction {
                description,
                started,
            },
        );
    }

    fn finished(&self, id: &ActionId) {
        self.lock_running().remove(id);
    }

    fn lock_running(&self) -> std::sync::MutexGuard<'_, HashMap<ActionId, RunningAction>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ActionEventListener for ActionStatusReporter {
    fn on_event(&self, event: &ActionEvent) {
        match event {
            ActionEvent::Started { action } => {
                self.started(action.id.clone(), action.describe(), Instant::now());
            }
            ActionEvent::Completed { action, .. } | ActionEvent::Failed { action, .. } => {
                self.finished(&action.id);
            }
        }
    }
}
