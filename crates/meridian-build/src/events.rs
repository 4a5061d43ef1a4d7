//! Action execution events and the bus that carries them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use meridian_core::Action;

/// Events emitted by the evaluator while running actions
#[derive(Debug, Clone)]
pub enum ActionEvent {
    /// An action is starting execution
    Started { action: Arc<Action> },
    /// An action completed successfully
    Completed {
        action: Arc<Action>,
        duration: Duration,
    },
    /// An action failed
    Failed {
        action: Arc<Action>,
        duration: Duration,
        error: String,
    },
}

impl ActionEvent {
    pub fn action(&self) -> &Action {
        match self {
            Self::Started { action }
            | Self::Completed { action, .. }
            | Self::Failed { action, .. } => action,
        }
    }
}

/// Trait for observing action execution. Called from evaluator worker threads.
pub trait ActionEventListener: Send + Sync {
    /// Handle an action event
    fn on_event(&self, event: &ActionEvent);
}

/// Handle returned by [`ActionEventBus::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Registry of action event listeners, owned by the evaluator.
///
/// Listeners come and go while worker threads broadcast, so all access goes
/// through interior locking.
#[derive(Default)]
pub struct ActionEventBus {
    listeners: Mutex<Vec<(ListenerId, Arc<dyn ActionEventListener>)>>,
    next_id: AtomicU64,
}

impl ActionEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn ActionEventListener>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Remove a listener. Returns false if it was not registered.
    pub fn unregister(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(registered, _)| *registered != id);
        listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Broadcast an event to all registered listeners
    pub fn broadcast(&self, event: &ActionEvent) {
        // Snapshot so listeners may (un)register without deadlocking.
        let listeners: Vec<Arc<dyn ActionEventListener>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}

impl std::fmt::Debug for ActionEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionEventBus")
            .field("listeners", &self.len())
            .finish()
    }
}
