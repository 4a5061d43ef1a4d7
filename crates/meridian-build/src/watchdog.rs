//! Inactivity watchdog
//!
//! A background thread that notices when no action has completed for a
//! while and asks for a report of what is still running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, warn};

/// A wait was cut short because the watchdog is stopping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("wait for action completion was interrupted")]
pub struct Interrupted;

/// What the watchdog observes
pub trait InactivityMonitor: Send + Sync {
    /// Whether evaluation has enqueued any work yet
    fn has_started(&self) -> bool;

    /// Number of actions currently running
    fn pending(&self) -> usize;

    /// Wait up to `timeout` for an action to complete, returning how many did
    fn wait_for_next_completion(&self, timeout: Duration) -> Result<usize, Interrupted>;

    /// Cut short any current or future wait
    fn interrupt(&self);
}

/// What the watchdog does when nothing completes for a whole interval
pub trait InactivityReporter: Send + Sync {
    /// Returns whether a report was emitted
    fn maybe_report_inactivity(&self) -> bool;
}

/// Shortest interval the watchdog waits between reports
pub const MIN_REPORT_INTERVAL: Duration = Duration::from_millis(1);

/// Background timer reporting stalled builds
pub struct InactivityWatchdog {
    monitor: Arc<dyn InactivityMonitor>,
    reporter: Arc<dyn InactivityReporter>,
    interval: Duration,
    stopping: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl InactivityWatchdog {
    /// Intervals shorter than [`MIN_REPORT_INTERVAL`] are raised to it.
    pub fn new(
        monitor: Arc<dyn InactivityMonitor>,
        reporter: Arc<dyn InactivityReporter>,
        interval: Duration,
    ) -> Self {
        if interval < MIN_REPORT_INTERVAL {
            warn!(?interval, "inactivity interval too short, using {:?}", MIN_REPORT_INTERVAL);
        }
        Self {
            monitor,
            reporter,
            interval: interval.max(MIN_REPORT_INTERVAL),
            stopping: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Spawn the watchdog thread. Calling this on a running watchdog does nothing.
    pub fn start(&mut self) -> std::io::Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let monitor = Arc::clone(&self.monitor);
        let reporter = Arc::clone(&self.reporter);
        let stopping = Arc::clone(&self.stopping);
        let interval = self.interval;

        let handle = thread::Builder::new()
            .name("action-inactivity-watchdog".to_string())
            .spawn(move || watchdog_loop(&*monitor, &*reporter, &stopping, interval))?;
        self.handle = Some(handle);
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Stop and join the watchdog thread. Safe to call more than once.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };
        self.stopping.store(true, Ordering::SeqCst);
        self.monitor.interrupt();
        if handle.join().is_err() {
            warn!("inactivity watchdog thread panicked");
        }
    }
}

impl Drop for InactivityWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InactivityWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InactivityWatchdog")
            .field("interval", &self.interval)
            .field("running", &self.is_running())
            .finish()
    }
}

fn watchdog_loop(
    monitor: &dyn InactivityMonitor,
    reporter: &dyn InactivityReporter,
    stopping: &AtomicBool,
    interval: Duration,
) {
    while !stopping.load(Ordering::SeqCst) {
        let started = monitor.has_started();
        // Before anything is enqueued the wait only serves as an
        // interruptible sleep.
        match monitor.wait_for_next_completion(interval) {
            Ok(0) if started && !stopping.load(Ordering::SeqCst) => {
                let reported = reporter.maybe_report_inactivity();
                debug!(
                    pending = monitor.pending(),
                    reported,
                    "no action completed within interval"
                );
            }
            Ok(_) => {}
            Err(Interrupted) => break,
        }
    }
}
