//! Configuration types

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main configuration for Meridian
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build execution configuration
    pub build: BuildConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Build execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum number of graph nodes evaluated in parallel
    pub jobs: usize,

    /// Continue past failing nodes instead of stopping at the first one
    pub keep_going: bool,

    /// Seconds without a completed action before reporting what is still running
    pub progress_report_interval_secs: u64,
}

impl BuildConfig {
    /// Inactivity interval as a duration
    pub fn progress_report_interval(&self) -> Duration {
        Duration::from_secs(self.progress_report_interval_secs)
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            keep_going: false,
            progress_report_interval_secs: 15,
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console log level when RUST_LOG is not set
    pub level: String,

    /// Whether to also write debug-level JSON logs to a file
    pub file: bool,

    /// Log directory (default: ~/.meridian/logs)
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: false,
            directory: None,
        }
    }
}
