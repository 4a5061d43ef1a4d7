//! Tracing setup

use std::path::PathBuf;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Set up tracing with up to two layers:
/// - Console: controlled by RUST_LOG (default: the configured level)
/// - File: debug-level JSON, daily rotated, when `logging.file` is set
///
/// The returned guard flushes the file writer on drop and must be held for
/// as long as logging is wanted. Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.to_ascii_lowercase()));

    if config.file {
        if let Some(log_dir) = log_directory(config) {
            let file_appender = tracing_appender::rolling::daily(&log_dir, "meridian.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_target(false)
                        .with_filter(console_filter),
                )
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking)
                        .with_target(true)
                        .with_filter(EnvFilter::new("debug")),
                )
                .try_init()
                .context("failed to install tracing subscriber")?;

            return Ok(Some(guard));
        }
    }

    // Fallback: console only
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(console_filter),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(None)
}

/// Returns the log directory path, creating it if needed.
fn log_directory(config: &LoggingConfig) -> Option<PathBuf> {
    let log_dir = match &config.directory {
        Some(dir) => dir.clone(),
        None => dirs::home_dir()?.join(".meridian").join("logs"),
    };
    std::fs::create_dir_all(&log_dir).ok()?;
    Some(log_dir)
}
