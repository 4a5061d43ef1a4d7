//! Configuration validation

use tracing::debug;

use crate::error::{ConfigError, Result};

use super::types::Config;

/// Log levels accepted in `logging.level`
pub const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    debug!("validating configuration");
    validate_build(config)?;
    validate_logging(config)?;
    debug!("configuration validation passed");
    Ok(())
}

fn validate_build(config: &Config) -> Result<()> {
    if config.build.jobs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "build.jobs".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    if config.build.progress_report_interval_secs == 0 {
        return Err(ConfigError::InvalidValue {
            field: "build.progress_report_interval_secs".to_string(),
            message: "must be at least 1".to_string(),
        }
        .into());
    }

    Ok(())
}

fn validate_logging(config: &Config) -> Result<()> {
    let level = config.logging.level.to_ascii_lowercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(ConfigError::InvalidValue {
            field: "logging.level".to_string(),
            message: format!("must be one of: {}", VALID_LOG_LEVELS.join(", ")),
        }
        .into());
    }

    Ok(())
}
