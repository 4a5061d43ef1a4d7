//! Error types for Meridian

use std::path::PathBuf;
use thiserror::Error;

use crate::exit_codes;

/// Result type alias using BuildError
pub type Result<T> = std::result::Result<T, BuildError>;

/// Main error type for build operations
#[derive(Debug, Error)]
pub enum BuildError {
    /// The build did not complete successfully
    #[error("{}", .message.as_deref().unwrap_or("Build did not complete successfully"))]
    BuildFailed { message: Option<String> },

    /// A test failed while executing. Kept apart from `BuildFailed` so callers
    /// can render test failures differently.
    #[error("Test execution failed: {0}")]
    TestExecution(String),

    /// A failure that dictates the process exit code
    #[error("{message}")]
    ExitCausing { message: String, exit_code: i32 },

    /// The build was interrupted
    #[error("Build was cancelled")]
    Cancelled,

    /// An evaluator failure with no recognized kind
    #[error("Unexpected evaluation failure: {0}")]
    Internal(#[source] anyhow::Error),

    /// Configuration-related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BuildError {
    /// Build failure with no further detail
    pub fn build_failed() -> Self {
        Self::BuildFailed { message: None }
    }

    /// Build failure carrying a message
    pub fn build_failed_with<S: Into<String>>(message: S) -> Self {
        Self::BuildFailed {
            message: Some(message.into()),
        }
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Process exit code this error dictates, if it dictates one.
    ///
    /// Build and test failures are left to the caller, which knows whether it
    /// was asked to build or to test.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::ExitCausing { exit_code, .. } => Some(*exit_code),
            Self::Internal(_) => Some(exit_codes::INTERNAL_ERROR),
            Self::Config(_) => Some(exit_codes::BAD_ARGV),
            Self::BuildFailed { .. } | Self::TestExecution(_) | Self::Cancelled => None,
        }
    }
}

/// Why a single graph node failed, as reported by the evaluator
#[derive(Debug, Error)]
pub enum FailureCause {
    /// An action ran and failed
    #[error("{0}")]
    ActionFailed(String),

    /// A test action ran and failed
    #[error("{0}")]
    TestFailed(String),

    /// A failure that dictates the process exit code
    #[error("{message}")]
    ExitCausing { message: String, exit_code: i32 },

    /// Anything else the evaluator ran into
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl From<FailureCause> for BuildError {
    fn from(cause: FailureCause) -> Self {
        match cause {
            FailureCause::ActionFailed(message) => BuildError::build_failed_with(message),
            FailureCause::TestFailed(message) => BuildError::TestExecution(message),
            FailureCause::ExitCausing { message, exit_code } => {
                BuildError::ExitCausing { message, exit_code }
            }
            FailureCause::Unexpected(err) => BuildError::Internal(err),
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found at {0}")]
    NotFound(PathBuf),

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {message}")]
    InvalidValue { field: String, message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// IO error
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),
}
