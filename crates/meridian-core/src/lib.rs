//! Meridian Core - Core library for the Meridian build driver
//!
//! This crate provides the data model shared with evaluation engines
//! (artifacts, actions, graph node keys, evaluation results), error handling,
//! exit codes, configuration and logging setup.

pub mod artifact;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod exit_codes;
pub mod logging;
pub mod node;

pub use artifact::{Action, ActionId, ActionKind, Artifact, ArtifactKind};
pub use config::{BuildConfig, Config, LoggingConfig};
pub use error::{BuildError, ConfigError, FailureCause, Result};
pub use evaluation::{CycleInfo, ErrorInfo, EvaluationResult, ModifiedFileSet};
pub use node::{EvaluationState, NodeKey, NodeType};
