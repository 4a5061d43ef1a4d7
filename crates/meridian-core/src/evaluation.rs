//! Outcomes of one evaluation call

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::artifact::Artifact;
use crate::error::FailureCause;
use crate::node::NodeKey;

/// A circular dependency found while evaluating some node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleInfo {
    /// Nodes leading from the failing node to the cycle
    pub path_to_cycle: Vec<NodeKey>,
    /// The nodes forming the cycle
    pub cycle: Vec<NodeKey>,
}

impl CycleInfo {
    pub fn new(path_to_cycle: Vec<NodeKey>, cycle: Vec<NodeKey>) -> Self {
        Self {
            path_to_cycle,
            cycle,
        }
    }
}

/// Why one node failed to evaluate
#[derive(Debug, Default)]
pub struct ErrorInfo {
    /// The underlying failure, if one was recorded
    pub cause: Option<FailureCause>,
    /// Cycles reachable from the node
    pub cycles: Vec<CycleInfo>,
}

impl ErrorInfo {
    /// Error caused by a failure
    pub fn from_cause(cause: FailureCause) -> Self {
        Self {
            cause: Some(cause),
            cycles: Vec::new(),
        }
    }

    /// Error caused by cycles
    pub fn from_cycles(cycles: Vec<CycleInfo>) -> Self {
        Self {
            cause: None,
            cycles,
        }
    }

    pub fn has_cycles(&self) -> bool {
        !self.cycles.is_empty()
    }
}

/// Result of one evaluation call.
///
/// Errors are kept in the order the evaluator reported them; the first one is
/// the one fail-fast propagates.
#[derive(Debug, Default)]
pub struct EvaluationResult {
    /// Requested artifacts that evaluated successfully
    pub values: Vec<Artifact>,
    /// Failed nodes with their errors
    pub errors: Vec<(NodeKey, ErrorInfo)>,
}

impl EvaluationResult {
    /// A fully successful result
    pub fn success(values: Vec<Artifact>) -> Self {
        Self {
            values,
            errors: Vec::new(),
        }
    }

    /// Record a failed node
    pub fn with_error(mut self, key: impl Into<NodeKey>, info: ErrorInfo) -> Self {
        self.errors.push((key.into(), info));
        self
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Which input files changed since the previous build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifiedFileSet {
    /// Nothing is known; treat every input as modified
    EverythingModified,
    /// Exactly these paths changed
    Paths(BTreeSet<PathBuf>),
}

impl ModifiedFileSet {
    pub fn nothing_modified() -> Self {
        Self::Paths(BTreeSet::new())
    }

    pub fn is_everything_modified(&self) -> bool {
        matches!(self, Self::EverythingModified)
    }

    /// Number of modified files, or `None` when unknown
    pub fn count(&self) -> Option<usize> {
        match self {
            Self::EverythingModified => None,
            Self::Paths(paths) => Some(paths.len()),
        }
    }
}

impl Default for ModifiedFileSet {
    fn default() -> Self {
        Self::EverythingModified
    }
}

impl FromIterator<PathBuf> for ModifiedFileSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self::Paths(iter.into_iter().collect())
    }
}
