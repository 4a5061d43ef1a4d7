//! Artifacts and the actions that generate them

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Whether an artifact is checked in or produced by the build
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// Input file with no generating action
    Source,
    /// Output of exactly one action
    Derived,
}

/// A file-like build input or output, identified by its execution path
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Artifact {
    /// Path relative to the execution root
    pub path: PathBuf,
    /// Source or derived
    pub kind: ArtifactKind,
}

impl Artifact {
    /// Create a source artifact
    pub fn source(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Source,
        }
    }

    /// Create a derived artifact
    pub fn derived(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ArtifactKind::Derived,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this artifact has no generating action
    pub fn is_source(&self) -> bool {
        self.kind == ArtifactKind::Source
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Unique identifier for an action within one build graph
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActionId(pub String);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What sort of work an action does
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Runs a real build step
    #[default]
    Normal,
    /// Internal aggregation of other artifacts; does no work of its own
    Middleman,
}

/// A unit of work producing one or more derived artifacts.
///
/// Identity is the action id alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// Action identifier
    pub id: ActionId,
    /// Short name for the kind of step (e.g., "CppCompile")
    pub mnemonic: String,
    /// Normal or middleman
    #[serde(default)]
    pub kind: ActionKind,
    /// Artifacts this action produces
    pub outputs: Vec<Artifact>,
}

impl Action {
    /// Create a new action
    pub fn new(id: impl Into<String>, mnemonic: impl Into<String>) -> Self {
        Self {
            id: ActionId(id.into()),
            mnemonic: mnemonic.into(),
            kind: ActionKind::Normal,
            outputs: Vec::new(),
        }
    }

    /// Add an output artifact
    pub fn with_output(mut self, output: Artifact) -> Self {
        self.outputs.push(output);
        self
    }

    /// Mark as a middleman action
    pub fn middleman(mut self) -> Self {
        self.kind = ActionKind::Middleman;
        self
    }

    /// Whether this action counts toward progress reporting
    pub fn is_report_worthy(&self) -> bool {
        self.kind != ActionKind::Middleman
    }

    /// Human-readable one-line description
    pub fn describe(&self) -> String {
        match self.outputs.first() {
            Some(output) => format!("{} {}", self.mnemonic, output),
            None => format!("{} {}", self.mnemonic, self.id),
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Action {}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
