//! Addressable units of the evaluation graph

use std::fmt;
use std::sync::Arc;

use crate::artifact::{Action, Artifact};

/// The type tag of a graph node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeType {
    /// Evaluates to a built or clean artifact
    Artifact,
    /// Evaluates by running an action
    ActionExecution,
    /// Any other node the evaluator keeps (configuration, packages, ...)
    Other(String),
}

/// Key of one node in the evaluation graph
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Artifact(Artifact),
    ActionExecution(Arc<Action>),
    Other { node_type: String, name: String },
}

impl NodeKey {
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Artifact(_) => NodeType::Artifact,
            Self::ActionExecution(_) => NodeType::ActionExecution,
            Self::Other { node_type, .. } => NodeType::Other(node_type.clone()),
        }
    }

    /// The action, if this is an action-execution node
    pub fn action(&self) -> Option<&Action> {
        match self {
            Self::ActionExecution(action) => Some(action),
            _ => None,
        }
    }

    /// Whether this node runs an action that counts toward progress
    pub fn is_report_worthy_action(&self) -> bool {
        self.action().is_some_and(Action::is_report_worthy)
    }
}

impl From<Artifact> for NodeKey {
    fn from(artifact: Artifact) -> Self {
        Self::Artifact(artifact)
    }
}

impl From<Action> for NodeKey {
    fn from(action: Action) -> Self {
        Self::ActionExecution(Arc::new(action))
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Artifact(artifact) => write!(f, "ARTIFACT:{}", artifact),
            Self::ActionExecution(action) => write!(f, "ACTION_EXECUTION:{}", action.id),
            Self::Other { node_type, name } => write!(f, "{}:{}", node_type, name),
        }
    }
}

/// How a node came to have its value in this evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvaluationState {
    /// Recomputed during this evaluation
    Built,
    /// Already up to date; nothing was recomputed
    Clean,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_types() {
        let artifact: NodeKey = Artifact::derived("out").into();
        let action: NodeKey = Action::new("a", "Compile").into();
        let other = NodeKey::Other {
            node_type: "PACKAGE".to_string(),
            name: "//foo".to_string(),
        };

        assert_eq!(artifact.node_type(), NodeType::Artifact);
        assert_eq!(action.node_type(), NodeType::ActionExecution);
        assert_eq!(other.node_type(), NodeType::Other("PACKAGE".to_string()));
        assert_eq!(other.to_string(), "PACKAGE://foo");
    }

    #[test]
    fn test_report_worthy_action() {
        let normal: NodeKey = Action::new("a", "Compile").into();
        let middleman: NodeKey = Action::new("m", "Middleman").middleman().into();
        let artifact: NodeKey = Artifact::source("src").into();

        assert!(normal.is_report_worthy_action());
        assert!(!middleman.is_report_worthy_action());
        assert!(!artifact.is_report_worthy_action());
    }
}
