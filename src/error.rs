use crate::graph::NodeId;
use thiserror::Error;

/// Errors produced while building or querying the navigation graph
#[derive(Debug, Error)]
pub enum NavError {
    #[error("Malformed XPath '{xpath}': {reason}")]
    MalformedXPath { xpath: String, reason: String },

    #[error("Ambiguous reconciliation: expected exactly one root, found {} ({})", roots.len(), roots.join(", "))]
    AmbiguousReconciliation { roots: Vec<String> },

    #[error("Node key collision: {key} conflicts with existing node {existing}")]
    NodeKeyCollision { key: String, existing: NodeId },

    #[error("Graph store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("No path from {from} to {to}")]
    PathNotFound { from: NodeId, to: NodeId },

    #[error("Invalid collapse: {0}")]
    InvalidCollapse(String),

    #[error("Invalid trace entry '{entry_id}': {reason}")]
    InvalidEntry { entry_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NavError {
    pub(crate) fn malformed(xpath: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedXPath {
            xpath: xpath.into(),
            reason: reason.into(),
        }
    }

    /// Whether retrying the failed store round-trip may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, NavError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_roots() {
        let err = NavError::AmbiguousReconciliation {
            roots: vec!["/html/body".to_string(), "/svg/g".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("found 2"));
        assert!(msg.contains("/svg/g"));
    }

    #[test]
    fn test_only_store_errors_are_transient() {
        assert!(NavError::StoreUnavailable("timeout".into()).is_transient());
        assert!(!NavError::malformed("div", "no segments").is_transient());
        assert!(!NavError::NodeNotFound(NodeId(3)).is_transient());
    }
}
