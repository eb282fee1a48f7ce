use crate::graph::{NavKind, NodeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Label a node contributes to a pattern.
///
/// API nodes are labelled by identity: two API calls only match when they are the same
/// endpoint node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternLabel {
    Kind(NavKind),
    Api(NodeId),
}

impl PatternLabel {
    pub fn of(kind: NavKind, id: NodeId) -> Self {
        match kind {
            NavKind::Api => PatternLabel::Api(id),
            other => PatternLabel::Kind(other),
        }
    }

    pub fn kind(&self) -> NavKind {
        match self {
            PatternLabel::Kind(kind) => *kind,
            PatternLabel::Api(_) => NavKind::Api,
        }
    }
}

impl fmt::Display for PatternLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternLabel::Kind(kind) => write!(f, "{}", kind),
            PatternLabel::Api(id) => write!(f, "Api{}", id),
        }
    }
}

/// Path node together with its label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledNode {
    pub id: NodeId,
    pub label: PatternLabel,
}

/// One concrete path matching a pattern
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternInstance {
    pub nodes: Vec<LabeledNode>,
}

impl PatternInstance {
    pub fn new(nodes: Vec<LabeledNode>) -> Self {
        Self { nodes }
    }

    pub fn start(&self) -> Option<NodeId> {
        self.nodes.first().map(|n| n.id)
    }

    pub fn end(&self) -> Option<NodeId> {
        self.nodes.last().map(|n| n.id)
    }

    pub fn labels(&self) -> Vec<PatternLabel> {
        self.nodes.iter().map(|n| n.label).collect()
    }

    pub fn ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Label sequence shared by every instance, keyed by the sequence of its first path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    pub labels: Vec<PatternLabel>,
    pub instances: Vec<PatternInstance>,
}

impl Pattern {
    pub fn new(first: PatternInstance) -> Self {
        Self {
            labels: first.labels(),
            instances: vec![first],
        }
    }

    pub fn push(&mut self, instance: PatternInstance) {
        self.instances.push(instance);
    }

    /// Whether the pattern repeats at all
    pub fn is_recurring(&self) -> bool {
        self.instances.len() >= 2
    }

    /// Every instance ending on the first terminal node reached by two instances
    pub fn converging(&self) -> Option<(NodeId, Vec<&PatternInstance>)> {
        let mut terminals = Vec::with_capacity(self.instances.len());
        for instance in &self.instances {
            let end = instance.end()?;
            if terminals.contains(&end) {
                let converging = self.instances.iter().filter(|i| i.end() == Some(end)).collect();
                return Some((end, converging));
            }
            terminals.push(end);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(nodes: &[(u64, NavKind)]) -> PatternInstance {
        PatternInstance::new(
            nodes
                .iter()
                .map(|&(id, kind)| LabeledNode {
                    id: NodeId(id),
                    label: PatternLabel::of(kind, NodeId(id)),
                })
                .collect(),
        )
    }

    #[test]
    fn test_api_labels_carry_identity() {
        assert_eq!(PatternLabel::of(NavKind::Click, NodeId(1)), PatternLabel::of(NavKind::Click, NodeId(2)));
        assert_ne!(PatternLabel::of(NavKind::Api, NodeId(1)), PatternLabel::of(NavKind::Api, NodeId(2)));
        assert_eq!(PatternLabel::Api(NodeId(7)).kind(), NavKind::Api);
    }

    #[test]
    fn test_converging_instances() {
        let mut pattern = Pattern::new(instance(&[(0, NavKind::Location), (1, NavKind::Click), (9, NavKind::Effect)]));
        pattern.push(instance(&[(0, NavKind::Location), (2, NavKind::Click), (8, NavKind::Effect)]));
        assert!(pattern.is_recurring());
        assert!(pattern.converging().is_none());

        pattern.push(instance(&[(0, NavKind::Location), (3, NavKind::Click), (9, NavKind::Effect)]));
        let (end, instances) = pattern.converging().unwrap();
        assert_eq!(end, NodeId(9));
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[1].ids(), vec![NodeId(0), NodeId(3), NodeId(9)]);
    }
}
