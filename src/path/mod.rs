//! Path construction over the navigation graph
//!
//! Paths are found breadth-first under node-path uniqueness, so the first path reaching the
//! target is a shortest one. A [`NavPath`] then hands out the actionable steps one at a time.

use crate::error::{NavError, Result};
use crate::graph::{Evaluation, GraphPath, GraphStore, NavKind, NavNode, NodeId, Traversal};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Step a user (or an agent) has to perform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub node_id: NodeId,
    pub kind: NavKind,

    /// Element to act on; generalized for collapsed nodes
    pub xpath: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Resolved path with a cursor over its actionable steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavPath {
    pub nodes: Vec<NavNode>,

    #[serde(default)]
    cursor: usize,
}

impl NavPath {
    pub fn new(nodes: Vec<NavNode>) -> Self {
        Self { nodes, cursor: 0 }
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|n| n.id).collect()
    }

    /// Next Click or DataEntry step after the cursor, advancing past it.
    ///
    /// Effect, Api, Location and SelectOption nodes are stepped over.
    pub fn next_instruction(&mut self) -> Option<Instruction> {
        while self.cursor < self.nodes.len() {
            let node = &self.nodes[self.cursor];
            self.cursor += 1;

            if !node.kind().is_actionable() {
                continue;
            }
            match node.instruction_xpath() {
                Some(xpath) => {
                    return Some(Instruction {
                        node_id: node.id,
                        kind: node.kind(),
                        xpath,
                        text: node.display_text().map(str::to_string),
                    });
                }
                None => log::warn!("Actionable node {} has no xpath", node.id),
            }
        }
        None
    }

    /// Every remaining instruction, without moving the cursor
    pub fn instructions(&self) -> Vec<Instruction> {
        let mut rest = self.clone();
        std::iter::from_fn(|| rest.next_instruction()).collect()
    }

    /// Start over from the first node
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }
}

/// Union of every path from `source` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavDag {
    pub source: NodeId,
    pub target: NodeId,
    pub nodes: IndexSet<NodeId>,
    pub edges: IndexSet<(NodeId, NodeId)>,
}

impl NavDag {
    /// Steps leading from `node` toward the target
    pub fn next_steps(&self, node: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|(from, _)| *from == node)
            .map(|&(_, to)| to)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Breadth-first path queries against a [`GraphStore`]
pub struct PathConstructor<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    max_depth: Option<usize>,
}

impl<'s, S: GraphStore + ?Sized> PathConstructor<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store, max_depth: None }
    }

    /// Ignore paths longer than `depth` edges
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    fn paths_to(&self, source: NodeId, target: NodeId) -> Result<Traversal<'s, S>> {
        self.store.node(source)?;
        self.store.node(target)?;

        Ok(Traversal::new(self.store, source)
            .max_depth(self.max_depth)
            .evaluator(move |path: &GraphPath| {
                if path.end() == target {
                    Evaluation::IncludeAndPrune
                } else {
                    Evaluation::ExcludeAndContinue
                }
            }))
    }

    fn load(&self, path: &GraphPath) -> Result<NavPath> {
        let nodes = path
            .nodes()
            .iter()
            .map(|&id| self.store.node(id))
            .collect::<Result<Vec<_>>>()?;
        Ok(NavPath::new(nodes))
    }

    /// First path reaching `target`; ties between equally short paths go to the first
    /// one discovered
    pub fn shortest_path(&self, source: NodeId, target: NodeId) -> Result<Option<NavPath>> {
        match self.paths_to(source, target)?.next() {
            Some(path) => Ok(Some(self.load(&path?)?)),
            None => Ok(None),
        }
    }

    /// Every simple path from `source` to `target`, shortest first
    pub fn all_paths(&self, source: NodeId, target: NodeId) -> Result<Vec<NavPath>> {
        let mut paths = Vec::new();
        for path in self.paths_to(source, target)? {
            paths.push(self.load(&path?)?);
        }
        log::debug!("Found {} paths from {} to {}", paths.len(), source, target);
        Ok(paths)
    }

    /// Shortest path, or [`NavError::PathNotFound`]
    pub fn construct_path(&self, source: NodeId, target: NodeId) -> Result<NavPath> {
        self.shortest_path(source, target)?.ok_or(NavError::PathNotFound {
            from: source,
            to: target,
        })
    }

    /// Union of all paths toward `target`, for guidance that tolerates detours
    pub fn dag_toward(&self, source: NodeId, target: NodeId) -> Result<NavDag> {
        let mut dag = NavDag {
            source,
            target,
            nodes: IndexSet::new(),
            edges: IndexSet::new(),
        };
        for path in self.paths_to(source, target)? {
            let path = path?;
            dag.nodes.extend(path.nodes().iter().copied());
            dag.edges.extend(path.edges());
        }
        Ok(dag)
    }
}
