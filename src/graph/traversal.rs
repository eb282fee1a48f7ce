use crate::error::Result;
use crate::graph::{GraphStore, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Ordered list of nodes connected by `NEXT` edges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphPath {
    nodes: Vec<NodeId>,
}

impl GraphPath {
    /// Zero-length path sitting on `start`
    pub fn new(start: NodeId) -> Self {
        Self { nodes: vec![start] }
    }

    pub fn start(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn end(&self) -> NodeId {
        self.nodes[self.nodes.len() - 1]
    }

    /// Number of edges
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Consecutive `(from, to)` pairs
    pub fn edges(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.nodes.windows(2).map(|w| (w[0], w[1]))
    }

    fn extended(&self, next: NodeId) -> Self {
        let mut nodes = Vec::with_capacity(self.nodes.len() + 1);
        nodes.extend_from_slice(&self.nodes);
        nodes.push(next);
        Self { nodes }
    }
}

/// Decision taken for each path reached by a traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    IncludeAndContinue,
    IncludeAndPrune,
    ExcludeAndContinue,
    ExcludeAndPrune,
}

impl Evaluation {
    pub fn includes(self) -> bool {
        matches!(self, Evaluation::IncludeAndContinue | Evaluation::IncludeAndPrune)
    }

    pub fn continues(self) -> bool {
        matches!(self, Evaluation::IncludeAndContinue | Evaluation::ExcludeAndContinue)
    }
}

type Evaluator<'a> = Box<dyn FnMut(&GraphPath) -> Evaluation + 'a>;

/// Lazy breadth-first traversal under node-path uniqueness: no yielded path visits a node
/// twice. Paths are evaluated in order of increasing length.
pub struct Traversal<'a, S: GraphStore + ?Sized> {
    store: &'a S,
    queue: VecDeque<GraphPath>,
    evaluator: Evaluator<'a>,
    max_depth: Option<usize>,
}

impl<'a, S: GraphStore + ?Sized> Traversal<'a, S> {
    pub fn new(store: &'a S, start: NodeId) -> Self {
        Self {
            store,
            queue: VecDeque::from([GraphPath::new(start)]),
            evaluator: Box::new(|_| Evaluation::IncludeAndContinue),
            max_depth: None,
        }
    }

    /// Decide per path whether it is yielded and whether it is expanded further
    pub fn evaluator(mut self, evaluator: impl FnMut(&GraphPath) -> Evaluation + 'a) -> Self {
        self.evaluator = Box::new(evaluator);
        self
    }

    /// Stop expanding paths once they reach this many edges
    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }
}

impl<S: GraphStore + ?Sized> Iterator for Traversal<'_, S> {
    type Item = Result<GraphPath>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(path) = self.queue.pop_front() {
            let evaluation = (self.evaluator)(&path);

            let within_depth = self.max_depth.is_none_or(|depth| path.len() < depth);
            if evaluation.continues() && within_depth {
                match self.store.successors(path.end()) {
                    Ok(successors) => {
                        for next in successors {
                            if !path.contains(next) {
                                self.queue.push_back(path.extended(next));
                            }
                        }
                    }
                    Err(e) => {
                        self.queue.clear();
                        return Some(Err(e));
                    }
                }
            }

            if evaluation.includes() {
                return Some(Ok(path));
            }
        }
        None
    }
}
