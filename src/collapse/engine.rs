use crate::collapse::pattern::{LabeledNode, Pattern, PatternInstance, PatternLabel};
use crate::config::CollapseOptions;
use crate::error::{NavError, Result};
use crate::graph::{Evaluation, GraphPath, GraphStore, NodeId, Traversal};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Structurally repeating motif found below a start anchor, ready to be merged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collapse {
    /// Node every instance starts from
    pub start: NodeId,

    /// Node every instance converges on
    pub end: NodeId,

    pub labels: Vec<PatternLabel>,

    /// Matching paths, all running from `start` to `end`
    pub instances: Vec<PatternInstance>,
}

impl Collapse {
    fn from_pattern(pattern: &Pattern) -> Option<Self> {
        let (end, instances) = pattern.converging()?;
        let start = instances.first()?.start()?;
        Some(Self {
            start,
            end,
            labels: pattern.labels.clone(),
            instances: instances.into_iter().cloned().collect(),
        })
    }

    /// Number of edges of each instance
    pub fn len(&self) -> usize {
        self.labels.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}

type PatternTable = IndexMap<Vec<PatternLabel>, Pattern>;

#[derive(Default)]
struct SearchState {
    current: PatternTable,
    previous: PatternTable,
    current_length: Option<usize>,
    labels: HashMap<NodeId, PatternLabel>,
    found: Option<Collapse>,
    error: Option<NavError>,
}

impl SearchState {
    fn label<S: GraphStore + ?Sized>(&mut self, store: &S, id: NodeId) -> Result<PatternLabel> {
        if let Some(label) = self.labels.get(&id) {
            return Ok(*label);
        }
        let label = PatternLabel::of(store.node(id)?.kind(), id);
        self.labels.insert(id, label);
        Ok(label)
    }

    fn instance<S: GraphStore + ?Sized>(&mut self, store: &S, path: &GraphPath) -> Result<PatternInstance> {
        let mut nodes = Vec::with_capacity(path.nodes().len());
        for &id in path.nodes() {
            nodes.push(LabeledNode {
                id,
                label: self.label(store, id)?,
            });
        }
        Ok(PatternInstance::new(nodes))
    }

    /// Move the recurring patterns of the finished length to `previous` and look for a
    /// pattern whose instances converge
    fn close_length(&mut self) {
        let finished = std::mem::take(&mut self.current);
        self.previous = finished.into_iter().filter(|(_, p)| p.is_recurring()).collect();
        self.found = self.previous.values().find_map(Collapse::from_pattern);
    }

    fn record(&mut self, instance: PatternInstance) {
        let labels = instance.labels();
        match self.current.get_mut(&labels) {
            Some(pattern) => pattern.push(instance),
            None => {
                self.current.insert(labels, Pattern::new(instance));
            }
        }
    }

    fn evaluate<S: GraphStore + ?Sized>(&mut self, store: &S, path: &GraphPath) -> Evaluation {
        if self.found.is_some() || self.error.is_some() {
            return Evaluation::ExcludeAndPrune;
        }

        if self.current_length != Some(path.len()) {
            self.close_length();
            if let Some(collapse) = &self.found {
                log::debug!("Pattern converged on {} at length {}", collapse.end, collapse.len());
                return Evaluation::ExcludeAndPrune;
            }
            self.current_length = Some(path.len());
        }

        let instance = match self.instance(store, path) {
            Ok(instance) => instance,
            Err(e) => {
                self.error = Some(e);
                return Evaluation::ExcludeAndPrune;
            }
        };

        let labels = instance.labels();
        self.record(instance);

        if path.len() < 2 {
            return Evaluation::IncludeAndContinue;
        }

        let prefix = &labels[..labels.len() - 1];
        match self.previous.get(prefix) {
            Some(pattern) if pattern.is_recurring() => Evaluation::IncludeAndContinue,
            _ => Evaluation::ExcludeAndPrune,
        }
    }
}

/// Breadth-first motif detection over the navigation graph
pub struct PatternCollapser<'s, S: GraphStore + ?Sized> {
    store: &'s S,
    options: CollapseOptions,
}

impl<'s, S: GraphStore + ?Sized> PatternCollapser<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            options: CollapseOptions::default(),
        }
    }

    pub fn options(mut self, options: CollapseOptions) -> Self {
        self.options = options;
        self
    }

    /// Search for a collapsible pattern below `start`.
    ///
    /// Paths are grouped by label sequence per length. A path longer than one edge is only
    /// expanded while its prefix recurs at the previous length. The search stops at the first
    /// pattern with two instances ending on the same node.
    pub fn run(&self, start: NodeId) -> Result<Option<Collapse>> {
        self.store.node(start)?;

        let mut state = SearchState::default();
        let store = self.store;
        {
            let traversal = Traversal::new(store, start)
                .max_depth(self.options.max_depth)
                .evaluator(|path| state.evaluate(store, path));
            for path in traversal {
                path?;
            }
        }

        if let Some(e) = state.error.take() {
            return Err(e);
        }
        if state.found.is_none() {
            // The longest length is never closed by a following path
            state.close_length();
        }

        match &state.found {
            Some(collapse) => log::info!(
                "Found collapse from {} to {} with {} instances of length {}",
                collapse.start,
                collapse.end,
                collapse.instances.len(),
                collapse.len()
            ),
            None => log::debug!("No collapsible pattern below {}", start),
        }
        Ok(state.found)
    }
}
