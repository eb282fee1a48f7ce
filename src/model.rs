use crate::collapse::{self, Collapse, PatternCollapser};
use crate::config::EngineOptions;
use crate::error::Result;
use crate::graph::{GraphSnapshot, GraphStore, InMemoryGraphStore, NavKey, NavNode, NodeId};
use crate::path::{NavDag, NavPath, PathConstructor};
use crate::resolver::{NodeResolver, ResolvedTrace};
use crate::timeline::Trace;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Navigation graph model over a store.
///
/// Ingestion takes `&self` and may run from several threads at once. Collapsing rewrites the
/// graph and takes `&mut self`, so it can only run once ingestion is over.
pub struct NavigationModel<S: GraphStore = InMemoryGraphStore> {
    store: S,
    options: EngineOptions,
    traces: AtomicUsize,
}

impl NavigationModel<InMemoryGraphStore> {
    /// Model over a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new(InMemoryGraphStore::new())
    }

    /// Model over a previously exported graph, picking up its trace count
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let traces = snapshot.traces;
        let model = Self::new(InMemoryGraphStore::from_snapshot(snapshot)?);
        model.traces.store(traces, Ordering::SeqCst);
        Ok(model)
    }

    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        let mut snapshot = self.store.snapshot()?;
        snapshot.traces = self.trace_count();
        Ok(snapshot)
    }
}

impl<S: GraphStore> NavigationModel<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            options: EngineOptions::default(),
            traces: AtomicUsize::new(0),
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Traces ingested so far
    pub fn trace_count(&self) -> usize {
        self.traces.load(Ordering::SeqCst)
    }

    /// Resolve one trace into the graph
    pub fn ingest(&self, trace: &Trace) -> Result<ResolvedTrace> {
        let resolved = NodeResolver::new(&self.store)
            .options(self.options.resolver.clone())
            .resolve_trace(trace)?;
        self.traces.fetch_add(1, Ordering::SeqCst);
        Ok(resolved)
    }

    pub fn ingest_all(&self, traces: &[Trace]) -> Result<Vec<ResolvedTrace>> {
        traces.iter().map(|t| self.ingest(t)).collect()
    }

    pub fn find_node(&self, key: &NavKey) -> Result<Option<NavNode>> {
        self.store.find_node(key)
    }

    fn can_collapse(&self) -> bool {
        let traces = self.trace_count();
        if traces < 2 {
            log::info!("Skipping collapse: {} trace(s) ingested, at least 2 needed", traces);
            return false;
        }
        true
    }

    /// Search for a collapsible pattern below `start` without changing the graph
    pub fn run_collapse_pass(&mut self, start: NodeId) -> Result<Option<Collapse>> {
        if !self.can_collapse() {
            return Ok(None);
        }
        PatternCollapser::new(&self.store)
            .options(self.options.collapse.clone())
            .run(start)
    }

    /// Merge the instances of a collapse found by [`Self::run_collapse_pass`]
    pub fn apply_collapse(&mut self, collapse: &Collapse) -> Result<Vec<NavNode>> {
        collapse::apply_collapse(&self.store, collapse)
    }

    /// Find and apply collapses below `start` until the graph stops changing
    pub fn collapse_until_stable(&mut self, start: NodeId) -> Result<Vec<Collapse>> {
        if !self.can_collapse() {
            return Ok(Vec::new());
        }
        collapse::collapse_until_stable(&self.store, start, &self.options.collapse)
    }

    pub fn merge_effects_after_location(&mut self, location: NodeId) -> Result<Option<NavNode>> {
        collapse::merge_effects_after_location(&self.store, location)
    }

    fn paths(&self) -> PathConstructor<'_, S> {
        PathConstructor::new(&self.store)
    }

    pub fn construct_path(&self, source: NodeId, target: NodeId) -> Result<NavPath> {
        self.paths().construct_path(source, target)
    }

    pub fn all_paths(&self, source: NodeId, target: NodeId) -> Result<Vec<NavPath>> {
        self.paths().all_paths(source, target)
    }

    pub fn dag_toward(&self, source: NodeId, target: NodeId) -> Result<NavDag> {
        self.paths().dag_toward(source, target)
    }
}
