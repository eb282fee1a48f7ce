use crate::error::{NavError, Result};
use crate::graph::node::{NavKey, NavNode, NodeId, NodeIdentity};
use crate::graph::store::GraphStore;
use indexmap::{IndexMap, IndexSet};
use petgraph::Direction;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Serializable copy of a whole graph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<NavNode>,
    pub edges: Vec<(NodeId, NodeId)>,
    pub next_id: u64,
    /// Traces ingested into the graph, filled in by the model that owns the store
    #[serde(default)]
    pub traces: usize,
}

/// `NEXT` edges between nav nodes, with node ids mapped onto stable graph indices
#[derive(Debug, Default)]
struct StoreState {
    graph: StableDiGraph<NavNode, ()>,
    index: IndexMap<NodeId, NodeIndex>,
    keys: HashMap<NavKey, NodeId>,
    next_id: u64,
}

impl StoreState {
    fn allocate(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn insert(&mut self, node: NavNode) -> NavNode {
        for key in node.identity.keys() {
            if key.is_natural() {
                self.keys.insert(key.clone(), node.id);
            }
        }
        let id = node.id;
        let idx = self.graph.add_node(node.clone());
        self.index.insert(id, idx);
        node
    }

    fn require(&self, id: NodeId) -> Result<NodeIndex> {
        self.index.get(&id).copied().ok_or(NavError::NodeNotFound(id))
    }

    fn node(&self, id: NodeId) -> Option<&NavNode> {
        self.index.get(&id).and_then(|&idx| self.graph.node_weight(idx))
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut NavNode> {
        let idx = *self.index.get(&id)?;
        self.graph.node_weight_mut(idx)
    }

    fn link(&mut self, from: NodeId, to: NodeId) -> Result<()> {
        let a = self.require(from)?;
        let b = self.require(to)?;
        self.graph.update_edge(a, b, ());
        Ok(())
    }

    /// Neighbours in the order their edges were created.
    ///
    /// petgraph walks a node's edge list newest first.
    fn neighbours(&self, id: NodeId, direction: Direction) -> Result<Vec<NodeId>> {
        let idx = self.require(id)?;
        let mut ids: Vec<NodeId> = self
            .graph
            .neighbors_directed(idx, direction)
            .filter_map(|n| self.graph.node_weight(n).map(|node| node.id))
            .collect();
        ids.reverse();
        Ok(ids)
    }

    fn check_conflict(&self, key: &NavKey) -> Result<()> {
        if let Some(conflict) = key.conflicting_key() {
            if let Some(&existing) = self.keys.get(&conflict) {
                return Err(NavError::NodeKeyCollision {
                    key: key.to_string(),
                    existing,
                });
            }
        }
        Ok(())
    }
}

/// Graph store adapter keeping everything in memory.
///
/// Each operation takes the lock once, which makes it a single atomic round-trip.
/// Ids come from a counter owned by the store instance.
#[derive(Debug, Default)]
pub struct InMemoryGraphStore {
    state: RwLock<StoreState>,
}

impl InMemoryGraphStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|e| NavError::StoreUnavailable(format!("Failed to read graph: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|e| NavError::StoreUnavailable(format!("Failed to write graph: {}", e)))
    }

    /// Number of nodes
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.graph.node_count())
    }

    /// Whether the store holds no nodes
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of `NEXT` edges
    pub fn edge_count(&self) -> Result<usize> {
        Ok(self.read()?.graph.edge_count())
    }

    /// Copy the whole graph out of the store
    pub fn snapshot(&self) -> Result<GraphSnapshot> {
        let state = self.read()?;
        let mut nodes = Vec::with_capacity(state.index.len());
        let mut edges = Vec::with_capacity(state.graph.edge_count());
        for &id in state.index.keys() {
            if let Some(node) = state.node(id) {
                nodes.push(node.clone());
            }
            for to in state.neighbours(id, Direction::Outgoing)? {
                edges.push((id, to));
            }
        }
        Ok(GraphSnapshot {
            nodes,
            edges,
            next_id: state.next_id,
            traces: 0,
        })
    }

    /// Rebuild a store from a snapshot, re-indexing natural keys
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let mut state = StoreState {
            next_id: snapshot.next_id,
            ..StoreState::default()
        };
        for node in snapshot.nodes {
            state.next_id = state.next_id.max(node.id.0 + 1);
            state.insert(node);
        }
        for (from, to) in snapshot.edges {
            state.link(from, to)?;
        }
        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Serialize the graph to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }
}

impl GraphStore for InMemoryGraphStore {
    fn upsert_node(&self, key: &NavKey, instance_id: &str) -> Result<NavNode> {
        if !key.is_natural() {
            return Err(NavError::InvalidEntry {
                entry_id: instance_id.to_string(),
                reason: format!("{} has no natural key to upsert on", key),
            });
        }

        let mut state = self.write()?;
        state.check_conflict(key)?;

        if let Some(&id) = state.keys.get(key) {
            if let Some(node) = state.node_mut(id) {
                node.instances.insert(instance_id.to_string());
                return Ok(node.clone());
            }
        }

        let id = state.allocate();
        let mut node = NavNode::new(id, NodeIdentity::single(key.clone()));
        node.instances.insert(instance_id.to_string());
        log::debug!("Created node {} for {}", id, key);
        Ok(state.insert(node))
    }

    fn find_node(&self, key: &NavKey) -> Result<Option<NavNode>> {
        let state = self.read()?;
        Ok(state.keys.get(key).and_then(|&id| state.node(id)).cloned())
    }

    fn find_node_by_id(&self, id: NodeId) -> Result<Option<NavNode>> {
        Ok(self.read()?.node(id).cloned())
    }

    fn create_node(&self, identity: NodeIdentity, instances: IndexSet<String>) -> Result<NavNode> {
        let mut state = self.write()?;

        if let NodeIdentity::Single { key } = &identity {
            state.check_conflict(key)?;
            if let Some(&existing) = state.keys.get(key) {
                return Err(NavError::NodeKeyCollision {
                    key: key.to_string(),
                    existing,
                });
            }
        }

        let id = state.allocate();
        let node = NavNode {
            id,
            identity,
            instances,
        };
        Ok(state.insert(node))
    }

    fn add_instances(&self, id: NodeId, instances: &IndexSet<String>) -> Result<NavNode> {
        let mut state = self.write()?;
        let node = state.node_mut(id).ok_or(NavError::NodeNotFound(id))?;
        node.instances.extend(instances.iter().cloned());
        Ok(node.clone())
    }

    fn create_edge(&self, from: NodeId, to: NodeId) -> Result<()> {
        self.write()?.link(from, to)
    }

    fn delete_node(&self, id: NodeId) -> Result<()> {
        let mut state = self.write()?;
        let idx = state.index.shift_remove(&id).ok_or(NavError::NodeNotFound(id))?;
        // Removing the node drops every incident edge with it
        state.graph.remove_node(idx);
        state.keys.retain(|_, owner| *owner != id);
        Ok(())
    }

    fn successors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.read()?.neighbours(id, Direction::Outgoing)
    }

    fn predecessors(&self, id: NodeId) -> Result<Vec<NodeId>> {
        self.read()?.neighbours(id, Direction::Incoming)
    }

    fn node_ids(&self) -> Result<Vec<NodeId>> {
        Ok(self.read()?.index.keys().copied().collect())
    }
}
