use crate::error::{NavError, Result};
use crate::graph::node::{NavKey, NavNode, NodeId, NodeIdentity};
use crate::graph::traversal::Traversal;
use indexmap::IndexSet;

/// Persistence boundary of the navigation graph.
///
/// Every write is one atomic round-trip. Upserts merge `instances` by union, so concurrent
/// writers racing on the same natural key never lose provenance. Adapters report transient
/// backend failures as [`NavError::StoreUnavailable`].
pub trait GraphStore: Send + Sync {
    /// Create the node for `key` or merge into the existing one, adding `instance_id`
    fn upsert_node(&self, key: &NavKey, instance_id: &str) -> Result<NavNode>;

    /// Node answering to a natural key (plain or collapsed)
    fn find_node(&self, key: &NavKey) -> Result<Option<NavNode>>;

    /// Node with the given id, if it still exists
    fn find_node_by_id(&self, id: NodeId) -> Result<Option<NavNode>>;

    /// Insert a node without natural-key deduplication (effects, collapsed nodes)
    fn create_node(&self, identity: NodeIdentity, instances: IndexSet<String>) -> Result<NavNode>;

    /// Union `instances` into an existing node
    fn add_instances(&self, id: NodeId, instances: &IndexSet<String>) -> Result<NavNode>;

    /// Directed `NEXT` edge; a no-op when it already exists
    fn create_edge(&self, from: NodeId, to: NodeId) -> Result<()>;

    /// Remove a node together with its incident edges
    fn delete_node(&self, id: NodeId) -> Result<()>;

    /// Targets of the `NEXT` edges leaving `id`, in the order the edges were created
    fn successors(&self, id: NodeId) -> Result<Vec<NodeId>>;

    /// Sources of the `NEXT` edges entering `id`, in the order the edges were created
    fn predecessors(&self, id: NodeId) -> Result<Vec<NodeId>>;

    /// Every node id, in creation order
    fn node_ids(&self) -> Result<Vec<NodeId>>;

    /// Existing node by id
    fn node(&self, id: NodeId) -> Result<NavNode> {
        self.find_node_by_id(id)?.ok_or(NavError::NodeNotFound(id))
    }

    /// Lazy breadth-first sequence of paths starting at `start`
    fn traverse_breadth_first(&self, start: NodeId) -> Traversal<'_, Self>
    where
        Self: Sized,
    {
        Traversal::new(self, start)
    }
}
