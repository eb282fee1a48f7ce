//! Navigation graph: nodes, the store boundary and breadth-first traversal
//!
//! The algorithms in this crate only talk to [`GraphStore`]; [`InMemoryGraphStore`] is the
//! adapter that ships with it.

pub mod memory;
pub mod node;
pub mod store;
pub mod traversal;

pub use memory::{GraphSnapshot, InMemoryGraphStore};
pub use node::{NavKey, NavKind, NavNode, NodeId, NodeIdentity, resolve_base_label};
pub use store::GraphStore;
pub use traversal::{Evaluation, GraphPath, Traversal};
