//! # nav-graph
//!
//! A Rust library that builds a generalized navigation graph out of recorded web interaction
//! traces, and answers "how do I get from here to there" queries against it.
//!
//! ## Features
//!
//! - **Node Resolution**: Map clicks, form entries, API calls, location changes and DOM effects to
//!   canonical graph nodes, linked in the order they were observed
//! - **DOM Reconciliation**: Merge partial XPath observations into one coordinate tree
//! - **Dynamic XPath Mining**: Generalize repeated element families (`tr[1]`, `tr[2]`, ...) into
//!   one pattern
//! - **Pattern Collapsing**: Find repeating motifs that converge on the same node and merge them
//! - **Path Construction**: Shortest and all paths between nodes, with step-by-step instructions
//!
//! ## Library Usage
//!
//! ```rust
//! use nav_graph::{Interaction, NavigationModel, Trace};
//!
//! # fn main() -> nav_graph::Result<()> {
//! let model = NavigationModel::in_memory();
//!
//! let trace = Trace::new("session-1")
//!     .with(Interaction::LocationChange { url: "https://shop.test/".into() })
//!     .with(Interaction::Click { xpath: "/html/body/nav/a[2]".into(), text: "Orders".into() })
//!     .with(Interaction::LocationChange { url: "https://shop.test/orders".into() });
//!
//! let ids = model.ingest(&trace)?.node_ids();
//!
//! let mut path = model.construct_path(ids[0], ids[2])?;
//! let step = path.next_instruction().expect("one click on the way");
//! assert_eq!(step.xpath, "/html/body/nav/a[2]");
//! # Ok(())
//! # }
//! ```
//!
//! ### Collapsing Repeated Rows
//!
//! Once at least two traces are ingested, repeated motifs below a start node can be merged:
//!
//! ```rust,no_run
//! # use nav_graph::{NavigationModel, NodeId};
//! # fn main() -> nav_graph::Result<()> {
//! # let mut model = NavigationModel::in_memory();
//! # let start = NodeId(0);
//! if let Some(collapse) = model.run_collapse_pass(start)? {
//!     model.apply_collapse(&collapse)?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`dom`]: Coordinate trees, reconciliation and dynamic XPath mining
//! - [`graph`]: Navigation nodes, the [`GraphStore`] boundary and breadth-first traversal
//! - [`timeline`]: Trace input types and URL/API normalization
//! - [`resolver`]: Timeline entity to graph node resolution
//! - [`collapse`]: Pattern-collapsing engine and merge step
//! - [`path`]: Path construction and instructions
//! - [`config`]: Resolver and collapse options
//! - [`error`]: Error types and result aliases

pub mod collapse;
pub mod config;
pub mod dom;
pub mod error;
pub mod graph;
pub mod model;
pub mod path;
pub mod resolver;
pub mod timeline;

pub use collapse::{Collapse, PatternCollapser, apply_collapse, merge_effects_after_location};
pub use config::{CollapseOptions, EngineOptions, ResolverOptions};
pub use dom::{CoordinateTree, DynamicXPath, EffectStructure};
pub use error::{NavError, Result};
pub use graph::{
    GraphPath, GraphSnapshot, GraphStore, InMemoryGraphStore, NavKey, NavKind, NavNode, NodeId, NodeIdentity,
};
pub use model::NavigationModel;
pub use path::{Instruction, NavDag, NavPath, PathConstructor};
pub use resolver::{NodeResolver, ResolvedTrace};
pub use timeline::{Interaction, TimelineEntity, Trace, normalize_location, trace_schema};
