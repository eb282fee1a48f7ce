//! Pattern collapsing
//!
//! - [`PatternCollapser`]: breadth-first search for repeating motifs that converge on one node
//! - [`apply_collapse`]: merge step replacing each interior position by a collapsed node
//! - [`merge_effects_after_location`]: post-pass unifying the effects that follow a page load

pub mod engine;
pub mod merge;
pub mod pattern;

pub use engine::{Collapse, PatternCollapser};
pub use merge::{apply_collapse, collapse_until_stable, merge_effects_after_location, merge_nodes};
pub use pattern::{LabeledNode, Pattern, PatternInstance, PatternLabel};
