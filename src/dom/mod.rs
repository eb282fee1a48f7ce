//! DOM structure analysis for interaction events
//!
//! This module works purely on XPath strings observed in a trace. It includes:
//! - Coordinate / CoordinateTree: arena-backed tree of DOM element positions
//! - Sliver: flat node/edge view used to reconcile independently observed trees
//! - DynamicXPath: generalized pattern over a family of repeated element paths

pub mod coordinate;
pub mod dynamic_xpath;
pub mod sliver;
pub mod xpath;

pub use coordinate::{Coordinate, CoordinateId, CoordinateTree};
pub use dynamic_xpath::{DynamicXPath, mine_families};
pub use sliver::{Sliver, reconcile, reconcile_or_split, reconcile_xpaths};

use serde::Serialize;

/// Structure of the elements added to the page by one DOM effect
#[derive(Debug, Clone, Serialize)]
pub struct EffectStructure {
    /// One tree when the added leaves reconcile, otherwise one tree per leaf
    pub trees: Vec<CoordinateTree>,

    /// Repeated element families found among the added leaves
    pub families: Vec<DynamicXPath>,

    /// Leaves that could not be parsed
    pub rejected: Vec<String>,
}

impl EffectStructure {
    /// Materialize and reconcile the added leaves, then mine repeated families.
    ///
    /// Malformed leaves are logged and skipped rather than failing the whole effect.
    pub fn analyze<S: AsRef<str>>(leaves: &[S]) -> Self {
        let mut trees = Vec::new();
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for leaf in leaves {
            match CoordinateTree::materialize(leaf.as_ref()) {
                Ok(tree) => {
                    trees.push(tree);
                    accepted.push(leaf.as_ref());
                }
                Err(e) => {
                    log::warn!("Skipping effect leaf: {}", e);
                    rejected.push(leaf.as_ref().to_string());
                }
            }
        }

        let trees = if trees.len() > 1 { reconcile_or_split(trees) } else { trees };

        Self {
            trees,
            families: mine_families(&accepted),
            rejected,
        }
    }

    /// Whether every added leaf ended up under a single root
    pub fn is_reconciled(&self) -> bool {
        self.trees.len() == 1
    }
}
