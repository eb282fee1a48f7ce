use crate::dom::coordinate::CoordinateTree;
use crate::error::{NavError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Flat node/edge view of one or more coordinate trees, used to merge independently
/// observed fragments of the same page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sliver {
    nodes: IndexSet<String>,
    edges: IndexSet<(String, String)>,
}

impl Sliver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a coordinate tree into its xpaths and parent-child pairs
    pub fn from_tree(tree: &CoordinateTree) -> Self {
        Self {
            nodes: tree.iter().map(|c| c.xpath.clone()).collect(),
            edges: tree
                .edges()
                .map(|(parent, child)| (parent.to_string(), child.to_string()))
                .collect(),
        }
    }

    /// Set union of nodes and edges
    pub fn union(&mut self, other: &Sliver) {
        self.nodes.extend(other.nodes.iter().cloned());
        self.edges.extend(other.edges.iter().cloned());
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Nodes without an incoming edge
    pub fn roots(&self) -> Vec<&str> {
        let targets: IndexSet<&str> = self.edges.iter().map(|(_, child)| child.as_str()).collect();
        self.nodes
            .iter()
            .map(String::as_str)
            .filter(|node| !targets.contains(node))
            .collect()
    }

    /// Rebuild a coordinate tree from the unique root; zero or several roots is ambiguous
    pub fn to_tree(&self) -> Result<CoordinateTree> {
        let roots = self.roots();
        if roots.len() != 1 {
            return Err(NavError::AmbiguousReconciliation {
                roots: roots.into_iter().map(String::from).collect(),
            });
        }

        let mut adjacency: IndexMap<&str, Vec<&str>> = IndexMap::new();
        for (parent, child) in &self.edges {
            adjacency.entry(parent.as_str()).or_default().push(child.as_str());
        }

        let mut tree = CoordinateTree::with_root(roots[0]);
        let mut queue = VecDeque::from([(tree.root_id(), roots[0])]);
        while let Some((parent_id, parent)) = queue.pop_front() {
            for &child in adjacency.get(parent).into_iter().flatten() {
                let child_id = tree.attach(parent_id, child);
                queue.push_back((child_id, child));
            }
        }

        Ok(tree)
    }
}

/// Merge coordinate trees that were observed independently into one tree.
///
/// Hydrated details from the inputs are carried over to the merged coordinates.
pub fn reconcile(trees: &[CoordinateTree]) -> Result<CoordinateTree> {
    let mut merged = Sliver::new();
    for tree in trees {
        merged.union(&Sliver::from_tree(tree));
    }

    let mut tree = merged.to_tree()?;
    for source in trees {
        tree.hydrate_from(source);
    }

    log::debug!(
        "Reconciled {} slivers into {} coordinates rooted at {}",
        trees.len(),
        tree.len(),
        tree.root().xpath
    );
    Ok(tree)
}

/// Materialize each xpath and reconcile the results
pub fn reconcile_xpaths<S: AsRef<str>>(xpaths: &[S]) -> Result<CoordinateTree> {
    let trees = xpaths
        .iter()
        .map(|x| CoordinateTree::materialize(x.as_ref()))
        .collect::<Result<Vec<_>>>()?;
    reconcile(&trees)
}

/// Reconcile when the structure is unambiguous, otherwise keep every tree on its own
pub fn reconcile_or_split(trees: Vec<CoordinateTree>) -> Vec<CoordinateTree> {
    match reconcile(&trees) {
        Ok(tree) => vec![tree],
        Err(e) => {
            log::warn!("{}; treating {} leaves independently", e, trees.len());
            trees
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconcile_shares_common_ancestor() {
        let tree = reconcile_xpaths(&["/html/body/div/span", "/html/body/div/p"]).unwrap();

        assert_eq!(tree.root().xpath, "/html/body");
        assert_eq!(tree.len(), 4);

        let root_children: Vec<_> = tree.children(tree.root_id()).map(|c| c.xpath.clone()).collect();
        assert_eq!(root_children, vec!["/html/body/div"]);

        let div = tree.find("/html/body/div").unwrap();
        let div_children: Vec<_> = tree.children(div).map(|c| c.xpath.clone()).collect();
        assert_eq!(div_children, vec!["/html/body/div/span", "/html/body/div/p"]);
    }

    #[test]
    fn test_reconcile_is_deterministic() {
        let first = reconcile_xpaths(&["/html/body/div/span", "/html/body/div/p"]).unwrap();
        let second = reconcile_xpaths(&["/html/body/div/p", "/html/body/div/span"]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_reconcile_rejects_multiple_roots() {
        let result = reconcile_xpaths(&["/html/body/div", "/svg/g/path"]);
        match result {
            Err(NavError::AmbiguousReconciliation { roots }) => {
                assert_eq!(roots, vec!["/html/body", "/svg/g"]);
            }
            other => panic!("Expected ambiguous reconciliation, got {:?}", other),
        }
    }

    #[test]
    fn test_reconcile_rejects_empty_input() {
        let result = reconcile(&[]);
        assert!(matches!(result, Err(NavError::AmbiguousReconciliation { roots }) if roots.is_empty()));
    }

    #[test]
    fn test_reconcile_or_split_falls_back() {
        let trees = vec![
            CoordinateTree::materialize("/html/body/div").unwrap(),
            CoordinateTree::materialize("/svg/g/path").unwrap(),
        ];
        let result = reconcile_or_split(trees);
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].leaf().xpath, "/svg/g/path");
    }

    #[test]
    fn test_sliver_union_is_set_union() {
        let a = Sliver::from_tree(&CoordinateTree::materialize("/html/body/div/span").unwrap());
        let mut merged = a.clone();
        merged.union(&a);
        assert_eq!(merged, a);
        assert_eq!(merged.node_count(), 3);
        assert_eq!(merged.edge_count(), 2);
    }

    #[test]
    fn test_reconcile_keeps_hydration() {
        let mut input = CoordinateTree::materialize("/html/body/form/input").unwrap();
        let leaf = input.leaf_id();
        input.get_mut(leaf).unwrap().add_attribute("name", "email");
        let button = CoordinateTree::materialize("/html/body/form/button").unwrap();

        let tree = reconcile(&[input, button]).unwrap();
        let id = tree.find("/html/body/form/input").unwrap();
        assert_eq!(
            tree.get(id).unwrap().get_attribute("name"),
            Some(&"email".to_string())
        );
    }
}
