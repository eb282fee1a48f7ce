use crate::dom::xpath;
use crate::error::{NavError, Result};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Index of a coordinate inside its owning [`CoordinateTree`]
pub type CoordinateId = usize;

/// One DOM element position, identified by its XPath
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coordinate {
    /// Absolute XPath of the position (unique within a tree)
    pub xpath: String,

    /// Sibling ordinal taken from the trailing segment (0 when absent)
    pub index: usize,

    /// Hydrated HTML tag name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    /// Hydrated element attributes
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Hydrated computed style rules
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub style_rules: Vec<String>,

    /// Owning parent (None for the root)
    pub parent: Option<CoordinateId>,

    /// Owned children, in attachment order
    #[serde(default)]
    pub children: IndexSet<CoordinateId>,
}

impl Coordinate {
    fn new(xpath: impl Into<String>, parent: Option<CoordinateId>) -> Self {
        let xpath = xpath.into();
        Self {
            index: xpath::index_of(xpath::last_segment(&xpath)),
            xpath,
            tag: None,
            attributes: HashMap::new(),
            style_rules: Vec::new(),
            parent,
            children: IndexSet::new(),
        }
    }

    /// Builder method: set tag
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Builder method: set attributes
    pub fn with_attributes(mut self, attributes: HashMap<String, String>) -> Self {
        self.attributes = attributes;
        self
    }

    /// Builder method: set style rules
    pub fn with_style_rules(mut self, rules: Vec<String>) -> Self {
        self.style_rules = rules;
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Get attribute value by key
    pub fn get_attribute(&self, key: &str) -> Option<&String> {
        self.attributes.get(key)
    }

    /// Get element ID
    pub fn id(&self) -> Option<&String> {
        self.attributes.get("id")
    }

    /// Check if element has a specific class
    pub fn has_class(&self, class_name: &str) -> bool {
        self.attributes
            .get("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class_name))
    }

    /// Check the hydrated tag, falling back to the tag written in the xpath
    pub fn is_tag(&self, tag: &str) -> bool {
        let own = self
            .tag
            .as_deref()
            .or_else(|| xpath::tag_of(xpath::last_segment(&self.xpath)));
        own.is_some_and(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Whether any DOM detail has been attached beyond the xpath
    pub fn is_hydrated(&self) -> bool {
        self.tag.is_some() || !self.attributes.is_empty() || !self.style_rules.is_empty()
    }

    fn hydrate_from(&mut self, other: &Coordinate) {
        if self.tag.is_none() {
            self.tag = other.tag.clone();
        }
        for (key, value) in &other.attributes {
            self.attributes.entry(key.clone()).or_insert_with(|| value.clone());
        }
        for rule in &other.style_rules {
            if !self.style_rules.contains(rule) {
                self.style_rules.push(rule.clone());
            }
        }
    }
}

/// Arena holding a tree of coordinates; links between coordinates are ids into the arena
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateTree {
    nodes: Vec<Coordinate>,
    by_xpath: IndexMap<String, CoordinateId>,
    root: CoordinateId,
}

impl CoordinateTree {
    pub(crate) fn with_root(xpath: impl Into<String>) -> Self {
        let root = Coordinate::new(xpath, None);
        let mut by_xpath = IndexMap::new();
        by_xpath.insert(root.xpath.clone(), 0);
        Self {
            nodes: vec![root],
            by_xpath,
            root: 0,
        }
    }

    /// Materialize the ancestor chain of an XPath, parents first.
    ///
    /// The chain starts at the root span (`/html/body`) and gains one segment per coordinate.
    pub fn materialize(xpath: &str) -> Result<Self> {
        let mut chain = xpath::ancestry(xpath)?.into_iter();
        let root = chain
            .next()
            .ok_or_else(|| NavError::malformed(xpath, "no root segment"))?;

        let mut tree = Self::with_root(root);
        for step in chain {
            let parent_id = tree.leaf_id();
            tree.attach(parent_id, &step);
        }
        Ok(tree)
    }

    /// Get or create the child `xpath` below `parent`
    pub(crate) fn attach(&mut self, parent: CoordinateId, xpath: &str) -> CoordinateId {
        if let Some(&existing) = self.by_xpath.get(xpath) {
            return existing;
        }

        let id = self.nodes.len();
        self.nodes.push(Coordinate::new(xpath, Some(parent)));
        self.by_xpath.insert(xpath.to_string(), id);
        self.nodes[parent].children.insert(id);
        id
    }

    /// Id of the root coordinate
    pub fn root_id(&self) -> CoordinateId {
        self.root
    }

    /// Root coordinate (`/html/body` for full-depth xpaths)
    pub fn root(&self) -> &Coordinate {
        &self.nodes[self.root]
    }

    /// Deepest coordinate of a materialized chain (the last one attached)
    pub fn leaf_id(&self) -> CoordinateId {
        self.nodes.len() - 1
    }

    /// Deepest coordinate of a materialized chain
    pub fn leaf(&self) -> &Coordinate {
        &self.nodes[self.leaf_id()]
    }

    /// Get a coordinate by id
    pub fn get(&self, id: CoordinateId) -> Option<&Coordinate> {
        self.nodes.get(id)
    }

    /// Get a mutable coordinate by id, e.g. to hydrate it
    pub fn get_mut(&mut self, id: CoordinateId) -> Option<&mut Coordinate> {
        self.nodes.get_mut(id)
    }

    /// Find a coordinate id by xpath
    pub fn find(&self, xpath: &str) -> Option<CoordinateId> {
        self.by_xpath.get(xpath).copied()
    }

    /// Parent of a coordinate, `None` for the root
    pub fn parent(&self, id: CoordinateId) -> Option<&Coordinate> {
        self.get(id).and_then(|c| c.parent).and_then(|p| self.get(p))
    }

    /// Children of a coordinate in attachment order
    pub fn children(&self, id: CoordinateId) -> impl Iterator<Item = &Coordinate> {
        self.get(id)
            .into_iter()
            .flat_map(|c| c.children.iter())
            .filter_map(|&child| self.get(child))
    }

    /// Ids from `id` up to the root, inclusive
    pub fn ancestors(&self, id: CoordinateId) -> Vec<CoordinateId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).map(|_| id);
        while let Some(cur) = current {
            chain.push(cur);
            current = self.nodes[cur].parent;
        }
        chain
    }

    /// Coordinates without children, in attachment order
    pub fn leaves(&self) -> Vec<CoordinateId> {
        (0..self.nodes.len())
            .filter(|&id| self.nodes[id].children.is_empty())
            .collect()
    }

    /// Iterate over all coordinates in arena order
    pub fn iter(&self) -> impl Iterator<Item = &Coordinate> {
        self.nodes.iter()
    }

    /// Total number of coordinates
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Parent-to-child xpath pairs of the whole tree
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().filter_map(|c| {
            c.parent
                .map(|p| (self.nodes[p].xpath.as_str(), c.xpath.as_str()))
        })
    }

    /// Copy hydrated details from matching xpaths of another tree
    pub fn hydrate_from(&mut self, other: &CoordinateTree) {
        for coordinate in other.iter().filter(|c| c.is_hydrated()) {
            if let Some(id) = self.find(&coordinate.xpath) {
                self.nodes[id].hydrate_from(coordinate);
            }
        }
    }

    fn child_xpaths(&self, id: CoordinateId) -> HashSet<&str> {
        self.children(id).map(|c| c.xpath.as_str()).collect()
    }

    /// Structural equality of two coordinates: same xpath and same set of child xpaths
    pub fn same_coordinate(&self, a: CoordinateId, other: &CoordinateTree, b: CoordinateId) -> bool {
        match (self.get(a), other.get(b)) {
            (Some(x), Some(y)) => x.xpath == y.xpath && self.child_xpaths(a) == other.child_xpaths(b),
            _ => false,
        }
    }

    /// Convert the tree to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl PartialEq for CoordinateTree {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.root().xpath == other.root().xpath
            && self.by_xpath.iter().all(|(xpath, &id)| {
                other
                    .find(xpath)
                    .is_some_and(|other_id| self.same_coordinate(id, other, other_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_materialize_round_trip() {
        let xpath = "/html/body/div[2]/ul/li[3]/a";
        let tree = CoordinateTree::materialize(xpath).unwrap();

        assert_eq!(tree.leaf().xpath, xpath);
        assert_eq!(tree.leaf().index, 0);
        assert_eq!(tree.root().xpath, "/html/body");

        // leaf to root reproduces the segments
        let mut segments: Vec<String> = Vec::new();
        for id in tree.ancestors(tree.leaf_id()) {
            let coordinate = tree.get(id).unwrap();
            if coordinate.parent.is_some() {
                segments.push(xpath::last_segment(&coordinate.xpath).to_string());
            } else {
                let mut root: Vec<String> = xpath::segments(&coordinate.xpath)
                    .unwrap()
                    .into_iter()
                    .map(String::from)
                    .collect();
                root.reverse();
                segments.extend(root);
            }
        }
        segments.reverse();
        assert_eq!(segments.join("/"), xpath.trim_start_matches('/'));
    }

    #[test]
    fn test_materialize_links_parent_and_child() {
        let tree = CoordinateTree::materialize("/html/body/div[4]/span").unwrap();
        assert_eq!(tree.len(), 3);

        let div = tree.find("/html/body/div[4]").unwrap();
        assert_eq!(tree.get(div).unwrap().index, 4);
        assert_eq!(tree.parent(div).unwrap().xpath, "/html/body");

        let children: Vec<_> = tree.children(div).map(|c| c.xpath.clone()).collect();
        assert_eq!(children, vec!["/html/body/div[4]/span"]);
    }

    #[test]
    fn test_materialize_rejects_malformed() {
        assert!(CoordinateTree::materialize("body").is_err());
        assert!(CoordinateTree::materialize("/html//span").is_err());
    }

    #[test]
    fn test_structural_equality_needs_same_children() {
        let a = CoordinateTree::materialize("/html/body/div/span").unwrap();
        let b = CoordinateTree::materialize("/html/body/div/p").unwrap();

        let a_div = a.find("/html/body/div").unwrap();
        let b_div = b.find("/html/body/div").unwrap();
        assert!(!a.same_coordinate(a_div, &b, b_div));

        let a_again = CoordinateTree::materialize("/html/body/div/span").unwrap();
        assert!(a.same_coordinate(a_div, &a_again, a_again.find("/html/body/div").unwrap()));
        assert_eq!(a, a_again);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hydration_helpers() {
        let mut tree = CoordinateTree::materialize("/html/body/button[1]").unwrap();
        let leaf = tree.leaf_id();
        let button = tree.get_mut(leaf).unwrap();
        button.add_attribute("class", "btn primary");
        button.add_attribute("id", "save");

        let button = tree.leaf();
        assert!(button.is_tag("BUTTON"));
        assert!(button.has_class("primary"));
        assert!(!button.has_class("secondary"));
        assert_eq!(button.id(), Some(&"save".to_string()));
        assert!(button.is_hydrated());
    }

    #[test]
    fn test_hydrate_from_other_tree() {
        let mut plain = CoordinateTree::materialize("/html/body/div/input").unwrap();
        let mut rich = CoordinateTree::materialize("/html/body/div/input").unwrap();
        let leaf = rich.leaf_id();
        let hydrated = rich
            .leaf()
            .clone()
            .with_tag("input")
            .with_style_rules(vec!["display: block".to_string()]);
        *rich.get_mut(leaf).unwrap() = hydrated;

        plain.hydrate_from(&rich);
        assert_eq!(plain.leaf().tag.as_deref(), Some("input"));
        assert_eq!(plain.leaf().style_rules.len(), 1);
    }

    #[test]
    fn test_to_json() {
        let tree = CoordinateTree::materialize("/html/body/main/h1").unwrap();
        let json = tree.to_json().unwrap();
        assert!(json.contains("/html/body/main/h1"));
    }
}
