use crate::dom::{DynamicXPath, xpath};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque node identifier, assigned by the store at creation and stable thereafter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of interaction a node stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NavKind {
    Click,
    DataEntry,
    SelectOption,
    Api,
    Location,
    Effect,
}

const COLLAPSED_PREFIX: &str = "Collapsed";

impl NavKind {
    pub const ALL: [NavKind; 6] = [
        NavKind::Click,
        NavKind::DataEntry,
        NavKind::SelectOption,
        NavKind::Api,
        NavKind::Location,
        NavKind::Effect,
    ];

    /// Store label of the plain variant
    pub fn label(&self) -> &'static str {
        match self {
            NavKind::Click => "Click",
            NavKind::DataEntry => "DataEntry",
            NavKind::SelectOption => "SelectOption",
            NavKind::Api => "Api",
            NavKind::Location => "Location",
            NavKind::Effect => "Effect",
        }
    }

    /// Store label of the collapsed variant
    pub fn collapsed_label(&self) -> String {
        format!("{}{}", COLLAPSED_PREFIX, self.label())
    }

    /// Whether a user acts on this node directly (as opposed to observing it)
    pub fn is_actionable(&self) -> bool {
        matches!(self, NavKind::Click | NavKind::DataEntry)
    }

    fn from_label(label: &str) -> Option<Self> {
        NavKind::ALL.into_iter().find(|k| k.label() == label)
    }
}

impl fmt::Display for NavKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Base kind of a node carrying several labels (plain and collapsed variants of one kind)
pub fn resolve_base_label<S: AsRef<str>>(labels: &[S]) -> Option<NavKind> {
    labels.iter().find_map(|label| {
        let label = label.as_ref();
        NavKind::from_label(label.strip_prefix(COLLAPSED_PREFIX).unwrap_or(label))
    })
}

/// Natural key used to deduplicate nodes of one kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NavKey {
    Click { xpath: String, text: String },
    DataEntry { xpath: String },
    SelectOption { xpath: String },
    Api { path_template: String, method: String },
    Location { path: String },
    /// Effects have no intrinsic identity
    Effect,
}

impl NavKey {
    pub fn kind(&self) -> NavKind {
        match self {
            NavKey::Click { .. } => NavKind::Click,
            NavKey::DataEntry { .. } => NavKind::DataEntry,
            NavKey::SelectOption { .. } => NavKind::SelectOption,
            NavKey::Api { .. } => NavKind::Api,
            NavKey::Location { .. } => NavKind::Location,
            NavKey::Effect => NavKind::Effect,
        }
    }

    /// Whether the key identifies a node on its own
    pub fn is_natural(&self) -> bool {
        !matches!(self, NavKey::Effect)
    }

    pub fn xpath(&self) -> Option<&str> {
        match self {
            NavKey::Click { xpath, .. } | NavKey::DataEntry { xpath } | NavKey::SelectOption { xpath } => {
                Some(xpath.as_str())
            }
            _ => None,
        }
    }

    /// Key that may not coexist with this one: a form control is either typed into or
    /// selected from, never both
    pub fn conflicting_key(&self) -> Option<NavKey> {
        match self {
            NavKey::DataEntry { xpath } => Some(NavKey::SelectOption { xpath: xpath.clone() }),
            NavKey::SelectOption { xpath } => Some(NavKey::DataEntry { xpath: xpath.clone() }),
            _ => None,
        }
    }
}

impl fmt::Display for NavKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavKey::Click { xpath, text } => write!(f, "Click({}, {:?})", xpath, text),
            NavKey::DataEntry { xpath } => write!(f, "DataEntry({})", xpath),
            NavKey::SelectOption { xpath } => write!(f, "SelectOption({})", xpath),
            NavKey::Api { path_template, method } => write!(f, "Api({} {})", method, path_template),
            NavKey::Location { path } => write!(f, "Location({})", path),
            NavKey::Effect => f.write_str("Effect"),
        }
    }
}

/// What a node stands for: one natural key, or the union of the keys merged into it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "identity", rename_all = "snake_case")]
pub enum NodeIdentity {
    Single { key: NavKey },
    Collapsed { kind: NavKind, keys: IndexSet<NavKey> },
}

impl NodeIdentity {
    pub fn single(key: NavKey) -> Self {
        NodeIdentity::Single { key }
    }

    pub fn kind(&self) -> NavKind {
        match self {
            NodeIdentity::Single { key } => key.kind(),
            NodeIdentity::Collapsed { kind, .. } => *kind,
        }
    }

    /// Every natural key the node answers to
    pub fn keys(&self) -> Vec<&NavKey> {
        match self {
            NodeIdentity::Single { key } => vec![key],
            NodeIdentity::Collapsed { keys, .. } => keys.iter().collect(),
        }
    }
}

/// Canonical node of the navigation graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavNode {
    pub id: NodeId,

    #[serde(flatten)]
    pub identity: NodeIdentity,

    /// Trace entries this node was observed in; only ever grows
    #[serde(default)]
    pub instances: IndexSet<String>,
}

impl NavNode {
    pub fn new(id: NodeId, identity: NodeIdentity) -> Self {
        Self {
            id,
            identity,
            instances: IndexSet::new(),
        }
    }

    pub fn kind(&self) -> NavKind {
        self.identity.kind()
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self.identity, NodeIdentity::Collapsed { .. })
    }

    /// Store labels: the plain kind, plus the collapsed variant for merged nodes
    pub fn labels(&self) -> Vec<String> {
        let kind = self.kind();
        let mut labels = vec![kind.label().to_string()];
        if self.is_collapsed() {
            labels.push(kind.collapsed_label());
        }
        labels
    }

    /// Natural key of a plain node
    pub fn key(&self) -> Option<&NavKey> {
        match &self.identity {
            NodeIdentity::Single { key } => Some(key),
            NodeIdentity::Collapsed { .. } => None,
        }
    }

    /// Distinct xpaths of the node's keys
    pub fn xpaths(&self) -> Vec<&str> {
        let unique: IndexSet<&str> = self.identity.keys().into_iter().filter_map(NavKey::xpath).collect();
        unique.into_iter().collect()
    }

    /// Display text of a click (the first one for collapsed clicks)
    pub fn display_text(&self) -> Option<&str> {
        self.identity.keys().into_iter().find_map(|key| match key {
            NavKey::Click { text, .. } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
    }

    /// XPath to act on: the node's own xpath, or for collapsed nodes one that selects
    /// every merged member
    pub fn instruction_xpath(&self) -> Option<String> {
        let xpaths = self.xpaths();
        match xpaths.len() {
            0 => None,
            1 => Some(xpaths[0].to_string()),
            _ => Some(synthesize_xpath(&xpaths)),
        }
    }
}

/// Generalize the members of a collapsed node: the dynamic pattern when all members share
/// one, otherwise their common segment prefix
fn synthesize_xpath(xpaths: &[&str]) -> String {
    match DynamicXPath::mine(xpaths) {
        Ok(pattern) if !pattern.is_low_confidence() && xpaths.iter().all(|x| pattern.matches(x)) => {
            pattern.generalized()
        }
        _ => xpath::common_segment_prefix(xpaths),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click(xpath: &str, text: &str) -> NavKey {
        NavKey::Click {
            xpath: xpath.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_resolve_base_label() {
        assert_eq!(resolve_base_label(&["Click"]), Some(NavKind::Click));
        assert_eq!(resolve_base_label(&["CollapsedClick", "Click"]), Some(NavKind::Click));
        assert_eq!(resolve_base_label(&["CollapsedEffect"]), Some(NavKind::Effect));
        assert_eq!(resolve_base_label(&["Unknown"]), None);
    }

    #[test]
    fn test_labels_of_collapsed_node() {
        let node = NavNode::new(
            NodeId(1),
            NodeIdentity::Collapsed {
                kind: NavKind::Click,
                keys: IndexSet::from([click("/html/body/a[1]", "Edit")]),
            },
        );
        assert_eq!(node.labels(), vec!["Click", "CollapsedClick"]);
        assert_eq!(resolve_base_label(&node.labels()), Some(NavKind::Click));
    }

    #[test]
    fn test_conflicting_key() {
        let entry = NavKey::DataEntry { xpath: "/html/body/input".into() };
        assert_eq!(
            entry.conflicting_key(),
            Some(NavKey::SelectOption { xpath: "/html/body/input".into() })
        );
        assert_eq!(click("/x/y", "").conflicting_key(), None);
    }

    #[test]
    fn test_instruction_xpath_single() {
        let node = NavNode::new(NodeId(2), NodeIdentity::single(click("/html/body/button", "Save")));
        assert_eq!(node.instruction_xpath().as_deref(), Some("/html/body/button"));
        assert_eq!(node.display_text(), Some("Save"));
    }

    #[test]
    fn test_instruction_xpath_collapsed_rows() {
        let node = NavNode::new(
            NodeId(3),
            NodeIdentity::Collapsed {
                kind: NavKind::Click,
                keys: IndexSet::from([
                    click("/html/body/table/tr[1]/td/a", "Edit"),
                    click("/html/body/table/tr[2]/td/a", "Edit"),
                ]),
            },
        );
        assert_eq!(node.instruction_xpath().as_deref(), Some("/html/body/table/tr/td/a"));
    }

    #[test]
    fn test_instruction_xpath_falls_back_to_common_prefix() {
        let node = NavNode::new(
            NodeId(4),
            NodeIdentity::Collapsed {
                kind: NavKind::DataEntry,
                keys: IndexSet::from([
                    NavKey::DataEntry { xpath: "/html/body/form/div[1]/input".into() },
                    NavKey::DataEntry { xpath: "/html/body/form/section/textarea".into() },
                ]),
            },
        );
        assert_eq!(node.instruction_xpath().as_deref(), Some("/html/body/form"));
    }

    #[test]
    fn test_effect_has_no_xpath() {
        let node = NavNode::new(NodeId(5), NodeIdentity::single(NavKey::Effect));
        assert!(node.instruction_xpath().is_none());
        assert!(!NavKey::Effect.is_natural());
    }

    #[test]
    fn test_node_serialization() {
        let mut node = NavNode::new(NodeId(9), NodeIdentity::single(NavKey::Location { path: "/users".into() }));
        node.instances.insert("t1-0".to_string());

        let json = serde_json::to_string(&node).unwrap();
        let deserialized: NavNode = serde_json::from_str(&json).unwrap();
        assert_eq!(node, deserialized);
    }
}
