//! Timeline input: ordered interaction entities of one recorded trace
//!
//! Entities arrive already parsed; this module only turns them into natural keys.

pub mod normalize;

pub use normalize::{api_path_template, normalize_location, normalize_method};

use crate::dom::xpath;
use crate::error::Result;
use crate::graph::NavKey;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One recorded session, entries in temporal order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Trace {
    /// Identifier of the trace
    pub id: String,

    /// Entities in the order they happened
    #[serde(default)]
    pub entries: Vec<TimelineEntity>,
}

impl Trace {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Vec::new(),
        }
    }

    /// Append an entity whose entry id is derived from the trace id and its position
    pub fn push(&mut self, interaction: Interaction) -> &mut Self {
        let entry_id = format!("{}-{}", self.id, self.entries.len());
        self.entries.push(TimelineEntity { entry_id, interaction });
        self
    }

    pub fn with(mut self, interaction: Interaction) -> Self {
        self.push(interaction);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A single timeline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntity {
    /// Unique id of the entry; recorded in the `instances` of the node it resolves to
    pub entry_id: String,

    #[serde(flatten)]
    pub interaction: Interaction,
}

fn default_method() -> String {
    "GET".to_string()
}

/// What happened at one point of the trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Interaction {
    /// Click on an element
    Click {
        /// XPath of the clicked element
        xpath: String,
        /// Visible text of the element
        #[serde(default)]
        text: String,
    },

    /// Text typed into a form control
    DataEntry {
        xpath: String,
        #[serde(default)]
        value: String,
    },

    /// Option picked in a select control
    SelectOption {
        xpath: String,
        #[serde(default)]
        option: String,
    },

    /// Request issued by the page
    ApiCall {
        /// Request path or full URL
        path: String,
        /// HTTP method (default: GET)
        #[serde(default = "default_method")]
        method: String,
    },

    /// Browser location change
    LocationChange { url: String },

    /// DOM mutation observed after an interaction
    Effect {
        /// XPaths of the elements added to the page
        #[serde(default)]
        added: Vec<String>,
    },
}

impl Interaction {
    /// Natural key of the node this interaction resolves to.
    ///
    /// Element xpaths are validated here; a malformed one fails the entry.
    pub fn natural_key(&self) -> Result<NavKey> {
        let key = match self {
            Interaction::Click { xpath, text } => {
                xpath::segments(xpath)?;
                NavKey::Click {
                    xpath: xpath.clone(),
                    text: text.trim().to_string(),
                }
            }
            Interaction::DataEntry { xpath, .. } => {
                xpath::segments(xpath)?;
                NavKey::DataEntry { xpath: xpath.clone() }
            }
            Interaction::SelectOption { xpath, .. } => {
                xpath::segments(xpath)?;
                NavKey::SelectOption { xpath: xpath.clone() }
            }
            Interaction::ApiCall { path, method } => NavKey::Api {
                path_template: api_path_template(path),
                method: normalize_method(method),
            },
            Interaction::LocationChange { url } => NavKey::Location {
                path: normalize_location(url),
            },
            Interaction::Effect { .. } => NavKey::Effect,
        };
        Ok(key)
    }

    pub fn is_effect(&self) -> bool {
        matches!(self, Interaction::Effect { .. })
    }
}

impl TimelineEntity {
    pub fn natural_key(&self) -> Result<NavKey> {
        self.interaction.natural_key()
    }
}

/// JSON schema of the accepted trace file (an array of traces)
pub fn trace_schema() -> schemars::Schema {
    schemars::schema_for!(Vec<Trace>)
}
