//! Entity model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

use super::tag_names;

/// A higher-level object (actor, malware family, campaign, ...) linked to
/// observables through the graph.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub tags: Value,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Entity {
    pub fn tag_names(&self) -> Vec<String> {
        tag_names(&self.tags)
    }
}

/// Kinds of entity the typed helpers can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityType {
    Actor,
    Malware,
    Campaign,
    Ttp,
    Exploit,
    Company,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Actor => "actor",
            Self::Malware => "malware",
            Self::Campaign => "campaign",
            Self::Ttp => "ttp",
            Self::Exploit => "exploit",
            Self::Company => "company",
        };
        f.write_str(name)
    }
}

/// Parameters for creating an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntity {
    pub kind: EntityType,
    pub name: String,
    pub tags: Vec<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    /// Kill-chain phase, only meaningful for TTPs.
    pub killchain: Option<String>,
}

impl NewEntity {
    pub fn new(kind: EntityType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            tags: Vec::new(),
            description: None,
            aliases: Vec::new(),
            killchain: None,
        }
    }

    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_killchain(mut self, killchain: impl Into<String>) -> Self {
        self.killchain = Some(killchain.into());
        self
    }
}
