//! References to graph nodes and link parameters.

use std::fmt;

use serde::Serialize;

/// Which collection a graph node lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Observable,
    Entity,
    Indicator,
}

impl ObjectKind {
    /// Legacy collection name, used for `$ref` and link endpoints.
    pub fn legacy_name(self) -> &'static str {
        match self {
            Self::Observable => "observable",
            Self::Entity => "entity",
            Self::Indicator => "indicator",
        }
    }

    /// V2 collection name, used to build `"{collection}/{id}"` node handles.
    pub fn v2_collection(self) -> &'static str {
        match self {
            Self::Observable => "observables",
            Self::Entity => "entities",
            Self::Indicator => "indicators",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.legacy_name())
    }
}

/// A typed handle on a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ObjectRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn observable(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Observable, id)
    }

    pub fn entity(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Entity, id)
    }

    pub fn indicator(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::Indicator, id)
    }
}

/// Parameters for linking two graph nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLink {
    pub source: ObjectRef,
    pub target: ObjectRef,
    /// Relationship label; v2 only. Legacy servers derive it themselves.
    pub link_type: Option<String>,
    pub description: Option<String>,
}

impl NewLink {
    pub fn new(source: ObjectRef, target: ObjectRef) -> Self {
        Self {
            source,
            target,
            link_type: None,
            description: None,
        }
    }

    #[must_use]
    pub fn with_link_type(mut self, link_type: impl Into<String>) -> Self {
        self.link_type = Some(link_type.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
