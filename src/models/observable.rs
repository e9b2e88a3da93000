//! Observable model.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::tag_names;

/// An atomic indicator tracked by Yeti (IP, hostname, URL, hash, ...).
///
/// The id is assigned by the server and stable once created. The value is
/// whatever the server stored, which may differ from what was submitted:
/// Yeti refangs (`hxxp` → `http`, `[.]` → `.`) and canonicalizes URLs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Observable {
    /// Server-assigned identifier.
    pub id: String,

    /// The indicator value.
    #[serde(default)]
    pub value: String,

    /// Server-side type name (`Hostname`, `ipv4`, ...).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Tags in whichever shape the API generation uses; see [`Observable::tag_names`].
    #[serde(default)]
    pub tags: Value,

    /// Context entries attached to the observable.
    #[serde(default)]
    pub context: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Every other field returned by the server.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Observable {
    /// Names of the tags on this observable.
    pub fn tag_names(&self) -> Vec<String> {
        tag_names(&self.tags)
    }

    /// Whether the observable carries the given tag.
    pub fn has_tag(&self, name: &str) -> bool {
        self.tag_names().iter().any(|t| t == name)
    }
}

/// Kinds of observable the typed helpers can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservableType {
    Ip,
    Ipv6,
    Hostname,
    Url,
    Email,
    Hash,
    File,
    Text,
    Asn,
    MacAddress,
    Path,
    Bitcoin,
}

impl ObservableType {
    pub const ALL: [ObservableType; 12] = [
        Self::Ip,
        Self::Ipv6,
        Self::Hostname,
        Self::Url,
        Self::Email,
        Self::Hash,
        Self::File,
        Self::Text,
        Self::Asn,
        Self::MacAddress,
        Self::Path,
        Self::Bitcoin,
    ];
}

impl fmt::Display for ObservableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ip => "ip",
            Self::Ipv6 => "ipv6",
            Self::Hostname => "hostname",
            Self::Url => "url",
            Self::Email => "email",
            Self::Hash => "hash",
            Self::File => "file",
            Self::Text => "text",
            Self::Asn => "asn",
            Self::MacAddress => "mac_address",
            Self::Path => "path",
            Self::Bitcoin => "bitcoin",
        };
        f.write_str(name)
    }
}

/// Parameters for creating an observable.
///
/// # Example
///
/// ```
/// use yetiapi::{NewObservable, ObservableType};
///
/// let obs = NewObservable::new("evil.example.com")
///     .with_kind(ObservableType::Hostname)
///     .with_tags(["c2", "apt"])
///     .with_context("seen_in", "phishing mail");
/// assert_eq!(obs.source, "API");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct NewObservable {
    pub value: String,
    /// When unset, the server guesses the type from the value.
    pub kind: Option<ObservableType>,
    pub tags: Vec<String>,
    pub context: Map<String, Value>,
    /// Data source label, `"API"` by default.
    pub source: String,
    pub description: Option<String>,
}

impl NewObservable {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: None,
            tags: Vec::new(),
            context: Map::new(),
            source: "API".to_string(),
            description: None,
        }
    }

    /// Shorthand for `NewObservable::new(value).with_kind(kind)`.
    pub fn typed(kind: ObservableType, value: impl Into<String>) -> Self {
        Self::new(value).with_kind(kind)
    }

    #[must_use]
    pub fn with_kind(mut self, kind: ObservableType) -> Self {
        self.kind = Some(kind);
        self
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
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_context_map(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_observable_deserializes() {
        let obs: Observable = serde_json::from_value(json!({
            "id": "5d1b2c",
            "value": "test.com",
            "type": "Hostname",
            "tags": [{"name": "asd", "first_seen": "2019-01-01"}],
            "context": [{"source": "API", "note": "x"}],
            "created": "2019-01-01T00:00:00",
            "human_url": "http://localhost:5000/observable/5d1b2c"
        }))
        .unwrap();

        assert_eq!(obs.value, "test.com");
        assert_eq!(obs.kind.as_deref(), Some("Hostname"));
        assert_eq!(obs.tag_names(), vec!["asd"]);
        assert!(obs.has_tag("asd"));
        assert!(obs.extra.contains_key("human_url"));
    }

    #[test]
    fn test_missing_optional_fields() {
        let obs: Observable = serde_json::from_value(json!({"id": "1"})).unwrap();
        assert!(obs.value.is_empty());
        assert!(obs.tag_names().is_empty());
        assert!(obs.description.is_none());
    }

    #[test]
    fn test_new_observable_defaults() {
        let obs = NewObservable::typed(ObservableType::Ip, "8.8.8.8");
        assert_eq!(obs.kind, Some(ObservableType::Ip));
        assert_eq!(obs.source, "API");
        assert!(obs.tags.is_empty());
        assert!(obs.context.is_empty());
    }
}
