//! Yeti API model types.
//!
//! Responses are owned by the server. Models give a typed view of the
//! fields this crate uses and keep everything else in an `extra` map.

mod analysis;
mod entity;
mod file;
mod investigation;
mod link;
mod observable;
mod oneshot;
mod search;

pub use analysis::*;
pub use entity::*;
pub use file::*;
pub use investigation::*;
pub use link::*;
pub use observable::*;
pub use oneshot::*;
pub use search::*;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Collect tag names from any of the shapes Yeti uses for `tags`.
///
/// Legacy responses carry `[{"name": "x", ...}]`, v2 responses carry a map
/// keyed by tag name, and request echoes sometimes carry plain strings.
pub fn tag_names(tags: &Value) -> Vec<String> {
    match tags {
        Value::Array(items) => items
            .iter()
            .filter_map(|tag| match tag {
                Value::String(name) => Some(name.clone()),
                Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect(),
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    }
}

/// Accept a Mongo object id either as a plain string or as `{"$oid": "..."}`.
pub(crate) fn object_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Plain(String),
        Oid {
            #[serde(rename = "$oid")]
            oid: String,
        },
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Plain(id) | Repr::Oid { oid: id } => id,
    })
}
