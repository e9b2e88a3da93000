//! Investigation graph model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

use super::object_id;

/// A named, mutable graph of observables and entities.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    #[serde(rename = "_id", alias = "id", deserialize_with = "object_id")]
    pub id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub nodes: Vec<Value>,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub links: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_investigation_deserializes() {
        let inv: Investigation = serde_json::from_value(json!({
            "_id": {"$oid": "inv1"},
            "name": "phishing wave",
            "nodes": [{"$id": {"$oid": "o1"}, "$ref": "observable"}],
            "links": null
        }))
        .unwrap();

        assert_eq!(inv.id, "inv1");
        assert_eq!(inv.nodes.len(), 1);
        assert!(inv.links.is_empty());
    }
}
