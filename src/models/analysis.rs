//! Indicator matching results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

/// Result of matching raw values against the Yeti database.
#[serde_as]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisMatch {
    /// Stored observables whose value matched one of the inputs.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub known: Vec<Value>,

    /// Inputs with no stored counterpart.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub unknown: Vec<String>,

    /// Indicator and entity matches, kept as returned.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisMatch {
    /// Values of the known observables.
    pub fn known_values(&self) -> Vec<&str> {
        self.known
            .iter()
            .filter_map(|o| o.get("value").and_then(Value::as_str))
            .collect()
    }
}
