//! Oneshot analytics models.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

use super::object_id;

/// A named analytic that can be run once against an observable.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneshotJob {
    #[serde(alias = "_id", deserialize_with = "object_id")]
    pub id: String,

    pub name: String,

    /// Observable types this analytic accepts.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub acts_on: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Lifecycle state of a oneshot run.
///
/// `Pending` and `Running` are the only non-terminal states. A status the
/// client does not recognize is decoded as `Unknown` and treated as terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OneshotStatus {
    Pending,
    Running,
    Finished,
    Error,
    #[serde(other)]
    Unknown,
}

impl OneshotStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

impl fmt::Display for OneshotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Error => "error",
            Self::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// One run of a [`OneshotJob`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OneshotInstance {
    /// Empty when a status response omits it.
    #[serde(rename = "_id", alias = "id", default, deserialize_with = "object_id")]
    pub id: String,

    pub status: OneshotStatus,

    /// Analytic output; only meaningful once `status` is `Finished`.
    #[serde(default)]
    pub results: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_terminality() {
        assert!(!OneshotStatus::Pending.is_terminal());
        assert!(!OneshotStatus::Running.is_terminal());
        assert!(OneshotStatus::Finished.is_terminal());
        assert!(OneshotStatus::Error.is_terminal());
        assert!(OneshotStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_instance_deserializes_oid_and_unknown_status() {
        let instance: OneshotInstance = serde_json::from_value(json!({
            "_id": {"$oid": "5e8f"},
            "status": "exploded",
            "analytics": "Shodan"
        }))
        .unwrap();

        assert_eq!(instance.id, "5e8f");
        assert_eq!(instance.status, OneshotStatus::Unknown);
        assert!(instance.results.is_null());
        assert_eq!(instance.extra["analytics"], "Shodan");
    }

    #[test]
    fn test_job_deserializes() {
        let job: OneshotJob = serde_json::from_value(json!({
            "id": "shodan",
            "name": "Shodan",
            "acts_on": ["Ip"],
            "description": "Query Shodan"
        }))
        .unwrap();

        assert_eq!(job.name, "Shodan");
        assert_eq!(job.acts_on, vec!["Ip"]);
    }
}
