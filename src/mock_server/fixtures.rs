//! Test data fixtures for the mock server.
//!
//! Provides factory functions for creating realistic test data.

use serde_json::{json, Value};

use super::state::{MockState, OneshotScript};
use crate::{OneshotJob, OneshotStatus};

/// Collection of fixture factories for test data.
pub struct Fixtures;

impl Fixtures {
    /// A oneshot job with the given id and display name.
    pub fn oneshot_job(id: &str, name: &str, acts_on: &[&str]) -> OneshotJob {
        OneshotJob {
            id: id.to_string(),
            name: name.to_string(),
            acts_on: acts_on.iter().map(|s| s.to_string()).collect(),
            description: None,
            extra: Default::default(),
        }
    }

    /// A run that goes pending → running → finished with `results`.
    pub fn finishing(results: Value) -> OneshotScript {
        OneshotScript {
            statuses: vec![OneshotStatus::Running, OneshotStatus::Finished],
            results,
        }
    }

    /// A run that errors out after one running poll.
    pub fn failing() -> OneshotScript {
        OneshotScript {
            statuses: vec![OneshotStatus::Running, OneshotStatus::Error],
            results: Value::Null,
        }
    }

    /// A run that never leaves `running`.
    pub fn stuck() -> OneshotScript {
        OneshotScript {
            statuses: vec![OneshotStatus::Running],
            results: Value::Null,
        }
    }

    /// Default scenario: a few observables and three oneshot analytics.
    ///
    /// - `Resolve hostname` finishes with one resolved address
    /// - `Broken` ends in `error`
    /// - `Forever` never finishes
    pub fn default_scenario() -> MockState {
        MockState::new()
            .with_observable("evil.example.com", Some("Hostname"), &["c2"])
            .with_observable("203.0.113.7", Some("Ip"), &["c2", "scanner"])
            .with_observable("http://evil.example.com/payload", Some("Url"), &[])
            .with_oneshot(
                Self::oneshot_job("resolve", "Resolve hostname", &["Hostname"]),
                Self::finishing(json!({"nodes": [{"value": "203.0.113.7", "type": "Ip"}]})),
            )
            .with_oneshot(Self::oneshot_job("broken", "Broken", &["Hostname"]), Self::failing())
            .with_oneshot(Self::oneshot_job("forever", "Forever", &["Hostname"]), Self::stuck())
    }
}
