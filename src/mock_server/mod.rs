//! Mock Yeti API server for E2E testing.
//!
//! This module provides an in-memory mock server that simulates the legacy
//! Yeti API for integration and end-to-end testing. Unlike wiremock which
//! mocks at the HTTP level per-test, this server maintains state across
//! requests: observables are refanged and deduplicated by value, uploaded
//! files can be downloaded again by id or hash, and oneshot runs follow a
//! scripted sequence of statuses.
//!
//! # Example
//!
//! ```ignore
//! use yetiapi::mock_server::MockServer;
//! use yetiapi::{ObservableApi, YetiApi};
//!
//! #[tokio::test]
//! async fn test_workflow() {
//!     let server = MockServer::start().await;
//!     let api = YetiApi::new(server.url(), None).unwrap();
//!
//!     let obs = api.add_url("hxxp://test.com", &[]).await.unwrap();
//!     assert_eq!(obs.value, "http://test.com/");
//!
//!     server.shutdown().await;
//! }
//! ```

mod fixtures;
mod handlers;
mod server;
mod state;

pub use fixtures::Fixtures;
pub use server::MockServer;
pub use state::{normalize, refang, MockState, OneshotScript, Record};
