//! Yeti API client library.
//!
//! A thin async client for the Yeti threat-intelligence platform. Every
//! operation turns native arguments into one HTTP request and decodes the
//! JSON answer.
//!
//! # Quick Start
//!
//! ```no_run
//! use yetiapi::{EntityApi, LinkApi, ObservableApi, SearchQuery, YetiApi};
//!
//! #[tokio::main]
//! async fn main() -> yetiapi::Result<()> {
//!     // Reads YETI_URL / YETI_API_KEY
//!     let api = YetiApi::from_env()?;
//!     api.check_connection().await?;
//!
//!     let host = api.add_hostname("evil.example.com", &["c2"]).await?;
//!     let malware = api.add_malware("BadRAT", &[]).await?;
//!     api.link_entity_to_observable(&malware.id, &host.id, "C2 server").await?;
//!
//!     let hits = api
//!         .search_observables(&SearchQuery::new().filter("value", "example").regex(true))
//!         .await?;
//!     println!("Found {} observables", hits.len());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`RequestExecutor`] builds URLs, attaches credentials and maps non-200
//!   answers to [`YetiError::Upstream`].
//! - [`YetiApi`] (legacy) and [`YetiV2Api`] (v2) adapt resource operations to
//!   each API generation's endpoints and payloads.
//! - [`ObservableApi`], [`EntityApi`] and [`LinkApi`] are the operations both
//!   generations share.
//! - Oneshot analytics are polled by [`poll_until_terminal`] under a
//!   [`PollOptions`] budget and a cancellation token.
//!
//! # Configuration
//!
//! [`ClientConfig::from_env`] reads:
//!
//! - `YETI_URL` (optional) - Base URL (defaults to `http://localhost:5000/api`)
//! - `YETI_API_KEY` (optional) - API key
//! - `YETI_USERNAME` / `YETI_PASSWORD` (optional) - HTTP basic auth
//! - `YETI_VERIFY_TLS` (optional) - `false` disables certificate checks
//! - `YETI_API_VERSION` (optional) - `v1` (default) or `v2`

mod api;
mod client;
mod config;
mod error;
mod models;
mod pagination;
mod polling;
mod traits;

pub mod cli;
pub mod output;

#[cfg(feature = "test-server")]
pub mod mock_server;

// Re-export core types
pub use api::{YetiApi, YetiV2Api};
pub use client::{FileUpload, Payload, RequestExecutor};
pub use config::{ApiGeneration, BasicAuth, ClientConfig};
pub use error::{Result, YetiError};
pub use pagination::Page;
pub use polling::{poll_until_terminal, PollOptions};

// Re-export traits
pub use traits::{EntityApi, LinkApi, ObservableApi};

// Re-export models
pub use models::{
    tag_names,
    // Observables
    NewObservable,
    Observable,
    ObservableType,
    // Entities
    Entity,
    EntityType,
    NewEntity,
    // Files
    FileHash,
    FileInfo,
    FileRef,
    // Graph
    Investigation,
    NewLink,
    ObjectKind,
    ObjectRef,
    // Search
    SearchQuery,
    DEFAULT_PAGE_SIZE,
    // Analysis
    AnalysisMatch,
    OneshotInstance,
    OneshotJob,
    OneshotStatus,
};

pub use tokio_util::sync::CancellationToken;
