//! Mock Yeti API server.
//!
//! Provides an axum-based HTTP server that simulates the legacy Yeti API.

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::fixtures::Fixtures;
use super::handlers;
use super::state::MockState;

/// A stateful stand-in for a legacy Yeti instance, served on a loopback port.
pub struct MockServer {
    url: String,
    handle: JoinHandle<()>,
    state: Arc<RwLock<MockState>>,
}

impl MockServer {
    /// Serve [`Fixtures::default_scenario`].
    pub async fn start() -> Self {
        Self::with_state(Fixtures::default_scenario()).await
    }

    /// Serve a database with no records and no oneshot analytics.
    pub async fn start_empty() -> Self {
        Self::with_state(MockState::new()).await
    }

    /// Serve `state` on an ephemeral port.
    pub async fn with_state(state: MockState) -> Self {
        let state = state.shared();
        let app = Self::create_router(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Yeti listener");
        let addr = listener.local_addr().expect("Listener has no local address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Mock Yeti server failed");
        });

        Self {
            url: format!("http://{addr}/api"),
            handle,
            state,
        }
    }

    /// Base URL for a client, `/api` prefix included.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// The live database, for seeding records or inspecting writes.
    pub fn state(&self) -> Arc<RwLock<MockState>> {
        self.state.clone()
    }

    /// Stop serving and wait for the task to wind down.
    pub async fn shutdown(self) {
        self.handle.abort();
        let _ = self.handle.await;
    }

    /// Legacy routes nested under `/api`, all behind the API key check.
    fn create_router(state: Arc<RwLock<MockState>>) -> Router {
        let api = Router::new()
            // Observables
            .route("/observable/", post(handlers::add_or_change_observable))
            .route("/observable/bulk", post(handlers::bulk_add_observables))
            .route(
                "/observable/:id",
                get(handlers::get_observable).delete(handlers::delete_observable),
            )
            .route("/observablesearch/", post(handlers::search_observables))
            .route("/analysis/match", post(handlers::match_observables))
            // Files
            .route("/file/addfile", post(handlers::add_file))
            .route("/file/get/id/:id", get(handlers::get_file_by_id))
            .route("/file/get/hash/:hash", get(handlers::get_file_by_hash))
            // Entities
            .route("/entity/", post(handlers::add_entity))
            .route(
                "/entity/:id",
                get(handlers::get_entity).delete(handlers::delete_entity),
            )
            .route("/entitysearch/", post(handlers::search_entities))
            // Graph
            .route("/link/", post(handlers::add_link).delete(handlers::delete_links))
            .route("/link/:id", patch(handlers::update_link))
            .route(
                "/neighbors/tuples/:kind/:id/indicator",
                post(handlers::related_indicators),
            )
            .route("/investigation/", post(handlers::add_investigation))
            .route(
                "/investigation/:id",
                get(handlers::get_investigation).delete(handlers::delete_investigation),
            )
            .route("/investigation/add/:id", post(handlers::investigation_add))
            .route("/investigation/remove/:id", post(handlers::investigation_remove))
            .route("/investigationsearch/", post(handlers::search_investigations))
            // Analytics
            .route("/analytics/oneshot", get(handlers::list_oneshots))
            .route("/analytics/oneshot/:id/run", post(handlers::run_oneshot))
            .route("/analytics/oneshot/:id/status", get(handlers::oneshot_status))
            .route("/user/settings", post(handlers::update_settings))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                handlers::require_api_key,
            ))
            .with_state(state);

        Router::new()
            .nest("/api", api)
            // Health check
            .route("/health", get(health_check))
    }
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ObservableApi, YetiApi};

    #[tokio::test]
    async fn test_server_starts_and_responds() {
        let server = MockServer::start().await;

        let health = server.url().trim_end_matches("/api").to_string() + "/health";
        let response = reqwest::get(health).await.expect("Failed to send request");

        assert!(response.status().is_success());
        assert_eq!(response.text().await.unwrap(), "ok");

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_add_and_fetch_observable() {
        let server = MockServer::start_empty().await;
        let api = YetiApi::new(server.url(), None).unwrap();

        let obs = api.add_hostname("test[.]com", &["asd"]).await.unwrap();
        let details = api.observable(&obs.id).await.unwrap();

        assert_eq!(details.value, "test.com");
        assert_eq!(details.tag_names(), vec!["asd"]);

        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_api_key_is_enforced() {
        let server = MockServer::with_state(MockState::new().with_required_api_key("s3cret")).await;

        let anonymous = YetiApi::new(server.url(), None).unwrap();
        let err = anonymous.check_connection().await.unwrap_err();
        assert_eq!(err.status(), Some(401));

        let keyed = YetiApi::new(server.url(), Some("s3cret")).unwrap();
        keyed.check_connection().await.unwrap();

        server.shutdown().await;
    }
}
