//! HTTP request handlers for the mock server.

pub mod analytics;
pub mod entities;
pub mod files;
pub mod graph;
pub mod observables;

pub use analytics::*;
pub use entities::*;
pub use files::*;
pub use graph::*;
pub use observables::*;

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use crate::mock_server::state::{MockState, Record};

pub type SharedState = Arc<RwLock<MockState>>;

/// Reject requests without the configured `X-Api-Key`.
pub async fn require_api_key(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    let key = request
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok());
    if !state.read().await.authorized(key) {
        return error(StatusCode::UNAUTHORIZED, "Invalid or missing API key");
    }
    next.run(request).await
}

pub(crate) fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({"error": message.into()}))).into_response()
}

pub(crate) fn not_found(what: &str, id: &str) -> Response {
    error(StatusCode::NOT_FOUND, format!("{what} {id} not found"))
}

/// Body of every legacy `*search/` endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub filter: Record,
    #[serde(default)]
    pub params: SearchParams,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default = "first_page")]
    pub page: u32,
    #[serde(default = "default_range")]
    pub range: u32,
    #[serde(default)]
    pub regex: bool,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            page: first_page(),
            range: default_range(),
            regex: false,
        }
    }
}

fn first_page() -> u32 {
    1
}

fn default_range() -> u32 {
    50
}

pub(crate) fn search_response(
    records: &std::collections::BTreeMap<String, Record>,
    request: &SearchRequest,
) -> Response {
    let page = MockState::search(
        records,
        &request.filter,
        request.params.regex,
        request.params.page,
        request.params.range,
    );
    (StatusCode::OK, Json(page)).into_response()
}
