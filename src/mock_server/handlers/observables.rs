//! Observable endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error, not_found, search_response, SearchRequest, SharedState};
use crate::mock_server::state::{normalize, Record};

/// Body of `POST observable/`: a creation, or an update when `id` is set.
#[derive(Debug, Deserialize)]
pub struct ObservableParams {
    pub id: Option<String>,
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: Record,
    pub source: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkParams {
    pub observables: Vec<ObservableParams>,
}

#[derive(Debug, Deserialize)]
pub struct MatchParams {
    pub observables: Vec<String>,
}

/// POST /observable/
pub async fn add_or_change_observable(
    State(state): State<SharedState>,
    Json(params): Json<ObservableParams>,
) -> Response {
    let mut state = state.write().await;
    let source = params.source.as_deref().unwrap_or("API");

    if let Some(id) = &params.id {
        return match state.change_observable(id, &params.tags, &params.context, source) {
            Some(record) => (StatusCode::OK, Json(record)).into_response(),
            None => not_found("observable", id),
        };
    }

    let Some(value) = &params.value else {
        return error(StatusCode::BAD_REQUEST, "value is required");
    };
    let record = state.add_observable(
        value,
        params.kind.as_deref(),
        &params.tags,
        &params.context,
        source,
        params.description.as_deref(),
    );
    (StatusCode::OK, Json(record)).into_response()
}

/// POST /observable/bulk
pub async fn bulk_add_observables(
    State(state): State<SharedState>,
    Json(params): Json<BulkParams>,
) -> Response {
    let mut state = state.write().await;
    let mut added = Vec::with_capacity(params.observables.len());
    for obs in &params.observables {
        let Some(value) = &obs.value else {
            return error(StatusCode::BAD_REQUEST, "value is required");
        };
        added.push(state.add_observable(
            value,
            obs.kind.as_deref(),
            &obs.tags,
            &obs.context,
            obs.source.as_deref().unwrap_or("API"),
            obs.description.as_deref(),
        ));
    }
    (StatusCode::OK, Json(added)).into_response()
}

/// GET /observable/{id}
pub async fn get_observable(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let state = state.read().await;
    match state.observables.get(&id) {
        Some(record) => (StatusCode::OK, Json(record.clone())).into_response(),
        None => not_found("observable", &id),
    }
}

/// DELETE /observable/{id}
pub async fn delete_observable(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let mut state = state.write().await;
    match state.observables.remove(&id) {
        Some(_) => {
            state.file_contents.remove(&id);
            (StatusCode::OK, Json(json!({"deleted": id}))).into_response()
        }
        None => not_found("observable", &id),
    }
}

/// POST /observablesearch/
pub async fn search_observables(
    State(state): State<SharedState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let state = state.read().await;
    search_response(&state.observables, &request)
}

/// POST /analysis/match
pub async fn match_observables(
    State(state): State<SharedState>,
    Json(params): Json<MatchParams>,
) -> Response {
    let state = state.read().await;
    let mut known = Vec::new();
    let mut unknown = Vec::new();

    for raw in &params.observables {
        let (value, _) = normalize(raw, None);
        let hit = state
            .observables
            .values()
            .find(|record| record.get("value").and_then(Value::as_str) == Some(value.as_str()));
        match hit {
            Some(record) => known.push(Value::Object(record.clone())),
            None => unknown.push(raw.clone()),
        }
    }

    (
        StatusCode::OK,
        Json(json!({"known": known, "unknown": unknown, "matches": [], "entities": []})),
    )
        .into_response()
}
