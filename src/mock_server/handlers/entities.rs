//! Entity endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{not_found, search_response, SearchRequest, SharedState};

/// Body of `POST entity/`.
#[derive(Debug, Deserialize)]
pub struct EntityParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub killchain: Option<String>,
}

/// POST /entity/
pub async fn add_entity(
    State(state): State<SharedState>,
    Json(params): Json<EntityParams>,
) -> Response {
    let mut state = state.write().await;

    let existing = state.entities.values().find(|record| {
        record.get("name").and_then(Value::as_str) == Some(params.name.as_str())
            && record.get("type").and_then(Value::as_str) == Some(params.kind.as_str())
    });
    if let Some(record) = existing {
        return (StatusCode::OK, Json(record.clone())).into_response();
    }

    let id = state.next_id();
    let tags: Vec<Value> = params.tags.iter().map(|t| json!({"name": t})).collect();
    let mut record = json!({
        "id": id,
        "type": params.kind,
        "name": params.name,
        "tags": tags,
        "aliases": params.aliases,
        "description": params.description,
    });
    if let (Some(killchain), Value::Object(map)) = (params.killchain, &mut record) {
        map.insert("killchain".into(), json!(killchain));
    }

    if let Value::Object(map) = &record {
        state.entities.insert(id, map.clone());
    }
    (StatusCode::OK, Json(record)).into_response()
}

/// GET /entity/{id}
pub async fn get_entity(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let state = state.read().await;
    match state.entities.get(&id) {
        Some(record) => (StatusCode::OK, Json(record.clone())).into_response(),
        None => not_found("entity", &id),
    }
}

/// DELETE /entity/{id}
pub async fn delete_entity(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let mut state = state.write().await;
    match state.entities.remove(&id) {
        Some(_) => (StatusCode::OK, Json(json!({"deleted": id}))).into_response(),
        None => not_found("entity", &id),
    }
}

/// POST /entitysearch/
pub async fn search_entities(
    State(state): State<SharedState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let state = state.read().await;
    search_response(&state.entities, &request)
}
