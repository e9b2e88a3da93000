//! Link, neighbor and investigation handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{error, not_found, search_response, SearchRequest, SharedState};
use crate::mock_server::state::{MockState, Record};

#[derive(Debug, Deserialize)]
pub struct NodeParams {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Body of `POST link/`.
#[derive(Debug, Deserialize)]
pub struct LinkParams {
    pub source: NodeParams,
    pub target: NodeParams,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkUpdateParams {
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct LinkDeleteParams {
    pub ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct InvestigationParams {
    pub name: Option<String>,
}

/// Body of `investigation/add` and `investigation/remove`.
#[derive(Debug, Deserialize)]
pub struct InvestigationNodes {
    #[serde(default)]
    pub links: Vec<Value>,
    #[serde(default)]
    pub nodes: Vec<Value>,
}

fn node_exists(state: &MockState, node: &NodeParams) -> bool {
    match node.kind.as_str() {
        "observable" => state.observables.contains_key(&node.id),
        "entity" => state.entities.contains_key(&node.id),
        _ => true,
    }
}

/// POST /link/
pub async fn add_link(State(state): State<SharedState>, Json(params): Json<LinkParams>) -> Response {
    let mut state = state.write().await;
    for node in [&params.source, &params.target] {
        if !node_exists(&state, node) {
            return not_found(&node.kind, &node.id);
        }
    }

    let id = state.next_id();
    let record = json!({
        "id": id,
        "src": {"id": params.source.id, "type": params.source.kind},
        "dst": {"id": params.target.id, "type": params.target.kind},
        "description": params.description,
    });
    if let Value::Object(map) = &record {
        state.links.insert(id, map.clone());
    }
    (StatusCode::OK, Json(record)).into_response()
}

/// PATCH /link/{id}
pub async fn update_link(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(params): Json<LinkUpdateParams>,
) -> Response {
    let mut state = state.write().await;
    match state.links.get_mut(&id) {
        Some(record) => {
            record.insert("description".into(), json!(params.description));
            (StatusCode::OK, Json(record.clone())).into_response()
        }
        None => not_found("link", &id),
    }
}

/// DELETE /link/ with `{ids: [...]}`
pub async fn delete_links(
    State(state): State<SharedState>,
    Json(params): Json<LinkDeleteParams>,
) -> Response {
    let mut state = state.write().await;
    let deleted: Vec<&String> = params
        .ids
        .iter()
        .filter(|id| state.links.remove(id.as_str()).is_some())
        .collect();
    (StatusCode::OK, Json(json!({"deleted": deleted}))).into_response()
}

/// POST /neighbors/tuples/{kind}/{id}/indicator
///
/// Links between the node and any indicator.
pub async fn related_indicators(
    State(state): State<SharedState>,
    Path((kind, id)): Path<(String, String)>,
) -> Response {
    let state = state.read().await;
    let is_node = |end: Option<&Value>| {
        end.is_some_and(|e| e["id"] == json!(id) && e["type"] == json!(kind))
    };
    let is_indicator = |end: Option<&Value>| end.is_some_and(|e| e["type"] == "indicator");

    let links: Vec<&Record> = state
        .links
        .values()
        .filter(|link| {
            let (src, dst) = (link.get("src"), link.get("dst"));
            (is_node(src) && is_indicator(dst)) || (is_node(dst) && is_indicator(src))
        })
        .collect();
    (StatusCode::OK, Json(links)).into_response()
}

/// POST /investigation/
pub async fn add_investigation(
    State(state): State<SharedState>,
    Json(params): Json<InvestigationParams>,
) -> Response {
    let mut state = state.write().await;
    let id = state.next_id();
    let record = json!({
        "_id": {"$oid": id},
        "name": params.name,
        "nodes": [],
        "links": [],
    });
    if let Value::Object(map) = &record {
        state.investigations.insert(id, map.clone());
    }
    (StatusCode::OK, Json(record)).into_response()
}

/// GET /investigation/{id}
pub async fn get_investigation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let state = state.read().await;
    match state.investigations.get(&id) {
        Some(record) => (StatusCode::OK, Json(record.clone())).into_response(),
        None => not_found("investigation", &id),
    }
}

/// DELETE /investigation/{id}
pub async fn delete_investigation(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Response {
    let mut state = state.write().await;
    match state.investigations.remove(&id) {
        Some(_) => (StatusCode::OK, Json(json!({"deleted": id}))).into_response(),
        None => not_found("investigation", &id),
    }
}

/// POST /investigationsearch/
pub async fn search_investigations(
    State(state): State<SharedState>,
    Json(request): Json<SearchRequest>,
) -> Response {
    let state = state.read().await;
    search_response(&state.investigations, &request)
}

/// POST /investigation/add/{id}
pub async fn investigation_add(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(params): Json<InvestigationNodes>,
) -> Response {
    mutate_investigation(state, &id, params, |nodes, node| {
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    })
    .await
}

/// POST /investigation/remove/{id}
pub async fn investigation_remove(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    Json(params): Json<InvestigationNodes>,
) -> Response {
    mutate_investigation(state, &id, params, |nodes, node| nodes.retain(|n| *n != node)).await
}

async fn mutate_investigation(
    state: SharedState,
    id: &str,
    params: InvestigationNodes,
    mut apply: impl FnMut(&mut Vec<Value>, Value),
) -> Response {
    let mut state = state.write().await;
    let Some(record) = state.investigations.get_mut(id) else {
        return not_found("investigation", id);
    };
    if !params.links.is_empty() {
        return error(StatusCode::BAD_REQUEST, "link edits are not supported");
    }
    let Some(Value::Array(nodes)) = record.get_mut("nodes") else {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "corrupt investigation");
    };
    for node in params.nodes {
        apply(nodes, node);
    }
    (StatusCode::OK, Json(record.clone())).into_response()
}
