//! File upload and download handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sha2::{Digest, Sha256};

use super::{error, not_found, SharedState};

/// POST /file/addfile
///
/// Stores every `files` part of the multipart body.
pub async fn add_file(State(state): State<SharedState>, mut multipart: Multipart) -> Response {
    let mut uploads = Vec::new();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
        };
        if field.name() != Some("files") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        match field.bytes().await {
            Ok(bytes) => uploads.push((file_name, bytes.to_vec())),
            Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
        }
    }

    if uploads.is_empty() {
        return error(StatusCode::BAD_REQUEST, "no files in request");
    }

    let mut state = state.write().await;
    let stored: Vec<_> = uploads
        .into_iter()
        .map(|(file_name, content)| {
            let sha256 = hex::encode(Sha256::digest(&content));
            state.add_file(&file_name, sha256, content)
        })
        .collect();
    (StatusCode::OK, Json(stored)).into_response()
}

/// GET /file/get/id/{id}
pub async fn get_file_by_id(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let state = state.read().await;
    match state.file_content(Some(&id), None) {
        Some(content) => binary(content.to_vec()),
        None => not_found("file", &id),
    }
}

/// GET /file/get/hash/{hash}
pub async fn get_file_by_hash(
    State(state): State<SharedState>,
    Path(hash): Path<String>,
) -> Response {
    let state = state.read().await;
    match state.file_content(None, Some(&hash)) {
        Some(content) => binary(content.to_vec()),
        None => not_found("file", &hash),
    }
}

fn binary(content: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/octet-stream")],
        content,
    )
        .into_response()
}
