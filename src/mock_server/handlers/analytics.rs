//! Oneshot analytics and user settings handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;

use super::{not_found, SharedState};
use crate::mock_server::state::Record;
use crate::OneshotJob;

#[derive(Debug, Deserialize)]
pub struct RunParams {
    /// Observable to run the analytic on.
    pub id: String,
}

/// GET /analytics/oneshot
pub async fn list_oneshots(State(state): State<SharedState>) -> Response {
    let state = state.read().await;
    let jobs: Vec<&OneshotJob> = state.oneshots.values().map(|(job, _)| job).collect();
    (StatusCode::OK, Json(jobs)).into_response()
}

/// POST /analytics/oneshot/{job_id}/run
pub async fn run_oneshot(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
    Json(params): Json<RunParams>,
) -> Response {
    let mut state = state.write().await;
    if !state.observables.contains_key(&params.id) {
        return not_found("observable", &params.id);
    }
    match state.start_run(&job_id) {
        Some(run) => (StatusCode::OK, Json(run)).into_response(),
        None => not_found("oneshot analytic", &job_id),
    }
}

/// GET /analytics/oneshot/{run_id}/status
pub async fn oneshot_status(State(state): State<SharedState>, Path(run_id): Path<String>) -> Response {
    let mut state = state.write().await;
    match state.poll_run(&run_id) {
        Some(run) => (StatusCode::OK, Json(run)).into_response(),
        None => not_found("oneshot run", &run_id),
    }
}

/// POST /user/settings
pub async fn update_settings(
    State(state): State<SharedState>,
    Json(settings): Json<Record>,
) -> Response {
    let mut state = state.write().await;
    state.settings.extend(settings);
    (StatusCode::OK, Json(state.settings.clone())).into_response()
}
