//! Status and session-reset endpoints (§4.12).

use axum::extract::{Path, State};
use axum::response::Json;
use axum::Router;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sessions: usize,
    pub active_locks: usize,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub session_id: String,
    pub reset: bool,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/status", axum::routing::get(status)).route("/api/reset/:session_id", axum::routing::post(reset))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        sessions: state.sessions.len(),
        active_locks: state.session_locks.session_count(),
        model: state.config.llm.model.clone(),
    })
}

pub async fn reset(State(state): State<AppState>, Path(session_id): Path<String>) -> Json<ResetResponse> {
    let reset = state.sessions.reset(&session_id).is_some();
    state.agents.write().remove(&session_id);
    Json(ResetResponse { session_id, reset })
}
