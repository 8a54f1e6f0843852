//! Chat API endpoints — the primary interface for running agent turns (§4.12).
//!
//! - `POST /api/chat`        — non-streaming: runs the turn, returns the
//!   full event sequence plus the final reply.
//! - `POST /api/chat/stream` — SSE: the same events, delivered as they are
//!   produced by [`crate::turn::run_turn`].

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::Router;
use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex as AsyncMutex;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::session_agent::build_session_agent;
use crate::state::{AppState, SessionAgent};
use crate::turn::{run_turn, TurnEvent};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Explicit session id. A new session is created when absent.
    #[serde(default)]
    pub session_id: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub reply: Option<String>,
    pub events: Vec<TurnEvent>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/chat", axum::routing::post(chat)).route("/api/chat/stream", axum::routing::post(chat_stream))
}

/// Resolve the session's agent, creating both the session record and its
/// agent instance on first use.
async fn resolve_agent(state: &AppState, session_id: &str) -> Result<Arc<AsyncMutex<SessionAgent>>, ApiError> {
    if let Some(agent) = state.agents.read().get(session_id) {
        return Ok(agent.clone());
    }
    let agent = build_session_agent(state, session_id)?;
    let mut agents = state.agents.write();
    let agent = agents.entry(session_id.to_string()).or_insert_with(|| Arc::new(AsyncMutex::new(agent))).clone();
    Ok(agent)
}

async fn run_chat_turn(state: &AppState, session_id: &str, message: String) -> Result<crate::turn::TurnOutput, ApiError> {
    state.sessions.resolve_or_create(session_id);
    state.sessions.begin_turn(session_id);

    let permit = state.session_locks.acquire(session_id).await.map_err(|e| ah_domain::error::Error::IllegalState(e.to_string()))?;

    let agent = resolve_agent(state, session_id).await?;
    let mut guard = agent.lock().await;

    let output = run_turn(session_id, &mut guard.base, message).await;

    state.sessions.append_turn(
        session_id,
        output.new_messages.clone(),
        guard.base.llm.total_input_tokens(),
        guard.base.llm.total_completion_tokens(),
    );

    drop(guard);
    drop(permit);

    Ok(output)
}

pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Result<Json<ChatResponse>, ApiError> {
    let session_id = req.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let output = run_chat_turn(&state, &session_id, req.message).await?;

    let (input_tokens, output_tokens) = output
        .events
        .iter()
        .find_map(|e| match e {
            TurnEvent::TokenUsage { input_tokens, output_tokens } => Some((*input_tokens, *output_tokens)),
            _ => None,
        })
        .unwrap_or((0, 0));

    Ok(Json(ChatResponse { session_id, reply: output.reply, events: output.events, input_tokens, output_tokens }))
}

pub async fn chat_stream(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = req.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
    let output = run_chat_turn(&state, &session_id, req.message).await;

    let events: Vec<TurnEvent> = match output {
        Ok(output) => output.events,
        Err(e) => vec![TurnEvent::Error { message: e.0.to_string() }],
    };

    let sse_events = events.into_iter().map(|event| Ok(Event::default().json_data(event).unwrap_or_else(|_| Event::default())));

    Sse::new(stream::iter(sse_events)).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
