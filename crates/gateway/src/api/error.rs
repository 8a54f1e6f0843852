//! HTTP status mapping for the chat API (§7): a caller-facing error maps a
//! handler failure to the status code a client should act on, without
//! leaking internal detail for anything above a tool-argument mistake.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub struct ApiError(pub ah_domain::error::Error);

impl From<ah_domain::error::Error> for ApiError {
    fn from(err: ah_domain::error::Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        use ah_domain::error::Error as E;
        let status = match &self.0 {
            E::ToolArgumentInvalid { .. } | E::IllegalState(_) => StatusCode::BAD_REQUEST,
            E::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            E::TransportError(_) | E::ModelError { .. } => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = ah_providers::mask_secrets(&self.0.to_string());
        (status, Json(json!({ "error": message }))).into_response()
    }
}
