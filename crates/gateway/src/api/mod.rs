pub mod chat;
pub mod error;
pub mod status;

use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::state::AppState;

/// Build the full API router: chat (§4.12), status, and session reset.
pub fn router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors.allowed_origins);
    Router::new().merge(chat::router()).merge(status::router()).with_state(state).layer(cors)
}

/// CORS layer honoring `server.cors.allowed_origins`. A bare `"*"` entry is
/// fully permissive; `"http://host:*"` allows any port on that host; anything
/// else is matched literally.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS];
    let headers = [header::CONTENT_TYPE, header::AUTHORIZATION];

    if allowed_origins.iter().any(|o| o == "*") {
        return CorsLayer::new().allow_origin(tower_http::cors::Any).allow_methods(methods).allow_headers(headers);
    }

    let patterns: Vec<String> = allowed_origins.to_vec();
    let allow_origin = AllowOrigin::predicate(move |origin, _| {
        let Ok(origin) = origin.to_str() else { return false };
        patterns.iter().any(|pattern| match pattern.strip_suffix(":*") {
            Some(prefix) => origin.starts_with(prefix) && origin[prefix.len()..].trim_start_matches(':').chars().all(|c| c.is_ascii_digit()),
            None => origin == pattern,
        })
    });

    CorsLayer::new().allow_origin(allow_origin).allow_methods(methods).allow_headers(headers).allow_credentials(true)
}
