use axum::{Router, http::HeaderMap};

use crate::state::{DEFAULT_CLIENT, SharedState};

/// Privileged board operations.
pub mod admin;
/// Public board views and registration.
pub mod board;
/// Swagger UI.
pub mod docs;
/// Health endpoint.
pub mod health;
/// Server-sent event stream.
pub mod sse;

const CLIENT_ID_HEADER: &str = "x-client-id";

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState) -> Router<()> {
    let api_router = health::router()
        .merge(sse::router())
        .merge(board::router())
        .merge(admin::router(state.clone()));

    let docs_router = docs::router(state.clone());

    api_router.merge(docs_router).with_state(state)
}

/// Selection key announced by the caller, or the shared default.
fn client_id(headers: &HeaderMap) -> String {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_CLIENT)
        .to_string()
}
