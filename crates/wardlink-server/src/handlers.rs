use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::AppState;

pub async fn root() -> impl IntoResponse {
    let body = json!({
        "service": "Wardlink Hub",
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    });
    (StatusCode::OK, Json(body))
}

/// Liveness plus the two gauges operators watch: live connection count and
/// bus connectivity. Read-only, no side effects.
pub async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    let body = json!({
        "status": "ok",
        "connections": state.hub.connection_count(),
        "bus": state.hub.bus_status().as_str(),
    });
    (StatusCode::OK, Json(body))
}

pub async fn readyz() -> impl IntoResponse {
    // The hub serves from memory; once the listener is up we are ready.
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}
