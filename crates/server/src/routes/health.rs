//! Health check endpoints.

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns `{"ok": true}` if the server is running. Does not check dependencies.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

/// Readiness health check endpoint.
///
/// Verifies storage connectivity before returning OK.
/// Returns 503 Service Unavailable if storage is not reachable.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.orders().ping().await {
        Ok(()) => (StatusCode::OK, Json(json!({ "ok": true }))),
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "Storage unavailable" })),
            )
        }
    }
}
