//! Health and liveness endpoint handlers.
//!
//! Mounted outside the tenant context layer so health checks need no identity.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde_json::json;

use super::AppState;

/// Returns basic health information as JSON.
pub async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "state": "ready",
        "collections": state.records.collections(),
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// Kubernetes liveness check -- always returns 200 OK.
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}
