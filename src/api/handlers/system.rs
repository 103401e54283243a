//! System endpoints: health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::app_state::AppState;

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
    timestamp: String,
    version: String,
    /// `"enabled"` or `"degraded"` when the datastore is unreachable.
    audit_log: String,
    /// `"local"`, `"connecting"`, `"connected"`, or `"degraded"` while the
    /// Redis subscription is down.
    relay: String,
    /// Live event subscribers (WebSocket connections).
    subscribers: usize,
}

/// `GET /health`: Service health status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "System",
    summary = "Health check",
    description = "Returns service health status, version, audit log mode, relay state and the number of live event subscribers. Status is `degraded` while the relay subscription is down.",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
    )
)]
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let audit_log = if state.store.audit().is_enabled() {
        "enabled"
    } else {
        "degraded"
    };
    let relay = *state.relay.borrow();
    let status = if relay.is_degraded() { "degraded" } else { "healthy" };
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: Utc::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            audit_log: audit_log.to_string(),
            relay: relay.as_str().to_string(),
            subscribers: state.event_bus.receiver_count(),
        }),
    )
}

/// System routes mounted at the root level (not under /api/v1).
pub fn routes() -> Router<AppState> {
    Router::new().route("/health", get(health_handler))
}
