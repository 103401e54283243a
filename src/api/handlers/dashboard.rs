//! Dashboard aggregate and audit log handlers.

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, AuditQuery};
use crate::app_state::AppState;
use crate::cache::CacheKey;
use crate::domain::AuditEntry;
use crate::error::{ErrorResponse, GatewayError};
use crate::service::DashboardStats;

/// Upper bound for `GET /audit-logs?limit=`.
const MAX_AUDIT_LIMIT: u32 = 500;

/// `GET /dashboard/stats`: Counts per status and captured revenue.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    tag = "Dashboard",
    summary = "Dashboard aggregate",
    description = "Per-status counts for clients, stations and payments plus captured revenue. Cached for the aggregate TTL.",
    responses(
        (status = 200, description = "Aggregate", body = ApiResponse<DashboardStats>),
    )
)]
pub async fn dashboard_stats(State(state): State<AppState>) -> Result<impl IntoResponse, GatewayError> {
    let key = CacheKey::new("dashboard:stats").build();
    let stats = state
        .cache
        .get_or_compute(&key, state.cache.stats_ttl(), || async {
            Ok::<_, GatewayError>(state.store.stats().await)
        })
        .await?;
    Ok(Json(ApiResponse::ok(stats)))
}

/// `GET /audit-logs`: Most recent audit entries.
///
/// # Errors
///
/// Returns [`GatewayError::PersistenceError`] if the audit store fails.
#[utoipa::path(
    get,
    path = "/api/v1/audit-logs",
    tag = "Dashboard",
    summary = "Recent audit entries",
    description = "Newest first. Empty when the datastore is unavailable.",
    params(AuditQuery),
    responses(
        (status = 200, description = "Audit entries", body = ApiResponse<Vec<AuditEntry>>),
        (status = 500, description = "Datastore failure", body = ErrorResponse),
    )
)]
pub async fn audit_logs(
    State(state): State<AppState>,
    Query(query): Query<AuditQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let limit = query.limit.clamp(1, MAX_AUDIT_LIMIT);
    let entries = state.store.audit().recent(limit).await?;
    Ok(Json(ApiResponse::ok(entries)))
}

/// Dashboard routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard/stats", get(dashboard_stats))
        .route("/audit-logs", get(audit_logs))
}
