//! Station CRUD handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, ListQuery, Page};
use crate::app_state::AppState;
use crate::domain::{DocumentId, NewStation, Station, StationPatch};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /stations`: Register a charging station.
///
/// # Errors
///
/// Returns [`GatewayError`] on validation failure or a duplicate station code.
#[utoipa::path(
    post,
    path = "/api/v1/stations",
    tag = "Stations",
    summary = "Create a station",
    description = "Validates and stores a station, then publishes a `station_update` insert event.",
    request_body = NewStation,
    responses(
        (status = 201, description = "Station created", body = ApiResponse<Station>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Station code already in use", body = ErrorResponse),
    )
)]
pub async fn create_station(
    State(state): State<AppState>,
    Json(req): Json<NewStation>,
) -> Result<impl IntoResponse, GatewayError> {
    let station = state.store.create_station(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(station))))
}

/// `GET /stations`: Paginated station list.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/stations",
    tag = "Stations",
    summary = "List stations",
    description = "Newest first. Filtered by `search` (name, code, location) and `status`. Cached for the list TTL; writes are not reflected until the entry expires unless `fresh=true`.",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated station list", body = ApiResponse<Vec<Station>>),
    )
)]
pub async fn list_stations(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let query = query.clamped();
    let key = query.cache_key("stations:list");
    let page: Page<Station> = state
        .cache
        .read_through(&key, state.cache.list_ttl(), query.fresh, || async {
            let items = state.store.list_stations(&query.filter()).await;
            Ok::<_, GatewayError>(Page::slice(items, &query))
        })
        .await?;
    Ok(Json(ApiResponse::from(page)))
}

/// `GET /stations/{id}`: Fetch one station.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the station does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/stations/{id}",
    tag = "Stations",
    summary = "Get a station",
    params(("id" = uuid::Uuid, Path, description = "Station id")),
    responses(
        (status = 200, description = "Station", body = ApiResponse<Station>),
        (status = 404, description = "Station not found", body = ErrorResponse),
    )
)]
pub async fn get_station(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<impl IntoResponse, GatewayError> {
    let station = state.store.get_station(id).await?;
    Ok(Json(ApiResponse::ok(station)))
}

/// `PATCH /stations/{id}`: Partially update a station.
///
/// # Errors
///
/// Returns [`GatewayError`] if the station does not exist or the patch is
/// invalid.
#[utoipa::path(
    patch,
    path = "/api/v1/stations/{id}",
    tag = "Stations",
    summary = "Update a station",
    params(("id" = uuid::Uuid, Path, description = "Station id")),
    request_body = StationPatch,
    responses(
        (status = 200, description = "Updated station", body = ApiResponse<Station>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Station not found", body = ErrorResponse),
    )
)]
pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Json(patch): Json<StationPatch>,
) -> Result<impl IntoResponse, GatewayError> {
    let station = state.store.update_station(id, patch).await?;
    Ok(Json(ApiResponse::ok(station)))
}

/// `DELETE /stations/{id}`: Remove a station.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the station does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/stations/{id}",
    tag = "Stations",
    summary = "Delete a station",
    params(("id" = uuid::Uuid, Path, description = "Station id")),
    responses(
        (status = 200, description = "Deleted station", body = ApiResponse<Station>),
        (status = 404, description = "Station not found", body = ErrorResponse),
    )
)]
pub async fn delete_station(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<impl IntoResponse, GatewayError> {
    let station = state.store.delete_station(id).await?;
    Ok(Json(ApiResponse::ok(station)))
}

/// Station routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stations", get(list_stations).post(create_station))
        .route(
            "/stations/{id}",
            get(get_station).patch(update_station).delete(delete_station),
        )
}
