//! Client CRUD handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, ListQuery, Page};
use crate::app_state::AppState;
use crate::domain::{Client, ClientPatch, DocumentId, NewClient};
use crate::error::{ErrorResponse, GatewayError};

/// `POST /clients`: Register a client.
///
/// # Errors
///
/// Returns [`GatewayError`] on validation failure or a duplicate email.
#[utoipa::path(
    post,
    path = "/api/v1/clients",
    tag = "Clients",
    summary = "Create a client",
    description = "Validates and stores a client, then publishes a `client_update` insert event.",
    request_body = NewClient,
    responses(
        (status = 201, description = "Client created", body = ApiResponse<Client>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn create_client(
    State(state): State<AppState>,
    Json(req): Json<NewClient>,
) -> Result<impl IntoResponse, GatewayError> {
    let client = state.store.create_client(req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(client))))
}

/// `GET /clients`: Paginated client list.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/clients",
    tag = "Clients",
    summary = "List clients",
    description = "Newest first. Filtered by `search` (name, email, phone) and `status`. Cached for the list TTL; writes are not reflected until the entry expires unless `fresh=true`.",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated client list", body = ApiResponse<Vec<Client>>),
    )
)]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let query = query.clamped();
    let key = query.cache_key("clients:list");
    let page: Page<Client> = state
        .cache
        .read_through(&key, state.cache.list_ttl(), query.fresh, || async {
            let items = state.store.list_clients(&query.filter()).await;
            Ok::<_, GatewayError>(Page::slice(items, &query))
        })
        .await?;
    Ok(Json(ApiResponse::from(page)))
}

/// `GET /clients/{id}`: Fetch one client.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the client does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    summary = "Get a client",
    params(("id" = uuid::Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = ApiResponse<Client>),
        (status = 404, description = "Client not found", body = ErrorResponse),
    )
)]
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<impl IntoResponse, GatewayError> {
    let client = state.store.get_client(id).await?;
    Ok(Json(ApiResponse::ok(client)))
}

/// `PATCH /clients/{id}`: Partially update a client.
///
/// # Errors
///
/// Returns [`GatewayError`] if the client does not exist or the patch is
/// invalid.
#[utoipa::path(
    patch,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    summary = "Update a client",
    params(("id" = uuid::Uuid, Path, description = "Client id")),
    request_body = ClientPatch,
    responses(
        (status = 200, description = "Updated client", body = ApiResponse<Client>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Client not found", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
    )
)]
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
    Json(patch): Json<ClientPatch>,
) -> Result<impl IntoResponse, GatewayError> {
    let client = state.store.update_client(id, patch).await?;
    Ok(Json(ApiResponse::ok(client)))
}

/// `DELETE /clients/{id}`: Remove a client.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the client does not exist.
#[utoipa::path(
    delete,
    path = "/api/v1/clients/{id}",
    tag = "Clients",
    summary = "Delete a client",
    params(("id" = uuid::Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Deleted client", body = ApiResponse<Client>),
        (status = 404, description = "Client not found", body = ErrorResponse),
    )
)]
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<impl IntoResponse, GatewayError> {
    let client = state.store.delete_client(id).await?;
    Ok(Json(ApiResponse::ok(client)))
}

/// Client routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/clients", get(list_clients).post(create_client))
        .route(
            "/clients/{id}",
            get(get_client).patch(update_client).delete(delete_client),
        )
}
