//! Payment handlers: order creation, reads, checkout verification, and the
//! provider webhook.

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, ListQuery, Page, PaymentOrderResponse, VerifyPaymentRequest, WebhookAck,
    WebhookEvent,
};
use crate::app_state::AppState;
use crate::domain::{DocumentId, NewPayment, Payment};
use crate::error::{ErrorResponse, GatewayError};
use crate::signature::{self, SIGNATURE_HEADER};

/// `POST /payments`: Create a payment order.
///
/// # Errors
///
/// Returns [`GatewayError`] for an unknown client or station or an invalid
/// amount.
#[utoipa::path(
    post,
    path = "/api/v1/payments",
    tag = "Payments",
    summary = "Create a payment order",
    description = "Creates an order in `created` state with an `order_…` reference for the checkout widget.",
    request_body = NewPayment,
    responses(
        (status = 201, description = "Order created", body = ApiResponse<PaymentOrderResponse>),
        (status = 400, description = "Validation failed", body = ErrorResponse),
        (status = 404, description = "Client or station not found", body = ErrorResponse),
    )
)]
pub async fn create_payment(
    State(state): State<AppState>,
    Json(req): Json<NewPayment>,
) -> Result<impl IntoResponse, GatewayError> {
    let payment = state.store.create_payment(req).await?;
    let response = PaymentOrderResponse {
        payment,
        key_id: state.payments.key_id.clone(),
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(response))))
}

/// `GET /payments`: Paginated payment list.
///
/// # Errors
///
/// Returns [`GatewayError`] on internal failures.
#[utoipa::path(
    get,
    path = "/api/v1/payments",
    tag = "Payments",
    summary = "List payments",
    description = "Newest first. Filtered by `search` (order or payment reference) and `status`. Cached for the list TTL unless `fresh=true`.",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated payment list", body = ApiResponse<Vec<Payment>>),
    )
)]
pub async fn list_payments(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, GatewayError> {
    let query = query.clamped();
    let key = query.cache_key("payments:list");
    let page: Page<Payment> = state
        .cache
        .read_through(&key, state.cache.list_ttl(), query.fresh, || async {
            let items = state.store.list_payments(&query.filter()).await;
            Ok::<_, GatewayError>(Page::slice(items, &query))
        })
        .await?;
    Ok(Json(ApiResponse::from(page)))
}

/// `GET /payments/{id}`: Fetch one payment.
///
/// # Errors
///
/// Returns [`GatewayError::NotFound`] if the payment does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/payments/{id}",
    tag = "Payments",
    summary = "Get a payment",
    params(("id" = uuid::Uuid, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found", body = ErrorResponse),
    )
)]
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<DocumentId>,
) -> Result<impl IntoResponse, GatewayError> {
    let payment = state.store.get_payment(id).await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// `POST /payments/verify`: Confirm a checkout callback.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidSignature`] when the signature does not
/// match (the order is marked failed), or [`GatewayError::NotFound`] for
/// an unknown order.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    tag = "Payments",
    summary = "Verify a checkout payment",
    description = "Checks the HMAC-SHA256 over `order_id|payment_id` with the API key secret and marks the order captured.",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment captured", body = ApiResponse<Payment>),
        (status = 401, description = "Signature mismatch", body = ErrorResponse),
        (status = 404, description = "Order not found", body = ErrorResponse),
        (status = 409, description = "Order already settled", body = ErrorResponse),
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(req): Json<VerifyPaymentRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let valid = state.payments.key_secret.as_deref().is_some_and(|secret| {
        signature::verify_payment(secret, &req.order_id, &req.payment_id, &req.signature)
    });
    if !valid {
        tracing::warn!(order_id = %req.order_id, "checkout signature rejected");
        if let Err(e) = state.store.fail_payment(&req.order_id).await {
            tracing::warn!(order_id = %req.order_id, error = %e, "could not mark order failed");
        }
        return Err(GatewayError::InvalidSignature);
    }
    let payment = state
        .store
        .capture_payment(&req.order_id, &req.payment_id)
        .await?;
    Ok(Json(ApiResponse::ok(payment)))
}

/// `POST /webhooks/payments`: Provider webhook delivery.
///
/// The signature covers the raw body, so the body is verified before it is
/// parsed.
///
/// # Errors
///
/// Returns [`GatewayError::InvalidSignature`] for a missing or wrong
/// signature and [`GatewayError::InvalidRequest`] for an unparsable body.
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/payments",
    tag = "Payments",
    summary = "Payment provider webhook",
    description = "Verifies `X-Razorpay-Signature` over the raw body with the webhook secret, then applies `payment.captured` and `payment.failed` deliveries.",
    request_body(content = String, content_type = "application/json"),
    params(("X-Razorpay-Signature" = String, Header, description = "Hex HMAC-SHA256 of the body")),
    responses(
        (status = 200, description = "Delivery acknowledged", body = ApiResponse<WebhookAck>),
        (status = 400, description = "Malformed body", body = ErrorResponse),
        (status = 401, description = "Signature mismatch", body = ErrorResponse),
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, GatewayError> {
    let provided = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(GatewayError::InvalidSignature)?;
    let secret = state
        .payments
        .webhook_secret
        .as_deref()
        .ok_or(GatewayError::InvalidSignature)?;
    if !signature::verify(secret.as_bytes(), &body, provided) {
        tracing::warn!(bytes = body.len(), "webhook signature rejected");
        return Err(GatewayError::InvalidSignature);
    }

    let delivery: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| GatewayError::InvalidRequest(format!("webhook body: {e}")))?;
    let entity = delivery.payload.payment.as_ref().map(|p| &p.entity);

    let outcome = match (delivery.event.as_str(), entity) {
        ("payment.captured", Some(p)) => {
            Some(state.store.capture_payment(&p.order_id, &p.id).await)
        }
        ("payment.failed", Some(p)) => Some(state.store.fail_payment(&p.order_id).await),
        _ => None,
    };

    // Unknown or settled orders are acknowledged so the provider stops
    // redelivering.
    let processed = match outcome {
        None => {
            tracing::debug!(event = %delivery.event, "webhook event ignored");
            false
        }
        Some(Ok(_)) => true,
        Some(Err(e @ (GatewayError::NotFound { .. } | GatewayError::Conflict(_)))) => {
            tracing::warn!(error = %e, event = %delivery.event, "webhook not applied");
            false
        }
        Some(Err(e)) => return Err(e),
    };
    Ok(Json(ApiResponse::ok(WebhookAck {
        processed,
        event: delivery.event,
    })))
}

/// Payment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/payments", get(list_payments).post(create_payment))
        .route("/payments/verify", post(verify_payment))
        .route("/payments/{id}", get(get_payment))
        .route("/webhooks/payments", post(payment_webhook))
}
