//! Payment DTOs: order creation, checkout verification, and provider
//! webhooks.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::Payment;

/// Response body for `POST /payments` (201 Created).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaymentOrderResponse {
    /// The created order.
    pub payment: Payment,
    /// Public key id the browser checkout needs.
    pub key_id: String,
}

/// Request body for `POST /payments/verify`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VerifyPaymentRequest {
    /// Provider order reference (`order_…`).
    pub order_id: String,
    /// Provider payment reference (`pay_…`).
    pub payment_id: String,
    /// Hex HMAC-SHA256 over `"{order_id}|{payment_id}"`.
    pub signature: String,
}

/// Webhook delivery, e.g. `{"event":"payment.captured","payload":{...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Provider event name.
    pub event: String,
    /// Event payload.
    #[serde(default)]
    pub payload: WebhookPayload,
}

/// Payload section of a webhook delivery.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookPayload {
    /// Present on `payment.*` events.
    #[serde(default)]
    pub payment: Option<WebhookEntity>,
}

/// Provider entity wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntity {
    /// The payment entity.
    pub entity: WebhookPaymentEntity,
}

/// The fields of a provider payment entity the gateway consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPaymentEntity {
    /// Provider payment reference.
    pub id: String,
    /// Order the payment belongs to.
    pub order_id: String,
}

/// Acknowledgement for a webhook delivery.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// Whether the delivery changed a payment.
    pub processed: bool,
    /// Provider event name as received.
    pub event: String,
}

/// Query parameters for `GET /audit-logs`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AuditQuery {
    /// Maximum number of entries (1-500). Defaults to 50.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    50
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_provider_webhook_shape() {
        let raw = r#"{
            "entity": "event",
            "event": "payment.captured",
            "payload": { "payment": { "entity": {
                "id": "pay_29QQoUBi66xm2f",
                "order_id": "order_9A33XWu170gUtm",
                "amount": 5000,
                "status": "captured"
            } } }
        }"#;
        let Ok(event) = serde_json::from_str::<WebhookEvent>(raw) else {
            panic!("webhook rejected");
        };
        assert_eq!(event.event, "payment.captured");
        let Some(payment) = event.payload.payment else {
            panic!("payment entity missing");
        };
        assert_eq!(payment.entity.order_id, "order_9A33XWu170gUtm");
    }

    #[test]
    fn unrelated_events_parse_without_payment() {
        let Ok(event) = serde_json::from_str::<WebhookEvent>(r#"{"event":"refund.created"}"#) else {
            panic!("webhook rejected");
        };
        assert!(event.payload.payment.is_none());
    }
}
