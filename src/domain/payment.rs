//! Payment orders for charging sessions.
//!
//! A payment starts as an order (`created`) and is settled by either a
//! verified checkout callback or a signed provider webhook.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Document, DocumentId, EventKind, validation};
use crate::error::GatewayError;

/// Smallest order amount the provider accepts, in paise.
pub const MIN_AMOUNT_PAISE: u64 = 100;

/// Settlement state of a payment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order created, awaiting checkout.
    #[default]
    Created,
    /// Money received.
    Captured,
    /// Checkout failed or signature mismatch.
    Failed,
    /// Money returned to the client.
    Refunded,
}

impl PaymentStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Captured => "captured",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

/// A payment order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    /// Document key.
    pub id: DocumentId,
    /// Paying client.
    pub client_id: DocumentId,
    /// Station the session is booked on.
    #[serde(default)]
    pub station_id: Option<DocumentId>,
    /// Order amount in paise.
    pub amount_paise: u64,
    /// ISO currency code.
    pub currency: String,
    /// Provider order reference (`order_…`).
    pub order_id: String,
    /// Provider payment reference once paid.
    #[serde(default)]
    pub provider_payment_id: Option<String>,
    /// Settlement state.
    pub status: PaymentStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document for Payment {
    const KIND: EventKind = EventKind::PaymentUpdate;
    const LABEL: &'static str = "payment";

    fn id(&self) -> DocumentId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn owner(&self) -> Option<DocumentId> {
        Some(self.client_id)
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.order_id)
    }
}

impl Payment {
    /// Returns the payment marked captured with the provider reference.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] if the payment was already
    /// refunded, or captured under a different provider reference.
    pub fn captured(&self, provider_payment_id: &str) -> Result<Self, GatewayError> {
        match (self.status, self.provider_payment_id.as_deref()) {
            (PaymentStatus::Refunded, _) => Err(GatewayError::Conflict(format!(
                "payment {} is already refunded",
                self.id
            ))),
            (PaymentStatus::Captured, Some(existing)) if existing != provider_payment_id => {
                Err(GatewayError::Conflict(format!(
                    "payment {} is already captured",
                    self.id
                )))
            }
            _ => Ok(Self {
                provider_payment_id: Some(provider_payment_id.to_string()),
                status: PaymentStatus::Captured,
                updated_at: Utc::now(),
                ..self.clone()
            }),
        }
    }

    /// Returns the payment marked failed. Settled payments are left as-is.
    #[must_use]
    pub fn failed(&self) -> Self {
        if matches!(self.status, PaymentStatus::Captured | PaymentStatus::Refunded) {
            return self.clone();
        }
        Self {
            status: PaymentStatus::Failed,
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}

/// Request body for `POST /payments`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewPayment {
    /// Paying client.
    pub client_id: DocumentId,
    /// Station being booked.
    #[serde(default)]
    pub station_id: Option<DocumentId>,
    /// Amount in paise.
    pub amount_paise: u64,
    /// ISO currency code, `INR` when omitted.
    #[serde(default)]
    pub currency: Option<String>,
}

impl NewPayment {
    /// Validates the request and builds a fresh order.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming the first bad field.
    pub fn validate(self) -> Result<Payment, GatewayError> {
        if self.amount_paise < MIN_AMOUNT_PAISE {
            return Err(GatewayError::InvalidRequest(format!(
                "amount_paise must be at least {MIN_AMOUNT_PAISE}"
            )));
        }
        let currency = validation::currency(self.currency.as_deref().unwrap_or("INR"))?;
        let id = DocumentId::new();
        let now = Utc::now();
        Ok(Payment {
            id,
            client_id: self.client_id,
            station_id: self.station_id,
            amount_paise: self.amount_paise,
            currency,
            order_id: order_reference(id),
            provider_payment_id: None,
            status: PaymentStatus::Created,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Provider-style order reference derived from the document key.
fn order_reference(id: DocumentId) -> String {
    let simple = id.as_uuid().simple().to_string();
    format!("order_{}", simple.get(..14).unwrap_or(&simple))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn order() -> Payment {
        let req = NewPayment {
            client_id: DocumentId::new(),
            station_id: None,
            amount_paise: 25_000,
            currency: None,
        };
        let Ok(payment) = req.validate() else {
            panic!("valid order rejected");
        };
        payment
    }

    #[test]
    fn new_order_defaults() {
        let payment = order();
        assert_eq!(payment.currency, "INR");
        assert_eq!(payment.status, PaymentStatus::Created);
        assert!(payment.order_id.starts_with("order_"));
        assert_eq!(payment.order_id.len(), "order_".len() + 14);
    }

    #[test]
    fn tiny_amount_rejected() {
        let req = NewPayment {
            client_id: DocumentId::new(),
            station_id: None,
            amount_paise: 99,
            currency: Some("INR".to_string()),
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn capture_is_idempotent_for_same_reference() {
        let Ok(first) = order().captured("pay_1") else {
            panic!("capture failed");
        };
        assert_eq!(first.status, PaymentStatus::Captured);
        assert!(first.captured("pay_1").is_ok());
        assert!(first.captured("pay_2").is_err());
    }

    #[test]
    fn failed_does_not_override_capture() {
        let Ok(captured) = order().captured("pay_1") else {
            panic!("capture failed");
        };
        assert_eq!(captured.failed().status, PaymentStatus::Captured);
        assert_eq!(order().failed().status, PaymentStatus::Failed);
    }
}
