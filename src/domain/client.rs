//! EV customers booking charging slots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Document, DocumentId, EventKind, validation};
use crate::error::GatewayError;

/// Account status of a client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    /// Can book slots.
    #[default]
    Active,
    /// Dormant account.
    Inactive,
    /// Blocked by an operator.
    Suspended,
}

impl ClientStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Suspended => "suspended",
        }
    }
}

/// A registered EV customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Client {
    /// Document key.
    pub id: DocumentId,
    /// Display name.
    pub name: String,
    /// Unique, lower-cased email address.
    pub email: String,
    /// Contact number in compact form.
    pub phone: String,
    /// Vehicle the client charges.
    #[serde(default)]
    pub vehicle_model: Option<String>,
    /// Account status.
    pub status: ClientStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Document for Client {
    const KIND: EventKind = EventKind::ClientUpdate;
    const LABEL: &'static str = "client";

    fn id(&self) -> DocumentId {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn owner(&self) -> Option<DocumentId> {
        Some(self.id)
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.email)
    }
}

/// Request body for `POST /clients`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewClient {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
    /// Contact number.
    pub phone: String,
    /// Vehicle model.
    #[serde(default)]
    pub vehicle_model: Option<String>,
    /// Initial status, `active` when omitted.
    #[serde(default)]
    pub status: Option<ClientStatus>,
}

impl NewClient {
    /// Validates the request and builds a fresh [`Client`].
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] naming the first bad field.
    pub fn validate(self) -> Result<Client, GatewayError> {
        let now = Utc::now();
        Ok(Client {
            id: DocumentId::new(),
            name: validation::required_text("name", &self.name)?,
            email: validation::email(&self.email)?,
            phone: validation::phone(&self.phone)?,
            vehicle_model: optional_text("vehicle_model", self.vehicle_model)?,
            status: self.status.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Request body for `PATCH /clients/{id}`. Absent fields stay unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ClientPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New email address.
    #[serde(default)]
    pub email: Option<String>,
    /// New contact number.
    #[serde(default)]
    pub phone: Option<String>,
    /// New vehicle model.
    #[serde(default)]
    pub vehicle_model: Option<String>,
    /// New status.
    #[serde(default)]
    pub status: Option<ClientStatus>,
}

impl ClientPatch {
    /// Applies the patch on top of `current`, validating every supplied
    /// field.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] for an empty patch or a bad
    /// field.
    pub fn apply(self, current: &Client) -> Result<Client, GatewayError> {
        if self.name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.vehicle_model.is_none()
            && self.status.is_none()
        {
            return Err(GatewayError::InvalidRequest("no fields to update".to_string()));
        }
        let mut next = current.clone();
        if let Some(name) = self.name {
            next.name = validation::required_text("name", &name)?;
        }
        if let Some(email) = self.email {
            next.email = validation::email(&email)?;
        }
        if let Some(phone) = self.phone {
            next.phone = validation::phone(&phone)?;
        }
        if self.vehicle_model.is_some() {
            next.vehicle_model = optional_text("vehicle_model", self.vehicle_model)?;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        next.updated_at = Utc::now();
        Ok(next)
    }
}

/// Blank optional text collapses to `None`.
pub(crate) fn optional_text(
    field: &str,
    value: Option<String>,
) -> Result<Option<String>, GatewayError> {
    match value {
        Some(v) if !v.trim().is_empty() => validation::required_text(field, &v).map(Some),
        _ => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn request() -> NewClient {
        NewClient {
            name: " Asha Rao ".to_string(),
            email: "ASHA@example.com".to_string(),
            phone: "9876543210".to_string(),
            vehicle_model: Some("  ".to_string()),
            status: None,
        }
    }

    #[test]
    fn validate_normalizes_fields() {
        let Ok(client) = request().validate() else {
            panic!("valid request rejected");
        };
        assert_eq!(client.name, "Asha Rao");
        assert_eq!(client.email, "asha@example.com");
        assert_eq!(client.vehicle_model, None);
        assert_eq!(client.status, ClientStatus::Active);
        assert_eq!(client.created_at, client.updated_at);
    }

    #[test]
    fn validate_rejects_bad_email() {
        let mut req = request();
        req.email = "nope".to_string();
        let Err(GatewayError::InvalidRequest(msg)) = req.validate() else {
            panic!("expected validation error");
        };
        assert!(msg.contains("email"));
    }

    #[test]
    fn patch_changes_only_supplied_fields() {
        let Ok(client) = request().validate() else {
            panic!("valid request rejected");
        };
        let patch = ClientPatch {
            status: Some(ClientStatus::Suspended),
            ..ClientPatch::default()
        };
        let Ok(next) = patch.apply(&client) else {
            panic!("patch rejected");
        };
        assert_eq!(next.status, ClientStatus::Suspended);
        assert_eq!(next.id, client.id);
        assert_eq!(next.email, client.email);
        assert!(next.updated_at >= client.updated_at);
    }

    #[test]
    fn empty_patch_is_rejected() {
        let Ok(client) = request().validate() else {
            panic!("valid request rejected");
        };
        assert!(ClientPatch::default().apply(&client).is_err());
    }
}
