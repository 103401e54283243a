//! Change events describing writes on tracked collections.
//!
//! A [`ChangeEvent`] is built by the write path after a document operation
//! commits, fanned out through the relay, rebroadcast by the push gateway
//! and folded into snapshots by the reconciler. It is never persisted.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{Document, DocumentId};

/// Which tracked collection an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A document in the clients collection changed.
    ClientUpdate,
    /// A document in the stations collection changed.
    StationUpdate,
    /// A document in the payments collection changed.
    PaymentUpdate,
}

impl EventKind {
    /// Wire name of the event kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ClientUpdate => "client_update",
            Self::StationUpdate => "station_update",
            Self::PaymentUpdate => "payment_update",
        }
    }
}

/// The kind of write that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// A new document was stored.
    Insert,
    /// An existing document was replaced.
    Update,
    /// A document was removed.
    Delete,
}

impl Operation {
    /// Wire name of the operation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// Envelope published after every successful write.
///
/// `full_document` carries the post-write snapshot for inserts and updates
/// and is absent for deletes. `user_id` is the room key used by the push
/// gateway for targeted delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChangeEvent {
    /// Collection the write happened on.
    pub event: EventKind,
    /// Kind of write.
    pub operation: Operation,
    /// Key of the affected document.
    pub document_key: DocumentId,
    /// Post-write document snapshot (absent on delete).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_document: Option<serde_json::Value>,
    /// Owning user, if the event should reach that user's room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<DocumentId>,
    /// Time the event was built.
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Builds an insert or update event carrying the document snapshot.
    ///
    /// Passing [`Operation::Delete`] yields a body-less delete event.
    #[must_use]
    pub fn written<T: Document>(operation: Operation, document: &T) -> Self {
        let full_document = match operation {
            Operation::Delete => None,
            Operation::Insert | Operation::Update => match serde_json::to_value(document) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(error = %e, id = %document.id(), "document snapshot not serializable");
                    None
                }
            },
        };
        Self {
            event: T::KIND,
            operation,
            document_key: document.id(),
            full_document,
            user_id: document.owner(),
            timestamp: Utc::now(),
        }
    }

    /// Builds a delete event; deletes never carry a document body.
    #[must_use]
    pub fn deleted<T: Document>(document: &T) -> Self {
        Self::written(Operation::Delete, document)
    }

    /// Decodes the carried document snapshot as `T`.
    ///
    /// Returns `None` for deletes or when the body does not match `T`.
    #[must_use]
    pub fn document<T: DeserializeOwned>(&self) -> Option<T> {
        self.full_document
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Client, ClientStatus};

    fn client() -> Client {
        let now = Utc::now();
        Client {
            id: DocumentId::new(),
            name: "Asha Rao".to_string(),
            email: "asha@example.com".to_string(),
            phone: "+919876543210".to_string(),
            vehicle_model: Some("Nexon EV".to_string()),
            status: ClientStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn insert_event_carries_document_and_room() {
        let c = client();
        let event = ChangeEvent::written(Operation::Insert, &c);
        assert_eq!(event.event, EventKind::ClientUpdate);
        assert_eq!(event.document_key, c.id);
        assert_eq!(event.user_id, Some(c.id));
        assert_eq!(event.document::<Client>(), Some(c));
    }

    #[test]
    fn delete_event_has_no_body_on_the_wire() {
        let event = ChangeEvent::deleted(&client());
        let Ok(json) = serde_json::to_value(&event) else {
            panic!("serialization failed");
        };
        assert_eq!(json["event"], "client_update");
        assert_eq!(json["operation"], "delete");
        assert!(json.get("full_document").is_none());
    }

    #[test]
    fn parses_envelope_from_relay_payload() {
        let id = DocumentId::new();
        let payload = format!(
            r#"{{"event":"station_update","operation":"update","document_key":"{id}","timestamp":"2026-01-01T00:00:00Z"}}"#
        );
        let Ok(event) = serde_json::from_str::<ChangeEvent>(&payload) else {
            panic!("parse failed");
        };
        assert_eq!(event.event, EventKind::StationUpdate);
        assert_eq!(event.operation, Operation::Update);
        assert_eq!(event.document_key, id);
        assert!(event.full_document.is_none());
        assert!(event.user_id.is_none());
    }
}
