//! Row mapping for the `audit_logs` table.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{AuditEntry, DocumentId, EventKind, Operation};

/// Raw `audit_logs` row as returned by `sqlx`.
pub type AuditRow = (Uuid, String, String, Uuid, String, DateTime<Utc>);

/// Converts a raw row back into an [`AuditEntry`].
///
/// Returns `None` for rows whose enum columns hold unknown values.
#[must_use]
pub fn entry_from_row(row: AuditRow) -> Option<AuditEntry> {
    let (id, action, entity, document_key, summary, created_at) = row;
    Some(AuditEntry {
        id: DocumentId::from_uuid(id),
        action: parse_operation(&action)?,
        entity: parse_kind(&entity)?,
        document_key: DocumentId::from_uuid(document_key),
        summary,
        created_at,
    })
}

fn parse_operation(value: &str) -> Option<Operation> {
    match value {
        "insert" => Some(Operation::Insert),
        "update" => Some(Operation::Update),
        "delete" => Some(Operation::Delete),
        _ => None,
    }
}

fn parse_kind(value: &str) -> Option<EventKind> {
    match value {
        "client_update" => Some(EventKind::ClientUpdate),
        "station_update" => Some(EventKind::StationUpdate),
        "payment_update" => Some(EventKind::PaymentUpdate),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn row_maps_to_entry() {
        let id = Uuid::new_v4();
        let key = Uuid::new_v4();
        let now = Utc::now();
        let row = (
            id,
            "update".to_string(),
            "station_update".to_string(),
            key,
            "station update".to_string(),
            now,
        );
        let Some(entry) = entry_from_row(row) else {
            panic!("row rejected");
        };
        assert_eq!(entry.action, Operation::Update);
        assert_eq!(entry.entity, EventKind::StationUpdate);
        assert_eq!(*entry.document_key.as_uuid(), key);
    }

    #[test]
    fn unknown_enum_values_are_skipped() {
        let row = (
            Uuid::new_v4(),
            "upsert".to_string(),
            "client_update".to_string(),
            Uuid::new_v4(),
            String::new(),
            Utc::now(),
        );
        assert!(entry_from_row(row).is_none());
    }
}
