//! Audit trail entries recorded for every committed write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ChangeEvent, DocumentId, EventKind, Operation};

/// One row of the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AuditEntry {
    /// Row key.
    pub id: DocumentId,
    /// Kind of write.
    pub action: Operation,
    /// Collection written to.
    pub entity: EventKind,
    /// Key of the written document.
    pub document_key: DocumentId,
    /// Short description, e.g. `"client insert"`.
    pub summary: String,
    /// Time the write was observed.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    /// Derives the audit row for a published change event.
    #[must_use]
    pub fn from_event(event: &ChangeEvent) -> Self {
        let label = event.event.as_str().trim_end_matches("_update");
        Self {
            id: DocumentId::new(),
            action: event.operation,
            entity: event.event,
            document_key: event.document_key,
            summary: format!("{label} {}", event.operation.as_str()),
            created_at: event.timestamp,
        }
    }
}
