//! Persistence layer: the audit log and its datastore connection.
//!
//! The gateway favours availability here: if the database cannot be
//! reached after a bounded number of attempts, [`connect_with_retry`]
//! hands back [`AuditStore::Disabled`], a no-op stand-in, and the service
//! keeps running without an audit trail.

pub mod models;
pub mod postgres;

use std::time::Duration;

pub use postgres::PostgresAudit;

use crate::backoff::retry_fixed;
use crate::config::GatewayConfig;
use crate::domain::AuditEntry;
use crate::error::GatewayError;

/// Audit log backend.
#[derive(Debug, Clone)]
pub enum AuditStore {
    /// Entries go to PostgreSQL.
    Postgres(PostgresAudit),
    /// Entries are discarded.
    Disabled,
}

impl AuditStore {
    /// Records an entry best-effort. Failures are logged, never returned.
    pub async fn record(&self, entry: &AuditEntry) {
        if let Self::Postgres(pg) = self
            && let Err(e) = pg.save(entry).await
        {
            tracing::warn!(error = %e, key = %entry.document_key, "audit write failed");
        }
    }

    /// Returns the most recent entries (empty when disabled).
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>, GatewayError> {
        match self {
            Self::Postgres(pg) => pg.recent(limit).await,
            Self::Disabled => Ok(Vec::new()),
        }
    }

    /// Returns `true` when entries are actually stored.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        matches!(self, Self::Postgres(_))
    }
}

/// Connects the audit store, retrying with a fixed pause.
///
/// Never fails: exhaustion (or `PERSISTENCE_ENABLED=false`) yields
/// [`AuditStore::Disabled`].
pub async fn connect_with_retry(config: &GatewayConfig) -> AuditStore {
    if !config.persistence_enabled {
        tracing::info!("persistence disabled; audit log is a no-op");
        return AuditStore::Disabled;
    }
    let url = config.database_url.as_str();
    let max_connections = config.database_max_connections;
    let acquire_timeout = Duration::from_secs(config.database_connect_timeout_secs);
    let connected = retry_fixed(
        "audit_store",
        config.database_connect_retries.max(1),
        Duration::from_millis(config.database_retry_backoff_ms),
        move || PostgresAudit::connect(url, max_connections, acquire_timeout),
    )
    .await;

    match connected {
        Some(pg) => {
            tracing::info!("audit store connected");
            AuditStore::Postgres(pg)
        }
        None => {
            tracing::error!(
                attempts = config.database_connect_retries,
                "database unreachable; continuing without audit log"
            );
            AuditStore::Disabled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeEvent, DocumentId, EventKind, Operation};

    #[tokio::test]
    async fn disabled_store_is_a_no_op() {
        let store = AuditStore::Disabled;
        let event = ChangeEvent {
            event: EventKind::ClientUpdate,
            operation: Operation::Insert,
            document_key: DocumentId::new(),
            full_document: None,
            user_id: None,
            timestamp: chrono::Utc::now(),
        };
        store.record(&AuditEntry::from_event(&event)).await;
        assert!(!store.is_enabled());
        assert!(matches!(store.recent(10).await, Ok(v) if v.is_empty()));
    }
}
