//! PostgreSQL implementation of the audit store.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{AuditRow, entry_from_row};
use crate::domain::AuditEntry;
use crate::error::GatewayError;

const CREATE_AUDIT_TABLE: &str = "CREATE TABLE IF NOT EXISTS audit_logs (\
     id UUID PRIMARY KEY, \
     action TEXT NOT NULL, \
     entity TEXT NOT NULL, \
     document_key UUID NOT NULL, \
     summary TEXT NOT NULL, \
     created_at TIMESTAMPTZ NOT NULL DEFAULT now())";

/// PostgreSQL-backed audit log using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresAudit {
    pool: PgPool,
}

impl PostgresAudit {
    /// Opens a pool and makes sure the `audit_logs` table exists.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] if the database cannot
    /// be reached or the table cannot be created.
    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        sqlx::query(CREATE_AUDIT_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Appends one entry.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn save(&self, entry: &AuditEntry) -> Result<(), GatewayError> {
        sqlx::query(
            "INSERT INTO audit_logs (id, action, entity, document_key, summary, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(*entry.id.as_uuid())
        .bind(entry.action.as_str())
        .bind(entry.entity.as_str())
        .bind(*entry.document_key.as_uuid())
        .bind(&entry.summary)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;
        Ok(())
    }

    /// Loads the most recent entries, newest first.
    ///
    /// # Errors
    ///
    /// Returns a [`GatewayError::PersistenceError`] on database failure.
    pub async fn recent(&self, limit: u32) -> Result<Vec<AuditEntry>, GatewayError> {
        let rows = sqlx::query_as::<_, AuditRow>(
            "SELECT id, action, entity, document_key, summary, created_at FROM audit_logs \
             ORDER BY created_at DESC LIMIT $1",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| GatewayError::PersistenceError(e.to_string()))?;

        Ok(rows.into_iter().filter_map(entry_from_row).collect())
    }
}
