//! Common behaviour of documents stored in a [`super::Collection`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{DocumentId, EventKind};

/// A persisted entity tracked by the change pipeline.
///
/// Implemented by [`super::Client`], [`super::Station`] and
/// [`super::Payment`]. The same trait drives the server-side collections and
/// the client-side snapshots.
pub trait Document: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Event kind emitted for writes on this collection.
    const KIND: EventKind;

    /// Human-readable entity label used in error messages.
    const LABEL: &'static str;

    /// Document key.
    fn id(&self) -> DocumentId;

    /// Creation timestamp, used for newest-first ordering.
    fn created_at(&self) -> DateTime<Utc>;

    /// Room key of the user owning this document, if any.
    fn owner(&self) -> Option<DocumentId> {
        None
    }

    /// Value of the field that must be unique across the collection.
    fn unique_key(&self) -> Option<&str> {
        None
    }
}
