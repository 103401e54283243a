//! Concurrent in-process document store.
//!
//! [`Collection`] keeps one entity type in a `HashMap` keyed by
//! [`DocumentId`] behind a [`tokio::sync::RwLock`]. Every operation on a
//! single document is atomic with respect to the others, which is all the
//! write path needs: each write touches exactly one document.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::{Document, DocumentId};
use crate::error::GatewayError;

/// Store for all documents of type `T`.
///
/// # Concurrency
///
/// - Reads run concurrently.
/// - Writes are serialized, so unique-key checks cannot race.
#[derive(Debug)]
pub struct Collection<T> {
    documents: RwLock<HashMap<DocumentId, T>>,
}

impl<T: Document> Collection<T> {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a new document.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] if the key or the document's
    /// unique field is already taken.
    pub async fn insert(&self, document: T) -> Result<T, GatewayError> {
        let mut map = self.documents.write().await;
        if map.contains_key(&document.id()) {
            return Err(GatewayError::Conflict(format!(
                "{} {} already exists",
                T::LABEL,
                document.id()
            )));
        }
        ensure_unique(&map, &document)?;
        map.insert(document.id(), document.clone());
        Ok(document)
    }

    /// Returns a copy of the document with the given key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if no such document exists.
    pub async fn get(&self, id: DocumentId) -> Result<T, GatewayError> {
        self.documents
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found(T::LABEL, id))
    }

    /// Atomically replaces a document with `change(current)`.
    ///
    /// The closure runs under the write lock; its result must keep the same
    /// key.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if the document is missing, any
    /// error produced by `change`, or [`GatewayError::Conflict`] if the new
    /// unique field collides with another document.
    pub async fn update<F>(&self, id: DocumentId, change: F) -> Result<T, GatewayError>
    where
        F: FnOnce(&T) -> Result<T, GatewayError>,
    {
        let mut map = self.documents.write().await;
        let current = map
            .get(&id)
            .ok_or_else(|| GatewayError::not_found(T::LABEL, id))?;
        let next = change(current)?;
        if next.id() != id {
            return Err(GatewayError::Internal(format!(
                "{} key changed during update",
                T::LABEL
            )));
        }
        ensure_unique(&map, &next)?;
        map.insert(id, next.clone());
        Ok(next)
    }

    /// Removes a document, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::NotFound`] if no such document exists.
    pub async fn remove(&self, id: DocumentId) -> Result<T, GatewayError> {
        self.documents
            .write()
            .await
            .remove(&id)
            .ok_or_else(|| GatewayError::not_found(T::LABEL, id))
    }

    /// Returns the first document matching `predicate`.
    pub async fn find<P>(&self, predicate: P) -> Option<T>
    where
        P: Fn(&T) -> bool,
    {
        self.documents
            .read()
            .await
            .values()
            .find(|doc| predicate(doc))
            .cloned()
    }

    /// Returns all documents matching `predicate`, newest first.
    pub async fn list<P>(&self, predicate: P) -> Vec<T>
    where
        P: Fn(&T) -> bool,
    {
        let map = self.documents.read().await;
        let mut docs: Vec<T> = map.values().filter(|doc| predicate(doc)).cloned().collect();
        docs.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(&b.id()))
        });
        docs
    }

    /// Returns the number of documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns `true` if the collection holds no documents.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

impl<T: Document> Default for Collection<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_unique<T: Document>(map: &HashMap<DocumentId, T>, document: &T) -> Result<(), GatewayError> {
    let Some(key) = document.unique_key() else {
        return Ok(());
    };
    let taken = map
        .values()
        .any(|other| other.id() != document.id() && other.unique_key() == Some(key));
    if taken {
        return Err(GatewayError::Conflict(format!(
            "{} with key '{key}' already exists",
            T::LABEL
        )));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Client, ClientPatch, ClientStatus, NewClient};

    fn client(email: &str) -> Client {
        let req = NewClient {
            name: "Test Client".to_string(),
            email: email.to_string(),
            phone: "9876543210".to_string(),
            vehicle_model: None,
            status: None,
        };
        let Ok(client) = req.validate() else {
            panic!("valid client rejected");
        };
        client
    }

    #[tokio::test]
    async fn insert_and_get() {
        let coll = Collection::new();
        let c = client("a@example.com");
        assert!(coll.insert(c.clone()).await.is_ok());
        let Ok(fetched) = coll.get(c.id).await else {
            panic!("inserted client missing");
        };
        assert_eq!(fetched, c);
    }

    #[tokio::test]
    async fn duplicate_unique_key_conflicts() {
        let coll = Collection::new();
        assert!(coll.insert(client("a@example.com")).await.is_ok());
        let result = coll.insert(client("a@example.com")).await;
        assert!(matches!(result, Err(GatewayError::Conflict(_))));
        assert_eq!(coll.len().await, 1);
    }

    #[tokio::test]
    async fn update_applies_patch_atomically() {
        let coll = Collection::new();
        let c = client("a@example.com");
        let _ = coll.insert(c.clone()).await;
        let patch = ClientPatch {
            status: Some(ClientStatus::Inactive),
            ..ClientPatch::default()
        };
        let Ok(next) = coll.update(c.id, |cur| patch.apply(cur)).await else {
            panic!("update failed");
        };
        assert_eq!(next.status, ClientStatus::Inactive);
    }

    #[tokio::test]
    async fn update_into_taken_key_conflicts() {
        let coll = Collection::new();
        let a = client("a@example.com");
        let b = client("b@example.com");
        let _ = coll.insert(a.clone()).await;
        let _ = coll.insert(b.clone()).await;
        let patch = ClientPatch {
            email: Some("a@example.com".to_string()),
            ..ClientPatch::default()
        };
        let result = coll.update(b.id, |cur| patch.apply(cur)).await;
        assert!(matches!(result, Err(GatewayError::Conflict(_))));
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let coll: Collection<Client> = Collection::new();
        let result = coll.remove(DocumentId::new()).await;
        assert!(matches!(result, Err(GatewayError::NotFound { .. })));
        assert!(coll.is_empty().await);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filtered() {
        let coll = Collection::new();
        let mut older = client("old@example.com");
        older.created_at -= chrono::Duration::minutes(5);
        let newer = client("new@example.com");
        let _ = coll.insert(older.clone()).await;
        let _ = coll.insert(newer.clone()).await;

        let all = coll.list(|_| true).await;
        assert_eq!(
            all.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![newer.id, older.id]
        );
        let filtered = coll.list(|c| c.email.starts_with("old")).await;
        assert_eq!(filtered.len(), 1);
    }
}
