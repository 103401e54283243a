//! Local copy of one collection, kept current by change events.

use crate::domain::{Document, DocumentId};

/// Ordered list of documents keyed by id, newest first.
///
/// Applying the same upsert or remove twice leaves the same snapshot, so
/// events that overlap a refetch are harmless.
#[derive(Debug, Clone)]
pub struct CollectionSnapshot<T> {
    items: Vec<T>,
}

impl<T> Default for CollectionSnapshot<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Document> CollectionSnapshot<T> {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the document with the same key in place, or prepends it.
    /// Returns `true` if an existing document was replaced.
    pub fn upsert(&mut self, document: T) -> bool {
        let id = document.id();
        match self.items.iter_mut().find(|d| d.id() == id) {
            Some(slot) => {
                *slot = document;
                true
            }
            None => {
                self.items.insert(0, document);
                false
            }
        }
    }

    /// Removes the document with `id`, if present.
    pub fn remove(&mut self, id: DocumentId) -> Option<T> {
        let pos = self.items.iter().position(|d| d.id() == id)?;
        Some(self.items.remove(pos))
    }

    /// Replaces the whole snapshot with a fresh fetch.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Looks a document up by key.
    #[must_use]
    pub fn get(&self, id: DocumentId) -> Option<&T> {
        self.items.iter().find(|d| d.id() == id)
    }

    /// Documents in display order.
    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the snapshot holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
