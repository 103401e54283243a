//! Bounded log of recently applied change events.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{ChangeEvent, DocumentId, EventKind, Operation};

/// Default number of entries kept.
pub const DEFAULT_ACTIVITY_CAPACITY: usize = 50;

/// One line of the activity feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Collection the change happened on.
    pub event: EventKind,
    /// Kind of write.
    pub operation: Operation,
    /// Affected document.
    pub document_key: DocumentId,
    /// Time the server built the event.
    pub at: DateTime<Utc>,
}

impl From<&ChangeEvent> for ActivityEntry {
    fn from(event: &ChangeEvent) -> Self {
        Self {
            event: event.event,
            operation: event.operation,
            document_key: event.document_key,
            at: event.timestamp,
        }
    }
}

impl std::fmt::Display for ActivityEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} {}",
            self.event.as_str(),
            self.operation.as_str(),
            self.document_key
        )
    }
}

/// Newest-first feed holding at most `capacity` entries.
#[derive(Debug, Clone)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new(DEFAULT_ACTIVITY_CAPACITY)
    }
}

impl ActivityLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Records an entry at the front, evicting the oldest past capacity.
    pub fn push(&mut self, entry: ActivityEntry) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
