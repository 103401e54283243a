//! Per-connection room membership.
//!
//! Rooms are keyed by user id. A connection in no rooms sees every event;
//! once it joins rooms it sees untargeted events plus those addressed to
//! one of its rooms.

use std::collections::HashSet;

use crate::domain::{ChangeEvent, DocumentId};

/// Rooms joined by a single WebSocket connection.
#[derive(Debug, Default)]
pub struct RoomMembership {
    rooms: HashSet<DocumentId>,
}

impl RoomMembership {
    /// Creates an empty membership.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Joins a room. Returns `false` if already a member.
    pub fn join(&mut self, user_id: DocumentId) -> bool {
        self.rooms.insert(user_id)
    }

    /// Leaves a room. Returns `false` if not a member.
    pub fn leave(&mut self, user_id: DocumentId) -> bool {
        self.rooms.remove(&user_id)
    }

    /// Returns `true` if `event` should be delivered to this connection.
    #[must_use]
    pub fn accepts(&self, event: &ChangeEvent) -> bool {
        match event.user_id {
            None => true,
            Some(_) if self.rooms.is_empty() => true,
            Some(user) => self.rooms.contains(&user),
        }
    }

    /// Number of joined rooms.
    #[must_use]
    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventKind, Operation};

    fn event_for(user_id: Option<DocumentId>) -> ChangeEvent {
        ChangeEvent {
            event: EventKind::PaymentUpdate,
            operation: Operation::Update,
            document_key: DocumentId::new(),
            full_document: None,
            user_id,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn no_rooms_receives_everything() {
        let rooms = RoomMembership::new();
        assert!(rooms.accepts(&event_for(None)));
        assert!(rooms.accepts(&event_for(Some(DocumentId::new()))));
    }

    #[test]
    fn joined_room_filters_targeted_events() {
        let mut rooms = RoomMembership::new();
        let me = DocumentId::new();
        assert!(rooms.join(me));
        assert!(!rooms.join(me));

        assert!(rooms.accepts(&event_for(Some(me))));
        assert!(rooms.accepts(&event_for(None)));
        assert!(!rooms.accepts(&event_for(Some(DocumentId::new()))));
    }

    #[test]
    fn leaving_last_room_restores_broadcast() {
        let mut rooms = RoomMembership::new();
        let me = DocumentId::new();
        rooms.join(me);
        assert!(rooms.leave(me));
        assert!(!rooms.leave(me));
        assert_eq!(rooms.count(), 0);
        assert!(rooms.accepts(&event_for(Some(DocumentId::new()))));
    }
}
