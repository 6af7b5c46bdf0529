//! Session registry: room lifecycle and relay.
//!
//! The room index sits behind one reader/writer lock and each [`Room`] guards
//! its own participant set. Locks are always taken index first, then room,
//! and the index lock is released before any room lock is held for writing.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::errors::{DeliveryFailure, RegistryError, Result};
use crate::participant::{Participant, SharedHandle};
use crate::payload::Payload;
use crate::room::Room;

/// Registry of rooms keyed by identifier.
///
/// Construct one per process and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    rooms: RwLock<HashMap<String, Arc<Room>>>,
}

impl SessionRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new, empty room. Rooms are never created implicitly.
    pub fn create_room(&self, room_id: impl Into<String>) -> Result<Arc<Room>> {
        let room_id = room_id.into();
        let mut rooms = self.rooms.write();
        match rooms.entry(room_id) {
            Entry::Occupied(slot) => Err(RegistryError::RoomAlreadyExists {
                room_id: slot.key().clone(),
            }),
            Entry::Vacant(slot) => {
                let room = Arc::new(Room::new(slot.key().clone()));
                let _ = slot.insert(Arc::clone(&room));
                Ok(room)
            }
        }
    }

    /// Live view of a registered room.
    pub fn get_room(&self, room_id: &str) -> Result<Arc<Room>> {
        self.rooms
            .read()
            .get(room_id)
            .cloned()
            .ok_or_else(|| RegistryError::RoomNotFound {
                room_id: room_id.to_owned(),
            })
    }

    /// Add a connected participant to an existing room.
    pub fn join_room(
        &self,
        room_id: &str,
        participant_id: impl Into<String>,
        handle: SharedHandle,
    ) -> Result<Arc<Room>> {
        let room = self.get_room(room_id)?;
        room.insert(Participant::connected(participant_id.into(), handle))?;
        Ok(room)
    }

    /// Add a participant with no connection. Relay skips it.
    pub fn register_participant(
        &self,
        room_id: &str,
        participant_id: impl Into<String>,
    ) -> Result<Arc<Room>> {
        let room = self.get_room(room_id)?;
        room.insert(Participant::detached(participant_id.into()))?;
        Ok(room)
    }

    /// Remove a participant. The room stays registered even when it empties.
    pub fn leave_room(&self, room_id: &str, participant_id: &str) -> Result<()> {
        self.get_room(room_id)?.remove(participant_id)
    }

    /// Remove the entry a connection created at join time.
    ///
    /// Leaves the room untouched and returns `Ok(false)` if `participant_id`
    /// was removed and taken again by another connection or a REST join since.
    pub fn leave_if_handle(
        &self,
        room_id: &str,
        participant_id: &str,
        handle: &SharedHandle,
    ) -> Result<bool> {
        self.get_room(room_id)?.remove_if_held_by(participant_id, handle)
    }

    /// Relay `payload` to every participant in the room except `sender_id`.
    ///
    /// The sender need not be a member. Returns how many participants received
    /// the payload. If any delivery failed the rest still went out and the
    /// error lists each failure.
    pub fn signal_message(
        &self,
        room_id: &str,
        sender_id: &str,
        payload: impl Into<Payload>,
    ) -> Result<usize> {
        let payload = payload.into();
        let rooms = self.rooms.read();
        let room = rooms.get(room_id).ok_or_else(|| RegistryError::RoomNotFound {
            room_id: room_id.to_owned(),
        })?;
        let outcome = room.relay(sender_id, &payload);
        if outcome.failures.is_empty() {
            Ok(outcome.delivered)
        } else {
            Err(RegistryError::Delivery(DeliveryFailure {
                room_id: room_id.to_owned(),
                delivered: outcome.delivered,
                failures: outcome.failures,
            }))
        }
    }

    /// Number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }

    /// Registered room identifiers, sorted.
    pub fn room_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rooms.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SendError;
    use crate::participant::SendHandle;
    use parking_lot::Mutex;
    use std::thread;

    #[derive(Default)]
    struct Inbox(Mutex<Vec<Payload>>);

    impl Inbox {
        fn received(&self) -> Vec<Payload> {
            self.0.lock().clone()
        }
    }

    impl SendHandle for Inbox {
        fn send(&self, payload: Payload) -> std::result::Result<(), SendError> {
            self.0.lock().push(payload);
            Ok(())
        }
    }

    struct Broken;

    impl SendHandle for Broken {
        fn send(&self, _payload: Payload) -> std::result::Result<(), SendError> {
            Err(SendError::Closed)
        }
    }

    fn inbox() -> Arc<Inbox> {
        Arc::new(Inbox::default())
    }

    #[test]
    fn create_room_twice_conflicts() {
        let reg = SessionRegistry::new();
        let room = reg.create_room("r").unwrap();
        let _ = reg.join_room("r", "a", inbox()).unwrap();
        let err = reg.create_room("r").unwrap_err();
        assert_eq!(err, RegistryError::RoomAlreadyExists { room_id: "r".into() });
        assert_eq!(room.participant_ids(), vec!["a"]);
        assert_eq!(reg.room_count(), 1);
    }

    #[test]
    fn get_missing_room() {
        let reg = SessionRegistry::new();
        let err = reg.get_room("nope").unwrap_err();
        assert_eq!(err, RegistryError::RoomNotFound { room_id: "nope".into() });
    }

    #[test]
    fn join_requires_existing_room() {
        let reg = SessionRegistry::new();
        let err = reg.join_room("r", "p", inbox()).unwrap_err();
        assert!(matches!(err, RegistryError::RoomNotFound { .. }));
        assert_eq!(reg.room_count(), 0);

        let _ = reg.create_room("r").unwrap();
        let _ = reg.join_room("r", "p", inbox()).unwrap();
        assert_eq!(reg.get_room("r").unwrap().participant_ids(), vec!["p"]);
    }

    #[test]
    fn join_twice_then_leave_twice() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let _ = reg.join_room("r", "p", inbox()).unwrap();
        let err = reg.join_room("r", "p", inbox()).unwrap_err();
        assert!(matches!(err, RegistryError::ParticipantAlreadyInRoom { .. }));

        reg.leave_room("r", "p").unwrap();
        let err = reg.leave_room("r", "p").unwrap_err();
        assert_eq!(
            err,
            RegistryError::ParticipantNotInRoom {
                room_id: "r".into(),
                participant_id: "p".into(),
            }
        );
    }

    #[test]
    fn stale_handle_leaves_replacement_in_place() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let old: SharedHandle = inbox();
        let _ = reg.join_room("r", "u1", old.clone()).unwrap();

        // Removed out from under the first connection, then taken again.
        reg.leave_room("r", "u1").unwrap();
        let fresh = inbox();
        let _ = reg.join_room("r", "u1", fresh.clone()).unwrap();

        assert!(!reg.leave_if_handle("r", "u1", &old).unwrap());
        assert_eq!(reg.get_room("r").unwrap().participant_ids(), vec!["u1"]);
        assert_eq!(reg.signal_message("r", "u2", "still routed").unwrap(), 1);
        assert_eq!(fresh.received(), vec![Payload::text("still routed")]);

        let fresh: SharedHandle = fresh;
        assert!(reg.leave_if_handle("r", "u1", &fresh).unwrap());
        assert!(reg.get_room("r").unwrap().is_empty());
    }

    #[test]
    fn stale_handle_does_not_remove_rest_entry() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let old: SharedHandle = inbox();
        let _ = reg.join_room("r", "u1", old.clone()).unwrap();
        reg.leave_room("r", "u1").unwrap();
        let _ = reg.register_participant("r", "u1").unwrap();

        assert!(!reg.leave_if_handle("r", "u1", &old).unwrap());
        assert!(reg.get_room("r").unwrap().contains("u1"));
    }

    #[test]
    fn leave_if_handle_reports_missing() {
        let reg = SessionRegistry::new();
        let handle: SharedHandle = inbox();
        assert!(matches!(
            reg.leave_if_handle("nope", "u1", &handle),
            Err(RegistryError::RoomNotFound { .. })
        ));
        let _ = reg.create_room("r").unwrap();
        assert!(matches!(
            reg.leave_if_handle("r", "u1", &handle),
            Err(RegistryError::ParticipantNotInRoom { .. })
        ));
    }

    #[test]
    fn leave_missing_room() {
        let reg = SessionRegistry::new();
        let err = reg.leave_room("r", "p").unwrap_err();
        assert!(matches!(err, RegistryError::RoomNotFound { .. }));
    }

    #[test]
    fn empty_room_persists_after_last_leave() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let _ = reg.join_room("r", "p", inbox()).unwrap();
        reg.leave_room("r", "p").unwrap();
        assert!(reg.get_room("r").unwrap().is_empty());
        assert!(reg.create_room("r").is_err());
    }

    #[test]
    fn signal_skips_sender() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let (a, b, c) = (inbox(), inbox(), inbox());
        let _ = reg.join_room("r", "a", a.clone()).unwrap();
        let _ = reg.join_room("r", "b", b.clone()).unwrap();
        let _ = reg.join_room("r", "c", c.clone()).unwrap();

        let delivered = reg.signal_message("r", "a", "m").unwrap();
        assert_eq!(delivered, 2);
        assert!(a.received().is_empty());
        assert_eq!(b.received(), vec![Payload::text("m")]);
        assert_eq!(c.received(), vec![Payload::text("m")]);
    }

    #[test]
    fn signal_alone_delivers_nothing() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let a = inbox();
        let _ = reg.join_room("r", "a", a.clone()).unwrap();
        assert_eq!(reg.signal_message("r", "a", "m").unwrap(), 0);
        assert!(a.received().is_empty());
    }

    #[test]
    fn signal_missing_room() {
        let reg = SessionRegistry::new();
        let err = reg.signal_message("r", "a", "m").unwrap_err();
        assert!(matches!(err, RegistryError::RoomNotFound { .. }));
    }

    #[test]
    fn signal_from_non_member_reaches_everyone() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let a = inbox();
        let _ = reg.join_room("r", "a", a.clone()).unwrap();
        assert_eq!(reg.signal_message("r", "outsider", "m").unwrap(), 1);
        assert_eq!(a.received().len(), 1);
    }

    #[test]
    fn failing_participant_does_not_block_others() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let c = inbox();
        let _ = reg.join_room("r", "a", inbox()).unwrap();
        let _ = reg.join_room("r", "b", Arc::new(Broken)).unwrap();
        let _ = reg.join_room("r", "c", c.clone()).unwrap();

        let err = reg.signal_message("r", "a", "m").unwrap_err();
        let RegistryError::Delivery(failure) = err else {
            panic!("expected delivery failure, got {err:?}");
        };
        assert_eq!(failure.delivered, 1);
        assert_eq!(failure.failed_participants().collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(failure.failures[0].error, SendError::Closed);
        assert_eq!(c.received(), vec![Payload::text("m")]);
        // Not evicted.
        assert!(reg.get_room("r").unwrap().contains("b"));
    }

    #[test]
    fn detached_participants_are_skipped() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let a = inbox();
        let _ = reg.join_room("r", "a", a.clone()).unwrap();
        let _ = reg.register_participant("r", "rest-user").unwrap();
        assert_eq!(reg.get_room("r").unwrap().participant_count(), 2);
        assert_eq!(reg.signal_message("r", "x", "m").unwrap(), 1);
        assert!(matches!(
            reg.register_participant("r", "a").unwrap_err(),
            RegistryError::ParticipantAlreadyInRoom { .. }
        ));
    }

    #[test]
    fn binary_payload_passes_through() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r").unwrap();
        let b = inbox();
        let _ = reg.join_room("r", "b", b.clone()).unwrap();
        let _ = reg.signal_message("r", "a", vec![0u8, 159, 146, 150]).unwrap();
        assert_eq!(b.received(), vec![Payload::binary(vec![0u8, 159, 146, 150])]);
    }

    #[test]
    fn end_to_end_hello() {
        let reg = SessionRegistry::new();
        let _ = reg.create_room("r1").unwrap();
        let (u1, u2) = (inbox(), inbox());
        let _ = reg.join_room("r1", "u1", u1.clone()).unwrap();
        let _ = reg.join_room("r1", "u2", u2.clone()).unwrap();
        let _ = reg.signal_message("r1", "u1", "hello").unwrap();
        assert_eq!(u2.received(), vec![Payload::text("hello")]);
        assert!(u1.received().is_empty());
    }

    #[test]
    fn concurrent_join_leave_loses_nothing() {
        let reg = Arc::new(SessionRegistry::new());
        let _ = reg.create_room("r").unwrap();

        let handles: Vec<_> = (0..16)
            .map(|t| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || {
                    for i in 0..100 {
                        let id = format!("t{t}-p{i}");
                        let _ = reg.join_room("r", id.clone(), inbox()).unwrap();
                        let _ = reg.signal_message("r", &id, "ping");
                        reg.leave_room("r", &id).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(reg.get_room("r").unwrap().participant_count(), 0);
    }

    #[test]
    fn concurrent_create_only_one_wins() {
        let reg = Arc::new(SessionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                thread::spawn(move || reg.create_room("shared").is_ok())
            })
            .collect();
        let wins = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(wins, 1);
    }

    #[test]
    fn room_ids_sorted() {
        let reg = SessionRegistry::new();
        for id in ["b", "c", "a"] {
            let _ = reg.create_room(id).unwrap();
        }
        assert_eq!(reg.room_ids(), vec!["a", "b", "c"]);
    }
}
