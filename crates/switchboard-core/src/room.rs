//! Room state.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use parking_lot::RwLock;

use crate::errors::{FailedDelivery, RegistryError, Result};
use crate::participant::{Participant, SharedHandle};
use crate::payload::Payload;

/// A named group of participants.
///
/// Handed out as `Arc<Room>` by the registry. Accessors read the live
/// membership, so two calls may observe different sets under concurrent
/// joins and leaves.
#[derive(Debug)]
pub struct Room {
    id: String,
    participants: RwLock<HashMap<String, Participant>>,
}

/// Outcome of one relay pass through a room.
pub(crate) struct RelayOutcome {
    pub delivered: usize,
    pub failures: Vec<FailedDelivery>,
}

impl Room {
    pub(crate) fn new(id: String) -> Self {
        Self {
            id,
            participants: RwLock::new(HashMap::new()),
        }
    }

    /// Room identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current participant identifiers, sorted.
    pub fn participant_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.participants.read().keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Number of participants, detached entries included.
    pub fn participant_count(&self) -> usize {
        self.participants.read().len()
    }

    /// Whether the room has no participants.
    pub fn is_empty(&self) -> bool {
        self.participants.read().is_empty()
    }

    /// Whether `participant_id` is a member.
    pub fn contains(&self, participant_id: &str) -> bool {
        self.participants.read().contains_key(participant_id)
    }

    /// Snapshot of one participant's entry.
    pub fn participant(&self, participant_id: &str) -> Option<Participant> {
        self.participants.read().get(participant_id).cloned()
    }

    pub(crate) fn insert(&self, participant: Participant) -> Result<()> {
        let mut participants = self.participants.write();
        match participants.entry(participant.id().to_owned()) {
            Entry::Occupied(_) => Err(RegistryError::ParticipantAlreadyInRoom {
                room_id: self.id.clone(),
                participant_id: participant.id().to_owned(),
            }),
            Entry::Vacant(slot) => {
                let _ = slot.insert(participant);
                Ok(())
            }
        }
    }

    pub(crate) fn remove(&self, participant_id: &str) -> Result<()> {
        match self.participants.write().remove(participant_id) {
            Some(_) => Ok(()),
            None => Err(RegistryError::ParticipantNotInRoom {
                room_id: self.id.clone(),
                participant_id: participant_id.to_owned(),
            }),
        }
    }

    /// Remove `participant_id` only if its entry was created with `handle`.
    ///
    /// `Ok(false)` when the id now belongs to another entry, which stays.
    pub(crate) fn remove_if_held_by(
        &self,
        participant_id: &str,
        handle: &SharedHandle,
    ) -> Result<bool> {
        let mut participants = self.participants.write();
        match participants.get(participant_id) {
            None => Err(RegistryError::ParticipantNotInRoom {
                room_id: self.id.clone(),
                participant_id: participant_id.to_owned(),
            }),
            Some(entry) if !entry.holds(handle) => Ok(false),
            Some(_) => {
                let _ = participants.remove(participant_id);
                Ok(true)
            }
        }
    }

    /// Send `payload` to every connected participant except `sender_id`.
    ///
    /// Holds the read lock for the whole pass. Individual failures are
    /// collected and never stop the pass.
    pub(crate) fn relay(&self, sender_id: &str, payload: &Payload) -> RelayOutcome {
        let participants = self.participants.read();
        let mut outcome = RelayOutcome {
            delivered: 0,
            failures: Vec::new(),
        };
        for (id, participant) in participants.iter() {
            if id == sender_id {
                continue;
            }
            match participant.deliver(payload.clone()) {
                Some(Ok(())) => outcome.delivered += 1,
                Some(Err(error)) => outcome.failures.push(FailedDelivery {
                    participant_id: id.clone(),
                    error,
                }),
                None => {}
            }
        }
        outcome
    }
}
