//! Registry error taxonomy.

use std::fmt;

use thiserror::Error;

/// Failure writing a payload to a single participant's connection.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SendError {
    /// The connection's write side is gone.
    #[error("connection closed")]
    Closed,
    /// The connection's outbound queue is at capacity.
    #[error("send queue full")]
    QueueFull,
    /// Any other transport-level failure.
    #[error("transport error: {0}")]
    Transport(String),
}

/// One participant that could not be reached during a relay pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FailedDelivery {
    /// Participant the payload was addressed to.
    pub participant_id: String,
    /// Why the write failed.
    pub error: SendError,
}

/// Aggregate of every per-participant failure in one relay pass.
///
/// Deliveries to the other participants in the same pass still happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// Room the relay ran in.
    pub room_id: String,
    /// Number of participants that did receive the payload.
    pub delivered: usize,
    /// Every participant that did not.
    pub failures: Vec<FailedDelivery>,
}

impl DeliveryFailure {
    /// Identifiers of the participants that failed, in pass order.
    pub fn failed_participants(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.participant_id.as_str())
    }
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "relay in room {} failed for {} participant(s)",
            self.room_id,
            self.failures.len()
        )?;
        for (i, failure) in self.failures.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{}: {}", failure.participant_id, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for DeliveryFailure {}

/// Errors returned by [`crate::SessionRegistry`] operations.
///
/// All variants are expected conditions. None of them leave the registry in a
/// partially mutated state.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// No room is registered under this identifier.
    #[error("room {room_id} not found")]
    RoomNotFound {
        /// Requested room.
        room_id: String,
    },
    /// A room is already registered under this identifier.
    #[error("room {room_id} already exists")]
    RoomAlreadyExists {
        /// Requested room.
        room_id: String,
    },
    /// The participant identifier is already taken in this room.
    #[error("participant {participant_id} already in room {room_id}")]
    ParticipantAlreadyInRoom {
        /// Room joined.
        room_id: String,
        /// Duplicate participant.
        participant_id: String,
    },
    /// The participant is not a member of this room.
    #[error("participant {participant_id} not in room {room_id}")]
    ParticipantNotInRoom {
        /// Room left.
        room_id: String,
        /// Missing participant.
        participant_id: String,
    },
    /// One or more deliveries in a relay pass failed.
    #[error(transparent)]
    Delivery(DeliveryFailure),
}

impl RegistryError {
    /// True for the two "does not exist" variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::RoomNotFound { .. } | Self::ParticipantNotInRoom { .. }
        )
    }

    /// True for the two "already exists" variants.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::RoomAlreadyExists { .. } | Self::ParticipantAlreadyInRoom { .. }
        )
    }
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
