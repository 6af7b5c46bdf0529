//! Participants and their send handles.

use std::fmt;
use std::sync::Arc;

use crate::errors::SendError;
use crate::payload::Payload;

/// Write capability for one participant's connection.
///
/// Implementations must not block: the registry calls `send` while holding a
/// room read lock. Queue the payload and return, or fail immediately.
pub trait SendHandle: Send + Sync {
    /// Hand one payload to the connection's writer.
    fn send(&self, payload: Payload) -> Result<(), SendError>;
}

/// Shared, type-erased send handle.
pub type SharedHandle = Arc<dyn SendHandle>;

/// A member of a room.
///
/// The handle is fixed when the entry is created and never replaced. An entry
/// without a handle is detached: it counts as a member but relay skips it.
#[derive(Clone)]
pub struct Participant {
    id: String,
    handle: Option<SharedHandle>,
}

impl Participant {
    pub(crate) fn connected(id: String, handle: SharedHandle) -> Self {
        Self {
            id,
            handle: Some(handle),
        }
    }

    pub(crate) fn detached(id: String) -> Self {
        Self {
            id,
            handle: None,
        }
    }

    /// Participant identifier, unique within its room.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether this entry has a live connection behind it.
    pub fn is_connected(&self) -> bool {
        self.handle.is_some()
    }

    /// Whether this entry was created with `handle`.
    pub(crate) fn holds(&self, handle: &SharedHandle) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|own| std::ptr::addr_eq(Arc::as_ptr(own), Arc::as_ptr(handle)))
    }

    /// Send through the handle. `None` for detached entries.
    pub(crate) fn deliver(&self, payload: Payload) -> Option<Result<(), SendError>> {
        self.handle.as_ref().map(|h| h.send(payload))
    }
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}
