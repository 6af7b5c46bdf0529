//! WebSocket client connection state.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use switchboard_core::{Payload, SendError, SendHandle};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// One joined WebSocket client.
///
/// Registered with the room as its [`SendHandle`]. Sends only enqueue onto
/// the writer task's bounded channel.
pub struct ClientConnection {
    /// Participant identifier within the room.
    pub participant_id: String,
    /// Room this connection joined.
    pub room_id: String,
    tx: mpsc::Sender<Payload>,
    connected_at: Instant,
    pub(crate) is_alive: AtomicBool,
    last_pong: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection feeding `tx`.
    pub fn new(room_id: String, participant_id: String, tx: mpsc::Sender<Payload>) -> Self {
        let now = Instant::now();
        Self {
            participant_id,
            room_id,
            tx,
            connected_at: now,
            is_alive: AtomicBool::new(true),
            last_pong: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Payloads rejected because the queue was full or closed.
    pub fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }

    /// Mark the connection as alive (any inbound frame).
    pub fn mark_alive(&self) {
        self.is_alive.store(true, Ordering::Relaxed);
        *self.last_pong.lock() = Instant::now();
    }

    /// Duration since the last inbound frame (or connection establishment).
    pub fn last_pong_elapsed(&self) -> Duration {
        self.last_pong.lock().elapsed()
    }

    /// Check and reset the alive flag for heartbeat.
    ///
    /// Returns `true` if the connection was alive since the last check.
    pub fn check_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::Relaxed)
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

impl SendHandle for ClientConnection {
    fn send(&self, payload: Payload) -> Result<(), SendError> {
        self.tx.try_send(payload).map_err(|e| {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
            match e {
                TrySendError::Full(_) => SendError::QueueFull,
                TrySendError::Closed(_) => SendError::Closed,
            }
        })
    }
}
