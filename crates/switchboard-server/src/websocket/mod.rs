//! WebSocket upgrade, connection state, heartbeat and the per-participant
//! session loop.

pub mod connection;
pub mod heartbeat;
pub mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{Instrument, Span, warn};

use crate::server::AppState;

/// GET `/ws/{room_id}/{participant_id}`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Path((room_id, participant_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Response {
    let Some(slot) = ConnectionSlot::acquire(&state.connections, state.config.max_connections)
    else {
        warn!(%room_id, %participant_id, "connection limit reached, refusing upgrade");
        return (StatusCode::SERVICE_UNAVAILABLE, "connection limit reached").into_response();
    };

    let max = state.config.max_message_size;
    let registry = state.registry.clone();
    let config = state.config.clone();
    let token = state.shutdown.token();
    let shutdown = state.shutdown.clone();
    let span = Span::current();

    ws.max_message_size(max)
        .max_frame_size(max)
        .on_upgrade(move |socket| {
            async move {
                let _slot = slot;
                shutdown
                    .track(session::run_ws_session(
                        socket,
                        room_id,
                        participant_id,
                        registry,
                        config,
                        token,
                    ))
                    .await;
            }
            .instrument(span)
        })
}

/// One counted WebSocket connection. Released on drop.
pub struct ConnectionSlot {
    counter: Arc<AtomicUsize>,
}

impl ConnectionSlot {
    /// Take a slot if fewer than `max` are held.
    pub fn acquire(counter: &Arc<AtomicUsize>, max: usize) -> Option<Self> {
        counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .ok()
            .map(|_| Self {
                counter: Arc::clone(counter),
            })
    }
}

impl Drop for ConnectionSlot {
    fn drop(&mut self) {
        let _ = self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}
