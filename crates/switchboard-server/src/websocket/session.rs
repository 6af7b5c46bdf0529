//! WebSocket session lifecycle: one connected participant from upgrade
//! through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, Utf8Bytes, WebSocket, close_code};
use bytes::Bytes;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use metrics::{counter, gauge, histogram};
use switchboard_core::{FrameKind, Payload, RegistryError, SessionRegistry, SharedHandle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, instrument, warn};

use super::connection::ClientConnection;
use super::heartbeat::{HeartbeatResult, run_heartbeat};
use crate::config::ServerConfig;
use crate::metrics as names;

/// How long the writer gets to flush its Close frame at session end.
const WRITER_DRAIN: Duration = Duration::from_secs(2);

/// Run a WebSocket session for one participant.
///
/// 1. Joins the room; on failure writes `Error joining room: <reason>`, closes
///    and returns
/// 2. Relays every inbound Text/Binary frame to the rest of the room
/// 3. Forwards relayed payloads and periodic Pings through the writer task
/// 4. Ends on Close, socket error, heartbeat timeout or server shutdown
/// 5. Leaves the room, unless the entry was since replaced
#[instrument(skip_all, fields(room_id = %room_id, participant_id = %participant_id))]
pub async fn run_ws_session(
    ws: WebSocket,
    room_id: String,
    participant_id: String,
    registry: Arc<SessionRegistry>,
    config: Arc<ServerConfig>,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, send_rx) = mpsc::channel::<Payload>(config.send_queue.max(1));
    let connection = Arc::new(ClientConnection::new(
        room_id.clone(),
        participant_id.clone(),
        send_tx,
    ));

    let handle: SharedHandle = connection.clone();

    if let Err(err) = registry.join_room(&room_id, participant_id.clone(), handle.clone()) {
        warn!(error = %err, "join rejected");
        counter!(names::WS_JOIN_REJECTIONS_TOTAL, "reason" => rejection_reason(&err)).increment(1);
        let _ = ws_tx
            .send(Message::Text(format!("Error joining room: {err}").into()))
            .await;
        let _ = ws_tx.send(Message::Close(None)).await;
        return;
    }

    info!("participant connected");
    counter!(names::WS_CONNECTIONS_TOTAL).increment(1);
    gauge!(names::WS_CONNECTIONS_ACTIVE).increment(1.0);

    let session = shutdown.child_token();

    let heartbeat = tokio::spawn({
        let connection = connection.clone();
        let session = session.clone();
        let interval = config.heartbeat_interval();
        let timeout = config.heartbeat_timeout();
        async move {
            if run_heartbeat(connection.clone(), interval, timeout, session.clone()).await
                == HeartbeatResult::TimedOut
            {
                warn!(
                    silent_for = ?connection.last_pong_elapsed(),
                    "heartbeat timed out, closing"
                );
                session.cancel();
            }
        }
        .in_current_span()
    });

    let writer = tokio::spawn(
        run_writer(ws_tx, send_rx, config.heartbeat_interval(), session.clone()).in_current_span(),
    );

    loop {
        let msg = tokio::select! {
            () = session.cancelled() => break,
            msg = ws_rx.next() => msg,
        };
        let payload = match msg {
            Some(Ok(frame @ Message::Text(_))) => text_payload(frame.into_data()),
            Some(Ok(Message::Binary(data))) => Payload::binary(data),
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                connection.mark_alive();
                continue;
            }
            Some(Ok(Message::Close(_))) => {
                debug!("client sent close frame");
                break;
            }
            Some(Err(err)) => {
                debug!(error = %err, "socket read failed");
                break;
            }
            None => break,
        };
        connection.mark_alive();
        relay(&registry, &room_id, &participant_id, payload);
    }

    session.cancel();
    match registry.leave_if_handle(&room_id, &participant_id, &handle) {
        Ok(true) => {}
        Ok(false) => debug!("participant id taken by a newer entry, leaving it in place"),
        Err(RegistryError::ParticipantNotInRoom { .. }) => {
            debug!("entry already removed");
        }
        Err(err) => warn!(error = %err, "leave failed"),
    }
    let _ = heartbeat.await;
    if tokio::time::timeout(WRITER_DRAIN, writer).await.is_err() {
        debug!("writer did not drain in time");
    }

    info!(dropped = connection.drop_count(), "participant disconnected");
    counter!(names::WS_DISCONNECTIONS_TOTAL).increment(1);
    gauge!(names::WS_CONNECTIONS_ACTIVE).decrement(1.0);
    histogram!(names::WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

/// Hand one inbound payload to the registry and record the outcome.
fn relay(registry: &SessionRegistry, room_id: &str, sender_id: &str, payload: Payload) {
    let kind = match payload.kind() {
        FrameKind::Text => "text",
        FrameKind::Binary => "binary",
    };
    let len = payload.len();
    counter!(names::SIGNAL_MESSAGES_TOTAL, "kind" => kind).increment(1);

    match registry.signal_message(room_id, sender_id, payload) {
        Ok(delivered) => {
            debug!(kind, len, delivered, "relayed");
            counter!(names::SIGNAL_DELIVERIES_TOTAL).increment(delivered as u64);
        }
        Err(RegistryError::Delivery(failure)) => {
            warn!(error = %failure, "relay partially failed");
            counter!(names::SIGNAL_DELIVERIES_TOTAL).increment(failure.delivered as u64);
            counter!(names::SIGNAL_DELIVERY_FAILURES_TOTAL)
                .increment(failure.failures.len() as u64);
        }
        Err(err) => warn!(error = %err, "relay failed"),
    }
}

/// Forward queued payloads and periodic Pings to the socket.
///
/// Sends a Close frame once `session` is cancelled.
async fn run_writer(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut send_rx: mpsc::Receiver<Payload>,
    ping_every: Duration,
    session: CancellationToken,
) {
    let mut ping_interval = tokio::time::interval(ping_every);
    // Skip the immediate first tick
    let _ = ping_interval.tick().await;

    loop {
        tokio::select! {
            payload = send_rx.recv() => {
                let Some(payload) = payload else { break };
                if ws_tx.send(to_message(payload)).await.is_err() {
                    session.cancel();
                    return;
                }
            }
            _ = ping_interval.tick() => {
                if ws_tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    session.cancel();
                    return;
                }
            }
            () = session.cancelled() => break,
        }
    }

    let close = CloseFrame {
        code: close_code::NORMAL,
        reason: Utf8Bytes::from_static(""),
    };
    let _ = ws_tx.send(Message::Close(Some(close))).await;
    let _ = ws_tx.close().await;
}

/// Inbound text frame bytes as a payload, sharing the frame's buffer.
fn text_payload(data: Bytes) -> Payload {
    Payload::text_bytes(data.clone()).unwrap_or_else(|_| Payload::binary(data))
}

/// Outbound frame with the same kind the payload arrived in.
fn to_message(payload: Payload) -> Message {
    let (kind, data) = payload.into_parts();
    match kind {
        FrameKind::Text => match String::from_utf8(data.to_vec()) {
            Ok(text) => Message::Text(text.into()),
            Err(_) => Message::Binary(data),
        },
        FrameKind::Binary => Message::Binary(data),
    }
}

fn rejection_reason(err: &RegistryError) -> &'static str {
    match err {
        RegistryError::RoomNotFound { .. } => "room_not_found",
        RegistryError::ParticipantAlreadyInRoom { .. } => "duplicate_participant",
        _ => "other",
    }
}
