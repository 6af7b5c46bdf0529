//! Prometheus metrics recorder and metric names.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the `PrometheusHandle` used to render `/metrics`. Call once at
/// startup before any metrics are recorded.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Handle backed by a recorder that is not installed globally.
///
/// Renders nothing useful; for servers built in tests.
pub fn detached_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

/// WebSocket connections that joined a room (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// WebSocket sessions that ended after joining (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Joined WebSocket sessions (gauge).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Connections refused at join time (counter, labels: reason).
pub const WS_JOIN_REJECTIONS_TOTAL: &str = "ws_join_rejections_total";
/// Session length in seconds (histogram).
pub const WS_CONNECTION_DURATION_SECONDS: &str = "ws_connection_duration_seconds";
/// Inbound frames handed to the relay (counter, labels: kind).
pub const SIGNAL_MESSAGES_TOTAL: &str = "signal_messages_total";
/// Successful per-participant deliveries (counter).
pub const SIGNAL_DELIVERIES_TOTAL: &str = "signal_deliveries_total";
/// Failed per-participant deliveries (counter).
pub const SIGNAL_DELIVERY_FAILURES_TOTAL: &str = "signal_delivery_failures_total";
/// Rooms created through the REST surface (counter).
pub const ROOMS_CREATED_TOTAL: &str = "rooms_created_total";
/// Offers answered (counter).
pub const WEBRTC_OFFERS_TOTAL: &str = "webrtc_offers_total";
/// Offers that failed (counter).
pub const WEBRTC_OFFER_FAILURES_TOTAL: &str = "webrtc_offer_failures_total";
