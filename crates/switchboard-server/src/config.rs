//! Server configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use switchboard_settings::SwitchboardSettings;

/// Configuration for the signaling server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Deployment name recorded on every request span.
    pub environment: String,
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Maximum concurrent WebSocket connections.
    pub max_connections: usize,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection.
    pub send_queue: usize,
    /// Heartbeat interval in seconds.
    pub heartbeat_interval_secs: u64,
    /// Heartbeat timeout in seconds (close after this long without a pong).
    pub heartbeat_timeout_secs: u64,
    /// How long shutdown waits for sessions to drain.
    pub shutdown_timeout_secs: u64,
    /// ICE server URLs for offer companion peers.
    pub ice_servers: Vec<String>,
    /// Lifetime cap for offer companion peers in seconds.
    pub peer_max_lifetime_secs: u64,
}

impl ServerConfig {
    /// Project loaded settings onto the server's view.
    pub fn from_settings(settings: &SwitchboardSettings) -> Self {
        let server = &settings.server;
        Self {
            environment: settings.environment.clone(),
            host: server.host.clone(),
            port: server.port,
            max_connections: server.max_connections,
            max_message_size: server.max_message_size,
            send_queue: server.send_queue,
            heartbeat_interval_secs: server.heartbeat_interval_secs,
            heartbeat_timeout_secs: server.heartbeat_timeout_secs,
            shutdown_timeout_secs: server.shutdown_timeout_secs,
            ice_servers: settings.webrtc.ice_servers.clone(),
            peer_max_lifetime_secs: settings.webrtc.peer_max_lifetime_secs,
        }
    }

    /// `host:port` for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Heartbeat interval.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }

    /// Heartbeat timeout.
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }

    /// Shutdown drain timeout.
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    /// Offer companion peer lifetime.
    pub fn peer_max_lifetime(&self) -> Duration {
        Duration::from_secs(self.peer_max_lifetime_secs)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            environment: "local".into(),
            host: "127.0.0.1".into(),
            port: 0,
            max_connections: 1024,
            max_message_size: 1024 * 1024,
            send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            shutdown_timeout_secs: 10,
            ice_servers: Vec::new(),
            peer_max_lifetime_secs: 600,
        }
    }
}
