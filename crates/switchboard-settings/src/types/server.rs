use serde::{Deserialize, Serialize};

/// Listener and connection settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Concurrent WebSocket connections before upgrades get 503.
    pub max_connections: usize,
    /// Largest accepted WebSocket message in bytes.
    pub max_message_size: usize,
    /// Outbound frames buffered per connection before sends fail.
    pub send_queue: usize,
    /// Seconds between server pings.
    pub heartbeat_interval_secs: u64,
    /// Seconds of silence before a connection is closed.
    pub heartbeat_timeout_secs: u64,
    /// Seconds to wait for sessions to drain on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3001,
            max_connections: 1024,
            max_message_size: 1024 * 1024,
            send_queue: 256,
            heartbeat_interval_secs: 30,
            heartbeat_timeout_secs: 90,
            shutdown_timeout_secs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 3001);
        assert_eq!(s.max_connections, 1024);
        assert_eq!(s.max_message_size, 1_048_576);
        assert_eq!(s.send_queue, 256);
        assert_eq!(s.heartbeat_interval_secs, 30);
        assert_eq!(s.heartbeat_timeout_secs, 90);
        assert_eq!(s.shutdown_timeout_secs, 10);
    }

    #[test]
    fn server_serde_camel_case() {
        let json = serde_json::to_value(ServerSettings::default()).unwrap();
        assert!(json.get("maxConnections").is_some());
        assert!(json.get("heartbeatIntervalSecs").is_some());
        assert!(json.get("shutdownTimeoutSecs").is_some());
    }
}
