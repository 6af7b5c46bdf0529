//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a settings
//! file may specify any subset of fields. Missing fields keep their compiled
//! default.

mod logging;
mod server;
mod webrtc;

pub use logging::*;
pub use server::*;
pub use webrtc::*;

use serde::{Deserialize, Serialize};

/// Root settings type for the relay.
///
/// ```json
/// {
///   "environment": "staging",
///   "server": { "port": 3002, "heartbeatIntervalSecs": 15 },
///   "logging": { "level": "debug", "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SwitchboardSettings {
    /// Deployment name attached to every log line.
    pub environment: String,
    /// Listener, limits and connection lifecycle.
    pub server: ServerSettings,
    /// Log filtering and output format.
    pub logging: LoggingSettings,
    /// Offer companion peer connections.
    pub webrtc: WebRtcSettings,
}

impl Default for SwitchboardSettings {
    fn default() -> Self {
        Self {
            environment: "local".to_string(),
            server: ServerSettings::default(),
            logging: LoggingSettings::default(),
            webrtc: WebRtcSettings::default(),
        }
    }
}
