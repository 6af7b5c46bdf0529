use serde::{Deserialize, Serialize};

/// Offer companion settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebRtcSettings {
    /// STUN/TURN URLs handed to every peer connection.
    pub ice_servers: Vec<String>,
    /// Seconds an answered peer connection may live before it is closed.
    pub peer_max_lifetime_secs: u64,
}

impl Default for WebRtcSettings {
    fn default() -> Self {
        Self {
            ice_servers: Vec::new(),
            peer_max_lifetime_secs: 600,
        }
    }
}
