//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`SwitchboardSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply `SWITCHBOARD_*` environment overrides
//! 4. Validate cross-field constraints
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, LogLevel, SwitchboardSettings};

/// Environment variable naming the settings file.
pub const CONFIG_ENV: &str = "SWITCHBOARD_CONFIG";

/// Smallest accepted `server.maxMessageSize`, in bytes.
pub const MIN_MESSAGE_SIZE: usize = 1024;

/// Settings file used when neither a flag nor [`CONFIG_ENV`] names one.
pub const DEFAULT_CONFIG_FILE: &str = "switchboard.json";

/// Resolve the settings file path.
///
/// An explicit path wins, then [`CONFIG_ENV`], then `./switchboard.json`.
pub fn settings_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    std::env::var(CONFIG_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
}

/// Load settings from the resolved path with env var overrides.
pub fn load_settings(explicit: Option<&Path>) -> Result<SwitchboardSettings> {
    load_settings_from_path(&settings_path(explicit))
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults (plus overrides). If the file
/// contains invalid JSON, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<SwitchboardSettings> {
    load_settings_with(path, |key| std::env::var(key).ok())
}

/// Load settings from `path`, reading overrides through `lookup`.
pub fn load_settings_with(
    path: &Path,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<SwitchboardSettings> {
    let defaults = serde_json::to_value(SwitchboardSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: SwitchboardSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, lookup);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides read through `lookup`.
///
/// Values are parsed strictly. Unset or empty variables are skipped; invalid
/// ones are ignored with a warning and the file/default value stays.
pub fn apply_overrides(settings: &mut SwitchboardSettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = Overrides { lookup };

    if let Some(v) = env.string("SWITCHBOARD_ENVIRONMENT") {
        settings.environment = v;
    }

    // ── Server ──────────────────────────────────────────────────────
    let server = &mut settings.server;
    if let Some(v) = env.string("SWITCHBOARD_HOST") {
        server.host = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_PORT", |s| parse_u16_range(s, 1, 65535)) {
        server.port = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_MAX_CONNECTIONS", |s| {
        parse_usize_range(s, 1, 1_000_000)
    }) {
        server.max_connections = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_MAX_MESSAGE_SIZE", |s| {
        parse_usize_range(s, MIN_MESSAGE_SIZE, 64 * 1024 * 1024)
    }) {
        server.max_message_size = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_SEND_QUEUE", |s| {
        parse_usize_range(s, 1, 65_536)
    }) {
        server.send_queue = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_HEARTBEAT_INTERVAL_SECS", |s| {
        parse_u64_range(s, 1, 3600)
    }) {
        server.heartbeat_interval_secs = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_HEARTBEAT_TIMEOUT_SECS", |s| {
        parse_u64_range(s, 1, 86_400)
    }) {
        server.heartbeat_timeout_secs = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_SHUTDOWN_TIMEOUT_SECS", |s| {
        parse_u64_range(s, 0, 3600)
    }) {
        server.shutdown_timeout_secs = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.parsed("SWITCHBOARD_LOG_LEVEL", LogLevel::parse) {
        settings.logging.level = v;
    }
    if let Some(v) = env.parsed("SWITCHBOARD_LOG_FORMAT", LogFormat::parse) {
        settings.logging.format = v;
    }

    // ── WebRTC ──────────────────────────────────────────────────────
    if let Some(v) = env.string("SWITCHBOARD_ICE_SERVERS") {
        settings.webrtc.ice_servers = parse_list(&v);
    }
    if let Some(v) = env.parsed("SWITCHBOARD_PEER_MAX_LIFETIME_SECS", |s| {
        parse_u64_range(s, 1, 86_400)
    }) {
        settings.webrtc.peer_max_lifetime_secs = v;
    }
}

/// Check the merged settings.
///
/// Applies the same lower bounds as the environment parsers, so a settings
/// file cannot configure a server that refuses every connection.
pub fn validate(settings: &SwitchboardSettings) -> Result<()> {
    let server = &settings.server;
    at_least("server.maxConnections", server.max_connections, 1)?;
    at_least("server.maxMessageSize", server.max_message_size, MIN_MESSAGE_SIZE)?;
    at_least("server.sendQueue", server.send_queue, 1)?;
    at_least("server.heartbeatIntervalSecs", server.heartbeat_interval_secs, 1)?;
    at_least(
        "webrtc.peerMaxLifetimeSecs",
        settings.webrtc.peer_max_lifetime_secs,
        1,
    )?;
    if server.heartbeat_timeout_secs < server.heartbeat_interval_secs {
        return Err(SettingsError::InvalidValue(format!(
            "server.heartbeatTimeoutSecs ({}) is shorter than heartbeatIntervalSecs ({})",
            server.heartbeat_timeout_secs, server.heartbeat_interval_secs
        )));
    }
    Ok(())
}

fn at_least<T: PartialOrd + std::fmt::Display>(field: &str, value: T, min: T) -> Result<()> {
    if value < min {
        return Err(SettingsError::InvalidValue(format!(
            "{field} must be at least {min}, got {value}"
        )));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Split a comma-separated list, trimming entries and dropping empty ones.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

// ── Override readers (thin wrappers) ────────────────────────────────────────

struct Overrides<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Overrides<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl Fn(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}
