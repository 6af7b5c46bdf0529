//! Subscriber setup.

use switchboard_settings::{LogFormat, LogLevel, LoggingSettings};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install the global subscriber. Call once at startup.
///
/// `RUST_LOG` wins over the configured level.
pub fn init(settings: &LoggingSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(settings)));

    let (text, json) = match settings.format {
        LogFormat::Text => (Some(fmt::layer().with_target(true)), None),
        LogFormat::Json => (
            None,
            Some(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_list(true),
            ),
        ),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(text)
        .with(json)
        .init();
}

/// Configured level for our crates. The WebRTC stack stays at `warn` unless
/// the level is stricter.
fn default_directives(settings: &LoggingSettings) -> String {
    let level = settings.level.as_filter_str();
    if settings.level == LogLevel::Error {
        level.to_string()
    } else {
        format!("{level},webrtc=warn,webrtc_ice=warn,webrtc_mdns=warn")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directives_follow_level() {
        let settings = LoggingSettings {
            level: LogLevel::Debug,
            format: LogFormat::Json,
        };
        assert_eq!(
            default_directives(&settings),
            "debug,webrtc=warn,webrtc_ice=warn,webrtc_mdns=warn"
        );
    }

    #[test]
    fn error_level_has_no_overrides() {
        let settings = LoggingSettings {
            level: LogLevel::Error,
            format: LogFormat::Text,
        };
        assert_eq!(default_directives(&settings), "error");
    }

    #[test]
    fn directives_parse() {
        let _ = EnvFilter::try_new(default_directives(&LoggingSettings::default())).unwrap();
    }
}
