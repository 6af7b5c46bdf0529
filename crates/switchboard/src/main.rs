//! # switchboard
//!
//! Signaling relay binary. Loads layered settings, installs logging and the
//! Prometheus recorder, serves until Ctrl-C or SIGTERM, then drains sessions.

#![deny(unsafe_code)]

mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use switchboard_core::SessionRegistry;
use switchboard_server::{ServerConfig, SwitchboardServer, metrics};
use switchboard_settings::SwitchboardSettings;
use tracing::{Instrument, info, info_span};

/// WebRTC signaling relay.
#[derive(Parser, Debug)]
#[command(name = "switchboard", about = "WebRTC signaling relay")]
struct Cli {
    /// Settings file (default: `$SWITCHBOARD_CONFIG`, then `./switchboard.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    /// CLI flags sit above every settings layer.
    fn apply(&self, settings: &mut SwitchboardSettings) {
        if let Some(host) = &self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = switchboard_settings::load_settings(cli.config.as_deref())
        .context("Failed to load settings")?;
    cli.apply(&mut settings);

    logging::init(&settings.logging);

    let root = info_span!("switchboard", environment = %settings.environment);
    run(settings).instrument(root).await
}

async fn run(settings: SwitchboardSettings) -> Result<()> {
    let prometheus = metrics::install_recorder().context("Failed to install metrics recorder")?;

    let config = ServerConfig::from_settings(&settings);
    let shutdown_timeout = config.shutdown_timeout();
    let server = SwitchboardServer::new(config, Arc::new(SessionRegistry::new()), prometheus)
        .context("Failed to build server")?;

    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    info!("Switchboard listening on http://{addr}");

    shutdown_signal()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down...");
    server
        .shutdown()
        .graceful_shutdown(vec![handle], Some(shutdown_timeout))
        .await;

    info!("Shutdown complete");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use switchboard_server::metrics::detached_handle;

    #[test]
    fn cli_defaults_leave_settings_alone() {
        let cli = Cli::parse_from(["switchboard"]);
        assert!(cli.config.is_none());

        let mut settings = SwitchboardSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings, SwitchboardSettings::default());
    }

    #[test]
    fn cli_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("switchboard.json");
        std::fs::write(&path, r#"{"server": {"host": "10.0.0.1", "port": 4000, "sendQueue": 8}}"#)
            .unwrap();

        let cli = Cli::parse_from([
            "switchboard",
            "--config",
            path.to_str().unwrap(),
            "--port",
            "5000",
        ]);
        let mut settings = switchboard_settings::load_settings_with(
            cli.config.as_deref().unwrap(),
            |_| None,
        )
        .unwrap();
        cli.apply(&mut settings);

        assert_eq!(settings.server.host, "10.0.0.1");
        assert_eq!(settings.server.port, 5000);
        assert_eq!(settings.server.send_queue, 8);
    }

    #[test]
    fn cli_host_override() {
        let cli = Cli::parse_from(["switchboard", "--host", "127.0.0.1"]);
        let mut settings = SwitchboardSettings::default();
        cli.apply(&mut settings);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3001);
    }

    #[tokio::test]
    async fn server_graceful_shutdown() {
        let mut settings = SwitchboardSettings::default();
        settings.server.host = "127.0.0.1".into();
        settings.server.port = 0;

        let server = SwitchboardServer::new(
            ServerConfig::from_settings(&settings),
            Arc::new(SessionRegistry::new()),
            detached_handle(),
        )
        .unwrap();
        let (_, handle) = server.listen().await.unwrap();

        tokio::time::timeout(
            Duration::from_secs(5),
            server
                .shutdown()
                .graceful_shutdown(vec![handle], Some(Duration::from_secs(2))),
        )
        .await
        .expect("shutdown timed out");
        assert!(server.shutdown().is_shutting_down());
    }
}
