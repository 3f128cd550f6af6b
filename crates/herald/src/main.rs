//! # herald
//!
//! Server binary: loads settings, initializes logging and metrics, and
//! serves the notification stream until Ctrl-C.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use herald_server::config::ServerConfig;
use herald_server::server::HeraldServer;
use herald_settings::HeraldSettings;

/// Server-sent event notification broadcaster.
#[derive(Parser, Debug)]
#[command(name = "herald", about = "Server-sent event notification broadcaster")]
struct Cli {
    /// Settings file (defaults to `~/.herald/settings.json`).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Log filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Load settings and apply CLI overrides on top.
    fn resolve_settings(&self) -> Result<HeraldSettings> {
        let path = self
            .config
            .clone()
            .unwrap_or_else(herald_settings::settings_path);
        let mut settings = herald_settings::load_settings_from_path(&path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?;
        self.apply_overrides(&mut settings);
        Ok(settings)
    }

    fn apply_overrides(&self, settings: &mut HeraldSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref level) = self.log_level {
            settings.logging.level.clone_from(level);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    let settings = args.resolve_settings()?;

    let _ = herald_core::init_subscriber(&settings.logging.level, settings.logging.format);

    let metrics = herald_server::metrics::install_recorder()
        .context("Failed to install metrics recorder")?;

    let config = ServerConfig::from(&settings.server);
    let server = HeraldServer::new(config, Some(metrics));
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;

    tracing::info!("herald listening on http://{addr}/sse/notifications");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    let _ = server
        .shutdown()
        .shutdown_and_wait(vec![handle], settings.server.shutdown_timeout())
        .await;

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_are_empty() {
        let cli = Cli::parse_from(["herald"]);
        assert!(cli.config.is_none());
        assert!(cli.host.is_none());
        assert!(cli.port.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn cli_overrides_settings() {
        let cli = Cli::parse_from([
            "herald",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--log-level",
            "debug",
        ]);
        let mut settings = HeraldSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn cli_without_flags_keeps_settings() {
        let cli = Cli::parse_from(["herald"]);
        let mut settings = HeraldSettings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.server.port, HeraldSettings::default().server.port);
    }

    #[test]
    fn cli_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["herald", "--port", "70000"]).is_err());
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let cli = Cli::parse_from(["herald", "--config", "/nonexistent/herald.json"]);
        let settings = cli.resolve_settings().unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
    }
}
