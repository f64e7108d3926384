//! # duplex-agent
//!
//! Duplex server binary: loads settings, initializes logging, serves the
//! WebSocket echo endpoint and shuts down gracefully on ctrl-c.

#![deny(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use duplex_core::logging::init_subscriber;
use duplex_server::{DuplexServer, ServerConfig};
use duplex_settings::{DuplexSettings, load_settings_from_path, settings_path};

/// Duplex WebSocket server.
#[derive(Parser, Debug)]
#[command(name = "duplex-agent", about = "Full-duplex WebSocket echo server")]
struct Cli {
    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// WebSocket route (overrides settings).
    #[arg(long)]
    path: Option<String>,

    /// Settings file (default `~/.duplex/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,
}

impl Cli {
    fn settings_file(&self) -> PathBuf {
        self.settings.clone().unwrap_or_else(settings_path)
    }

    /// Server config from settings with command-line overrides applied.
    fn server_config(&self, settings: &DuplexSettings) -> Result<ServerConfig> {
        let mut config = ServerConfig::from_settings(settings);
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(path) = &self.path {
            anyhow::ensure!(
                path.starts_with('/') && path != "/health",
                "invalid --path {path}: must start with '/' and not be /health"
            );
            config.path.clone_from(path);
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let settings_file = args.settings_file();
    let settings = load_settings_from_path(&settings_file)
        .with_context(|| format!("Failed to load settings from {}", settings_file.display()))?;

    init_subscriber(&settings.logging.level, settings.logging.format);

    let config = args.server_config(&settings)?;
    let server = DuplexServer::new(config);
    let (addr, handle) = server
        .listen()
        .await
        .with_context(|| format!("Failed to bind {}", server.config().bind_addr()))?;

    tracing::info!(
        %addr,
        path = %server.config().path,
        frame_kind = %server.config().frame_kind,
        "duplex agent ready"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;

    tracing::info!("Shutting down...");
    if !server.shutdown_gracefully(handle).await {
        tracing::warn!("some sessions did not finish before the shutdown timeout");
    }
    Ok(())
}
