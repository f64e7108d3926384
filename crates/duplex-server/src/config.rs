//! Server configuration.

use std::time::Duration;

use duplex_connection::ConnectionConfig;
use duplex_core::constants::{DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_WS_PATH};
use duplex_settings::{DuplexSettings, FrameKind};
use serde::{Deserialize, Serialize};

/// Configuration for the duplex server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Route that accepts WebSocket upgrades.
    pub path: String,
    /// Max WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Frame type for outgoing messages.
    pub frame_kind: FrameKind,
    /// Seconds to wait for sessions to finish on shutdown.
    pub shutdown_timeout_secs: u64,
    /// Queue capacities for each accepted connection.
    pub connection: ConnectionConfig,
}

/// Loopback with an OS-assigned port, for tests and embedding. The binary
/// goes through [`ServerConfig::from_settings`] and binds `0.0.0.0:8080` by
/// default.
impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            path: DEFAULT_WS_PATH.into(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            frame_kind: FrameKind::Text,
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            connection: ConnectionConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Build from loaded settings.
    pub fn from_settings(settings: &DuplexSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            path: settings.server.path.clone(),
            max_message_size: settings.server.max_message_size,
            frame_kind: settings.server.frame_kind,
            shutdown_timeout_secs: settings.server.shutdown_timeout_secs,
            connection: ConnectionConfig {
                inbound_capacity: settings.connection.inbound_capacity,
                outbound_capacity: settings.connection.outbound_capacity,
            },
        }
    }

    /// `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Shutdown timeout as a [`Duration`].
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_loopback_auto_port() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.host, "127.0.0.1");
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.path, "/ws");
        assert_eq!(cfg.bind_addr(), "127.0.0.1:0");
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn from_settings_copies_every_field() {
        let mut settings = DuplexSettings::default();
        settings.server.host = "10.0.0.2".into();
        settings.server.port = 9100;
        settings.server.path = "/socket".into();
        settings.server.max_message_size = 2048;
        settings.server.frame_kind = FrameKind::Binary;
        settings.server.shutdown_timeout_secs = 5;
        settings.connection.inbound_capacity = 8;
        settings.connection.outbound_capacity = 16;

        let cfg = ServerConfig::from_settings(&settings);
        assert_eq!(cfg.bind_addr(), "10.0.0.2:9100");
        assert_eq!(cfg.path, "/socket");
        assert_eq!(cfg.max_message_size, 2048);
        assert_eq!(cfg.frame_kind, FrameKind::Binary);
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.connection.inbound_capacity, 8);
        assert_eq!(cfg.connection.outbound_capacity, 16);
    }

    #[test]
    fn settings_defaults_listen_on_all_interfaces() {
        let cfg = ServerConfig::from_settings(&DuplexSettings::default());
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
    }
}
