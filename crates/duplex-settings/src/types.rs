//! Settings type definitions.
//!
//! All types use camelCase JSON keys and `#[serde(default)]`, so a partial
//! settings file only needs the keys it changes.

use std::fmt;
use std::str::FromStr;

use duplex_core::constants::{
    DEFAULT_HOST, DEFAULT_INBOUND_CAPACITY, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_OUTBOUND_CAPACITY,
    DEFAULT_PORT, DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_WS_PATH,
};
use duplex_core::logging::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000, "frameKind": "binary" },
///   "connection": { "outboundCapacity": 256 },
///   "logging": { "format": "json" }
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DuplexSettings {
    /// Listener and WebSocket settings.
    pub server: ServerSettings,
    /// Per-connection queue sizes.
    pub connection: ConnectionSettings,
    /// Log level and output format.
    pub logging: LoggingSettings,
}

impl DuplexSettings {
    /// Reject values the server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if !self.server.path.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "server.path must start with '/': {}",
                self.server.path
            )));
        }
        if self.server.path == "/health" {
            return Err(SettingsError::InvalidValue(
                "server.path conflicts with the /health route".into(),
            ));
        }
        if self.server.max_message_size == 0 {
            return Err(SettingsError::InvalidValue(
                "server.maxMessageSize must be greater than zero".into(),
            ));
        }
        if self.connection.inbound_capacity == 0 || self.connection.outbound_capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "connection capacities must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Frame type used for outgoing WebSocket messages.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameKind {
    /// Text frames; payloads that are not UTF-8 still go out as binary.
    #[default]
    Text,
    /// Binary frames for every payload.
    Binary,
}

impl FrameKind {
    /// Lowercase name as used in settings and env vars.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for FrameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            other => Err(format!("unknown frame kind: {other}")),
        }
    }
}

/// Listener and WebSocket settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Listen port. `0` picks a free port.
    pub port: u16,
    /// Route that accepts WebSocket upgrades.
    pub path: String,
    /// Largest accepted WebSocket message, in bytes.
    pub max_message_size: usize,
    /// Frame type for outgoing messages.
    pub frame_kind: FrameKind,
    /// Seconds to wait for sessions to finish on shutdown.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            path: DEFAULT_WS_PATH.to_string(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            frame_kind: FrameKind::default(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

/// Per-connection queue sizes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// Inbound queue capacity.
    pub inbound_capacity: usize,
    /// Outbound queue capacity.
    pub outbound_capacity: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

/// Log level and output format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Compact text or JSON lines.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}
