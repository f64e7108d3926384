//! Defaults shared across crates.

/// Default capacity of the inbound payload queue.
pub const DEFAULT_INBOUND_CAPACITY: usize = 1000;

/// Default capacity of the outbound payload queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1000;

/// Default bind host for the WebSocket server.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port for the WebSocket server.
pub const DEFAULT_PORT: u16 = 8080;

/// Default route for the WebSocket upgrade.
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Default maximum size of a single WebSocket message (16 MiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Default graceful shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Prefix for generated connection IDs.
pub const CONNECTION_ID_PREFIX: &str = "conn_";
