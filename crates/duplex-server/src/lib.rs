//! # duplex-server
//!
//! Axum HTTP + WebSocket server built on `duplex-connection`.
//!
//! - `GET /health` reports status, uptime and the open connection count
//! - `GET <path>` (default `/ws`) upgrades to a WebSocket, wraps it in a
//!   [`Connection`](duplex_connection::Connection) over a [`WsTransport`]
//!   and echoes every payload back until either side closes
//!
//! [`DuplexServer::shutdown_gracefully`] stops the listener, closes every
//! connection and waits (bounded) for the sessions to finish.

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod registry;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use registry::ConnectionRegistry;
pub use server::{AppState, DuplexServer};
pub use shutdown::ShutdownCoordinator;
pub use websocket::{SessionContext, WsTransport, run_echo_session};
