//! Error types for connections and transports.
//!
//! Transport failures never reach application code directly. A pump that
//! hits a [`TransportError`] closes the connection, and every caller then
//! sees [`ConnectionError::Closed`].

use thiserror::Error;

/// Errors returned by the connection API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The connection has been shut down. Discard it.
    #[error("connection is closed")]
    Closed,

    /// The outbound queue had no room (non-blocking send only).
    #[error("outbound queue is full")]
    QueueFull,

    /// A connection was created outside a Tokio runtime.
    #[error("connection requires a running Tokio runtime")]
    NoRuntime,

    /// The connection configuration was rejected.
    #[error("invalid connection config: {0}")]
    InvalidConfig(String),
}

/// Errors raised by a transport while receiving or sending.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The remote side closed the connection.
    #[error("transport closed by peer")]
    PeerClosed,

    /// The transport was closed locally.
    #[error("transport closed")]
    Closed,

    /// Underlying I/O failure (reset, broken pipe, ...).
    #[error("transport I/O error: {0}")]
    Io(String),
}
