//! # duplex-connection
//!
//! Thread-safe, full-duplex wrapper around one message-oriented socket.
//!
//! A [`Connection`] owns a [`Transport`] and two bounded queues. Two
//! background pumps move payloads between the queues and the transport:
//!
//! - the inbound pump receives from the transport into the inbound queue
//! - the outbound pump drains the outbound queue into the transport
//!
//! Both pumps and every blocked [`Connection::send`] / [`Connection::read`]
//! race their work against one shared shutdown signal. Whoever closes the
//! connection first (application code or a pump hitting a transport error)
//! fires the signal exactly once, and everything else unblocks with
//! [`ConnectionError::Closed`].
//!
//! ```ignore
//! let conn = Connection::create(transport)?;
//! while let Ok(payload) = conn.read().await {
//!     if conn.send(payload).await.is_err() {
//!         break;
//!     }
//! }
//! conn.close();
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod latch;
mod pump;
pub mod stats;
pub mod transport;

pub use config::ConnectionConfig;
pub use connection::Connection;
pub use duplex_core::{ConnectionError, TransportError};
pub use latch::CloseReason;
pub use stats::ConnectionStats;
pub use transport::Transport;
pub use transport::memory::{MemoryPeer, MemoryTransport, memory_pair};
