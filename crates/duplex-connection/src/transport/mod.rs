//! Socket abstraction driven by the connection pumps.
//!
//! - [`Transport`]: the message socket a [`Connection`](crate::Connection) owns
//! - [`memory`]: in-process loopback transport for tests and demos

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use duplex_core::TransportError;

/// A message-oriented socket.
///
/// Each `receive`/`send` call moves exactly one discrete payload. The
/// connection calls `receive` only from its inbound pump and `send` only from
/// its outbound pump, so implementations see at most one of each in flight.
/// `close` may be called from any task, any number of times.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Wait for the next payload from the peer.
    async fn receive(&self) -> Result<Bytes, TransportError>;

    /// Transmit one payload to the peer.
    async fn send(&self, payload: Bytes) -> Result<(), TransportError>;

    /// Close the socket.
    ///
    /// Must be idempotent and must not block. Pending and later
    /// `receive`/`send` calls should fail once it returns. Underlying
    /// resources may stay allocated until the transport is dropped, which
    /// happens when the last [`Connection`](crate::Connection) clone goes away.
    fn close(&self);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn receive(&self) -> Result<Bytes, TransportError> {
        (**self).receive().await
    }

    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        (**self).send(payload).await
    }

    fn close(&self) {
        (**self).close();
    }
}
