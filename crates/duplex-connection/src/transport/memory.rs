//! In-process loopback transport.
//!
//! [`memory_pair`] returns a [`MemoryTransport`] to hand to a connection and
//! the [`MemoryPeer`] that plays the remote side: it delivers payloads (or
//! receive errors) to the transport and observes what the transport sends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use duplex_core::TransportError;
use parking_lot::Mutex as SyncMutex;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

use super::Transport;

/// Create a connected transport/peer pair.
///
/// `capacity` bounds both directions. With the peer not draining
/// [`MemoryPeer::next_sent`], at most `capacity` payloads are accepted by
/// [`MemoryTransport::send`] before it blocks.
pub fn memory_pair(capacity: usize) -> (MemoryTransport, MemoryPeer) {
    let capacity = capacity.max(1);
    let (to_transport, incoming) = mpsc::channel(capacity);
    let (outgoing, from_transport) = mpsc::channel(capacity);
    let closed = CancellationToken::new();
    let close_calls = Arc::new(AtomicUsize::new(0));
    let send_failure = Arc::new(SyncMutex::new(None));

    let transport = MemoryTransport {
        incoming: Mutex::new(incoming),
        outgoing,
        closed: closed.clone(),
        close_calls: Arc::clone(&close_calls),
        send_failure: Arc::clone(&send_failure),
    };
    let peer = MemoryPeer {
        to_transport: Some(to_transport),
        from_transport,
        closed,
        close_calls,
        send_failure,
    };
    (transport, peer)
}

/// The local end of a loopback pair.
pub struct MemoryTransport {
    incoming: Mutex<mpsc::Receiver<Result<Bytes, TransportError>>>,
    outgoing: mpsc::Sender<Bytes>,
    closed: CancellationToken,
    close_calls: Arc<AtomicUsize>,
    send_failure: Arc<SyncMutex<Option<TransportError>>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn receive(&self) -> Result<Bytes, TransportError> {
        let mut incoming = tokio::select! {
            biased;
            () = self.closed.cancelled() => return Err(TransportError::Closed),
            guard = self.incoming.lock() => guard,
        };
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(TransportError::Closed),
            item = incoming.recv() => item.unwrap_or(Err(TransportError::PeerClosed)),
        }
    }

    async fn send(&self, payload: Bytes) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        if let Some(err) = self.send_failure.lock().clone() {
            return Err(err);
        }
        tokio::select! {
            biased;
            () = self.closed.cancelled() => Err(TransportError::Closed),
            sent = self.outgoing.send(payload) => sent.map_err(|_| TransportError::PeerClosed),
        }
    }

    fn close(&self) {
        let _ = self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.cancel();
    }
}

/// The remote end of a loopback pair.
pub struct MemoryPeer {
    to_transport: Option<mpsc::Sender<Result<Bytes, TransportError>>>,
    from_transport: mpsc::Receiver<Bytes>,
    closed: CancellationToken,
    close_calls: Arc<AtomicUsize>,
    send_failure: Arc<SyncMutex<Option<TransportError>>>,
}

impl MemoryPeer {
    /// Deliver a payload for the transport to receive.
    ///
    /// Returns `false` once the transport is gone or the peer disconnected.
    pub async fn deliver(&self, payload: impl Into<Bytes>) -> bool {
        self.push(Ok(payload.into())).await
    }

    /// Make the transport's next `receive` fail with `err`.
    pub async fn fail(&self, err: TransportError) -> bool {
        self.push(Err(err)).await
    }

    /// Make every later `send` on the transport fail with `err`.
    pub fn fail_sends(&self, err: TransportError) {
        *self.send_failure.lock() = Some(err);
    }

    async fn push(&self, item: Result<Bytes, TransportError>) -> bool {
        match &self.to_transport {
            Some(tx) => tx.send(item).await.is_ok(),
            None => false,
        }
    }

    /// Hang up: once queued items are drained, `receive` reports
    /// [`TransportError::PeerClosed`].
    pub fn disconnect(&mut self) {
        self.to_transport = None;
    }

    /// Wait for the next payload the transport sent.
    ///
    /// Returns `None` once the transport is dropped and everything sent has
    /// been drained.
    pub async fn next_sent(&mut self) -> Option<Bytes> {
        self.from_transport.recv().await
    }

    /// Take a sent payload without waiting.
    pub fn try_next_sent(&mut self) -> Option<Bytes> {
        self.from_transport.try_recv().ok()
    }

    /// How many times `close` was called on the transport.
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// Whether the transport has been closed locally.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}
