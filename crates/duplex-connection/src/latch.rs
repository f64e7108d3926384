//! One-shot shutdown latch shared by a connection and its pumps.
//!
//! The latch pairs the connection-wide shutdown signal (a
//! [`CancellationToken`]) with a mutex-guarded close state. Closing always
//! closes the transport first, then flips the state and fires the signal
//! under the lock, so the signal fires exactly once however many tasks race
//! to close.

use std::fmt;
use std::sync::Arc;

use duplex_core::TransportError;
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::stats::Counters;
use crate::transport::Transport;

/// Why a connection was shut down. The first close wins.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// Application code called `close`.
    Local,
    /// Every application handle was dropped.
    Dropped,
    /// The peer closed the socket.
    PeerClosed,
    /// Receiving from the transport failed.
    ReceiveFailed,
    /// Sending on the transport failed.
    SendFailed,
}

impl CloseReason {
    /// Snake-case name used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Dropped => "dropped",
            Self::PeerClosed => "peer_closed",
            Self::ReceiveFailed => "receive_failed",
            Self::SendFailed => "send_failed",
        }
    }

    /// Whether the connection ended because of a transport failure.
    pub fn is_failure(self) -> bool {
        matches!(self, Self::ReceiveFailed | Self::SendFailed)
    }

    /// Classify a receive error.
    pub fn from_receive_error(err: &TransportError) -> Self {
        match err {
            TransportError::PeerClosed => Self::PeerClosed,
            TransportError::Closed => Self::Local,
            TransportError::Io(_) => Self::ReceiveFailed,
        }
    }

    /// Classify a send error.
    pub fn from_send_error(err: &TransportError) -> Self {
        match err {
            TransportError::PeerClosed => Self::PeerClosed,
            TransportError::Closed => Self::Local,
            TransportError::Io(_) => Self::SendFailed,
        }
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Close state plus the shutdown signal.
pub(crate) struct ShutdownLatch {
    connection_id: String,
    transport: Arc<dyn Transport>,
    state: Mutex<Option<CloseReason>>,
    signal: CancellationToken,
    counters: Arc<Counters>,
}

impl ShutdownLatch {
    pub(crate) fn new(
        connection_id: String,
        transport: Arc<dyn Transport>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            connection_id,
            transport,
            state: Mutex::new(None),
            signal: CancellationToken::new(),
            counters,
        }
    }

    /// Close the transport and fire the signal if nobody has yet.
    ///
    /// Returns `true` for the single caller that performed the transition.
    pub(crate) fn close(&self, reason: CloseReason) -> bool {
        self.transport.close();

        {
            let mut state = self.state.lock();
            if state.is_some() {
                return false;
            }
            *state = Some(reason);
            self.signal.cancel();
        }

        self.counters.record_shutdown();
        if reason.is_failure() {
            info!(connection_id = %self.connection_id, reason = reason.as_str(), "connection closed after transport failure");
        } else {
            debug!(connection_id = %self.connection_id, reason = reason.as_str(), "connection closed");
        }
        true
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.signal.is_cancelled()
    }

    pub(crate) fn reason(&self) -> Option<CloseReason> {
        *self.state.lock()
    }

    pub(crate) fn signal(&self) -> &CancellationToken {
        &self.signal
    }

    pub(crate) fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::memory::memory_pair;

    fn make_latch() -> (Arc<ShutdownLatch>, crate::MemoryPeer, Arc<Counters>) {
        let (transport, peer) = memory_pair(4);
        let counters = Arc::new(Counters::default());
        let latch = ShutdownLatch::new("conn_test".into(), Arc::new(transport), Arc::clone(&counters));
        (Arc::new(latch), peer, counters)
    }

    #[test]
    fn starts_open() {
        let (latch, peer, _) = make_latch();
        assert!(!latch.is_closed());
        assert!(latch.reason().is_none());
        assert_eq!(peer.close_calls(), 0);
    }

    #[test]
    fn first_close_wins() {
        let (latch, _peer, counters) = make_latch();
        assert!(latch.close(CloseReason::PeerClosed));
        assert!(!latch.close(CloseReason::Local));
        assert_eq!(latch.reason(), Some(CloseReason::PeerClosed));
        assert_eq!(counters.snapshot().shutdown_signals, 1);
    }

    #[test]
    fn every_close_reaches_transport() {
        let (latch, peer, _) = make_latch();
        let _ = latch.close(CloseReason::Local);
        let _ = latch.close(CloseReason::Local);
        assert_eq!(peer.close_calls(), 2);
        assert!(peer.is_closed());
    }

    #[test]
    fn concurrent_closes_fire_once() {
        let (latch, peer, counters) = make_latch();
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let latch = Arc::clone(&latch);
                std::thread::spawn(move || latch.close(CloseReason::Local))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(counters.snapshot().shutdown_signals, 1);
        assert_eq!(peer.close_calls(), 16);
    }

    #[tokio::test]
    async fn signal_wakes_waiters() {
        let (latch, _peer, _) = make_latch();
        let token = latch.signal().clone();
        let waiter = tokio::spawn(async move { token.cancelled().await });
        let _ = latch.close(CloseReason::Local);
        waiter.await.unwrap();
    }

    #[test]
    fn reason_classification() {
        assert_eq!(
            CloseReason::from_receive_error(&TransportError::PeerClosed),
            CloseReason::PeerClosed
        );
        assert_eq!(
            CloseReason::from_receive_error(&TransportError::Io("reset".into())),
            CloseReason::ReceiveFailed
        );
        assert_eq!(
            CloseReason::from_send_error(&TransportError::Io("broken pipe".into())),
            CloseReason::SendFailed
        );
        assert_eq!(
            CloseReason::from_send_error(&TransportError::Closed),
            CloseReason::Local
        );
        assert!(CloseReason::SendFailed.is_failure());
        assert!(!CloseReason::Dropped.is_failure());
    }

    #[test]
    fn reason_serializes_snake_case() {
        let json = serde_json::to_string(&CloseReason::PeerClosed).unwrap();
        assert_eq!(json, "\"peer_closed\"");
        assert_eq!(CloseReason::ReceiveFailed.to_string(), "receive_failed");
    }
}
