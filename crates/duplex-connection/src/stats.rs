//! Per-connection counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time copy of a connection's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Payloads handed from the transport to the inbound queue.
    pub received: u64,
    /// Payloads written to the transport by the outbound pump.
    pub sent: u64,
    /// Payloads rejected by `try_send` because the outbound queue was full.
    pub dropped: u64,
    /// Shutdown transitions. Never more than one.
    pub shutdown_signals: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    received: AtomicU64,
    sent: AtomicU64,
    dropped: AtomicU64,
    shutdown_signals: AtomicU64,
}

impl Counters {
    pub(crate) fn record_received(&self) {
        let _ = self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_sent(&self) {
        let _ = self.sent.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dropped(&self) -> u64 {
        self.dropped.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn record_shutdown(&self) {
        let _ = self.shutdown_signals.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn snapshot(&self) -> ConnectionStats {
        ConnectionStats {
            received: self.received.load(Ordering::Relaxed),
            sent: self.sent.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            shutdown_signals: self.shutdown_signals.load(Ordering::SeqCst),
        }
    }
}
