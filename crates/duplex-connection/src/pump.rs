//! Background pumps moving payloads between the queues and the transport.
//!
//! Each pump is one loop racing useful work against the shutdown signal.
//! Every exit path (shutdown, transport error, queue gone, panic) runs the
//! [`CloseOnExit`] guard, which closes the whole connection.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::latch::{CloseReason, ShutdownLatch};
use crate::stats::Counters;

/// Closes the connection when dropped.
struct CloseOnExit {
    latch: Arc<ShutdownLatch>,
    reason: CloseReason,
}

impl CloseOnExit {
    fn new(latch: Arc<ShutdownLatch>, reason: CloseReason) -> Self {
        Self { latch, reason }
    }
}

impl Drop for CloseOnExit {
    fn drop(&mut self) {
        let _ = self.latch.close(self.reason);
    }
}

/// Transport → inbound queue.
pub(crate) async fn run_inbound(
    latch: Arc<ShutdownLatch>,
    inbound: mpsc::Sender<Bytes>,
    counters: Arc<Counters>,
) {
    let mut exit = CloseOnExit::new(Arc::clone(&latch), CloseReason::ReceiveFailed);
    let shutdown = latch.signal().clone();
    let transport = Arc::clone(latch.transport());

    loop {
        let received = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            received = transport.receive() => received,
        };

        let payload = match received {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, "receive failed");
                exit.reason = CloseReason::from_receive_error(&err);
                break;
            }
        };

        let len = payload.len();
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                trace!(len, "discarding payload received during shutdown");
                break;
            }
            queued = inbound.send(payload) => {
                if queued.is_err() {
                    exit.reason = CloseReason::Dropped;
                    break;
                }
                counters.record_received();
                trace!(len, "payload queued for read");
            }
        }
    }

    debug!("inbound pump exited");
}

/// Outbound queue → transport.
pub(crate) async fn run_outbound(
    latch: Arc<ShutdownLatch>,
    mut outbound: mpsc::Receiver<Bytes>,
    counters: Arc<Counters>,
) {
    let mut exit = CloseOnExit::new(Arc::clone(&latch), CloseReason::SendFailed);
    let shutdown = latch.signal().clone();
    let transport = Arc::clone(latch.transport());

    loop {
        let payload = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            next = outbound.recv() => match next {
                Some(payload) => payload,
                None => {
                    exit.reason = CloseReason::Dropped;
                    break;
                }
            },
        };

        let len = payload.len();
        let sent = tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            sent = transport.send(payload) => sent,
        };

        if let Err(err) = sent {
            debug!(error = %err, len, "send failed");
            exit.reason = CloseReason::from_send_error(&err);
            break;
        }
        counters.record_sent();
        trace!(len, "payload sent");
    }

    debug!("outbound pump exited");
}
