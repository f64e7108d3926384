//! The full-duplex [`Connection`].

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use duplex_core::ConnectionError;
use duplex_core::constants::CONNECTION_ID_PREFIX;
use tokio::runtime::Handle;
use tokio::sync::{Mutex, mpsc};
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::config::ConnectionConfig;
use crate::latch::{CloseReason, ShutdownLatch};
use crate::pump;
use crate::stats::{ConnectionStats, Counters};
use crate::transport::Transport;

/// A full-duplex message connection over one [`Transport`].
///
/// Cheap to clone; all clones share the same queues and shutdown signal.
/// Dropping the last clone closes the connection with
/// [`CloseReason::Dropped`].
#[derive(Clone)]
pub struct Connection {
    shared: Arc<Shared>,
}

struct Shared {
    id: String,
    config: ConnectionConfig,
    latch: Arc<ShutdownLatch>,
    outbound: mpsc::Sender<Bytes>,
    inbound: Mutex<mpsc::Receiver<Bytes>>,
    counters: Arc<Counters>,
    pumps: TaskTracker,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let _ = self.latch.close(CloseReason::Dropped);
    }
}

impl Connection {
    /// Wrap `transport` with default queue capacities and start both pumps.
    pub fn create<T: Transport>(transport: T) -> Result<Self, ConnectionError> {
        Self::with_config(transport, ConnectionConfig::default())
    }

    /// Wrap `transport` with explicit queue capacities and start both pumps.
    ///
    /// Must be called from within a Tokio runtime; the pumps are spawned on it.
    pub fn with_config<T: Transport>(
        transport: T,
        config: ConnectionConfig,
    ) -> Result<Self, ConnectionError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| ConnectionError::NoRuntime)?;

        let id = format!("{CONNECTION_ID_PREFIX}{}", Uuid::now_v7());
        let counters = Arc::new(Counters::default());
        let transport: Arc<dyn Transport> = Arc::new(transport);
        let latch = Arc::new(ShutdownLatch::new(
            id.clone(),
            transport,
            Arc::clone(&counters),
        ));

        let (inbound_tx, inbound_rx) = mpsc::channel(config.inbound_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity);

        let pumps = TaskTracker::new();
        let _ = pumps.spawn_on(
            pump::run_inbound(Arc::clone(&latch), inbound_tx, Arc::clone(&counters))
                .instrument(info_span!("inbound_pump", connection_id = %id)),
            &runtime,
        );
        let _ = pumps.spawn_on(
            pump::run_outbound(Arc::clone(&latch), outbound_rx, Arc::clone(&counters))
                .instrument(info_span!("outbound_pump", connection_id = %id)),
            &runtime,
        );
        let _ = pumps.close();

        debug!(
            connection_id = %id,
            inbound_capacity = config.inbound_capacity,
            outbound_capacity = config.outbound_capacity,
            "connection opened"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                id,
                config,
                latch,
                outbound: outbound_tx,
                inbound: Mutex::new(inbound_rx),
                counters,
                pumps,
            }),
        })
    }

    /// Unique connection ID (`conn_<uuid>`).
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Queue capacities this connection was built with.
    pub fn config(&self) -> &ConnectionConfig {
        &self.shared.config
    }

    /// Queue `data` for transmission.
    ///
    /// Waits while the outbound queue is full. Fails with
    /// [`ConnectionError::Closed`] once the connection is shut down, including
    /// while waiting. Acceptance is not delivery: payloads still queued when
    /// the connection closes are lost.
    pub async fn send(&self, data: impl Into<Bytes>) -> Result<(), ConnectionError> {
        let payload = data.into();
        tokio::select! {
            biased;
            () = self.shared.latch.signal().cancelled() => Err(ConnectionError::Closed),
            queued = self.shared.outbound.send(payload) => {
                queued.map_err(|_| ConnectionError::Closed)
            }
        }
    }

    /// Queue `data` without waiting.
    ///
    /// A full outbound queue drops the payload and returns
    /// [`ConnectionError::QueueFull`]; the drop is counted in
    /// [`ConnectionStats::dropped`].
    pub fn try_send(&self, data: impl Into<Bytes>) -> Result<(), ConnectionError> {
        if self.shared.latch.is_closed() {
            return Err(ConnectionError::Closed);
        }
        match self.shared.outbound.try_send(data.into()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(payload)) => {
                let dropped = self.shared.counters.record_dropped();
                warn!(
                    connection_id = %self.shared.id,
                    len = payload.len(),
                    dropped,
                    "outbound queue full, dropping payload"
                );
                Err(ConnectionError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ConnectionError::Closed),
        }
    }

    /// Wait for the next payload from the peer.
    ///
    /// Fails with [`ConnectionError::Closed`] once the connection is shut
    /// down. A payload is never returned after shutdown has been observed.
    pub async fn read(&self) -> Result<Bytes, ConnectionError> {
        let shutdown = self.shared.latch.signal();

        let mut inbound = tokio::select! {
            biased;
            () = shutdown.cancelled() => return Err(ConnectionError::Closed),
            guard = self.shared.inbound.lock() => guard,
        };

        tokio::select! {
            biased;
            () = shutdown.cancelled() => Err(ConnectionError::Closed),
            next = inbound.recv() => next.ok_or(ConnectionError::Closed),
        }
    }

    /// Shut the connection down.
    ///
    /// Idempotent and safe to call from any task. Closes the transport,
    /// fires the shutdown signal once, and makes every pending and future
    /// `send`/`read` fail with [`ConnectionError::Closed`].
    pub fn close(&self) {
        let _ = self.shared.latch.close(CloseReason::Local);
    }

    /// Whether shutdown has been initiated.
    pub fn is_closed(&self) -> bool {
        self.shared.latch.is_closed()
    }

    /// Why the connection closed, or `None` while it is open.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.shared.latch.reason()
    }

    /// Wait until shutdown has been initiated.
    pub async fn closed(&self) {
        self.shared.latch.signal().cancelled().await;
    }

    /// Wait until both pumps have exited.
    ///
    /// Resolves only after the connection is closed, since the pumps run
    /// until shutdown.
    pub async fn terminated(&self) {
        self.shared.pumps.wait().await;
    }

    /// Snapshot of the connection's counters.
    pub fn stats(&self) -> ConnectionStats {
        self.shared.counters.snapshot()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.shared.id)
            .field("closed", &self.is_closed())
            .field("close_reason", &self.close_reason())
            .finish_non_exhaustive()
    }
}
