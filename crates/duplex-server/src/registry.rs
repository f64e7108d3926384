//! Live connections by id.

use std::collections::HashMap;

use duplex_connection::Connection;
use parking_lot::RwLock;
use tracing::{debug, info};

/// Registry of open WebSocket connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<String, Connection>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Track `conn` under its id.
    pub fn register(&self, conn: Connection) {
        let id = conn.id().to_owned();
        let _ = self.connections.write().insert(id.clone(), conn);
        debug!(connection_id = %id, "connection registered");
    }

    /// Stop tracking a connection. Returns `true` if it was present.
    pub fn unregister(&self, id: &str) -> bool {
        let removed = self.connections.write().remove(id).is_some();
        if removed {
            debug!(connection_id = %id, "connection unregistered");
        }
        removed
    }

    /// Number of open connections.
    pub fn count(&self) -> usize {
        self.connections.read().len()
    }

    /// Close every registered connection. Returns how many were closed.
    ///
    /// Sessions unregister themselves once their connection terminates.
    pub fn close_all(&self) -> usize {
        let connections: Vec<Connection> = self.connections.read().values().cloned().collect();
        for conn in &connections {
            conn.close();
        }
        if !connections.is_empty() {
            info!(count = connections.len(), "closed all connections");
        }
        connections.len()
    }
}
