//! Connection queue configuration.

use duplex_core::ConnectionError;
use duplex_core::constants::{DEFAULT_INBOUND_CAPACITY, DEFAULT_OUTBOUND_CAPACITY};
use serde::{Deserialize, Serialize};

/// Queue capacities for a [`Connection`](crate::Connection).
///
/// Capacities are fixed once the connection is created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Payloads buffered between the inbound pump and `read` callers.
    pub inbound_capacity: usize,
    /// Payloads buffered between `send` callers and the outbound pump.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: DEFAULT_INBOUND_CAPACITY,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
        }
    }
}

impl ConnectionConfig {
    /// Config with the same capacity for both queues.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inbound_capacity: capacity,
            outbound_capacity: capacity,
        }
    }

    /// Reject capacities the queues cannot be built with.
    pub fn validate(&self) -> Result<(), ConnectionError> {
        if self.inbound_capacity == 0 {
            return Err(ConnectionError::InvalidConfig(
                "inbound capacity must be greater than zero".into(),
            ));
        }
        if self.outbound_capacity == 0 {
            return Err(ConnectionError::InvalidConfig(
                "outbound capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_capacities() {
        let cfg = ConnectionConfig::default();
        assert_eq!(cfg.inbound_capacity, 1000);
        assert_eq!(cfg.outbound_capacity, 1000);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn zero_inbound_rejected() {
        let cfg = ConnectionConfig {
            inbound_capacity: 0,
            ..ConnectionConfig::default()
        };
        assert_matches!(cfg.validate(), Err(ConnectionError::InvalidConfig(msg)) if msg.contains("inbound"));
    }

    #[test]
    fn zero_outbound_rejected() {
        let cfg = ConnectionConfig {
            outbound_capacity: 0,
            ..ConnectionConfig::default()
        };
        assert_matches!(cfg.validate(), Err(ConnectionError::InvalidConfig(msg)) if msg.contains("outbound"));
    }

    #[test]
    fn with_capacity_sets_both() {
        let cfg = ConnectionConfig::with_capacity(4);
        assert_eq!(cfg.inbound_capacity, 4);
        assert_eq!(cfg.outbound_capacity, 4);
    }

    #[test]
    fn deserialize_partial_uses_defaults() {
        let cfg: ConnectionConfig = serde_json::from_str(r#"{"outbound_capacity": 8}"#).unwrap();
        assert_eq!(cfg.inbound_capacity, 1000);
        assert_eq!(cfg.outbound_capacity, 8);
    }
}
