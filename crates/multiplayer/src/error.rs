//! Error types for the multiplayer crate.
//!
//! These errors are only ever returned to the network layer driving the
//! inbound surface. UI collaborators observe state through events and
//! snapshots and never receive them.

use crate::connection::ConnectionState;
use crate::queue::TransactionId;
use thiserror::Error;

/// Result type alias for multiplayer operations.
pub type MultiplayerResult<T> = Result<T, MultiplayerError>;

/// Errors that can occur while driving the multiplayer core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultiplayerError {
    /// The network layer reported a transition the state machine does not allow.
    #[error("Invalid connection transition from {from} to {to}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// The transport failed while a transaction was in flight.
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// The server acknowledged a transaction other than the queue head.
    #[error("Acknowledgment mismatch: expected {expected}, got {actual}")]
    AckMismatch {
        expected: TransactionId,
        actual: TransactionId,
    },

    /// A flush was requested while another one is still waiting for an ack.
    #[error("A flush is already in progress")]
    FlushInProgress,

    /// An acknowledgment arrived while no transaction was in flight.
    #[error("No transaction is awaiting acknowledgment")]
    NothingInFlight,

    /// Persistent storage failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Persistence was requested without a configured storage path.
    #[error("No storage path configured")]
    NoStoragePath,

    /// The configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for MultiplayerError {
    fn from(err: serde_json::Error) -> Self {
        MultiplayerError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for MultiplayerError {
    fn from(err: std::io::Error) -> Self {
        MultiplayerError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MultiplayerError::InvalidTransition {
            from: ConnectionState::Startup,
            to: ConnectionState::Syncing,
        };
        assert_eq!(
            err.to_string(),
            "Invalid connection transition from startup to syncing"
        );

        let err = MultiplayerError::AckMismatch {
            expected: TransactionId(1),
            actual: TransactionId(2),
        };
        assert_eq!(err.to_string(), "Acknowledgment mismatch: expected tx-1, got tx-2");
    }

    #[test]
    fn test_from_serde_error() {
        let err: MultiplayerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, MultiplayerError::Serialization(_)));
    }
}
