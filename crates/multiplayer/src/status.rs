//! Status-bar information derived from connection and queue state.

use crate::connection::ConnectionState;
use serde::{Deserialize, Serialize};

/// Icon shown next to the status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusIndicator {
    Spinner,
    Check,
    Error,
}

/// UI display information for the sync status.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusInfo {
    pub state: ConnectionState,
    pub broken_connection: bool,
    pub pending_transactions: usize,
    pub indicator: StatusIndicator,
    pub message: String,
    pub tooltip: String,
    /// Whether the message should use error styling.
    pub is_error: bool,
}

impl SyncStatusInfo {
    /// Derive the status shown for the given state.
    pub fn new(
        state: ConnectionState,
        broken_connection: bool,
        pending_transactions: usize,
    ) -> Self {
        use ConnectionState::*;

        let recovering = broken_connection && matches!(state, Connecting | WaitingToReconnect);
        let (indicator, message, tooltip, is_error) = if recovering {
            (
                StatusIndicator::Spinner,
                "Reconnecting…",
                "Attempting to connect to the server after losing connection. Your changes may only be saved locally…",
                true,
            )
        } else {
            match state {
                Startup | Connecting | WaitingToReconnect => (
                    StatusIndicator::Spinner,
                    "Connecting…",
                    "Connecting to the server…",
                    false,
                ),
                Syncing => (
                    StatusIndicator::Spinner,
                    "Syncing...",
                    "Syncing changes to the server. Your recent changes are saved locally.",
                    false,
                ),
                Connected => (
                    StatusIndicator::Check,
                    "Connected",
                    "Connected to the server. Your changes are saved.",
                    false,
                ),
                NoInternet => (
                    StatusIndicator::Error,
                    "Offline",
                    "Your internet connection appears not to be working. Your changes are only saved locally.",
                    true,
                ),
            }
        };

        Self {
            state,
            broken_connection,
            pending_transactions,
            indicator,
            message: message.to_string(),
            tooltip: tooltip.to_string(),
            is_error,
        }
    }

    /// Summary of the offline queue for the status menu.
    pub fn pending_summary(&self) -> String {
        match self.pending_transactions {
            0 => "Nothing waiting to sync".to_string(),
            1 => "Syncing 1 item.".to_string(),
            n => format!("Syncing {} items.", n),
        }
    }

    /// Check if the indicator should draw attention.
    pub fn should_show(&self) -> bool {
        self.state != ConnectionState::Connected || self.pending_transactions > 0
    }
}
