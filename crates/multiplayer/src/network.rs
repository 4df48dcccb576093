//! Outbound boundary to the network layer.
//!
//! The multiplayer core never touches sockets. It hands outbound messages to a
//! [`Network`] implementation, which is responsible for transport, encoding and
//! retries. Presence and cell-edit broadcasts are fire-and-forget; only
//! transactions are acknowledged.

use crate::cell_edit::CellEdit;
use crate::error::{MultiplayerError, MultiplayerResult};
use crate::queue::{PendingTransaction, TransactionId};
use crate::types::{Pos, Rect, SheetId, SheetPos};
use std::sync::{Mutex, MutexGuard};

/// Outbound network collaborator.
#[trait_variant::make(Send)]
pub trait Network: Send + Sync {
    /// Broadcast the local cursor, selection and active sheet.
    fn send_presence_update(&self, cursor: Pos, selection: Option<Rect>, sheet_id: &SheetId);

    /// Broadcast the local in-progress cell edit, or `None` when it ends.
    fn send_cell_edit_broadcast(&self, content: Option<&CellEdit>, location: &SheetPos);

    /// Send one transaction and wait for the server to acknowledge it.
    ///
    /// Returns the acknowledged transaction ID.
    async fn send_transaction(
        &self,
        transaction: &PendingTransaction,
    ) -> MultiplayerResult<TransactionId>;
}

/// A presence broadcast captured by [`RecordingNetwork`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentPresence {
    pub cursor: Pos,
    pub selection: Option<Rect>,
    pub sheet_id: SheetId,
}

/// Everything a [`RecordingNetwork`] has been asked to send.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkLog {
    pub presence: Vec<SentPresence>,
    pub cell_edits: Vec<(Option<CellEdit>, SheetPos)>,
    /// Transactions that were acknowledged, in send order.
    pub transactions: Vec<TransactionId>,
    /// Transactions whose send failed.
    pub failed: Vec<TransactionId>,
}

/// In-memory network that records outbound traffic and acknowledges every
/// transaction immediately. Useful for tests and offline development.
#[derive(Debug, Default)]
pub struct RecordingNetwork {
    log: Mutex<NetworkLog>,
    /// Remaining transactions to acknowledge before the link "drops".
    ack_budget: Mutex<Option<usize>>,
}

impl RecordingNetwork {
    /// Create a network that acknowledges everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a network that acknowledges `count` transactions and then fails.
    pub fn failing_after(count: usize) -> Self {
        Self {
            log: Mutex::default(),
            ack_budget: Mutex::new(Some(count)),
        }
    }

    /// Restore the link so every following transaction is acknowledged.
    pub fn restore(&self) {
        *lock(&self.ack_budget) = None;
    }

    /// Snapshot of recorded traffic.
    pub fn log(&self) -> NetworkLog {
        lock(&self.log).clone()
    }
}

impl Network for RecordingNetwork {
    fn send_presence_update(&self, cursor: Pos, selection: Option<Rect>, sheet_id: &SheetId) {
        lock(&self.log).presence.push(SentPresence {
            cursor,
            selection,
            sheet_id: sheet_id.clone(),
        });
    }

    fn send_cell_edit_broadcast(&self, content: Option<&CellEdit>, location: &SheetPos) {
        lock(&self.log)
            .cell_edits
            .push((content.cloned(), location.clone()));
    }

    async fn send_transaction(
        &self,
        transaction: &PendingTransaction,
    ) -> MultiplayerResult<TransactionId> {
        let allowed = {
            let mut budget = lock(&self.ack_budget);
            match budget.as_mut() {
                None => true,
                Some(0) => false,
                Some(remaining) => {
                    *remaining -= 1;
                    true
                }
            }
        };

        let mut log = lock(&self.log);
        if allowed {
            log.transactions.push(transaction.id);
            Ok(transaction.id)
        } else {
            log.failed.push(transaction.id);
            Err(MultiplayerError::NetworkUnavailable(format!(
                "link dropped while sending {}",
                transaction.id
            )))
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
