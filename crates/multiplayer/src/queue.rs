//! Offline transaction queue.
//!
//! Every locally committed transaction is appended here first and leaves the
//! queue only when the server acknowledges it. While the link is down the
//! queue simply grows; once it is back, transactions are sent strictly one at
//! a time in commit order, each waiting for its own acknowledgment.
//!
//! # Features
//!
//! - FIFO queue with monotonically increasing transaction IDs
//! - Single in-flight transaction, removed only on matching acknowledgment
//! - Interrupted sends keep their place at the head of the queue
//! - Optional JSON persistence so pending work survives a restart
//! - Pending-count events for the status bar

use crate::config::MultiplayerConfig;
use crate::error::{MultiplayerError, MultiplayerResult};
use crate::events::{EventBus, MultiplayerEvent};
use crate::network::Network;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Client-local transaction identifier, increasing with commit order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TransactionId(pub u64);

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// A locally committed change waiting for server acknowledgment.
///
/// The payload is opaque to this crate; it is produced and interpreted by the
/// document layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTransaction {
    pub id: TransactionId,
    /// Number of operations in the transaction, for display only.
    pub operation_count: usize,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl PendingTransaction {
    pub fn new(id: TransactionId, operation_count: usize, payload: Vec<u8>) -> Self {
        Self {
            id,
            operation_count,
            payload,
            created_at: Utc::now(),
        }
    }
}

/// Serializable queue state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OfflineQueueState {
    pub next_id: u64,
    pub pending: Vec<PendingTransaction>,
}

/// Ordered queue of unacknowledged local transactions.
#[derive(Debug)]
pub struct OfflineTransactionQueue {
    pending: VecDeque<PendingTransaction>,
    next_id: u64,
    /// Head transaction currently awaiting acknowledgment.
    in_flight: Option<TransactionId>,
    warn_threshold: Option<usize>,
    storage_path: Option<PathBuf>,
    auto_save: bool,
    bus: EventBus,
}

impl OfflineTransactionQueue {
    /// Create an empty, in-memory queue.
    pub fn new(bus: EventBus) -> Self {
        Self {
            pending: VecDeque::new(),
            next_id: 1,
            in_flight: None,
            warn_threshold: None,
            storage_path: None,
            auto_save: false,
            bus,
        }
    }

    /// Create a queue using the warning threshold and storage settings of `config`.
    pub fn with_config(config: &MultiplayerConfig, bus: EventBus) -> Self {
        Self {
            warn_threshold: config.queue_warn_threshold,
            storage_path: config.storage_path.clone(),
            auto_save: config.auto_save && config.storage_path.is_some(),
            ..Self::new(bus)
        }
    }

    /// Append a transaction. Never fails; returns the assigned ID.
    pub fn enqueue(&mut self, operation_count: usize, payload: Vec<u8>) -> TransactionId {
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        self.pending
            .push_back(PendingTransaction::new(id, operation_count, payload));
        debug!(%id, operation_count, pending = self.pending.len(), "transaction queued");

        if let Some(threshold) = self.warn_threshold {
            if self.pending.len() > threshold {
                warn!(
                    pending = self.pending.len(),
                    threshold, "offline queue above warning threshold"
                );
            }
        }

        self.changed();
        id
    }

    /// `(transactions, operations)` currently pending, including any in flight.
    pub fn count(&self) -> (usize, usize) {
        let operations = self.pending.iter().map(|tx| tx.operation_count).sum();
        (self.pending.len(), operations)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Oldest pending transaction.
    pub fn head(&self) -> Option<&PendingTransaction> {
        self.pending.front()
    }

    /// Pending transactions in commit order.
    pub fn pending(&self) -> impl Iterator<Item = &PendingTransaction> {
        self.pending.iter()
    }

    /// Transaction currently awaiting acknowledgment.
    pub fn in_flight(&self) -> Option<TransactionId> {
        self.in_flight
    }

    /// Mark the head as in flight and return a copy to send.
    ///
    /// Returns `Ok(None)` when the queue is empty.
    pub fn begin_send(&mut self) -> MultiplayerResult<Option<PendingTransaction>> {
        if self.in_flight.is_some() {
            return Err(MultiplayerError::FlushInProgress);
        }
        let Some(head) = self.pending.front() else {
            return Ok(None);
        };
        self.in_flight = Some(head.id);
        debug!(id = %head.id, "sending transaction");
        Ok(Some(head.clone()))
    }

    /// Handle the server's acknowledgment of the in-flight transaction.
    pub fn acknowledge(&mut self, id: TransactionId) -> MultiplayerResult<PendingTransaction> {
        let expected = self.in_flight.ok_or(MultiplayerError::NothingInFlight)?;
        if expected != id {
            warn!(%expected, actual = %id, "acknowledgment for unexpected transaction");
            return Err(MultiplayerError::AckMismatch {
                expected,
                actual: id,
            });
        }

        self.in_flight = None;
        let acknowledged = self
            .pending
            .pop_front()
            .ok_or(MultiplayerError::NothingInFlight)?;
        debug!(%id, remaining = self.pending.len(), "transaction acknowledged");
        self.changed();
        Ok(acknowledged)
    }

    /// The link dropped while a transaction was in flight.
    ///
    /// The transaction stays at the head and is sent again on the next flush.
    pub fn interrupt(&mut self) {
        if let Some(id) = self.in_flight.take() {
            info!(%id, "send interrupted, transaction kept at head of queue");
        }
    }

    /// Send every pending transaction in order, waiting for each acknowledgment.
    ///
    /// Returns the number of transactions acknowledged. On failure the
    /// unacknowledged transaction stays at the head and the error is returned.
    pub async fn flush<N: Network>(&mut self, network: &N) -> MultiplayerResult<usize> {
        let mut flushed = 0;
        while let Some(transaction) = self.begin_send()? {
            let result = network.send_transaction(&transaction).await;
            match result.and_then(|ack| self.acknowledge(ack)) {
                Ok(_) => flushed += 1,
                Err(err) => {
                    self.interrupt();
                    warn!(id = %transaction.id, error = %err, flushed, "flush stopped");
                    return Err(err);
                }
            }
        }
        if flushed > 0 {
            info!(flushed, "offline queue flushed");
        }
        Ok(flushed)
    }

    /// Publish the current pending count.
    pub fn publish(&self) {
        let (transactions, operations) = self.count();
        self.bus.publish(MultiplayerEvent::PendingTransactionsChanged {
            transactions,
            operations,
        });
    }

    fn changed(&self) {
        if self.auto_save {
            if let Err(err) = self.save() {
                warn!(error = %err, "failed to persist offline queue");
            }
        }
        self.publish();
    }

    // ========== Persistence ==========

    /// Get state for serialization.
    pub fn state(&self) -> OfflineQueueState {
        OfflineQueueState {
            next_id: self.next_id,
            pending: self.pending.iter().cloned().collect(),
        }
    }

    /// Replace the queue contents with a saved state.
    pub fn restore(&mut self, state: OfflineQueueState) {
        let highest = state.pending.iter().map(|tx| tx.id.0).max().unwrap_or(0);
        self.next_id = state.next_id.max(highest + 1);
        self.pending = state.pending.into();
        self.in_flight = None;
        info!(pending = self.pending.len(), "offline queue restored");
        self.publish();
    }

    /// Storage path, if persistence is configured.
    pub fn storage_path(&self) -> Option<&Path> {
        self.storage_path.as_deref()
    }

    /// Write the queue to the configured storage path.
    pub fn save(&self) -> MultiplayerResult<()> {
        let path = self
            .storage_path
            .as_ref()
            .ok_or(MultiplayerError::NoStoragePath)?;
        let json = serde_json::to_string_pretty(&self.state())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load the queue from the configured storage path.
    ///
    /// A missing file is not an error: there is simply nothing pending.
    pub fn load(&mut self) -> MultiplayerResult<()> {
        let path = self
            .storage_path
            .as_ref()
            .ok_or(MultiplayerError::NoStoragePath)?;
        if !path.exists() {
            return Ok(());
        }
        let json = std::fs::read_to_string(path)?;
        let state: OfflineQueueState = serde_json::from_str(&json)?;
        self.restore(state);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Subscription;
    use crate::network::RecordingNetwork;

    fn queue() -> (OfflineTransactionQueue, Subscription) {
        let bus = EventBus::new(64);
        let sub = bus.subscribe();
        (OfflineTransactionQueue::new(bus), sub)
    }

    fn counts(sub: &mut Subscription) -> Vec<(usize, usize)> {
        sub.drain()
            .into_iter()
            .filter_map(|event| match event {
                MultiplayerEvent::PendingTransactionsChanged {
                    transactions,
                    operations,
                } => Some((transactions, operations)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_enqueue_assigns_increasing_ids() {
        let (mut queue, mut sub) = queue();
        let a = queue.enqueue(2, vec![1]);
        let b = queue.enqueue(3, vec![2]);
        assert!(a < b);
        assert_eq!(queue.count(), (2, 5));
        assert_eq!(counts(&mut sub), vec![(1, 2), (2, 5)]);
    }

    #[test]
    fn test_acknowledge_removes_head_only() {
        let (mut queue, _) = queue();
        let a = queue.enqueue(2, Vec::new());
        let b = queue.enqueue(3, Vec::new());

        let sent = queue.begin_send().unwrap().unwrap();
        assert_eq!(sent.id, a);
        assert_eq!(queue.in_flight(), Some(a));
        // still counted while in flight
        assert_eq!(queue.count(), (2, 5));

        queue.acknowledge(a).unwrap();
        assert_eq!(queue.count(), (1, 3));
        assert_eq!(queue.head().map(|tx| tx.id), Some(b));
    }

    #[test]
    fn test_acknowledge_mismatch_keeps_queue() {
        let (mut queue, _) = queue();
        let a = queue.enqueue(1, Vec::new());
        let b = queue.enqueue(1, Vec::new());
        queue.begin_send().unwrap();

        assert_eq!(
            queue.acknowledge(b),
            Err(MultiplayerError::AckMismatch {
                expected: a,
                actual: b,
            })
        );
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.in_flight(), Some(a));
    }

    #[test]
    fn test_acknowledge_without_send() {
        let (mut queue, _) = queue();
        let a = queue.enqueue(1, Vec::new());
        assert_eq!(queue.acknowledge(a), Err(MultiplayerError::NothingInFlight));
    }

    #[test]
    fn test_single_in_flight() {
        let (mut queue, _) = queue();
        queue.enqueue(1, Vec::new());
        queue.enqueue(1, Vec::new());
        queue.begin_send().unwrap();
        assert_eq!(queue.begin_send(), Err(MultiplayerError::FlushInProgress));
    }

    #[test]
    fn test_interrupt_keeps_head() {
        let (mut queue, _) = queue();
        let a = queue.enqueue(4, Vec::new());
        queue.begin_send().unwrap();
        queue.interrupt();

        assert_eq!(queue.in_flight(), None);
        assert_eq!(queue.count(), (1, 4));
        let resent = queue.begin_send().unwrap().unwrap();
        assert_eq!(resent.id, a);
    }

    #[test]
    fn test_begin_send_empty() {
        let (mut queue, _) = queue();
        assert_eq!(queue.begin_send(), Ok(None));
        assert_eq!(queue.count(), (0, 0));
    }

    #[tokio::test]
    async fn test_flush_in_order() {
        let (mut queue, mut sub) = queue();
        let ids: Vec<_> = (1..=3).map(|n| queue.enqueue(n, Vec::new())).collect();
        sub.drain();

        let network = RecordingNetwork::new();
        let flushed = queue.flush(&network).await.unwrap();

        assert_eq!(flushed, 3);
        assert!(queue.is_empty());
        assert_eq!(network.log().transactions, ids);
        assert_eq!(counts(&mut sub), vec![(2, 5), (1, 3), (0, 0)]);
    }

    #[tokio::test]
    async fn test_flush_resumes_after_drop() {
        let (mut queue, _) = queue();
        let ids: Vec<_> = (0..3).map(|_| queue.enqueue(1, Vec::new())).collect();

        let network = RecordingNetwork::failing_after(1);
        let result = queue.flush(&network).await;
        assert!(matches!(result, Err(MultiplayerError::NetworkUnavailable(_))));
        assert_eq!(queue.count(), (2, 2));
        assert_eq!(queue.head().map(|tx| tx.id), Some(ids[1]));
        assert_eq!(queue.in_flight(), None);

        network.restore();
        assert_eq!(queue.flush(&network).await.unwrap(), 2);
        assert_eq!(network.log().transactions, ids);
        assert_eq!(network.log().failed, vec![ids[1]]);
    }

    #[test]
    fn test_warn_threshold_does_not_reject() {
        let config = MultiplayerConfig::new().with_queue_warn_threshold(1);
        let mut queue = OfflineTransactionQueue::with_config(&config, EventBus::new(4));
        for _ in 0..5 {
            queue.enqueue(1, Vec::new());
        }
        assert_eq!(queue.len(), 5);
    }

    // ========== Persistence Tests ==========

    #[test]
    fn test_save_load_without_storage_path() {
        let (mut queue, _) = queue();
        assert_eq!(queue.save(), Err(MultiplayerError::NoStoragePath));
        assert_eq!(queue.load(), Err(MultiplayerError::NoStoragePath));
    }

    #[test]
    fn test_save_load_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("offline_queue.json");
        let config = MultiplayerConfig::new().with_storage(&path);

        let saved_ids = {
            let mut queue = OfflineTransactionQueue::with_config(&config, EventBus::new(4));
            let a = queue.enqueue(2, b"first".to_vec());
            let b = queue.enqueue(3, b"second".to_vec());
            vec![a, b]
        };

        let mut queue = OfflineTransactionQueue::with_config(&config, EventBus::new(4));
        queue.load().unwrap();
        let loaded: Vec<_> = queue.pending().map(|tx| tx.id).collect();
        assert_eq!(loaded, saved_ids);
        assert_eq!(queue.count(), (2, 5));
        assert_eq!(queue.head().map(|tx| tx.payload.as_slice()), Some(&b"first"[..]));

        // ids keep increasing after a restart
        let next = queue.enqueue(1, Vec::new());
        assert!(next > saved_ids[1]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = MultiplayerConfig::new().with_storage(temp_dir.path().join("none.json"));
        let mut queue = OfflineTransactionQueue::with_config(&config, EventBus::new(4));
        assert!(queue.load().is_ok());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_restore_repairs_next_id() {
        let (mut queue, _) = queue();
        queue.restore(OfflineQueueState {
            next_id: 1,
            pending: vec![PendingTransaction::new(TransactionId(9), 1, Vec::new())],
        });
        assert_eq!(queue.enqueue(1, Vec::new()), TransactionId(10));
    }
}
