//! The multiplayer client: one explicitly constructed handle owning every
//! piece of multiplayer state for an open spreadsheet.
//!
//! The network layer drives the inbound side (`on_*` methods) and UI code
//! drives the local side (cursor moves, sheet switches, commits). Both sides
//! observe results through the [`EventBus`]. The client is single-writer: all
//! mutation goes through `&mut self`, so updates never interleave.
//!
//! # Example
//!
//! ```
//! use multiplayer::{
//!     ConnectionSignal, ConnectionState, MultiplayerClient, MultiplayerConfig, PresenceUpdate,
//!     RecordingNetwork, SessionId, SheetId,
//! };
//! use std::sync::Arc;
//!
//! let network = Arc::new(RecordingNetwork::new());
//! let mut client = MultiplayerClient::new(
//!     MultiplayerConfig::default(),
//!     SessionId::from("me"),
//!     SheetId::from("Sheet1"),
//!     network,
//! );
//! let mut events = client.subscribe();
//!
//! client.start().unwrap();
//! client.on_connection_signal(ConnectionSignal::Connected).unwrap();
//! assert_eq!(client.connection_state(), ConnectionState::Connected);
//!
//! client.on_presence(&PresenceUpdate::new("alice").sheet("Sheet1").cursor(3, 4));
//! assert_eq!(client.visible_users().len(), 1);
//! assert!(!events.drain().is_empty());
//! ```

use crate::cell_edit::{CellEdit, CellEditBroadcast, CellEditBroadcastMerger, CellEditChange};
use crate::config::MultiplayerConfig;
use crate::connection::{ConnectionSignal, ConnectionState, ConnectionStateMachine};
use crate::error::{MultiplayerError, MultiplayerResult};
use crate::events::{EventBus, MultiplayerEvent, Subscription};
use crate::follow::FollowGraph;
use crate::network::Network;
use crate::presence::{LocalPresence, PresenceRegistry, PresenceUpdate, RemoteUser, UpsertOutcome};
use crate::queue::{OfflineTransactionQueue, PendingTransaction, TransactionId};
use crate::status::SyncStatusInfo;
use crate::types::{Pos, Rect, SessionId, SheetId, SheetPos};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Multiplayer state for one open spreadsheet.
pub struct MultiplayerClient<N: Network> {
    config: MultiplayerConfig,
    bus: EventBus,
    network: Arc<N>,
    connection: ConnectionStateMachine,
    queue: OfflineTransactionQueue,
    presence: PresenceRegistry,
    follow: FollowGraph,
    cell_edits: CellEditBroadcastMerger,
    local: LocalPresence,
    started: bool,
}

impl<N: Network> MultiplayerClient<N> {
    /// Create a client for `session_id`, initially viewing `sheet_id`.
    ///
    /// Nothing is published until [`start`](Self::start) is called.
    pub fn new(
        config: MultiplayerConfig,
        session_id: SessionId,
        sheet_id: SheetId,
        network: Arc<N>,
    ) -> Self {
        let bus = EventBus::new(config.event_capacity);
        Self {
            connection: ConnectionStateMachine::new(bus.clone()),
            queue: OfflineTransactionQueue::with_config(&config, bus.clone()),
            presence: PresenceRegistry::new(session_id.clone(), bus.clone()),
            follow: FollowGraph::new(session_id.clone(), bus.clone()),
            cell_edits: CellEditBroadcastMerger::new(),
            local: LocalPresence::new(session_id, sheet_id),
            config,
            bus,
            network,
            started: false,
        }
    }

    // ========== Lifecycle ==========

    /// Restore any persisted offline work, publish the initial state and
    /// begin connecting.
    pub fn start(&mut self) -> MultiplayerResult<()> {
        if self.started {
            return Ok(());
        }
        if self.config.storage_path.is_some() {
            self.queue.load()?;
        }
        info!(session = %self.local.session_id, "multiplayer starting");
        self.connection.publish();
        self.queue.publish();
        self.connection.handle(ConnectionSignal::Connecting)?;
        self.started = true;
        Ok(())
    }

    /// Drop all remote state, persist the offline queue and return the
    /// connection to `startup`, publishing the final snapshots.
    ///
    /// A later [`start`](Self::start) begins a fresh session.
    pub fn shutdown(&mut self) {
        if !self.started {
            return;
        }
        self.queue.interrupt();
        if self.config.storage_path.is_some() {
            if let Err(err) = self.queue.save() {
                warn!(error = %err, "failed to persist offline queue on shutdown");
            }
        }
        for entry in self.cell_edits.take_all() {
            if let Some(user) = self.presence.get(&entry.session_id).cloned() {
                self.bus.publish(MultiplayerEvent::CellEditBroadcast {
                    content: None,
                    user,
                });
            }
        }
        self.presence.clear();
        self.follow.reset();
        self.connection.reset();
        self.started = false;
        info!(session = %self.local.session_id, "multiplayer shut down");
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    // ========== Queries ==========

    /// Subscribe to multiplayer events.
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &MultiplayerConfig {
        &self.config
    }

    pub fn session_id(&self) -> &SessionId {
        &self.local.session_id
    }

    pub fn local_presence(&self) -> &LocalPresence {
        &self.local
    }

    pub fn active_sheet(&self) -> &SheetId {
        &self.local.sheet_id
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn broken_connection(&self) -> bool {
        self.connection.broken_connection()
    }

    /// `(transactions, operations)` waiting for acknowledgment.
    pub fn pending_count(&self) -> (usize, usize) {
        self.queue.count()
    }

    /// Status-bar information for the current state.
    pub fn status(&self) -> SyncStatusInfo {
        SyncStatusInfo::new(
            self.connection.state(),
            self.connection.broken_connection(),
            self.queue.len(),
        )
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn queue(&self) -> &OfflineTransactionQueue {
        &self.queue
    }

    pub fn cell_edits(&self) -> &CellEditBroadcastMerger {
        &self.cell_edits
    }

    /// Remote users on the active sheet, in display order.
    pub fn visible_users(&self) -> Vec<&RemoteUser> {
        self.presence.list_for_sheet(&self.local.sheet_id)
    }

    /// Remote cell edits on the active sheet.
    pub fn visible_cell_edits(&self) -> Vec<&CellEditBroadcast> {
        self.cell_edits.visible_on(&self.local.sheet_id)
    }

    /// Sessions following the local user.
    pub fn followers(&self) -> &[SessionId] {
        self.follow.followers()
    }

    /// Session the view is currently following.
    pub fn follow_target(&self) -> Option<&SessionId> {
        self.follow.resolved()
    }

    // ========== Inbound (network layer) ==========

    /// Apply a connection signal from the network layer.
    pub fn on_connection_signal(&mut self, signal: ConnectionSignal) -> MultiplayerResult<()> {
        let changed = self.connection.handle(signal)?;
        match signal {
            ConnectionSignal::TransportLost | ConnectionSignal::NoInternet => {
                self.queue.interrupt()
            }
            ConnectionSignal::Connected if changed => self.broadcast_presence(),
            _ => {}
        }
        Ok(())
    }

    /// Merge a presence update for a remote session.
    pub fn on_presence(&mut self, update: &PresenceUpdate) -> UpsertOutcome {
        let outcome = self.presence.upsert(update);
        if outcome != UpsertOutcome::Ignored {
            self.follow.refresh(&self.presence);
        }
        outcome
    }

    /// A remote session left.
    pub fn on_leave(&mut self, session_id: &SessionId) -> Option<RemoteUser> {
        let user = self.presence.remove(session_id)?;
        if self.cell_edits.remove_session(session_id) {
            self.bus.publish(MultiplayerEvent::CellEditBroadcast {
                content: None,
                user: user.clone(),
            });
        }
        self.follow.refresh(&self.presence);
        Some(user)
    }

    /// A remote session started, changed or ended (`None`) a cell edit.
    pub fn on_cell_edit(
        &mut self,
        session_id: &SessionId,
        content: Option<CellEdit>,
    ) -> CellEditChange {
        let Some(user) = self.presence.get(session_id).cloned() else {
            debug!(session = %session_id, "cell edit from unknown session");
            return CellEditChange::Ignored;
        };
        let change = self.cell_edits.apply(content.clone(), &user);
        if change != CellEditChange::Ignored {
            self.bus
                .publish(MultiplayerEvent::CellEditBroadcast { content, user });
        }
        change
    }

    /// The server acknowledged the in-flight transaction.
    pub fn on_transaction_ack(&mut self, id: TransactionId) -> MultiplayerResult<()> {
        self.queue.acknowledge(id)?;
        if self.queue.is_empty() && self.connection.state() == ConnectionState::Syncing {
            self.connection.handle(ConnectionSignal::SyncFinished)?;
        }
        Ok(())
    }

    // ========== Local (UI) ==========

    /// Switch the local user to another sheet.
    pub fn set_active_sheet(&mut self, sheet_id: SheetId) {
        if sheet_id == self.local.sheet_id {
            return;
        }
        debug!(sheet = %sheet_id, "active sheet changed");
        self.local.sheet_id = sheet_id.clone();
        self.local.selection = None;
        self.bus.publish(MultiplayerEvent::SheetChanged(sheet_id));
        self.broadcast_presence();
    }

    /// Move the local cursor and selection.
    pub fn move_cursor(&mut self, cursor: Pos, selection: Option<Rect>) {
        self.local.set_cursor(cursor, selection);
        self.bus.publish(MultiplayerEvent::CursorPositionChanged {
            cursor: self.local.cursor,
            selection: self.local.selection,
        });
        self.broadcast_presence();
    }

    /// Broadcast the local in-progress cell edit, or `None` when it ends.
    pub fn broadcast_cell_edit(&self, content: Option<&CellEdit>) {
        if !self.connection.is_online() {
            return;
        }
        let location = SheetPos::new(self.local.cursor, self.local.sheet_id.clone());
        self.network.send_cell_edit_broadcast(content, &location);
    }

    /// Choose a remote session to follow, or `None` to stop.
    ///
    /// Returns `false` if the choice was rejected (following oneself).
    pub fn follow(&mut self, target: Option<SessionId>) -> bool {
        self.follow.set_target(target, &self.presence)
    }

    /// Record a locally committed transaction.
    ///
    /// The transaction is always queued first; it is sent by the next
    /// [`flush`](Self::flush) or [`begin_send`](Self::begin_send).
    pub fn commit_transaction(
        &mut self,
        operation_count: usize,
        payload: Vec<u8>,
    ) -> TransactionId {
        self.queue.enqueue(operation_count, payload)
    }

    /// Take the next transaction to send, for drivers that deliver
    /// acknowledgments through [`on_transaction_ack`](Self::on_transaction_ack).
    ///
    /// Returns `Ok(None)` while offline or when nothing is pending.
    pub fn begin_send(&mut self) -> MultiplayerResult<Option<PendingTransaction>> {
        if !self.connection.is_online() || self.queue.is_empty() {
            return Ok(None);
        }
        if self.connection.state() == ConnectionState::Connected {
            self.connection.handle(ConnectionSignal::SyncStarted)?;
        }
        self.queue.begin_send()
    }

    /// Send every pending transaction through the network, in commit order,
    /// waiting for each acknowledgment before sending the next.
    ///
    /// Does nothing while offline. A send failure is treated as transport
    /// loss: the state moves to `waiting-to-reconnect` and the unacknowledged
    /// transaction stays queued for the next flush. Any other error ends the
    /// sync and returns to `connected`, again keeping the transaction queued.
    pub async fn flush(&mut self) -> MultiplayerResult<usize> {
        if !self.connection.is_online() || self.queue.is_empty() {
            return Ok(0);
        }
        if self.connection.state() == ConnectionState::Connected {
            self.connection.handle(ConnectionSignal::SyncStarted)?;
        }

        match self.queue.flush(self.network.as_ref()).await {
            Ok(flushed) => {
                self.connection.handle(ConnectionSignal::SyncFinished)?;
                Ok(flushed)
            }
            Err(err @ MultiplayerError::NetworkUnavailable(_)) => {
                self.connection.handle(ConnectionSignal::TransportLost)?;
                Err(err)
            }
            Err(err) => {
                if self.queue.in_flight().is_none() {
                    self.connection.handle(ConnectionSignal::SyncFinished)?;
                }
                Err(err)
            }
        }
    }

    fn broadcast_presence(&self) {
        if !self.connection.is_online() {
            return;
        }
        self.network.send_presence_update(
            self.local.cursor,
            self.local.selection,
            &self.local.sheet_id,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::RecordingNetwork;

    fn client() -> (MultiplayerClient<RecordingNetwork>, Arc<RecordingNetwork>) {
        let network = Arc::new(RecordingNetwork::new());
        let client = MultiplayerClient::new(
            MultiplayerConfig::default(),
            SessionId::from("me"),
            SheetId::from("Sheet1"),
            network.clone(),
        );
        (client, network)
    }

    fn connected() -> (MultiplayerClient<RecordingNetwork>, Arc<RecordingNetwork>) {
        let (mut client, network) = client();
        client.start().unwrap();
        client.on_connection_signal(ConnectionSignal::Connected).unwrap();
        (client, network)
    }

    #[test]
    fn test_start_publishes_and_connects() {
        let (mut client, _) = client();
        let mut sub = client.subscribe();
        client.start().unwrap();
        client.start().unwrap();

        assert!(client.is_started());
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
        let topics: Vec<_> = sub.drain().iter().map(|e| e.topic()).collect();
        assert_eq!(
            topics,
            vec![
                "connectionStateChanged",
                "pendingTransactionsChanged",
                "connectionStateChanged"
            ]
        );
    }

    #[test]
    fn test_presence_not_sent_while_offline() {
        let (mut client, network) = client();
        client.start().unwrap();
        client.move_cursor(Pos::new(1, 1), None);
        assert!(network.log().presence.is_empty());

        // reconnecting re-broadcasts the latest local presence
        client.on_connection_signal(ConnectionSignal::Connected).unwrap();
        let log = network.log();
        assert_eq!(log.presence.len(), 1);
        assert_eq!(log.presence[0].cursor, Pos::new(1, 1));
    }

    #[test]
    fn test_move_cursor_publishes_and_sends() {
        let (mut client, network) = connected();
        let mut sub = client.subscribe();
        let selection = Rect::new(Pos::new(1, 1), Pos::new(2, 2));
        client.move_cursor(Pos::new(1, 1), Some(selection));

        assert_eq!(
            sub.drain(),
            vec![MultiplayerEvent::CursorPositionChanged {
                cursor: Pos::new(1, 1),
                selection: Some(selection),
            }]
        );
        let log = network.log();
        assert_eq!(log.presence.last().map(|p| p.selection), Some(Some(selection)));
    }

    #[test]
    fn test_set_active_sheet() {
        let (mut client, network) = connected();
        let mut sub = client.subscribe();

        client.set_active_sheet(SheetId::from("Sheet1"));
        assert!(sub.drain().is_empty());

        client.set_active_sheet(SheetId::from("Sheet2"));
        assert_eq!(
            sub.drain(),
            vec![MultiplayerEvent::SheetChanged(SheetId::from("Sheet2"))]
        );
        assert_eq!(
            network.log().presence.last().map(|p| p.sheet_id.clone()),
            Some(SheetId::from("Sheet2"))
        );
    }

    #[test]
    fn test_leave_ends_cell_edit_and_follow() {
        let (mut client, _) = connected();
        client.on_presence(&PresenceUpdate::new("alice").sheet("Sheet1").cursor(0, 0));
        client.on_cell_edit(&SessionId::from("alice"), Some(CellEdit::text("hi")));
        assert!(client.follow(Some(SessionId::from("alice"))));
        assert_eq!(client.follow_target(), Some(&SessionId::from("alice")));

        let mut sub = client.subscribe();
        client.on_leave(&SessionId::from("alice"));

        assert!(client.cell_edits().is_empty());
        assert!(client.follow_target().is_none());
        let topics: Vec<_> = sub.drain().iter().map(|e| e.topic()).collect();
        assert_eq!(
            topics,
            vec!["presenceUpdated", "cellEditBroadcast", "followTargetChanged"]
        );
    }

    #[test]
    fn test_cell_edit_from_unknown_session() {
        let (mut client, _) = connected();
        let mut sub = client.subscribe();
        let change = client.on_cell_edit(&SessionId::from("ghost"), Some(CellEdit::text("x")));
        assert_eq!(change, CellEditChange::Ignored);
        assert!(sub.drain().is_empty());
    }

    #[test]
    fn test_local_cell_edit_broadcast() {
        let (mut client, network) = connected();
        client.move_cursor(Pos::new(3, 7), None);
        client.broadcast_cell_edit(Some(&CellEdit::text("42")));
        client.broadcast_cell_edit(None);

        let log = network.log();
        assert_eq!(log.cell_edits.len(), 2);
        assert_eq!(log.cell_edits[0].1.pos(), Pos::new(3, 7));
        assert_eq!(log.cell_edits[0].0.as_ref().map(|c| c.text.as_str()), Some("42"));
        assert!(log.cell_edits[1].0.is_none());
    }

    #[test]
    fn test_step_send_with_acks() {
        let (mut client, _) = connected();
        let a = client.commit_transaction(2, Vec::new());
        let b = client.commit_transaction(1, Vec::new());

        let sent = client.begin_send().unwrap().unwrap();
        assert_eq!(sent.id, a);
        assert_eq!(client.connection_state(), ConnectionState::Syncing);
        client.on_transaction_ack(a).unwrap();
        assert_eq!(client.pending_count(), (1, 1));

        assert_eq!(client.begin_send().unwrap().map(|tx| tx.id), Some(b));
        client.on_transaction_ack(b).unwrap();
        assert_eq!(client.pending_count(), (0, 0));
        assert_eq!(client.connection_state(), ConnectionState::Connected);
    }

    #[test]
    fn test_begin_send_offline_is_noop() {
        let (mut client, _) = client();
        client.start().unwrap();
        client.commit_transaction(1, Vec::new());
        assert_eq!(client.begin_send(), Ok(None));
        assert_eq!(client.pending_count(), (1, 1));
    }

    #[test]
    fn test_transport_loss_interrupts_send() {
        let (mut client, _) = connected();
        let a = client.commit_transaction(1, Vec::new());
        client.begin_send().unwrap();
        client.on_connection_signal(ConnectionSignal::TransportLost).unwrap();

        assert_eq!(client.queue().in_flight(), None);
        assert_eq!(client.queue().head().map(|tx| tx.id), Some(a));
        assert!(client.broken_connection());
    }

    #[tokio::test]
    async fn test_flush_moves_through_syncing() {
        let (mut client, network) = connected();
        client.commit_transaction(1, Vec::new());
        client.commit_transaction(1, Vec::new());
        let mut sub = client.subscribe();

        assert_eq!(client.flush().await.unwrap(), 2);
        assert_eq!(network.log().transactions.len(), 2);

        let states: Vec<_> = sub
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                MultiplayerEvent::ConnectionStateChanged { state, .. } => Some(state),
                _ => None,
            })
            .collect();
        assert_eq!(states, vec![ConnectionState::Syncing, ConnectionState::Connected]);
    }

    #[tokio::test]
    async fn test_flush_failure_is_transport_loss() {
        let network = Arc::new(RecordingNetwork::failing_after(0));
        let mut client = MultiplayerClient::new(
            MultiplayerConfig::default(),
            SessionId::from("me"),
            SheetId::from("Sheet1"),
            network,
        );
        client.start().unwrap();
        client.on_connection_signal(ConnectionSignal::Connected).unwrap();
        client.commit_transaction(3, Vec::new());

        assert!(client.flush().await.is_err());
        assert_eq!(client.connection_state(), ConnectionState::WaitingToReconnect);
        assert!(client.broken_connection());
        assert_eq!(client.pending_count(), (1, 3));
    }

    #[tokio::test]
    async fn test_flush_offline_is_noop() {
        let (mut client, network) = client();
        client.start().unwrap();
        client.commit_transaction(1, Vec::new());
        assert_eq!(client.flush().await, Ok(0));
        assert!(network.log().transactions.is_empty());
    }

    #[test]
    fn test_shutdown_persists_and_clears() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("queue.json");
        let network = Arc::new(RecordingNetwork::new());
        let config = MultiplayerConfig::new().with_storage(&path);

        {
            let mut client = MultiplayerClient::new(
                config.clone(),
                SessionId::from("me"),
                SheetId::from("Sheet1"),
                network.clone(),
            );
            client.start().unwrap();
            client.on_presence(&PresenceUpdate::new("alice").sheet("Sheet1"));
            client.commit_transaction(4, b"edit".to_vec());
            client.shutdown();
            assert!(client.presence().is_empty());
            assert!(!client.is_started());
        }

        let mut client = MultiplayerClient::new(
            config,
            SessionId::from("me"),
            SheetId::from("Sheet1"),
            network,
        );
        client.start().unwrap();
        assert_eq!(client.pending_count(), (1, 4));
    }

    #[test]
    fn test_restart_after_shutdown() {
        let (mut client, network) = connected();
        client.on_connection_signal(ConnectionSignal::TransportLost).unwrap();
        assert!(client.broken_connection());
        client.shutdown();
        assert_eq!(client.connection_state(), ConnectionState::Startup);
        assert!(!client.broken_connection());

        client.start().unwrap();
        assert!(client.is_started());
        assert_eq!(client.connection_state(), ConnectionState::Connecting);
        assert_eq!(client.status().message, "Connecting…");

        client.on_connection_signal(ConnectionSignal::Connected).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Connected);
        assert_eq!(network.log().presence.len(), 2);
    }

    #[test]
    fn test_shutdown_ends_live_cell_edits() {
        let (mut client, _) = connected();
        client.on_presence(&PresenceUpdate::new("alice").sheet("Sheet1").cursor(1, 1));
        client.on_cell_edit(&SessionId::from("alice"), Some(CellEdit::text("=SUM(")));
        let mut sub = client.subscribe();

        client.shutdown();

        let events = sub.drain();
        let topics: Vec<_> = events.iter().map(|e| e.topic()).collect();
        assert_eq!(
            topics,
            vec!["cellEditBroadcast", "presenceUpdated", "connectionStateChanged"]
        );
        match &events[0] {
            MultiplayerEvent::CellEditBroadcast { content, user } => {
                assert!(content.is_none());
                assert_eq!(user.session_id, SessionId::from("alice"));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(client.cell_edits().is_empty());
    }

    #[tokio::test]
    async fn test_flush_during_step_send_keeps_syncing() {
        let (mut client, _) = connected();
        let id = client.commit_transaction(1, Vec::new());
        client.begin_send().unwrap();

        assert_eq!(client.flush().await, Err(MultiplayerError::FlushInProgress));
        assert_eq!(client.connection_state(), ConnectionState::Syncing);
        assert_eq!(client.queue().in_flight(), Some(id));

        client.on_transaction_ack(id).unwrap();
        assert_eq!(client.connection_state(), ConnectionState::Connected);
    }

    /// Acknowledges every transaction with an ID it never sent.
    struct MisackNetwork;

    impl Network for MisackNetwork {
        fn send_presence_update(&self, _: Pos, _: Option<Rect>, _: &SheetId) {}

        fn send_cell_edit_broadcast(&self, _: Option<&CellEdit>, _: &SheetPos) {}

        async fn send_transaction(
            &self,
            transaction: &PendingTransaction,
        ) -> MultiplayerResult<TransactionId> {
            Ok(TransactionId(transaction.id.0 + 100))
        }
    }

    #[tokio::test]
    async fn test_flush_ack_mismatch_ends_sync() {
        let mut client = MultiplayerClient::new(
            MultiplayerConfig::default(),
            SessionId::from("me"),
            SheetId::from("Sheet1"),
            Arc::new(MisackNetwork),
        );
        client.start().unwrap();
        client.on_connection_signal(ConnectionSignal::Connected).unwrap();
        let id = client.commit_transaction(2, Vec::new());

        assert_eq!(
            client.flush().await,
            Err(MultiplayerError::AckMismatch {
                expected: id,
                actual: TransactionId(id.0 + 100),
            })
        );
        assert_eq!(client.connection_state(), ConnectionState::Connected);
        assert!(!client.broken_connection());
        assert_eq!(client.queue().in_flight(), None);
        assert_eq!(client.pending_count(), (1, 2));
        assert_eq!(client.status().message, "Connected");
    }
}
