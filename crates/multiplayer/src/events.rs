//! Typed publish/subscribe bus connecting the multiplayer core to UI collaborators.
//!
//! Every event carries the full current value of whatever changed rather than
//! a delta, so a subscriber that lags or misses an event resynchronizes on the
//! next one it receives.

use crate::cell_edit::CellEdit;
use crate::connection::ConnectionState;
use crate::presence::RemoteUser;
use crate::types::{Pos, Rect, SessionId, SheetId};
use tokio::sync::broadcast;
use tracing::{trace, warn};

/// Events emitted by the multiplayer core.
#[derive(Clone, Debug, PartialEq)]
pub enum MultiplayerEvent {
    /// The connection state machine moved to a new state.
    ConnectionStateChanged {
        state: ConnectionState,
        broken_connection: bool,
    },
    /// The presence registry changed; carries every known remote user in display order.
    PresenceUpdated(Vec<RemoteUser>),
    /// The set of remote sessions following the local user changed.
    FollowChanged(Vec<SessionId>),
    /// The resolved camera-follow target of the local user changed.
    FollowTargetChanged(Option<SessionId>),
    /// A remote cell edit started, changed (`Some`) or ended (`None`).
    CellEditBroadcast {
        content: Option<CellEdit>,
        user: RemoteUser,
    },
    /// The offline queue changed.
    PendingTransactionsChanged {
        transactions: usize,
        operations: usize,
    },
    /// The local user switched to another sheet.
    SheetChanged(SheetId),
    /// The local cursor moved.
    CursorPositionChanged {
        cursor: Pos,
        selection: Option<Rect>,
    },
}

impl MultiplayerEvent {
    /// Stable topic name, used for logging.
    pub fn topic(&self) -> &'static str {
        match self {
            MultiplayerEvent::ConnectionStateChanged { .. } => "connectionStateChanged",
            MultiplayerEvent::PresenceUpdated(_) => "presenceUpdated",
            MultiplayerEvent::FollowChanged(_) => "followChanged",
            MultiplayerEvent::FollowTargetChanged(_) => "followTargetChanged",
            MultiplayerEvent::CellEditBroadcast { .. } => "cellEditBroadcast",
            MultiplayerEvent::PendingTransactionsChanged { .. } => "pendingTransactionsChanged",
            MultiplayerEvent::SheetChanged(_) => "sheetChanged",
            MultiplayerEvent::CursorPositionChanged { .. } => "cursorPositionChanged",
        }
    }
}

/// Broadcast-backed event bus.
///
/// Cloning the bus is cheap; every clone publishes into the same channel.
#[derive(Clone, Debug)]
pub struct EventBus {
    sender: broadcast::Sender<MultiplayerEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to every event published from now on.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// Publish an event. Never blocks; with no subscribers the event is dropped.
    pub fn publish(&self, event: MultiplayerEvent) {
        let topic = event.topic();
        match self.sender.send(event) {
            Ok(receivers) => trace!(topic, receivers, "event published"),
            Err(_) => trace!(topic, "event published with no subscribers"),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// A subscriber's view of the bus.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<MultiplayerEvent>,
}

impl Subscription {
    /// Wait for the next event. Returns `None` once every bus handle is dropped.
    pub async fn recv(&mut self) -> Option<MultiplayerEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged behind the event bus");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<MultiplayerEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber lagged behind the event bus");
                }
                Err(_) => return None,
            }
        }
    }

    /// Take every buffered event without waiting.
    pub fn drain(&mut self) -> Vec<MultiplayerEvent> {
        std::iter::from_fn(|| self.try_next()).collect()
    }
}
