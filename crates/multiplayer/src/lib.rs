//! Real-time collaboration core for a multi-user spreadsheet client.
//!
//! This crate tracks the health of the link to the collaboration server,
//! queues local transactions while offline, and merges remote presence
//! (cursors, selections, in-progress cell edits and follow relations) into a
//! consistent local view. It renders nothing and never interprets document
//! content: transactions are opaque payloads and cell edits are carried as is.
//!
//! # Modules
//!
//! - `events`: Typed event bus connecting the core to UI collaborators
//! - `connection`: Connection state machine and broken-connection tracking
//! - `queue`: Offline transaction queue with ordered, acknowledged flushing
//! - `presence`: Registry of remote sessions and the local presence
//! - `follow`: Cycle-safe follow resolution and follower tracking
//! - `cell_edit`: Merged view of remote in-progress cell edits
//! - `network`: Outbound boundary to the network layer
//! - `client`: The explicitly constructed handle tying everything together
//! - `status`: Status-bar information derived from connection and queue state
//! - `config`: Client configuration
//! - `error`: Error types for the multiplayer crate
//!
//! # Example
//!
//! ```
//! use multiplayer::{
//!     EventBus, MultiplayerEvent, PresenceRegistry, PresenceUpdate, SessionId, SheetId,
//! };
//!
//! let bus = EventBus::new(16);
//! let mut events = bus.subscribe();
//! let mut registry = PresenceRegistry::new(SessionId::from("me"), bus);
//!
//! registry.upsert(&PresenceUpdate::new("alice").sheet("Sheet1").cursor(2, 5));
//! registry.upsert(&PresenceUpdate::new("bob").sheet("Sheet2"));
//!
//! let on_sheet1 = registry.list_for_sheet(&SheetId::from("Sheet1"));
//! assert_eq!(on_sheet1.len(), 1);
//! assert!(matches!(events.try_next(), Some(MultiplayerEvent::PresenceUpdated(_))));
//! ```

pub mod cell_edit;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod events;
pub mod follow;
pub mod network;
pub mod presence;
pub mod queue;
pub mod status;
pub mod types;

// Re-export commonly used types
pub use cell_edit::{CellEdit, CellEditBroadcast, CellEditBroadcastMerger, CellEditChange};
pub use client::MultiplayerClient;
pub use config::MultiplayerConfig;
pub use connection::{ConnectionSignal, ConnectionState, ConnectionStateMachine};
pub use error::{MultiplayerError, MultiplayerResult};
pub use events::{EventBus, MultiplayerEvent, Subscription};
pub use follow::{resolve_follow, FollowGraph};
pub use network::{Network, NetworkLog, RecordingNetwork, SentPresence};
pub use presence::{
    CursorUpdate, FollowUpdate, LocalPresence, PresenceRegistry, PresenceUpdate, RemoteUser,
    SelectionUpdate, UpsertOutcome,
};
pub use queue::{OfflineQueueState, OfflineTransactionQueue, PendingTransaction, TransactionId};
pub use status::{StatusIndicator, SyncStatusInfo};
pub use types::{Pos, Rect, SessionId, SheetId, SheetPos};
