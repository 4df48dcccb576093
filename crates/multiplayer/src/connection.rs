//! Connection state tracking for the collaboration server link.
//!
//! The network layer is the only writer: it reports what happened through
//! [`ConnectionSignal`]s and the state machine translates them into a single
//! authoritative [`ConnectionState`]. Every change is published with the full
//! new state so subscribers never need to reconstruct it from a history.
//!
//! ```text
//! startup -> connecting -> connected <-> syncing
//!               ^  |           |
//!               |  v           v
//!        waiting-to-reconnect <-+
//!               |  ^
//!               v  |
//!            no-internet
//! ```

use crate::error::{MultiplayerError, MultiplayerResult};
use crate::events::{EventBus, MultiplayerEvent};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

/// Connection state as seen by the rest of the application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    /// Initial state before the first connection attempt.
    #[default]
    Startup,
    /// A connection attempt is in progress.
    Connecting,
    /// The transport dropped; a retry is scheduled.
    WaitingToReconnect,
    /// Connected and sending locally queued transactions.
    Syncing,
    /// Connected and up to date.
    Connected,
    /// The local network itself is down.
    NoInternet,
}

impl ConnectionState {
    /// All states, in declaration order.
    pub const ALL: [ConnectionState; 6] = [
        ConnectionState::Startup,
        ConnectionState::Connecting,
        ConnectionState::WaitingToReconnect,
        ConnectionState::Syncing,
        ConnectionState::Connected,
        ConnectionState::NoInternet,
    ];

    /// Check if the server link is up (`connected` or `syncing`).
    pub fn is_online(self) -> bool {
        matches!(self, ConnectionState::Connected | ConnectionState::Syncing)
    }

    /// Check if a transition from `self` to `to` is allowed.
    pub fn can_transition_to(self, to: ConnectionState) -> bool {
        use ConnectionState::*;
        match (self, to) {
            (Startup, Connecting) => true,
            (Connecting, Connected | WaitingToReconnect | NoInternet) => true,
            (Connected, Syncing | WaitingToReconnect | NoInternet) => true,
            (Syncing, Connected | WaitingToReconnect | NoInternet) => true,
            (WaitingToReconnect, Connecting | NoInternet) => true,
            (NoInternet, Connecting) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Startup => "startup",
            ConnectionState::Connecting => "connecting",
            ConnectionState::WaitingToReconnect => "waiting-to-reconnect",
            ConnectionState::Syncing => "syncing",
            ConnectionState::Connected => "connected",
            ConnectionState::NoInternet => "no-internet",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the network layer observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionSignal {
    /// A connection attempt started (first attempt or retry).
    Connecting,
    /// The server accepted the connection.
    Connected,
    /// Queued transactions started flowing to the server.
    SyncStarted,
    /// Queued transactions are all acknowledged.
    SyncFinished,
    /// The transport closed or errored; the retry layer will try again.
    TransportLost,
    /// The retry layer determined the local network is down.
    NoInternet,
    /// Local connectivity came back.
    InternetRestored,
}

impl ConnectionSignal {
    /// State this signal moves the machine into.
    pub fn target(self) -> ConnectionState {
        match self {
            ConnectionSignal::Connecting | ConnectionSignal::InternetRestored => {
                ConnectionState::Connecting
            }
            ConnectionSignal::Connected | ConnectionSignal::SyncFinished => {
                ConnectionState::Connected
            }
            ConnectionSignal::SyncStarted => ConnectionState::Syncing,
            ConnectionSignal::TransportLost => ConnectionState::WaitingToReconnect,
            ConnectionSignal::NoInternet => ConnectionState::NoInternet,
        }
    }
}

/// Owner of the single authoritative connection state.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    /// Set when a previously connected session drops, cleared on reconnection.
    broken_connection: bool,
    /// Whether the machine has ever reached `connected`.
    ever_connected: bool,
    transitions: u64,
    bus: EventBus,
}

impl ConnectionStateMachine {
    /// Create a state machine in `startup` publishing to `bus`.
    pub fn new(bus: EventBus) -> Self {
        Self {
            state: ConnectionState::Startup,
            broken_connection: false,
            ever_connected: false,
            transitions: 0,
            bus,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Whether the link is recovering from an unexpected drop.
    pub fn broken_connection(&self) -> bool {
        self.broken_connection
    }

    /// Whether the machine has ever reached `connected`.
    pub fn ever_connected(&self) -> bool {
        self.ever_connected
    }

    /// Number of transitions applied so far.
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn is_online(&self) -> bool {
        self.state.is_online()
    }

    /// Apply a signal from the network layer.
    ///
    /// Returns `Ok(true)` if the state changed, `Ok(false)` if the signal
    /// restated the current state. Disallowed transitions leave the state
    /// untouched and are reported back to the caller.
    pub fn handle(&mut self, signal: ConnectionSignal) -> MultiplayerResult<bool> {
        self.transition_to(signal.target())
    }

    /// Move directly to `to`, subject to the transition table.
    pub fn transition_to(&mut self, to: ConnectionState) -> MultiplayerResult<bool> {
        let from = self.state;
        if from == to {
            debug!(state = %to, "connection state unchanged");
            return Ok(false);
        }
        if !from.can_transition_to(to) {
            warn!(%from, %to, "rejected connection transition");
            return Err(MultiplayerError::InvalidTransition { from, to });
        }

        let dropped = matches!(
            to,
            ConnectionState::WaitingToReconnect | ConnectionState::NoInternet
        );
        if from.is_online() && dropped {
            if !self.broken_connection {
                warn!(%from, %to, "connection dropped unexpectedly");
            }
            self.broken_connection = true;
        }
        if to == ConnectionState::Connected {
            if self.broken_connection {
                info!("connection recovered");
            }
            self.broken_connection = false;
            self.ever_connected = true;
        }

        self.state = to;
        self.transitions += 1;
        info!(%from, %to, broken = self.broken_connection, "connection state changed");
        self.publish();
        Ok(true)
    }

    /// Return to `startup` for a fresh session, publishing if anything changed.
    pub fn reset(&mut self) {
        let changed = self.state != ConnectionState::Startup || self.broken_connection;
        self.state = ConnectionState::Startup;
        self.broken_connection = false;
        self.ever_connected = false;
        if changed {
            info!("connection state reset");
            self.publish();
        }
    }

    /// Re-publish the current state, e.g. for a freshly attached UI.
    pub fn publish(&self) {
        self.bus.publish(MultiplayerEvent::ConnectionStateChanged {
            state: self.state,
            broken_connection: self.broken_connection,
        });
    }
}
