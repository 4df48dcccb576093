//! Follow resolution for the local user.
//!
//! Follow relations are stored per session as a general directed edge, so the
//! chain starting at the local user's choice is walked with a visited set. A
//! cycle or a dangling edge anywhere along the chain resolves to "not
//! following". Resolution is recomputed from the registry after every change,
//! so a followed user leaving cancels the follow without any extra bookkeeping.

use crate::events::{EventBus, MultiplayerEvent};
use crate::presence::PresenceRegistry;
use crate::types::SessionId;
use std::collections::HashSet;
use tracing::debug;

/// Resolve the session `local` should follow, given its chosen `target`.
///
/// Returns the chosen target only if every hop from it reaches a known user
/// and the chain ends without revisiting a session (the local one included).
pub fn resolve_follow(
    local: &SessionId,
    target: Option<&SessionId>,
    registry: &PresenceRegistry,
) -> Option<SessionId> {
    let first = target?;
    let mut seen: HashSet<&SessionId> = HashSet::from([local]);
    let mut current = first;
    loop {
        if !seen.insert(current) {
            debug!(target = %first, at = %current, "follow chain has a cycle");
            return None;
        }
        let Some(user) = registry.get(current) else {
            debug!(target = %first, missing = %current, "follow chain reaches unknown session");
            return None;
        };
        match &user.follow_target {
            Some(next) => current = next,
            None => return Some(first.clone()),
        }
    }
}

/// The local user's follow choice and derived follow state.
#[derive(Debug)]
pub struct FollowGraph {
    local: SessionId,
    /// Session the local user asked to follow.
    target: Option<SessionId>,
    /// Last resolved target.
    resolved: Option<SessionId>,
    /// Sessions currently following the local user.
    followers: Vec<SessionId>,
    bus: EventBus,
}

impl FollowGraph {
    pub fn new(local: SessionId, bus: EventBus) -> Self {
        Self {
            local,
            target: None,
            resolved: None,
            followers: Vec::new(),
            bus,
        }
    }

    /// Session the local user asked to follow, resolvable or not.
    pub fn target(&self) -> Option<&SessionId> {
        self.target.as_ref()
    }

    /// Session the view is actually following.
    pub fn resolved(&self) -> Option<&SessionId> {
        self.resolved.as_ref()
    }

    /// Sessions following the local user, in display order.
    pub fn followers(&self) -> &[SessionId] {
        &self.followers
    }

    /// Choose a session to follow, or `None` to stop following.
    ///
    /// Following oneself is rejected and leaves the current choice in place;
    /// returns whether the choice was accepted.
    pub fn set_target(&mut self, target: Option<SessionId>, registry: &PresenceRegistry) -> bool {
        if target.as_ref() == Some(&self.local) {
            debug!("rejected self-follow");
            return false;
        }
        self.target = target;
        self.refresh(registry);
        true
    }

    /// Recompute the resolved target and follower set, publishing what changed.
    pub fn refresh(&mut self, registry: &PresenceRegistry) {
        let resolved = resolve_follow(&self.local, self.target.as_ref(), registry);
        if resolved != self.resolved {
            debug!(from = ?self.resolved, to = ?resolved, "follow target changed");
            self.resolved = resolved.clone();
            self.bus
                .publish(MultiplayerEvent::FollowTargetChanged(resolved));
        }

        let followers = registry.followers_of(&self.local);
        if followers != self.followers {
            self.followers = followers.clone();
            self.bus.publish(MultiplayerEvent::FollowChanged(followers));
        }
    }

    /// Forget the follow choice and derived state, e.g. on shutdown.
    pub fn reset(&mut self) {
        self.target = None;
        if self.resolved.take().is_some() {
            self.bus.publish(MultiplayerEvent::FollowTargetChanged(None));
        }
        if !self.followers.is_empty() {
            self.followers.clear();
            self.bus.publish(MultiplayerEvent::FollowChanged(Vec::new()));
        }
    }
}
