//! Presence registry for remote collaborators.
//!
//! Tracks every remote session's sheet, cursor, selection, color and follow
//! target. Sessions are kept in join order: each one receives an `index` when
//! it first appears, the index is never reused, and every list this module
//! returns is ordered by it so avatars do not reorder on unrelated updates.

use crate::events::{EventBus, MultiplayerEvent};
use crate::types::{Pos, Rect, SessionId, SheetId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// A remote collaborator session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub session_id: SessionId,
    /// Join order, used only for stable display ordering.
    pub index: u64,
    /// Sheet the user is looking at.
    pub sheet_id: Option<SheetId>,
    pub cursor: Option<Pos>,
    /// Multi-cell selection; `None` when only the cursor cell is selected.
    pub selection: Option<Rect>,
    /// Display color assigned by the server.
    pub color: Option<String>,
    pub display_name: Option<String>,
    /// Session this user is following.
    pub follow_target: Option<SessionId>,
    /// Whether the user's tab is in the foreground.
    pub visible: bool,
}

impl RemoteUser {
    fn new(session_id: SessionId, index: u64) -> Self {
        Self {
            session_id,
            index,
            sheet_id: None,
            cursor: None,
            selection: None,
            color: None,
            display_name: None,
            follow_target: None,
            visible: true,
        }
    }

    /// Check if the user is on `sheet_id`.
    pub fn is_on_sheet(&self, sheet_id: &SheetId) -> bool {
        self.sheet_id.as_ref() == Some(sheet_id)
    }
}

/// Cursor coordinates as received; either coordinate may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorUpdate {
    pub x: Option<i64>,
    pub y: Option<i64>,
}

impl CursorUpdate {
    fn resolve(self) -> Option<Pos> {
        Some(Pos::new(self.x?, self.y?))
    }
}

/// Selection as received. Both corners absent means a single-cell selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionUpdate {
    pub min: Option<Pos>,
    pub max: Option<Pos>,
}

impl SelectionUpdate {
    /// `Some(None)` clears the selection, `None` means the update is malformed.
    fn resolve(self) -> Option<Option<Rect>> {
        match (self.min, self.max) {
            (None, None) => Some(None),
            (Some(min), Some(max)) => {
                let rect = Rect::new(min, max);
                Some((!rect.is_single_cell()).then_some(rect))
            }
            _ => None,
        }
    }
}

/// Change to a user's follow target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FollowUpdate {
    Follow(SessionId),
    Unfollow,
}

/// Incremental presence update for one session. Absent fields are left unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub session_id: SessionId,
    #[serde(default)]
    pub sheet_id: Option<SheetId>,
    #[serde(default)]
    pub cursor: Option<CursorUpdate>,
    #[serde(default)]
    pub selection: Option<SelectionUpdate>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub follow: Option<FollowUpdate>,
    #[serde(default)]
    pub visible: Option<bool>,
}

impl PresenceUpdate {
    /// An update for `session_id` that changes nothing.
    pub fn new(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            sheet_id: None,
            cursor: None,
            selection: None,
            color: None,
            display_name: None,
            follow: None,
            visible: None,
        }
    }

    pub fn sheet(mut self, sheet_id: impl Into<SheetId>) -> Self {
        self.sheet_id = Some(sheet_id.into());
        self
    }

    pub fn cursor(mut self, x: i64, y: i64) -> Self {
        self.cursor = Some(CursorUpdate {
            x: Some(x),
            y: Some(y),
        });
        self
    }

    pub fn selection(mut self, min: Pos, max: Pos) -> Self {
        self.selection = Some(SelectionUpdate {
            min: Some(min),
            max: Some(max),
        });
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn follow(mut self, target: impl Into<SessionId>) -> Self {
        self.follow = Some(FollowUpdate::Follow(target.into()));
        self
    }

    pub fn unfollow(mut self) -> Self {
        self.follow = Some(FollowUpdate::Unfollow);
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = Some(visible);
        self
    }

    /// Check if the update carries no fields.
    pub fn is_empty(&self) -> bool {
        self.sheet_id.is_none()
            && self.cursor.is_none()
            && self.selection.is_none()
            && self.color.is_none()
            && self.display_name.is_none()
            && self.follow.is_none()
            && self.visible.is_none()
    }

    /// Apply the well-formed fields of this update to `user`.
    fn apply_to(&self, user: &mut RemoteUser) {
        if let Some(sheet_id) = &self.sheet_id {
            user.sheet_id = Some(sheet_id.clone());
        }
        if let Some(cursor) = self.cursor {
            match cursor.resolve() {
                Some(pos) => user.cursor = Some(pos),
                None => {
                    debug!(session = %user.session_id, "dropping cursor with missing coordinate")
                }
            }
        }
        if let Some(selection) = self.selection {
            match selection.resolve() {
                Some(rect) => user.selection = rect,
                None => {
                    debug!(session = %user.session_id, "dropping selection with missing corner")
                }
            }
        }
        if let Some(color) = &self.color {
            user.color = Some(color.clone());
        }
        if let Some(name) = &self.display_name {
            user.display_name = Some(name.clone());
        }
        match &self.follow {
            Some(FollowUpdate::Follow(target)) if *target == user.session_id => {
                debug!(session = %user.session_id, "ignoring self-follow");
            }
            Some(FollowUpdate::Follow(target)) => user.follow_target = Some(target.clone()),
            Some(FollowUpdate::Unfollow) => user.follow_target = None,
            None => {}
        }
        if let Some(visible) = self.visible {
            user.visible = visible;
        }
    }
}

/// What an upsert did to the registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new session joined.
    Inserted,
    /// An existing session changed.
    Updated,
    /// The update restated what was already known.
    Unchanged,
    /// Empty update for an unknown session, or an echo of the local session.
    Ignored,
}

/// Registry of remote sessions, in join order.
#[derive(Debug)]
pub struct PresenceRegistry {
    local_session: SessionId,
    /// Sorted by `index`; new sessions are appended with the next index.
    users: Vec<RemoteUser>,
    next_index: u64,
    bus: EventBus,
}

impl PresenceRegistry {
    /// Create an empty registry for the local session `local_session`.
    pub fn new(local_session: SessionId, bus: EventBus) -> Self {
        Self {
            local_session,
            users: Vec::new(),
            next_index: 0,
            bus,
        }
    }

    pub fn local_session(&self) -> &SessionId {
        &self.local_session
    }

    /// Merge an incremental update. Never removes a session.
    pub fn upsert(&mut self, update: &PresenceUpdate) -> UpsertOutcome {
        if update.session_id == self.local_session {
            debug!("ignoring presence echo for local session");
            return UpsertOutcome::Ignored;
        }

        let outcome = match self.position(&update.session_id) {
            Some(slot) => {
                let user = &mut self.users[slot];
                let before = user.clone();
                update.apply_to(user);
                if *user == before {
                    UpsertOutcome::Unchanged
                } else {
                    UpsertOutcome::Updated
                }
            }
            None if update.is_empty() => return UpsertOutcome::Ignored,
            None => {
                let mut user = RemoteUser::new(update.session_id.clone(), self.next_index);
                self.next_index += 1;
                update.apply_to(&mut user);
                info!(session = %user.session_id, index = user.index, "user joined");
                self.users.push(user);
                UpsertOutcome::Inserted
            }
        };

        self.publish();
        outcome
    }

    /// Remove a session after an explicit leave.
    pub fn remove(&mut self, session_id: &SessionId) -> Option<RemoteUser> {
        let slot = self.position(session_id)?;
        let user = self.users.remove(slot);
        info!(session = %session_id, "user left");
        self.publish();
        Some(user)
    }

    /// Drop every session, e.g. on shutdown.
    pub fn clear(&mut self) {
        if !self.users.is_empty() {
            self.users.clear();
            self.publish();
        }
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&RemoteUser> {
        self.users.iter().find(|user| user.session_id == *session_id)
    }

    /// All remote users in display order.
    pub fn users(&self) -> &[RemoteUser] {
        &self.users
    }

    /// Users on `sheet_id`, in display order.
    pub fn list_for_sheet(&self, sheet_id: &SheetId) -> Vec<&RemoteUser> {
        self.users
            .iter()
            .filter(|user| user.is_on_sheet(sheet_id))
            .collect()
    }

    /// Sessions whose follow target is `session_id`, in display order.
    pub fn followers_of(&self, session_id: &SessionId) -> Vec<SessionId> {
        self.users
            .iter()
            .filter(|user| user.follow_target.as_ref() == Some(session_id))
            .map(|user| user.session_id.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Publish the full user list.
    pub fn publish(&self) {
        self.bus
            .publish(MultiplayerEvent::PresenceUpdated(self.users.clone()));
    }

    fn position(&self, session_id: &SessionId) -> Option<usize> {
        self.users
            .iter()
            .position(|user| user.session_id == *session_id)
    }
}

/// The local session's own presence, broadcast to everyone else.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalPresence {
    pub session_id: SessionId,
    pub sheet_id: SheetId,
    pub cursor: Pos,
    pub selection: Option<Rect>,
}

impl LocalPresence {
    pub fn new(session_id: SessionId, sheet_id: SheetId) -> Self {
        Self {
            session_id,
            sheet_id,
            cursor: Pos::default(),
            selection: None,
        }
    }

    /// Move the cursor; a single-cell selection is stored as `None`.
    pub fn set_cursor(&mut self, cursor: Pos, selection: Option<Rect>) {
        self.cursor = cursor;
        self.selection = selection.filter(|rect| !rect.is_single_cell());
    }
}
