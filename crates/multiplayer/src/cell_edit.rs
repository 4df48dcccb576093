//! In-progress cell edits of remote users.
//!
//! Each remote session has at most one live edit. Entries are stored for all
//! sheets; callers filter by the sheet the local user is viewing. Updating an
//! existing session's edit keeps its slot, so the relative order of the other
//! entries never changes.

use crate::presence::RemoteUser;
use crate::types::{SessionId, SheetId, SheetPos};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Contents of a cell editor as broadcast by its owner.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEdit {
    /// Text currently in the editor.
    pub text: String,
    /// Caret offset within `text`.
    pub cursor: u32,
    /// The edit is happening in the code editor rather than in-cell.
    pub code_editor: bool,
    /// The edit is an inline formula/code edit.
    pub inline_code_editor: bool,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
}

impl CellEdit {
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            cursor: u32::try_from(text.chars().count()).unwrap_or(u32::MAX),
            text,
            ..Self::default()
        }
    }
}

/// A remote user's live cell edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEditBroadcast {
    pub session_id: SessionId,
    pub sheet_id: SheetId,
    /// Display color of the editing user.
    pub color: Option<String>,
    pub content: CellEdit,
    pub location: SheetPos,
}

/// What applying a cell-edit signal did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellEditChange {
    Inserted,
    Replaced,
    Removed,
    /// Nothing to do: an end signal with no live edit, or a user with no
    /// known cursor position.
    Ignored,
}

/// Merged view of every live remote cell edit.
#[derive(Clone, Debug, Default)]
pub struct CellEditBroadcastMerger {
    entries: Vec<CellEditBroadcast>,
}

impl CellEditBroadcastMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a cell-edit signal from `user`. `None` content ends the edit.
    pub fn apply(&mut self, content: Option<CellEdit>, user: &RemoteUser) -> CellEditChange {
        let slot = self
            .entries
            .iter()
            .position(|entry| entry.session_id == user.session_id);

        let Some(content) = content else {
            return match slot {
                Some(slot) => {
                    self.entries.remove(slot);
                    debug!(session = %user.session_id, "cell edit ended");
                    CellEditChange::Removed
                }
                None => CellEditChange::Ignored,
            };
        };

        let (Some(cursor), Some(sheet_id)) = (user.cursor, user.sheet_id.clone()) else {
            debug!(session = %user.session_id, "cell edit from user without a cursor");
            return CellEditChange::Ignored;
        };

        let entry = CellEditBroadcast {
            session_id: user.session_id.clone(),
            location: SheetPos::new(cursor, sheet_id.clone()),
            sheet_id,
            color: user.color.clone(),
            content,
        };

        match slot {
            Some(slot) => {
                self.entries[slot] = entry;
                CellEditChange::Replaced
            }
            None => {
                debug!(session = %user.session_id, "cell edit started");
                self.entries.push(entry);
                CellEditChange::Inserted
            }
        }
    }

    /// Drop a session's edit, e.g. when it leaves.
    pub fn remove_session(&mut self, session_id: &SessionId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.session_id != *session_id);
        self.entries.len() != before
    }

    pub fn get(&self, session_id: &SessionId) -> Option<&CellEditBroadcast> {
        self.entries
            .iter()
            .find(|entry| entry.session_id == *session_id)
    }

    /// Every live edit, across all sheets.
    pub fn entries(&self) -> &[CellEditBroadcast] {
        &self.entries
    }

    /// Live edits on `sheet_id`.
    pub fn visible_on(&self, sheet_id: &SheetId) -> Vec<&CellEditBroadcast> {
        self.entries
            .iter()
            .filter(|entry| entry.sheet_id == *sheet_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every live edit, returning them in their current order.
    pub fn take_all(&mut self) -> Vec<CellEditBroadcast> {
        std::mem::take(&mut self.entries)
    }
}
