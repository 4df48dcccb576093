//! Identifiers and grid geometry shared by the multiplayer components.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one collaborator session.
///
/// A single user may hold several sessions at once (e.g. two browser tabs),
/// so this is never used as a user identity.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Create a session ID from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        SessionId(id.into())
    }

    /// Generate a new unique session ID.
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        SessionId(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        SessionId(s)
    }
}

/// Identifier of a sheet within the open spreadsheet.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetId(pub String);

impl SheetId {
    pub fn new(id: impl Into<String>) -> Self {
        SheetId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SheetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SheetId {
    fn from(s: &str) -> Self {
        SheetId(s.to_string())
    }
}

/// A cell coordinate on a sheet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pos {
    pub x: i64,
    pub y: i64,
}

impl Pos {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A rectangular multi-cell selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub min: Pos,
    pub max: Pos,
}

impl Rect {
    /// Create a rectangle, normalizing the corners so `min <= max` on both axes.
    pub fn new(a: Pos, b: Pos) -> Self {
        Self {
            min: Pos::new(a.x.min(b.x), a.y.min(b.y)),
            max: Pos::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    /// Check if this rectangle covers a single cell.
    pub fn is_single_cell(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.x >= self.min.x && pos.x <= self.max.x && pos.y >= self.min.y && pos.y <= self.max.y
    }
}

/// A cell coordinate qualified by its sheet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetPos {
    pub x: i64,
    pub y: i64,
    pub sheet_id: SheetId,
}

impl SheetPos {
    pub fn new(pos: Pos, sheet_id: SheetId) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            sheet_id,
        }
    }

    pub fn pos(&self) -> Pos {
        Pos::new(self.x, self.y)
    }
}
