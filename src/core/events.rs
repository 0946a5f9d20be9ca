//! Semantic events
//!
//! The canonical form every recognized control sequence is normalized into.
//! Anything the normalizer does not fully understand travels as
//! [`SemanticEvent::Opaque`] with its exact original bytes.

use serde::{Deserialize, Serialize};

use super::attributes::AttributeChanges;

/// Cursor axis for relative moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    Row,
    Column,
}

/// Cursor movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorMove {
    /// Move along one axis; negative is up/left (CUU/CUD/CUF/CUB)
    Relative { axis: Axis, delta: i32 },
    /// Move to a 1-based position (CUP/HVP)
    Absolute { row: u32, col: u32 },
}

/// Save/restore cursor encoding
///
/// Both forms save and restore position and attributes through the same
/// slot. The form is kept because `CSI s` means DECSLRM once left/right
/// margin mode is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CursorStyle {
    /// `ESC 7` / `ESC 8`
    Dec,
    /// `CSI s` / `CSI u`
    Sco,
}

/// Erase extent (ED / EL parameter)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EraseMode {
    /// 0: cursor to end
    ToEnd,
    /// 1: start to cursor
    ToStart,
    /// 2: everything
    All,
    /// 3: scrollback (ED only)
    Scrollback,
}

impl EraseMode {
    pub fn from_param(param: u32) -> Option<Self> {
        match param {
            0 => Some(EraseMode::ToEnd),
            1 => Some(EraseMode::ToStart),
            2 => Some(EraseMode::All),
            3 => Some(EraseMode::Scrollback),
            _ => None,
        }
    }

    pub fn param(self) -> u32 {
        match self {
            EraseMode::ToEnd => 0,
            EraseMode::ToStart => 1,
            EraseMode::All => 2,
            EraseMode::Scrollback => 3,
        }
    }
}

/// Why an opaque event is opaque
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpaqueKind {
    /// A whole token that is unrecognized or malformed
    Sequence,
    /// A text run containing stray C1 bytes
    Text,
    /// One unrecognized parameter of an SGR sequence
    ///
    /// When `open_ended` is set the bytes run to the end of the sequence and
    /// nothing may follow them inside the same `m`.
    SgrParameter { open_ended: bool },
}

/// Canonical event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SemanticEvent {
    /// Literal text, including C0 controls
    Text(Vec<u8>),
    /// SGR attribute changes
    SetAttributes(AttributeChanges),
    /// SGR 0
    ResetAllAttributes,
    MoveCursor(CursorMove),
    SaveCursor(CursorStyle),
    RestoreCursor(CursorStyle),
    EraseInLine(EraseMode),
    EraseInDisplay(EraseMode),
    /// DECSTBM; `bottom` of `None` is the last line
    SetScrollRegion { top: u32, bottom: Option<u32> },
    /// Passthrough bytes
    Opaque { bytes: Vec<u8>, kind: OpaqueKind },
}

impl SemanticEvent {
    /// Text and opaque events end the optimizer's lookahead window
    pub fn is_barrier(&self) -> bool {
        matches!(self, SemanticEvent::Text(_) | SemanticEvent::Opaque { .. })
    }

    /// Barriers that stand for a whole token and never share an encoding
    /// with their neighbours
    pub fn is_hard_barrier(&self) -> bool {
        match self {
            SemanticEvent::Text(_) => true,
            SemanticEvent::Opaque { kind, .. } => !matches!(kind, OpaqueKind::SgrParameter { .. }),
            _ => false,
        }
    }

    /// Events whose immediate repetition has no further effect
    pub fn is_repeatable(&self) -> bool {
        matches!(
            self,
            SemanticEvent::MoveCursor(CursorMove::Absolute { .. })
                | SemanticEvent::SaveCursor(_)
                | SemanticEvent::RestoreCursor(_)
                | SemanticEvent::EraseInLine(_)
                | SemanticEvent::EraseInDisplay(_)
                | SemanticEvent::SetScrollRegion { .. }
        )
    }

    /// Whether attribute changes can be moved across this event
    ///
    /// Erases paint with the current background and save/restore snapshot
    /// attributes, so those observe attribute state.
    pub fn commutes_with_attributes(&self) -> bool {
        matches!(
            self,
            SemanticEvent::MoveCursor(_) | SemanticEvent::SetScrollRegion { .. }
        )
    }
}
