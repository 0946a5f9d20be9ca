//! Terminal state tracker
//!
//! A small model of the terminal: only what preceding events
//! proved. Anything the model cannot follow (opaque sequences, a cursor
//! restore without a snapshot) turns the affected state unknown, and unknown
//! state never produces a no-op verdict.

use serde::{Deserialize, Serialize};

use super::attributes::AttributeChanges;
use super::events::{CursorMove, OpaqueKind, SemanticEvent};

/// Last known scroll region, 1-based; `bottom` of `None` is the last line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollRegion {
    pub top: u32,
    pub bottom: Option<u32>,
}

impl Default for ScrollRegion {
    fn default() -> Self {
        Self {
            top: 1,
            bottom: None,
        }
    }
}

/// What an applied event changed in the model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDelta {
    /// Attributes that took a new known value
    pub attributes: AttributeChanges,
    /// Some tracked state became unknown
    pub invalidated: bool,
}

impl StateDelta {
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && !self.invalidated
    }
}

/// Cumulative terminal state as far as it is known
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalState {
    /// Known attribute values; `None` fields are unknown
    attributes: AttributeChanges,
    /// Attributes captured by the last cursor save, if known
    saved: Option<AttributeChanges>,
    /// Scroll region, if known
    scroll_region: Option<ScrollRegion>,
    /// Idempotent event applied last, with nothing after it
    last_repeatable: Option<SemanticEvent>,
}

impl Default for TerminalState {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalState {
    /// State at stream start: every attribute at its default
    pub fn new() -> Self {
        Self {
            attributes: AttributeChanges::defaults(),
            saved: None,
            scroll_region: Some(ScrollRegion::default()),
            last_repeatable: None,
        }
    }

    /// Known attribute values
    pub fn attributes(&self) -> &AttributeChanges {
        &self.attributes
    }

    /// Attributes captured by the last cursor save
    pub fn saved_attributes(&self) -> Option<&AttributeChanges> {
        self.saved.as_ref()
    }

    pub fn scroll_region(&self) -> Option<ScrollRegion> {
        self.scroll_region
    }

    /// Check if the scroll region is known to be `region` already
    pub fn has_scroll_region(&self, region: ScrollRegion) -> bool {
        self.scroll_region == Some(region)
    }

    /// Check whether every attribute is known to be at its default
    pub fn attributes_are_default(&self) -> bool {
        self.attributes == AttributeChanges::defaults()
    }

    /// The part of `changes` that would actually change known state
    pub fn reduce_attributes(&self, changes: &AttributeChanges) -> AttributeChanges {
        changes.pruned(&self.attributes)
    }

    /// Check if applying `event` now would change nothing
    pub fn would_be_noop(&self, event: &SemanticEvent) -> bool {
        match event {
            SemanticEvent::SetAttributes(changes) => self.reduce_attributes(changes).is_empty(),
            SemanticEvent::ResetAllAttributes => self.attributes_are_default(),
            // A region starting at line 1 always takes effect and homes the cursor
            SemanticEvent::MoveCursor(CursorMove::Absolute { row: 1, col: 1 })
                if matches!(
                    self.last_repeatable,
                    Some(SemanticEvent::SetScrollRegion { top: 1, .. })
                ) =>
            {
                true
            }
            _ if event.is_repeatable() => self.last_repeatable.as_ref() == Some(event),
            _ => false,
        }
    }

    /// Fold `event` into the model
    pub fn apply(&mut self, event: &SemanticEvent) -> StateDelta {
        let mut delta = StateDelta::default();

        match event {
            SemanticEvent::Text(_) => {}
            SemanticEvent::SetAttributes(changes) => {
                delta.attributes = self.reduce_attributes(changes);
                self.attributes.merge(changes);
            }
            SemanticEvent::ResetAllAttributes => {
                delta.attributes = AttributeChanges::defaults().pruned(&self.attributes);
                self.attributes = AttributeChanges::defaults();
            }
            SemanticEvent::SaveCursor(_) => {
                self.saved = Some(self.attributes);
            }
            SemanticEvent::RestoreCursor(_) => match self.saved {
                Some(saved) => {
                    delta.attributes = saved.pruned(&self.attributes);
                    self.attributes = saved;
                }
                None => {
                    delta.invalidated = true;
                    self.attributes = AttributeChanges::default();
                }
            },
            SemanticEvent::SetScrollRegion { top, bottom } => {
                self.scroll_region = Some(ScrollRegion {
                    top: *top,
                    bottom: *bottom,
                });
            }
            SemanticEvent::Opaque {
                kind: OpaqueKind::SgrParameter { .. },
                ..
            } => {
                delta.invalidated = true;
                self.attributes = AttributeChanges::default();
            }
            SemanticEvent::Opaque { .. } => {
                delta.invalidated = true;
                self.attributes = AttributeChanges::default();
                self.saved = None;
                self.scroll_region = None;
            }
            SemanticEvent::MoveCursor(_)
            | SemanticEvent::EraseInLine(_)
            | SemanticEvent::EraseInDisplay(_) => {}
        }

        self.last_repeatable = event.is_repeatable().then(|| event.clone());
        delta
    }
}
