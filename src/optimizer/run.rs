//! Pending run of control events
//!
//! The run holds every control event seen since the last barrier. Attribute
//! events are kept in slots that later events merge into; cursor moves fold
//! into earlier moves where they commute.

use crate::config::Rules;
use crate::core::{AttributeChanges, Axis, CursorMove, ScrollRegion, SemanticEvent};

/// Largest folded relative move; bigger sums are kept as separate moves
pub const MAX_FOLDED_MOVE: i32 = 65535;

/// Coalesced attribute events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeSlot {
    /// The slot starts with SGR 0
    pub reset: bool,
    /// Changes applied after the optional reset
    pub changes: AttributeChanges,
}

/// One entry of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pending {
    Attributes(AttributeSlot),
    Event(SemanticEvent),
}

/// Pending events between two barriers
#[derive(Debug, Clone, Default)]
pub struct Run {
    entries: Vec<Pending>,
}

impl Run {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drop every entry, keeping the allocation
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Take every entry, leaving the run empty
    pub fn drain(&mut self) -> std::vec::Drain<'_, Pending> {
        self.entries.drain(..)
    }

    /// Add an attribute event; `reset` marks SGR 0
    pub fn push_attributes(&mut self, reset: bool, changes: AttributeChanges, rules: &Rules) {
        if rules.coalesce_attributes {
            if let Some(slot) = self.merge_target() {
                if reset {
                    // A reset makes every earlier change in the slot irrelevant
                    slot.reset = true;
                    slot.changes = changes;
                } else {
                    slot.changes.merge(&changes);
                }
                return;
            }
        }
        self.entries
            .push(Pending::Attributes(AttributeSlot { reset, changes }));
    }

    /// Latest attribute slot reachable across events that commute with attributes
    fn merge_target(&mut self) -> Option<&mut AttributeSlot> {
        let index = self.entries.iter().rposition(|entry| match entry {
            Pending::Attributes(_) => true,
            Pending::Event(event) => !event.commutes_with_attributes(),
        })?;
        match &mut self.entries[index] {
            Pending::Attributes(slot) => Some(slot),
            Pending::Event(_) => None,
        }
    }

    /// Add a cursor move
    pub fn push_move(&mut self, movement: CursorMove, rules: &Rules) {
        if rules.fold_cursor_moves {
            match movement {
                CursorMove::Relative { axis, delta } => {
                    if self.fold_relative(axis, delta, rules) {
                        return;
                    }
                }
                CursorMove::Absolute { .. } => self.drop_subsumed_moves(),
            }
        }
        self.entries
            .push(Pending::Event(SemanticEvent::MoveCursor(movement)));
    }

    /// Fold into an earlier relative move on the same axis, if one is reachable
    fn fold_relative(&mut self, axis: Axis, delta: i32, rules: &Rules) -> bool {
        let Some(index) = self.entries.iter().rposition(|entry| match entry {
            Pending::Attributes(_) => false,
            Pending::Event(SemanticEvent::MoveCursor(CursorMove::Relative { axis: a, .. })) => {
                *a == axis
            }
            Pending::Event(_) => true,
        }) else {
            return false;
        };

        let Pending::Event(SemanticEvent::MoveCursor(CursorMove::Relative { axis: a, delta: d })) =
            &mut self.entries[index]
        else {
            return false;
        };
        if *a != axis {
            return false;
        }

        let sum = *d + delta;
        if sum.abs() > MAX_FOLDED_MOVE {
            return false;
        }
        if sum == 0 {
            if !rules.drop_net_zero_moves {
                return false;
            }
            self.entries.remove(index);
            tracing::trace!("dropped net-zero {:?} move", axis);
        } else {
            *d = sum;
        }
        true
    }

    /// Remove moves an absolute move makes irrelevant
    fn drop_subsumed_moves(&mut self) {
        let mut index = self.entries.len();
        while index > 0 {
            index -= 1;
            match &self.entries[index] {
                Pending::Attributes(_) => {}
                Pending::Event(SemanticEvent::MoveCursor(_)) => {
                    self.entries.remove(index);
                }
                Pending::Event(_) => break,
            }
        }
    }

    /// Add any other control event
    pub fn push_event(&mut self, event: SemanticEvent) {
        self.entries.push(Pending::Event(event));
    }

    /// Region set by the latest pending DECSTBM
    pub fn last_scroll_region(&self) -> Option<ScrollRegion> {
        self.entries.iter().rev().find_map(|entry| match entry {
            Pending::Event(SemanticEvent::SetScrollRegion { top, bottom }) => Some(ScrollRegion {
                top: *top,
                bottom: *bottom,
            }),
            _ => None,
        })
    }
}
