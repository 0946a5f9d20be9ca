//! Event optimizer
//!
//! A single left-to-right pass over semantic events. Control events are
//! buffered in a [`Run`] until the next barrier (text or opaque), where the
//! run is rewritten:
//!
//! 1. Components of attribute changes that the tracked state already proves
//!    are stripped, and events that change nothing are dropped.
//! 2. Attribute events coalesce (last write wins) across events they
//!    commute with; a reset discards earlier changes.
//! 3. Relative moves on one axis are summed, net-zero sums vanish, and an
//!    absolute move subsumes the moves before it.
//! 4. An idempotent event repeated with nothing applied in between is
//!    dropped.
//! 5. Setting a scroll region from line 1 that is already in force only
//!    homes the cursor, so it becomes a home move. Regions starting lower
//!    are ignored by terminals shorter than their top line and are left
//!    alone.
//!
//! Barriers are emitted in their original position.

mod run;

pub use run::{AttributeSlot, Pending, Run, MAX_FOLDED_MOVE};

use crate::config::Rules;
use crate::core::{AttributeChanges, CursorMove, ScrollRegion, SemanticEvent, TerminalState};

/// Streaming optimizer over semantic events
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    rules: Rules,
    state: TerminalState,
    run: Run,
}

impl Optimizer {
    /// Create an optimizer for a stream starting in the default state
    pub fn new(rules: Rules) -> Self {
        Self {
            rules,
            state: TerminalState::new(),
            run: Run::default(),
        }
    }

    /// Drop pending events and forget the tracked state
    pub fn reset(&mut self) {
        self.state = TerminalState::new();
        self.run.clear();
    }

    /// Tracked state as of the last emitted event
    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    /// Feed one event, calling the callback for each event ready for output
    pub fn push<F>(&mut self, event: SemanticEvent, mut callback: F)
    where
        F: FnMut(SemanticEvent),
    {
        if event.is_barrier() {
            self.flush(&mut callback);
            self.state.apply(&event);
            callback(event);
            return;
        }

        match event {
            SemanticEvent::SetScrollRegion { top: 1, bottom }
                if self.rules.redundant_state
                    && self.has_scroll_region(ScrollRegion { top: 1, bottom }) =>
            {
                tracing::trace!("scroll region 1;{:?} already set", bottom);
                self.run
                    .push_move(CursorMove::Absolute { row: 1, col: 1 }, &self.rules)
            }
            SemanticEvent::SetAttributes(changes) => {
                self.run.push_attributes(false, changes, &self.rules)
            }
            SemanticEvent::ResetAllAttributes => {
                self.run
                    .push_attributes(true, AttributeChanges::default(), &self.rules)
            }
            SemanticEvent::MoveCursor(movement) => self.run.push_move(movement, &self.rules),
            other => self.run.push_event(other),
        }
    }

    /// Signal end of stream, emitting whatever is still pending
    pub fn finish<F>(&mut self, mut callback: F)
    where
        F: FnMut(SemanticEvent),
    {
        self.flush(&mut callback);
    }

    /// Optimize a complete event sequence
    pub fn optimize<I>(&mut self, events: I) -> Vec<SemanticEvent>
    where
        I: IntoIterator<Item = SemanticEvent>,
    {
        let mut out = Vec::new();
        for event in events {
            self.push(event, |e| out.push(e));
        }
        self.finish(|e| out.push(e));
        out
    }

    /// Whether the region is in force once the pending run has been applied
    fn has_scroll_region(&self, region: ScrollRegion) -> bool {
        match self.run.last_scroll_region() {
            Some(pending) => pending == region,
            None => self.state.has_scroll_region(region),
        }
    }

    /// Rewrite and emit the pending run
    pub fn flush<F>(&mut self, callback: &mut F)
    where
        F: FnMut(SemanticEvent),
    {
        if self.run.is_empty() {
            return;
        }

        let Self { rules, state, run } = self;
        for entry in run.drain() {
            match entry {
                Pending::Attributes(slot) => emit_slot(slot, state, rules, callback),
                Pending::Event(event) => {
                    if rules.collapse_repeats && event.is_repeatable() && state.would_be_noop(&event) {
                        tracing::trace!("dropped repeated {:?}", event);
                        continue;
                    }
                    state.apply(&event);
                    callback(event);
                }
            }
        }
    }
}

fn emit<F>(event: SemanticEvent, state: &mut TerminalState, callback: &mut F)
where
    F: FnMut(SemanticEvent),
{
    state.apply(&event);
    callback(event);
}

/// Emit the shortest event pair reaching the slot's net attributes
fn emit_slot<F>(slot: AttributeSlot, state: &mut TerminalState, rules: &Rules, callback: &mut F)
where
    F: FnMut(SemanticEvent),
{
    if !rules.redundant_state {
        if slot.reset {
            emit(SemanticEvent::ResetAllAttributes, state, callback);
        }
        if !slot.changes.is_empty() {
            emit(SemanticEvent::SetAttributes(slot.changes), state, callback);
        }
        return;
    }

    if slot.reset {
        let mut net = AttributeChanges::defaults();
        net.merge(&slot.changes);
        if *state.attributes() == net {
            return;
        }
        if !state.attributes_are_default() {
            emit(SemanticEvent::ResetAllAttributes, state, callback);
        }
    }

    let changes = state.reduce_attributes(&slot.changes);
    if !changes.is_empty() {
        emit(SemanticEvent::SetAttributes(changes), state, callback);
    }
}

/// Optimize a complete event sequence with the given rules
pub fn optimize_events<I>(events: I, rules: Rules) -> Vec<SemanticEvent>
where
    I: IntoIterator<Item = SemanticEvent>,
{
    Optimizer::new(rules).optimize(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Axis, Color, CursorMove, CursorStyle, EraseMode, OpaqueKind};

    fn bold() -> SemanticEvent {
        SemanticEvent::SetAttributes(AttributeChanges {
            bold: Some(true),
            ..Default::default()
        })
    }

    fn fg(color: Color) -> SemanticEvent {
        SemanticEvent::SetAttributes(AttributeChanges {
            foreground: Some(color),
            ..Default::default()
        })
    }

    fn up(n: i32) -> SemanticEvent {
        SemanticEvent::MoveCursor(CursorMove::Relative {
            axis: Axis::Row,
            delta: -n,
        })
    }

    fn text(s: &str) -> SemanticEvent {
        SemanticEvent::Text(s.as_bytes().to_vec())
    }

    fn opt(events: Vec<SemanticEvent>) -> Vec<SemanticEvent> {
        optimize_events(events, Rules::default())
    }

    #[test]
    fn test_repeated_attribute() {
        assert_eq!(opt(vec![bold(), bold(), text("x")]), vec![bold(), text("x")]);
    }

    #[test]
    fn test_last_color_wins() {
        assert_eq!(
            opt(vec![fg(Color::RED), fg(Color::GREEN)]),
            vec![fg(Color::GREEN)]
        );
    }

    #[test]
    fn test_moves_fold() {
        assert_eq!(opt(vec![up(2), up(3)]), vec![up(5)]);
        assert_eq!(opt(vec![up(1), up(-1)]), Vec::<SemanticEvent>::new());
    }

    #[test]
    fn test_reset_at_start_dropped() {
        assert_eq!(
            opt(vec![SemanticEvent::ResetAllAttributes, text("a")]),
            vec![text("a")]
        );
    }

    #[test]
    fn test_reset_kept_after_opaque() {
        let opaque = SemanticEvent::Opaque {
            bytes: b"\x1b[?1049h".to_vec(),
            kind: OpaqueKind::Sequence,
        };
        let events = vec![opaque.clone(), SemanticEvent::ResetAllAttributes];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_reset_then_back_to_current_state() {
        // bold, text, reset + bold: the terminal is already bold
        assert_eq!(
            opt(vec![bold(), text("a"), SemanticEvent::ResetAllAttributes, bold()]),
            vec![bold(), text("a")]
        );
    }

    #[test]
    fn test_reset_with_changes() {
        assert_eq!(
            opt(vec![bold(), text("a"), SemanticEvent::ResetAllAttributes, fg(Color::RED)]),
            vec![bold(), text("a"), SemanticEvent::ResetAllAttributes, fg(Color::RED)]
        );
    }

    #[test]
    fn test_reset_from_default_state_becomes_changes() {
        assert_eq!(
            opt(vec![SemanticEvent::ResetAllAttributes, fg(Color::RED), text("a")]),
            vec![fg(Color::RED), text("a")]
        );
    }

    #[test]
    fn test_repeated_erase() {
        let erase = SemanticEvent::EraseInDisplay(EraseMode::All);
        assert_eq!(opt(vec![erase.clone(), erase.clone()]), vec![erase.clone()]);
        // Moves that cancel out leave the erases adjacent
        assert_eq!(
            opt(vec![erase.clone(), up(1), up(-1), erase.clone()]),
            vec![erase.clone()]
        );
        // Text in between makes the second erase meaningful again
        assert_eq!(
            opt(vec![erase.clone(), text("a"), erase.clone()]),
            vec![erase.clone(), text("a"), erase]
        );
    }

    #[test]
    fn test_attribute_between_erases_blocks_collapse() {
        let erase = SemanticEvent::EraseInLine(EraseMode::ToEnd);
        let events = vec![erase.clone(), fg(Color::RED), erase.clone()];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_dec_restore_observes_attributes() {
        let events = vec![
            SemanticEvent::SaveCursor(CursorStyle::Dec),
            bold(),
            SemanticEvent::RestoreCursor(CursorStyle::Dec),
            bold(),
        ];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_sco_restore_observes_attributes() {
        let events = vec![
            SemanticEvent::SaveCursor(CursorStyle::Sco),
            fg(Color::RED),
            SemanticEvent::RestoreCursor(CursorStyle::Sco),
            fg(Color::RED),
            text("x"),
        ];
        assert_eq!(opt(events.clone()), events);
    }

    fn region(top: u32, bottom: Option<u32>) -> SemanticEvent {
        SemanticEvent::SetScrollRegion { top, bottom }
    }

    fn home() -> SemanticEvent {
        SemanticEvent::MoveCursor(CursorMove::Absolute { row: 1, col: 1 })
    }

    #[test]
    fn test_known_scroll_region_becomes_home() {
        assert_eq!(opt(vec![region(1, None), text("x")]), vec![home(), text("x")]);
        assert_eq!(
            opt(vec![region(1, Some(9)), text("x"), up(3), region(1, Some(9)), text("y")]),
            vec![region(1, Some(9)), text("x"), home(), text("y")]
        );
        // May have been ignored, so it may not have homed the cursor
        let events = vec![region(5, Some(9)), text("x"), region(5, Some(9)), text("y")];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_home_after_scroll_region_dropped() {
        assert_eq!(
            opt(vec![region(1, Some(9)), home(), text("x")]),
            vec![region(1, Some(9)), text("x")]
        );
        assert_eq!(
            opt(vec![region(1, Some(9)), region(1, Some(9))]),
            vec![region(1, Some(9))]
        );
        let events = vec![region(5, Some(9)), home(), text("x")];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_scroll_region_unknown_after_opaque() {
        let opaque = SemanticEvent::Opaque {
            bytes: b"\x1b[?6h".to_vec(),
            kind: OpaqueKind::Sequence,
        };
        let events = vec![opaque, region(1, None), text("x")];
        assert_eq!(opt(events.clone()), events);
    }

    #[test]
    fn test_rules_disabled() {
        let events = vec![
            SemanticEvent::ResetAllAttributes,
            bold(),
            bold(),
            up(1),
            up(-1),
        ];
        assert_eq!(optimize_events(events.clone(), Rules::none()), events);
    }

    #[test]
    fn test_reset() {
        let mut optimizer = Optimizer::new(Rules::default());
        optimizer.optimize(vec![bold(), text("a")]);
        optimizer.push(up(2), |_| unreachable!());
        optimizer.reset();
        assert!(optimizer.state().attributes_are_default());
        assert_eq!(optimizer.optimize(vec![up(1)]), vec![up(1)]);
    }

    #[test]
    fn test_state_follows_output() {
        let mut optimizer = Optimizer::new(Rules::default());
        optimizer.optimize(vec![bold(), text("a")]);
        assert_eq!(optimizer.state().attributes().bold, Some(true));
    }
}
