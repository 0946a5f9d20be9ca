//! Terminal Core Module
//!
//! The semantic side of the optimizer:
//! - Colors and attribute change sets
//! - Semantic events produced by the normalizer
//! - The terminal state tracker used for no-op detection
//!
//! Everything here is deterministic: the same event sequence always leads
//! to the same tracked state.

mod attributes;
mod color;
mod events;
mod tracker;

pub use attributes::AttributeChanges;
pub use color::{Color, Layer};
pub use events::{Axis, CursorMove, CursorStyle, EraseMode, OpaqueKind, SemanticEvent};
pub use tracker::{ScrollRegion, StateDelta, TerminalState};
