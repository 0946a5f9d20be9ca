//! Control sequence lexer
//!
//! A stateful lexer that splits bytes into text runs and control sequences.
//! Based on the VT500-series parser model from <https://vt100.net/emu/dec_ansi_parser>

mod state;
mod token;
pub mod utf8;

pub use state::{tokenize, Lexer, LexerPosition, LexerState, Tokens, DEFAULT_MAX_SEQUENCE_LEN};
pub use token::{Malformation, Sequence, SequenceKind, Token, BEL, ESC};
