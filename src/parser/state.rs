//! Lexer state machine
//!
//! Segments a byte stream into [`Token`]s. The machine follows the shape of
//! the VT500-series parser (<https://vt100.net/emu/dec_ansi_parser>) but
//! never interprets anything: it only finds sequence boundaries and keeps
//! every byte it consumed.
//!
//! States:
//! - Ground: text run collection
//! - Escape / EscapeIntermediate: after ESC
//! - CsiEntry / CsiParam / CsiIntermediate: after ESC [
//! - OscString: after ESC ], terminated by BEL or ST
//! - DcsPassthrough / ApcPassthrough / PmPassthrough / SosPassthrough:
//!   after ESC P, ESC _, ESC ^ and ESC X, terminated by ST only
//!
//! The lexer handles arbitrary chunk boundaries. Its entire state is a
//! [`LexerPosition`] which can be serialized, stored and resumed later.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::token::{Malformation, Sequence, SequenceKind, Token, BEL, ESC};
use super::utf8;

/// Default bound on the length of a single sequence (64 KiB)
pub const DEFAULT_MAX_SEQUENCE_LEN: usize = 65536;

/// Cancel
const CAN: u8 = 0x18;
/// Substitute
const SUB: u8 = 0x1A;

/// Lexer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LexerState {
    /// Collecting a text run
    #[default]
    Ground,
    /// After ESC
    Escape,
    /// ESC followed by intermediate bytes
    EscapeIntermediate,
    /// Right after ESC [
    CsiEntry,
    /// Collecting CSI parameter bytes
    CsiParam,
    /// Collecting CSI intermediate bytes
    CsiIntermediate,
    /// After ESC ]
    OscString,
    /// After ESC P
    DcsPassthrough,
    /// After ESC _
    ApcPassthrough,
    /// After ESC ^
    PmPassthrough,
    /// After ESC X
    SosPassthrough,
}

impl LexerState {
    /// Sequence kind being collected in this state
    pub fn kind(self) -> Option<SequenceKind> {
        match self {
            LexerState::Ground => None,
            LexerState::Escape | LexerState::EscapeIntermediate => Some(SequenceKind::Escape),
            LexerState::CsiEntry | LexerState::CsiParam | LexerState::CsiIntermediate => {
                Some(SequenceKind::Csi)
            }
            LexerState::OscString => Some(SequenceKind::Osc),
            LexerState::DcsPassthrough => Some(SequenceKind::Dcs),
            LexerState::ApcPassthrough => Some(SequenceKind::Apc),
            LexerState::PmPassthrough => Some(SequenceKind::Pm),
            LexerState::SosPassthrough => Some(SequenceKind::Sos),
        }
    }

    /// State entered after the introducer of `kind`
    fn entry(kind: SequenceKind) -> Self {
        match kind {
            SequenceKind::Escape => LexerState::Escape,
            SequenceKind::Csi => LexerState::CsiEntry,
            SequenceKind::Osc => LexerState::OscString,
            SequenceKind::Dcs => LexerState::DcsPassthrough,
            SequenceKind::Apc => LexerState::ApcPassthrough,
            SequenceKind::Pm => LexerState::PmPassthrough,
            SequenceKind::Sos => LexerState::SosPassthrough,
        }
    }
}

/// Complete, resumable lexer state
///
/// Holds the partial token under construction: the pending text run in
/// [`LexerState::Ground`], or the pieces of the sequence being collected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LexerPosition {
    /// Current state
    pub state: LexerState,
    /// Pending text run (Ground only)
    pub text: Vec<u8>,
    /// Parameter bytes, or string payload
    pub params: Vec<u8>,
    /// Intermediate bytes
    pub intermediates: Vec<u8>,
    /// An ESC was seen inside a string, waiting for the `\` of ST
    pub string_escape: bool,
    /// The introducer was already emitted as part of an oversized fragment
    pub continued: bool,
}

impl LexerPosition {
    /// Length of the partial sequence consumed so far
    fn pending_len(&self) -> usize {
        let prefix = match self.state.kind() {
            Some(kind) if !self.continued => 1 + usize::from(kind.introducer().is_some()),
            _ => 0,
        };
        prefix + self.params.len() + self.intermediates.len() + usize::from(self.string_escape)
    }

    /// Take the raw bytes of the partial sequence, leaving the state untouched
    fn take_pending(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pending_len());
        if !self.continued {
            if let Some(kind) = self.state.kind() {
                out.push(ESC);
                if let Some(introducer) = kind.introducer() {
                    out.push(introducer);
                }
            }
        }
        out.append(&mut self.params);
        out.append(&mut self.intermediates);
        if self.string_escape {
            out.push(ESC);
            self.string_escape = false;
        }
        out
    }

    fn enter(&mut self, state: LexerState) {
        self.state = state;
        self.params.clear();
        self.intermediates.clear();
        self.string_escape = false;
        self.continued = false;
    }
}

/// Chunk-resumable tokenizer
#[derive(Debug, Clone)]
pub struct Lexer {
    pos: LexerPosition,
    max_sequence_len: usize,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    /// Create a lexer in the ground state
    pub fn new() -> Self {
        Self::with_max_sequence_len(DEFAULT_MAX_SEQUENCE_LEN)
    }

    /// Create a lexer that splits sequences longer than `max_sequence_len`
    pub fn with_max_sequence_len(max_sequence_len: usize) -> Self {
        Self {
            pos: LexerPosition::default(),
            max_sequence_len,
        }
    }

    /// Get current lexer state
    pub fn state(&self) -> LexerState {
        self.pos.state
    }

    /// Snapshot of the complete lexer state
    pub fn position(&self) -> LexerPosition {
        self.pos.clone()
    }

    /// Continue from a previously saved position
    pub fn resume(&mut self, position: LexerPosition) {
        self.pos = position;
    }

    /// Drop any partial token and return to the ground state
    pub fn reset(&mut self) {
        self.pos = LexerPosition::default();
    }

    /// Lex a chunk, calling the callback for each completed token
    ///
    /// A text run at the end of the chunk is emitted, except for a trailing
    /// incomplete UTF-8 character which waits for the next chunk.
    pub fn feed<F>(&mut self, data: &[u8], mut callback: F)
    where
        F: FnMut(Token),
    {
        for &byte in data {
            self.advance(byte, &mut callback);
        }

        if self.pos.state == LexerState::Ground {
            let keep = utf8::incomplete_suffix_len(&self.pos.text);
            if self.pos.text.len() > keep {
                let rest = self.pos.text.split_off(self.pos.text.len() - keep);
                let run = std::mem::replace(&mut self.pos.text, rest);
                callback(Token::Text(run));
            }
        }
    }

    /// Lex a chunk and collect tokens into a vector
    pub fn feed_collect(&mut self, data: &[u8]) -> Vec<Token> {
        let mut tokens = Vec::new();
        self.feed(data, |token| tokens.push(token));
        tokens
    }

    /// Signal end of input, returning whatever partial token remains
    ///
    /// An unfinished sequence comes back as [`Malformation::Unterminated`].
    pub fn finish(&mut self) -> Option<Token> {
        let token = if self.pos.state == LexerState::Ground {
            let text = std::mem::take(&mut self.pos.text);
            (!text.is_empty()).then_some(Token::Text(text))
        } else {
            let bytes = self.pos.take_pending();
            (!bytes.is_empty()).then_some(Token::Malformed {
                bytes,
                reason: Malformation::Unterminated,
            })
        };
        self.pos.enter(LexerState::Ground);
        token
    }

    /// Advance the lexer by one byte
    fn advance<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        // CAN and SUB abort any sequence. Inside a string after ESC the
        // string handler decides first.
        if self.pos.state != LexerState::Ground
            && !self.pos.string_escape
            && (byte == CAN || byte == SUB)
        {
            self.abort(byte, callback);
            return;
        }

        match self.pos.state {
            LexerState::Ground => self.ground(byte, callback),
            LexerState::Escape => self.escape(byte, callback),
            LexerState::EscapeIntermediate => self.escape_intermediate(byte, callback),
            LexerState::CsiEntry | LexerState::CsiParam => self.csi_param(byte, callback),
            LexerState::CsiIntermediate => self.csi_intermediate(byte, callback),
            LexerState::OscString
            | LexerState::DcsPassthrough
            | LexerState::ApcPassthrough
            | LexerState::PmPassthrough
            | LexerState::SosPassthrough => self.string(byte, callback),
        }
    }

    fn ground<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if byte == ESC {
            if !self.pos.text.is_empty() {
                callback(Token::Text(std::mem::take(&mut self.pos.text)));
            }
            self.pos.enter(LexerState::Escape);
        } else {
            self.pos.text.push(byte);
        }
    }

    fn escape<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if let Some(kind) = SequenceKind::from_introducer(byte) {
            self.pos.enter(LexerState::entry(kind));
            return;
        }

        match byte {
            0x20..=0x2F => {
                self.pos.intermediates.push(byte);
                self.pos.state = LexerState::EscapeIntermediate;
                self.check_len(callback);
            }
            0x30..=0x7E => self.dispatch(byte, callback),
            _ => self.abort(byte, callback),
        }
    }

    fn escape_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x20..=0x2F => {
                self.pos.intermediates.push(byte);
                self.check_len(callback);
            }
            0x30..=0x7E => self.dispatch(byte, callback),
            _ => self.abort(byte, callback),
        }
    }

    fn csi_param<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x30..=0x3F => {
                self.pos.params.push(byte);
                self.pos.state = LexerState::CsiParam;
                self.check_len(callback);
            }
            0x20..=0x2F => {
                self.pos.intermediates.push(byte);
                self.pos.state = LexerState::CsiIntermediate;
                self.check_len(callback);
            }
            0x40..=0x7E => self.dispatch(byte, callback),
            _ => self.abort(byte, callback),
        }
    }

    fn csi_intermediate<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        match byte {
            0x20..=0x2F => {
                self.pos.intermediates.push(byte);
                self.check_len(callback);
            }
            0x40..=0x7E => self.dispatch(byte, callback),
            _ => self.abort(byte, callback),
        }
    }

    fn string<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if self.pos.string_escape {
            if byte == b'\\' {
                self.dispatch(byte, callback);
                return;
            }

            // ESC without `\` ends the string and starts a new escape
            self.pos.string_escape = false;
            let bytes = self.pos.take_pending();
            if !bytes.is_empty() {
                callback(Token::Malformed {
                    bytes,
                    reason: Malformation::UnexpectedByte(ESC),
                });
            }
            self.pos.enter(LexerState::Escape);
            self.advance(byte, callback);
            return;
        }

        match byte {
            ESC => self.pos.string_escape = true,
            BEL if self.pos.state == LexerState::OscString => self.dispatch(byte, callback),
            _ => {
                self.pos.params.push(byte);
                self.check_len(callback);
            }
        }
    }

    /// Emit the completed sequence ending in `final_byte`
    fn dispatch<F>(&mut self, final_byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if self.pos.continued {
            let mut bytes = self.pos.take_pending();
            bytes.push(final_byte);
            callback(Token::Malformed {
                bytes,
                reason: Malformation::Oversized,
            });
        } else if let Some(kind) = self.pos.state.kind() {
            callback(Token::Sequence(Sequence {
                kind,
                params: std::mem::take(&mut self.pos.params),
                intermediates: std::mem::take(&mut self.pos.intermediates),
                final_byte,
            }));
        }
        self.pos.enter(LexerState::Ground);
    }

    /// Emit the partial sequence as malformed and reprocess `byte` in Ground
    fn abort<F>(&mut self, byte: u8, callback: &mut F)
    where
        F: FnMut(Token),
    {
        let bytes = self.pos.take_pending();
        self.pos.enter(LexerState::Ground);
        if !bytes.is_empty() {
            callback(Token::Malformed {
                bytes,
                reason: Malformation::UnexpectedByte(byte),
            });
        }
        self.advance(byte, callback);
    }

    /// Split off an oversized fragment once the limit is exceeded
    fn check_len<F>(&mut self, callback: &mut F)
    where
        F: FnMut(Token),
    {
        if self.pos.pending_len() > self.max_sequence_len {
            let bytes = self.pos.take_pending();
            self.pos.continued = true;
            callback(Token::Malformed {
                bytes,
                reason: Malformation::Oversized,
            });
        }
    }
}

/// Lazy iterator over the tokens of a complete input
#[derive(Debug)]
pub struct Tokens<'a> {
    lexer: Lexer,
    input: &'a [u8],
    queue: VecDeque<Token>,
    finished: bool,
}

impl Iterator for Tokens<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            if let Some(token) = self.queue.pop_front() {
                return Some(token);
            }

            if let Some((&byte, rest)) = self.input.split_first() {
                self.input = rest;
                let Self { lexer, queue, .. } = self;
                lexer.advance(byte, &mut |token| queue.push_back(token));
                continue;
            }

            if self.finished {
                return None;
            }
            self.finished = true;
            return self.lexer.finish();
        }
    }
}

/// Tokenize a complete input lazily
pub fn tokenize(input: &[u8]) -> Tokens<'_> {
    Tokens {
        lexer: Lexer::new(),
        input,
        queue: VecDeque::new(),
        finished: false,
    }
}
