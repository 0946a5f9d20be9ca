//! Tokens produced by the lexer
//!
//! A token is either a run of literal bytes, a complete control sequence
//! with its raw parameter/intermediate/final bytes, or a malformed fragment
//! that is kept verbatim. Every token can reproduce the exact bytes it was
//! lexed from.

use serde::{Deserialize, Serialize};

/// Escape character
pub const ESC: u8 = 0x1B;
/// Bell, the xterm OSC terminator
pub const BEL: u8 = 0x07;

/// Introducer class of a control sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceKind {
    /// `ESC I* F` - single-character escape with optional intermediates
    Escape,
    /// `ESC [` - Control Sequence Introducer
    Csi,
    /// `ESC ]` - Operating System Command
    Osc,
    /// `ESC P` - Device Control String
    Dcs,
    /// `ESC _` - Application Program Command
    Apc,
    /// `ESC ^` - Privacy Message
    Pm,
    /// `ESC X` - Start of String
    Sos,
}

impl SequenceKind {
    /// The byte following ESC that opens this kind of sequence
    pub fn introducer(self) -> Option<u8> {
        match self {
            SequenceKind::Escape => None,
            SequenceKind::Csi => Some(b'['),
            SequenceKind::Osc => Some(b']'),
            SequenceKind::Dcs => Some(b'P'),
            SequenceKind::Apc => Some(b'_'),
            SequenceKind::Pm => Some(b'^'),
            SequenceKind::Sos => Some(b'X'),
        }
    }

    /// Look up the kind opened by `ESC byte`
    pub fn from_introducer(byte: u8) -> Option<Self> {
        match byte {
            b'[' => Some(SequenceKind::Csi),
            b']' => Some(SequenceKind::Osc),
            b'P' => Some(SequenceKind::Dcs),
            b'_' => Some(SequenceKind::Apc),
            b'^' => Some(SequenceKind::Pm),
            b'X' => Some(SequenceKind::Sos),
            _ => None,
        }
    }

    /// Whether this kind carries a string payload terminated by ST (or BEL)
    pub fn is_string(self) -> bool {
        matches!(
            self,
            SequenceKind::Osc
                | SequenceKind::Dcs
                | SequenceKind::Apc
                | SequenceKind::Pm
                | SequenceKind::Sos
        )
    }
}

/// A complete, well-formed control sequence
///
/// For CSI and single escapes `params`/`intermediates`/`final_byte` hold the
/// raw bytes of the sequence. For string kinds the payload lives in `params`
/// and `final_byte` records the terminator: [`BEL`] or `\` (from `ESC \`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    /// Introducer class
    pub kind: SequenceKind,
    /// Parameter bytes (0x30-0x3F) or string payload
    pub params: Vec<u8>,
    /// Intermediate bytes (0x20-0x2F)
    pub intermediates: Vec<u8>,
    /// Final byte (0x30-0x7E for escapes, 0x40-0x7E for CSI) or terminator
    pub final_byte: u8,
}

impl Sequence {
    /// Build a CSI sequence from its raw parts
    pub fn csi(params: &[u8], intermediates: &[u8], final_byte: u8) -> Self {
        Self {
            kind: SequenceKind::Csi,
            params: params.to_vec(),
            intermediates: intermediates.to_vec(),
            final_byte,
        }
    }

    /// Build a single-character escape
    pub fn escape(intermediates: &[u8], final_byte: u8) -> Self {
        Self {
            kind: SequenceKind::Escape,
            params: Vec::new(),
            intermediates: intermediates.to_vec(),
            final_byte,
        }
    }

    /// Check for a plain CSI with the given final byte (no intermediates)
    pub fn is_csi(&self, final_byte: u8) -> bool {
        self.kind == SequenceKind::Csi && self.final_byte == final_byte && self.intermediates.is_empty()
    }

    /// Whether the parameter string starts with a private marker (`<`, `=`, `>`, `?`)
    pub fn has_private_marker(&self) -> bool {
        matches!(self.params.first(), Some(b'<' | b'=' | b'>' | b'?'))
    }

    /// Number of bytes this sequence occupies on the wire
    pub fn encoded_len(&self) -> usize {
        let introducer = usize::from(self.kind.introducer().is_some());
        let terminator = if self.kind.is_string() && self.final_byte != BEL {
            2
        } else {
            1
        };
        1 + introducer + self.params.len() + self.intermediates.len() + terminator
    }

    /// Append the wire bytes of this sequence to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.push(ESC);
        if let Some(introducer) = self.kind.introducer() {
            out.push(introducer);
        }
        out.extend_from_slice(&self.params);
        out.extend_from_slice(&self.intermediates);
        if self.kind.is_string() && self.final_byte != BEL {
            out.push(ESC);
        }
        out.push(self.final_byte);
    }
}

/// Why a fragment could not be lexed as a complete sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Malformation {
    /// Input ended before the sequence terminated
    Unterminated,
    /// A byte that is not valid in the current state interrupted the sequence
    UnexpectedByte(u8),
    /// The sequence grew past the configured length limit
    Oversized,
}

/// Lexer output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Token {
    /// Literal bytes, including C0 controls other than ESC
    Text(Vec<u8>),
    /// A complete control sequence
    Sequence(Sequence),
    /// Bytes of a sequence that did not complete, kept verbatim
    Malformed {
        /// Exactly the bytes consumed for this fragment
        bytes: Vec<u8>,
        /// What interrupted it
        reason: Malformation,
    },
}

impl Token {
    /// Number of input bytes covered by this token
    pub fn encoded_len(&self) -> usize {
        match self {
            Token::Text(bytes) => bytes.len(),
            Token::Sequence(seq) => seq.encoded_len(),
            Token::Malformed { bytes, .. } => bytes.len(),
        }
    }

    /// Append the original bytes of this token to `out`
    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Token::Text(bytes) => out.extend_from_slice(bytes),
            Token::Sequence(seq) => seq.write_to(out),
            Token::Malformed { bytes, .. } => out.extend_from_slice(bytes),
        }
    }

    /// The original bytes of this token
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out);
        out
    }

    /// Check if this is a text run
    pub fn is_text(&self) -> bool {
        matches!(self, Token::Text(_))
    }

    /// Check if this is a malformed fragment
    pub fn is_malformed(&self) -> bool {
        matches!(self, Token::Malformed { .. })
    }
}
