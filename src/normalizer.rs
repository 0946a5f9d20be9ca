//! Token normalizer
//!
//! Maps each [`Token`] to canonical [`SemanticEvent`]s with default
//! parameters filled in. Only plain, standard forms are recognized; anything
//! else (private markers, intermediates, sub-parameters, out-of-range values,
//! string sequences, malformed fragments) becomes [`SemanticEvent::Opaque`]
//! holding the exact original bytes.

use crate::core::{
    AttributeChanges, Axis, Color, CursorMove, CursorStyle, EraseMode, Layer, OpaqueKind,
    SemanticEvent,
};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::parser::{utf8, Sequence, SequenceKind, Token};

/// Largest numeric parameter accepted; larger values are left opaque
pub const MAX_PARAM: u32 = 65535;

/// Events produced for one token
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub events: Vec<SemanticEvent>,
    /// Set when part or all of the token is passed through opaquely
    pub diagnostic: Option<Diagnostic>,
}

impl Normalized {
    fn event(event: SemanticEvent) -> Self {
        Self {
            events: vec![event],
            diagnostic: None,
        }
    }

    /// Whether this token is a text run or passes through whole
    pub fn is_hard_barrier(&self) -> bool {
        matches!(self.events.as_slice(), [event] if event.is_hard_barrier())
    }
}

/// Stateful normalizer; tracks the stream offset for diagnostics
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    offset: u64,
    /// The previous token was malformed
    after_malformed: bool,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stream offset of the next token
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Start over at offset zero for a new stream
    pub fn reset(&mut self) {
        self.offset = 0;
        self.after_malformed = false;
    }

    /// Normalize the next token of the stream
    pub fn normalize(&mut self, token: &Token) -> Normalized {
        let offset = self.offset;
        self.offset += token.encoded_len() as u64;

        // The bytes that cut a sequence short must follow it unchanged, or
        // the fragment could combine with different bytes on replay
        let pinned = std::mem::replace(&mut self.after_malformed, token.is_malformed());
        if pinned {
            if let Token::Sequence(_) = token {
                return Normalized::event(opaque(token.to_bytes()));
            }
        }

        let diagnostic = |kind| Diagnostic {
            kind,
            offset,
            bytes: token.to_bytes(),
        };

        match token {
            Token::Text(bytes) if utf8::has_stray_c1(bytes) => Normalized {
                events: vec![SemanticEvent::Opaque {
                    bytes: bytes.clone(),
                    kind: OpaqueKind::Text,
                }],
                diagnostic: Some(diagnostic(DiagnosticKind::UnrecognizedSequence)),
            },
            Token::Text(bytes) => Normalized::event(SemanticEvent::Text(bytes.clone())),
            Token::Malformed { bytes, .. } => Normalized {
                events: vec![opaque(bytes.clone())],
                diagnostic: Some(diagnostic(DiagnosticKind::MalformedSequence)),
            },
            Token::Sequence(seq) => {
                // Parameters are re-split and reordered, so a private marker
                // byte anywhere keeps the whole sequence intact
                if seq.is_csi(b'm') && !seq.params.iter().any(|b| (0x3C..=0x3F).contains(b)) {
                    let (events, clean) = normalize_sgr(&seq.params);
                    return Normalized {
                        events,
                        diagnostic: (!clean)
                            .then(|| diagnostic(DiagnosticKind::UnrecognizedSequence)),
                    };
                }
                match normalize_sequence(seq) {
                    Some(event) => Normalized::event(event),
                    None => Normalized {
                        events: vec![opaque(token.to_bytes())],
                        diagnostic: Some(diagnostic(DiagnosticKind::UnrecognizedSequence)),
                    },
                }
            }
        }
    }
}

fn opaque(bytes: Vec<u8>) -> SemanticEvent {
    SemanticEvent::Opaque {
        bytes,
        kind: OpaqueKind::Sequence,
    }
}

/// Parse a decimal field
///
/// Returns `Some(None)` for an empty field and `None` for anything that is
/// not a number up to [`MAX_PARAM`].
fn parse_number(field: &[u8]) -> Option<Option<u32>> {
    if field.is_empty() {
        return Some(None);
    }
    let mut value: u32 = 0;
    for &byte in field {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(byte - b'0');
        if value > MAX_PARAM {
            return None;
        }
    }
    Some(Some(value))
}

/// Split plain `;`-separated numeric parameters
fn numeric_params(params: &[u8]) -> Option<Vec<Option<u32>>> {
    if params.is_empty() {
        return Some(Vec::new());
    }
    params
        .split(|&b| b == b';')
        .map(parse_number)
        .collect()
}

/// Normalize a single non-SGR sequence; `None` leaves it opaque
fn normalize_sequence(seq: &Sequence) -> Option<SemanticEvent> {
    match seq.kind {
        SequenceKind::Escape if seq.intermediates.is_empty() => match seq.final_byte {
            b'7' => Some(SemanticEvent::SaveCursor(CursorStyle::Dec)),
            b'8' => Some(SemanticEvent::RestoreCursor(CursorStyle::Dec)),
            _ => None,
        },
        SequenceKind::Csi if seq.intermediates.is_empty() && !seq.has_private_marker() => {
            normalize_csi(seq.final_byte, &numeric_params(&seq.params)?)
        }
        _ => None,
    }
}

fn normalize_csi(final_byte: u8, params: &[Option<u32>]) -> Option<SemanticEvent> {
    // Zero and missing parameters both mean "default"
    let param = |index: usize| params.get(index).copied().flatten().filter(|&n| n != 0);

    match final_byte {
        b'A' | b'B' | b'C' | b'D' if params.len() <= 1 => {
            let count = param(0).unwrap_or(1) as i32;
            let (axis, delta) = match final_byte {
                b'A' => (Axis::Row, -count),
                b'B' => (Axis::Row, count),
                b'C' => (Axis::Column, count),
                _ => (Axis::Column, -count),
            };
            Some(SemanticEvent::MoveCursor(CursorMove::Relative { axis, delta }))
        }
        b'H' | b'f' if params.len() <= 2 => Some(SemanticEvent::MoveCursor(CursorMove::Absolute {
            row: param(0).unwrap_or(1),
            col: param(1).unwrap_or(1),
        })),
        b'J' if params.len() <= 1 => {
            EraseMode::from_param(params.first().copied().flatten().unwrap_or(0))
                .map(SemanticEvent::EraseInDisplay)
        }
        b'K' if params.len() <= 1 => {
            match EraseMode::from_param(params.first().copied().flatten().unwrap_or(0)) {
                Some(EraseMode::Scrollback) | None => None,
                Some(mode) => Some(SemanticEvent::EraseInLine(mode)),
            }
        }
        b'r' if params.len() <= 2 => {
            let top = param(0).unwrap_or(1);
            let bottom = param(1);
            // Terminals ignore an empty region, so it cannot be tracked
            if bottom.is_some_and(|bottom| top >= bottom) {
                return None;
            }
            Some(SemanticEvent::SetScrollRegion { top, bottom })
        }
        b's' if params.is_empty() => Some(SemanticEvent::SaveCursor(CursorStyle::Sco)),
        b'u' if params.is_empty() => Some(SemanticEvent::RestoreCursor(CursorStyle::Sco)),
        _ => None,
    }
}

/// Accumulates SGR changes and emits them in order around opaque parameters
struct SgrBuilder {
    events: Vec<SemanticEvent>,
    pending: AttributeChanges,
    clean: bool,
}

impl SgrBuilder {
    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let changes = std::mem::take(&mut self.pending);
            self.events.push(SemanticEvent::SetAttributes(changes));
        }
    }

    fn reset(&mut self) {
        self.flush();
        self.events.push(SemanticEvent::ResetAllAttributes);
    }

    fn opaque(&mut self, bytes: &[u8], open_ended: bool) {
        self.flush();
        self.clean = false;
        self.events.push(SemanticEvent::Opaque {
            bytes: bytes.to_vec(),
            kind: OpaqueKind::SgrParameter { open_ended },
        });
    }
}

/// Parse one 0-255 color component
fn component(field: &[u8]) -> Option<u8> {
    parse_number(field).flatten().and_then(|value| u8::try_from(value).ok())
}

/// Decode the colon form of 38/48: `38:5:n`, `38:2::r:g:b` or `38:2:r:g:b`
fn colon_color(subs: &[&[u8]]) -> Option<(Layer, Color)> {
    let layer = match subs.first().copied()? {
        b"38" => Layer::Foreground,
        b"48" => Layer::Background,
        _ => return None,
    };
    let color = match subs[1..] {
        [b"5", index] => Color::Indexed(component(index)?),
        [b"2", b"", r, g, b] | [b"2", r, g, b] => {
            Color::Rgb(component(r)?, component(g)?, component(b)?)
        }
        _ => return None,
    };
    Some((layer, color))
}

/// Decode the semicolon form of 38/48 starting at `fields[0]`
///
/// Returns the color and the number of fields consumed.
fn semicolon_color(fields: &[&[u8]]) -> Option<(Color, usize)> {
    match fields.get(1).copied()? {
        b"5" => Some((Color::Indexed(component(fields.get(2)?)?), 3)),
        b"2" => {
            let r = component(fields.get(2)?)?;
            let g = component(fields.get(3)?)?;
            let b = component(fields.get(4)?)?;
            Some((Color::Rgb(r, g, b), 5))
        }
        _ => None,
    }
}

/// Normalize SGR parameters; the flag is false if anything stayed opaque
fn normalize_sgr(params: &[u8]) -> (Vec<SemanticEvent>, bool) {
    let mut builder = SgrBuilder {
        events: Vec::new(),
        pending: AttributeChanges::default(),
        clean: true,
    };

    // Field boundaries, so an open-ended tail can be cut from the raw bytes
    let mut starts = Vec::new();
    let mut fields: Vec<&[u8]> = Vec::new();
    let mut start = 0;
    for field in params.split(|&b| b == b';') {
        starts.push(start);
        fields.push(field);
        start += field.len() + 1;
    }

    let mut i = 0;
    while i < fields.len() {
        let field = fields[i];

        if field.contains(&b':') {
            let subs: Vec<&[u8]> = field.split(|&b| b == b':').collect();
            match colon_color(&subs) {
                Some((layer, color)) => builder.pending.set_color(layer, color),
                None => builder.opaque(field, false),
            }
            i += 1;
            continue;
        }

        let code = match parse_number(field) {
            Some(code) => code.unwrap_or(0),
            None => {
                builder.opaque(field, false);
                i += 1;
                continue;
            }
        };

        match code {
            0 => builder.reset(),
            38 | 48 => match semicolon_color(&fields[i..]) {
                Some((color, used)) => {
                    let layer = if code == 38 {
                        Layer::Foreground
                    } else {
                        Layer::Background
                    };
                    builder.pending.set_color(layer, color);
                    i += used;
                    continue;
                }
                None => {
                    // The terminal's reading of what follows is ambiguous
                    builder.opaque(&params[starts[i]..], true);
                    break;
                }
            },
            58 | 59 => {
                builder.opaque(&params[starts[i]..], true);
                break;
            }
            _ => {
                // Codes above u16 range were rejected by parse_number
                if !builder.pending.apply_code(code as u16) {
                    builder.opaque(field, false);
                }
            }
        }
        i += 1;
    }

    builder.flush();
    (builder.events, builder.clean)
}
