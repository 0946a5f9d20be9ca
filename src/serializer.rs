//! Event serializer
//!
//! Writes the shortest standard encoding of each event: default parameters
//! are omitted and adjacent SGR events share one `m` sequence. Text and
//! opaque events are written unchanged.

use crate::core::{
    Axis, CursorMove, CursorStyle, EraseMode, OpaqueKind, SemanticEvent,
};
use crate::parser::ESC;

/// Stateful encoder that merges adjacent SGR events
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    /// Parameters of the `m` sequence being built, if one is open
    sgr: Option<Vec<u8>>,
}

fn push_number(out: &mut Vec<u8>, n: u32) {
    out.extend_from_slice(n.to_string().as_bytes());
}

fn csi(out: &mut Vec<u8>) {
    out.extend_from_slice(&[ESC, b'[']);
}

impl Serializer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one parameter to the open `m` sequence, opening it if needed
    fn push_sgr_param(&mut self, param: &[u8]) {
        match &mut self.sgr {
            Some(params) => {
                params.push(b';');
                params.extend_from_slice(param);
            }
            None => self.sgr = Some(param.to_vec()),
        }
    }

    /// Encode `event`, appending bytes to `out`
    ///
    /// SGR events may be held back until a non-SGR event or [`flush`](Self::flush).
    pub fn write(&mut self, event: &SemanticEvent, out: &mut Vec<u8>) {
        match event {
            SemanticEvent::SetAttributes(changes) => {
                let mut params = Vec::new();
                changes.push_sgr_params(&mut params);
                for param in params {
                    self.push_sgr_param(param.as_bytes());
                }
                return;
            }
            SemanticEvent::ResetAllAttributes => {
                // An empty first parameter already means 0
                let param: &[u8] = if self.sgr.is_some() { b"0" } else { b"" };
                self.push_sgr_param(param);
                return;
            }
            SemanticEvent::Opaque {
                bytes,
                kind: OpaqueKind::SgrParameter { open_ended },
            } => {
                self.push_sgr_param(bytes);
                if *open_ended {
                    self.flush(out);
                }
                return;
            }
            _ => {}
        }

        self.flush(out);
        match event {
            SemanticEvent::Text(bytes) | SemanticEvent::Opaque { bytes, .. } => {
                out.extend_from_slice(bytes)
            }
            SemanticEvent::MoveCursor(movement) => write_move(movement, out),
            SemanticEvent::SaveCursor(CursorStyle::Dec) => out.extend_from_slice(&[ESC, b'7']),
            SemanticEvent::RestoreCursor(CursorStyle::Dec) => out.extend_from_slice(&[ESC, b'8']),
            SemanticEvent::SaveCursor(CursorStyle::Sco) => {
                csi(out);
                out.push(b's');
            }
            SemanticEvent::RestoreCursor(CursorStyle::Sco) => {
                csi(out);
                out.push(b'u');
            }
            SemanticEvent::EraseInLine(mode) => write_erase(*mode, b'K', out),
            SemanticEvent::EraseInDisplay(mode) => write_erase(*mode, b'J', out),
            SemanticEvent::SetScrollRegion { top, bottom } => {
                csi(out);
                if *top != 1 {
                    push_number(out, *top);
                }
                if let Some(bottom) = bottom {
                    out.push(b';');
                    push_number(out, *bottom);
                }
                out.push(b'r');
            }
            SemanticEvent::SetAttributes(_) | SemanticEvent::ResetAllAttributes => {}
        }
    }

    /// Discard a pending `m` sequence without writing it
    pub fn reset(&mut self) {
        self.sgr = None;
    }

    /// Close the open `m` sequence, if any
    pub fn flush(&mut self, out: &mut Vec<u8>) {
        if let Some(params) = self.sgr.take() {
            csi(out);
            out.extend_from_slice(&params);
            out.push(b'm');
        }
    }
}

fn write_move(movement: &CursorMove, out: &mut Vec<u8>) {
    match *movement {
        CursorMove::Relative { axis, delta } => {
            if delta == 0 {
                return;
            }
            let final_byte = match (axis, delta < 0) {
                (Axis::Row, true) => b'A',
                (Axis::Row, false) => b'B',
                (Axis::Column, false) => b'C',
                (Axis::Column, true) => b'D',
            };
            csi(out);
            let count = delta.unsigned_abs();
            if count != 1 {
                push_number(out, count);
            }
            out.push(final_byte);
        }
        CursorMove::Absolute { row, col } => {
            csi(out);
            if row != 1 {
                push_number(out, row);
            }
            if col != 1 {
                out.push(b';');
                push_number(out, col);
            }
            out.push(b'H');
        }
    }
}

fn write_erase(mode: EraseMode, final_byte: u8, out: &mut Vec<u8>) {
    csi(out);
    if mode != EraseMode::ToEnd {
        push_number(out, mode.param());
    }
    out.push(final_byte);
}

/// Encode a complete event sequence
pub fn serialize<'a, I>(events: I) -> Vec<u8>
where
    I: IntoIterator<Item = &'a SemanticEvent>,
{
    let mut serializer = Serializer::new();
    let mut out = Vec::new();
    for event in events {
        serializer.write(event, &mut out);
    }
    serializer.flush(&mut out);
    out
}
