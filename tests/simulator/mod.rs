//! Reference terminal model for equivalence tests
//!
//! Interprets a byte stream independently of the normalizer and records
//! every visible effect together with the state it happened in. Two streams
//! are equivalent when their effect logs and final states match.
//!
//! The cursor is unclamped. Anything the model does not understand replaces
//! the affected state with a fresh value derived from a counter, so an
//! optimizer that carries knowledge across it produces a different log.

#![allow(dead_code)]

use ansi_optimizer::parser::{tokenize, Sequence, SequenceKind, Token};

/// Graphic rendition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pen {
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub underline: bool,
    pub blink: bool,
    pub reverse: bool,
    pub hidden: bool,
    pub strike: bool,
    pub fg: String,
    pub bg: String,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            bold: false,
            dim: false,
            italic: false,
            underline: false,
            blink: false,
            reverse: false,
            hidden: false,
            strike: false,
            fg: "default".to_string(),
            bg: "default".to_string(),
        }
    }
}

impl Pen {
    fn unknown(epoch: u32) -> Self {
        Self {
            bold: epoch % 2 == 0,
            dim: epoch % 3 == 0,
            italic: true,
            underline: true,
            blink: true,
            reverse: true,
            hidden: true,
            strike: true,
            fg: format!("unknown{epoch}"),
            bg: format!("unknown{epoch}"),
        }
    }
}

/// A visible effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Print {
        row: i64,
        col: i64,
        pen: Pen,
        byte: u8,
    },
    Erase {
        display: bool,
        mode: u32,
        row: i64,
        col: i64,
        pen: Pen,
    },
    Unknown {
        bytes: Vec<u8>,
        row: i64,
        col: i64,
        pen: Pen,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pub row: i64,
    pub col: i64,
    pub pen: Pen,
    /// Cursor slot shared by `ESC 7` and `CSI s`
    pub saved: Option<(i64, i64, Pen)>,
    pub scroll: (u32, Option<u32>),
    pub log: Vec<Effect>,
    epoch: u32,
}

impl Default for Terminal {
    fn default() -> Self {
        Self {
            row: 1,
            col: 1,
            pen: Pen::default(),
            saved: None,
            scroll: (1, None),
            log: Vec::new(),
            epoch: 0,
        }
    }
}

fn number(field: &[u8]) -> Option<Option<u32>> {
    if field.is_empty() {
        return Some(None);
    }
    let mut value = 0u32;
    for &b in field {
        if !b.is_ascii_digit() {
            return None;
        }
        value = value * 10 + u32::from(b - b'0');
        if value > 65535 {
            return None;
        }
    }
    Some(Some(value))
}

fn numbers(params: &[u8]) -> Option<Vec<Option<u32>>> {
    if params.is_empty() {
        return Some(Vec::new());
    }
    params.split(|&b| b == b';').map(number).collect()
}

fn byte_component(field: &[u8]) -> Option<u8> {
    number(field).flatten().and_then(|n| u8::try_from(n).ok())
}

impl Terminal {
    pub fn run(input: &[u8]) -> Self {
        let mut terminal = Self::default();
        for token in tokenize(input) {
            terminal.token(&token);
        }
        terminal
    }

    fn record(&mut self, effect: Effect) {
        // Repeating an effect in an unchanged state changes nothing on screen
        if matches!(effect, Effect::Erase { .. }) && self.log.last() == Some(&effect) {
            return;
        }
        self.log.push(effect);
    }

    fn unknown(&mut self, bytes: Vec<u8>) {
        self.record(Effect::Unknown {
            bytes,
            row: self.row,
            col: self.col,
            pen: self.pen.clone(),
        });
        self.epoch += 1;
        let epoch = self.epoch;
        self.pen = Pen::unknown(epoch);
        self.row = 1000 + i64::from(epoch);
        self.col = 2000 + i64::from(epoch);
        self.saved = Some((-1, -1, Pen::unknown(epoch + 1000)));
        self.scroll = (epoch, None);
    }

    fn unknown_rendition(&mut self) {
        self.epoch += 1;
        self.pen = Pen::unknown(self.epoch);
    }

    fn token(&mut self, token: &Token) {
        match token {
            Token::Text(bytes) => {
                for &byte in bytes {
                    self.record(Effect::Print {
                        row: self.row,
                        col: self.col,
                        pen: self.pen.clone(),
                        byte,
                    });
                    self.col += 1;
                }
            }
            Token::Malformed { bytes, .. } => self.unknown(bytes.clone()),
            Token::Sequence(seq) => {
                if !self.sequence(seq) {
                    self.unknown(token.to_bytes());
                }
            }
        }
    }

    fn sequence(&mut self, seq: &Sequence) -> bool {
        if !seq.intermediates.is_empty() {
            return false;
        }
        match seq.kind {
            SequenceKind::Escape => match seq.final_byte {
                b'7' => {
                    self.save_cursor();
                    true
                }
                b'8' => {
                    self.restore_cursor();
                    true
                }
                _ => false,
            },
            SequenceKind::Csi => {
                if seq.params.iter().any(|b| (0x3C..=0x3F).contains(b)) {
                    return false;
                }
                if seq.final_byte == b'm' {
                    self.sgr(&seq.params);
                    return true;
                }
                match numbers(&seq.params) {
                    Some(params) => self.csi(seq.final_byte, &params),
                    None => false,
                }
            }
            _ => false,
        }
    }

    fn csi(&mut self, final_byte: u8, params: &[Option<u32>]) -> bool {
        let param = |i: usize| params.get(i).copied().flatten().filter(|&n| n != 0);
        let raw = |i: usize| params.get(i).copied().flatten().unwrap_or(0);
        match final_byte {
            b'A' | b'B' | b'C' | b'D' if params.len() <= 1 => {
                let n = i64::from(param(0).unwrap_or(1));
                match final_byte {
                    b'A' => self.row -= n,
                    b'B' => self.row += n,
                    b'C' => self.col += n,
                    _ => self.col -= n,
                }
                true
            }
            b'H' | b'f' if params.len() <= 2 => {
                self.row = i64::from(param(0).unwrap_or(1));
                self.col = i64::from(param(1).unwrap_or(1));
                true
            }
            b'J' if params.len() <= 1 && raw(0) <= 3 => {
                self.erase(true, raw(0));
                true
            }
            b'K' if params.len() <= 1 && raw(0) <= 2 => {
                self.erase(false, raw(0));
                true
            }
            b'r' if params.len() <= 2 => {
                let top = param(0).unwrap_or(1);
                let bottom = param(1);
                if bottom.is_some_and(|bottom| top >= bottom) {
                    return false;
                }
                self.scroll = (top, bottom);
                self.row = 1;
                self.col = 1;
                true
            }
            b's' if params.is_empty() => {
                self.save_cursor();
                true
            }
            b'u' if params.is_empty() => {
                self.restore_cursor();
                true
            }
            _ => false,
        }
    }

    fn save_cursor(&mut self) {
        self.saved = Some((self.row, self.col, self.pen.clone()));
    }

    /// Without a save the power-on cursor is restored
    fn restore_cursor(&mut self) {
        let (row, col, pen) = self.saved.clone().unwrap_or((1, 1, Pen::default()));
        self.row = row;
        self.col = col;
        self.pen = pen;
    }

    fn erase(&mut self, display: bool, mode: u32) {
        self.record(Effect::Erase {
            display,
            mode,
            row: self.row,
            col: self.col,
            pen: self.pen.clone(),
        });
    }

    fn sgr(&mut self, params: &[u8]) {
        let fields: Vec<&[u8]> = params.split(|&b| b == b';').collect();
        let mut i = 0;
        while i < fields.len() {
            let field = fields[i];
            i += 1;

            if field.contains(&b':') {
                let subs: Vec<&[u8]> = field.split(|&b| b == b':').collect();
                let color = match subs.as_slice() {
                    [_, b"5", n] => byte_component(n).map(|n| format!("index{n}")),
                    [_, b"2", b"", r, g, b] | [_, b"2", r, g, b] => {
                        match (byte_component(r), byte_component(g), byte_component(b)) {
                            (Some(r), Some(g), Some(b)) => Some(format!("rgb{r},{g},{b}")),
                            _ => None,
                        }
                    }
                    _ => None,
                };
                match (subs[0], color) {
                    (b"38", Some(color)) => self.pen.fg = color,
                    (b"48", Some(color)) => self.pen.bg = color,
                    _ => self.unknown_rendition(),
                }
                continue;
            }

            let Some(code) = number(field) else {
                self.unknown_rendition();
                continue;
            };
            let code = code.unwrap_or(0);
            let pen = &mut self.pen;
            match code {
                0 => *pen = Pen::default(),
                1 => pen.bold = true,
                2 => pen.dim = true,
                3 => pen.italic = true,
                4 => pen.underline = true,
                5 => pen.blink = true,
                7 => pen.reverse = true,
                8 => pen.hidden = true,
                9 => pen.strike = true,
                22 => {
                    pen.bold = false;
                    pen.dim = false;
                }
                23 => pen.italic = false,
                24 => pen.underline = false,
                25 => pen.blink = false,
                27 => pen.reverse = false,
                28 => pen.hidden = false,
                29 => pen.strike = false,
                30..=37 => pen.fg = format!("named{}", code - 30),
                39 => pen.fg = "default".to_string(),
                40..=47 => pen.bg = format!("named{}", code - 40),
                49 => pen.bg = "default".to_string(),
                90..=97 => pen.fg = format!("bright{}", code - 90),
                100..=107 => pen.bg = format!("bright{}", code - 100),
                38 | 48 => {
                    let color = match fields.get(i).copied() {
                        Some(b"5") => fields
                            .get(i + 1)
                            .and_then(|n| byte_component(n))
                            .map(|n| (format!("index{n}"), 2)),
                        Some(b"2") => {
                            let c = |k: usize| fields.get(i + k).and_then(|f| byte_component(f));
                            match (c(1), c(2), c(3)) {
                                (Some(r), Some(g), Some(b)) => Some((format!("rgb{r},{g},{b}"), 4)),
                                _ => None,
                            }
                        }
                        _ => None,
                    };
                    match color {
                        Some((color, used)) => {
                            if code == 38 {
                                pen.fg = color;
                            } else {
                                pen.bg = color;
                            }
                            i += used;
                        }
                        None => {
                            self.unknown_rendition();
                            return;
                        }
                    }
                }
                58 | 59 => {
                    self.unknown_rendition();
                    return;
                }
                _ => self.unknown_rendition(),
            }
        }
    }
}

/// Whether two streams leave the same visible effects and final state
pub fn assert_equivalent(input: &[u8], output: &[u8]) {
    let a = Terminal::run(input);
    let b = Terminal::run(output);
    assert_eq!(
        a,
        b,
        "not equivalent:\n  input:  {}\n  output: {}",
        input.escape_ascii(),
        output.escape_ascii()
    );
}
