//! SGR colors
//!
//! Colors keep the exact form they were selected with. A terminal may render
//! `ESC[31m` differently from `ESC[38;5;1m` (bold-is-bright, palette
//! overrides), so no form is ever converted into another.

use serde::{Deserialize, Serialize};

/// Which color a selection applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    Foreground,
    Background,
}

/// Color selected by SGR
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    /// Terminal default (SGR 39 / 49)
    #[default]
    Default,
    /// Standard color 0-7 (SGR 30-37 / 40-47)
    Named(u8),
    /// Bright color 0-7 (SGR 90-97 / 100-107)
    Bright(u8),
    /// 256-color palette entry (SGR 38;5;n / 48;5;n)
    Indexed(u8),
    /// 24-bit color (SGR 38;2;r;g;b / 48;2;r;g;b)
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Color = Color::Named(0);
    pub const RED: Color = Color::Named(1);
    pub const GREEN: Color = Color::Named(2);
    pub const YELLOW: Color = Color::Named(3);
    pub const BLUE: Color = Color::Named(4);
    pub const MAGENTA: Color = Color::Named(5);
    pub const CYAN: Color = Color::Named(6);
    pub const WHITE: Color = Color::Named(7);

    /// Decode a single-parameter color code for either layer
    pub fn from_code(code: u16) -> Option<(Layer, Color)> {
        // Ranges are checked first so the narrowing casts below cannot truncate
        match code {
            30..=37 => Some((Layer::Foreground, Color::Named((code - 30) as u8))),
            39 => Some((Layer::Foreground, Color::Default)),
            40..=47 => Some((Layer::Background, Color::Named((code - 40) as u8))),
            49 => Some((Layer::Background, Color::Default)),
            90..=97 => Some((Layer::Foreground, Color::Bright((code - 90) as u8))),
            100..=107 => Some((Layer::Background, Color::Bright((code - 100) as u8))),
            _ => None,
        }
    }

    /// Shortest SGR parameter string selecting this color on `layer`
    pub fn sgr_param(&self, layer: Layer) -> String {
        let (base, bright, extended) = match layer {
            Layer::Foreground => (30u16, 90u16, 38u16),
            Layer::Background => (40, 100, 48),
        };
        match *self {
            Color::Default => (base + 9).to_string(),
            Color::Named(n) => (base + u16::from(n)).to_string(),
            Color::Bright(n) => (bright + u16::from(n)).to_string(),
            Color::Indexed(n) => format!("{extended};5;{n}"),
            Color::Rgb(r, g, b) => format!("{extended};2;{r};{g};{b}"),
        }
    }
}
