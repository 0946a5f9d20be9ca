//! Character attributes
//!
//! [`AttributeChanges`] is a partial attribute set. As an event payload a
//! `Some` field means "set to this value". The state tracker reuses the same
//! shape for its knowledge, where `None` means the value is unknown.

use serde::{Deserialize, Serialize};

use super::color::{Color, Layer};

/// Partial set of SGR attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dim: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blink: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverse: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<Color>,
}

/// Strip a field that would not change the known value
fn strip<T: PartialEq + Copy>(change: Option<T>, known: Option<T>) -> Option<T> {
    match change {
        Some(_) if change == known => None,
        _ => change,
    }
}

impl AttributeChanges {
    /// Every attribute at its power-on value
    pub fn defaults() -> Self {
        Self {
            bold: Some(false),
            dim: Some(false),
            italic: Some(false),
            underline: Some(false),
            blink: Some(false),
            reverse: Some(false),
            hidden: Some(false),
            strike: Some(false),
            foreground: Some(Color::Default),
            background: Some(Color::Default),
        }
    }

    /// Check if no attribute is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the encoding needs SGR 22, which clears bold and dim together
    pub fn clears_intensity(&self) -> bool {
        self.bold == Some(false) || self.dim == Some(false)
    }

    /// Overlay `later` on top of this set (last write wins)
    pub fn merge(&mut self, later: &AttributeChanges) {
        self.bold = later.bold.or(self.bold);
        self.dim = later.dim.or(self.dim);
        self.italic = later.italic.or(self.italic);
        self.underline = later.underline.or(self.underline);
        self.blink = later.blink.or(self.blink);
        self.reverse = later.reverse.or(self.reverse);
        self.hidden = later.hidden.or(self.hidden);
        self.strike = later.strike.or(self.strike);
        self.foreground = later.foreground.or(self.foreground);
        self.background = later.background.or(self.background);
    }

    /// Drop every change that `known` already proves
    ///
    /// Bold and dim are stripped individually unless what remains would be
    /// encoded with SGR 22; then both keep their original values so the
    /// shared reset cannot clobber the partner.
    pub fn pruned(&self, known: &AttributeChanges) -> AttributeChanges {
        let mut out = AttributeChanges {
            bold: strip(self.bold, known.bold),
            dim: strip(self.dim, known.dim),
            italic: strip(self.italic, known.italic),
            underline: strip(self.underline, known.underline),
            blink: strip(self.blink, known.blink),
            reverse: strip(self.reverse, known.reverse),
            hidden: strip(self.hidden, known.hidden),
            strike: strip(self.strike, known.strike),
            foreground: strip(self.foreground, known.foreground),
            background: strip(self.background, known.background),
        };
        if out.clears_intensity() {
            out.bold = self.bold;
            out.dim = self.dim;
        }
        out
    }

    /// Apply a single-parameter SGR code, returning false if it is not one
    pub fn apply_code(&mut self, code: u16) -> bool {
        match code {
            1 => self.bold = Some(true),
            2 => self.dim = Some(true),
            3 => self.italic = Some(true),
            4 => self.underline = Some(true),
            5 => self.blink = Some(true),
            7 => self.reverse = Some(true),
            8 => self.hidden = Some(true),
            9 => self.strike = Some(true),
            22 => {
                self.bold = Some(false);
                self.dim = Some(false);
            }
            23 => self.italic = Some(false),
            24 => self.underline = Some(false),
            25 => self.blink = Some(false),
            27 => self.reverse = Some(false),
            28 => self.hidden = Some(false),
            29 => self.strike = Some(false),
            _ => match Color::from_code(code) {
                Some((layer, color)) => self.set_color(layer, color),
                None => return false,
            },
        }
        true
    }

    /// Select a color on one layer
    pub fn set_color(&mut self, layer: Layer, color: Color) {
        match layer {
            Layer::Foreground => self.foreground = Some(color),
            Layer::Background => self.background = Some(color),
        }
    }

    /// Append the SGR parameters encoding these changes
    pub fn push_sgr_params(&self, params: &mut Vec<String>) {
        let flag = |value: Option<bool>, on: &'static str, off: &'static str| match value {
            Some(true) => Some(on),
            Some(false) => Some(off),
            None => None,
        };

        if self.clears_intensity() {
            params.push("22".to_string());
        }
        if self.bold == Some(true) {
            params.push("1".to_string());
        }
        if self.dim == Some(true) {
            params.push("2".to_string());
        }

        let flags = [
            flag(self.italic, "3", "23"),
            flag(self.underline, "4", "24"),
            flag(self.blink, "5", "25"),
            flag(self.reverse, "7", "27"),
            flag(self.hidden, "8", "28"),
            flag(self.strike, "9", "29"),
        ];
        params.extend(flags.into_iter().flatten().map(str::to_string));

        if let Some(color) = self.foreground {
            params.push(color.sgr_param(Layer::Foreground));
        }
        if let Some(color) = self.background {
            params.push(color.sgr_param(Layer::Background));
        }
    }
}
