//! # Standard Fonts
//!
//! Text is set in the standard PDF fonts, which every reader ships, so
//! nothing is embedded. Widths come from the Adobe font metrics, in 1/1000
//! of the font size, for the printable ASCII range plus the few WinAnsi
//! punctuation marks the engine draws itself (bullets, dashes, quotes).

use crate::style::StyleDefinition;

/// Standard fonts the backend can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardFont {
    Helvetica,
    HelveticaBold,
    HelveticaOblique,
    HelveticaBoldOblique,
    Courier,
    CourierBold,
    CourierOblique,
    CourierBoldOblique,
}

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT: f64 = 1.2;

/// Baseline offset below the top of a line, as a multiple of the font size.
pub const ASCENT: f64 = 0.9;

impl StandardFont {
    pub const ALL: [StandardFont; 8] = [
        StandardFont::Helvetica,
        StandardFont::HelveticaBold,
        StandardFont::HelveticaOblique,
        StandardFont::HelveticaBoldOblique,
        StandardFont::Courier,
        StandardFont::CourierBold,
        StandardFont::CourierOblique,
        StandardFont::CourierBoldOblique,
    ];

    /// Pick a font for a family name. Unknown families fall back to
    /// Helvetica.
    pub fn resolve(family: &str, bold: bool, italic: bool) -> Self {
        let courier = family.trim().eq_ignore_ascii_case("courier")
            || family.trim().eq_ignore_ascii_case("monospace");
        match (courier, bold, italic) {
            (false, false, false) => Self::Helvetica,
            (false, true, false) => Self::HelveticaBold,
            (false, false, true) => Self::HelveticaOblique,
            (false, true, true) => Self::HelveticaBoldOblique,
            (true, false, false) => Self::Courier,
            (true, true, false) => Self::CourierBold,
            (true, false, true) => Self::CourierOblique,
            (true, true, true) => Self::CourierBoldOblique,
        }
    }

    pub fn for_style(style: &StyleDefinition) -> Self {
        Self::resolve(&style.font_family, style.is_bold(), style.is_italic())
    }

    pub fn pdf_name(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::HelveticaBold => "Helvetica-Bold",
            Self::HelveticaOblique => "Helvetica-Oblique",
            Self::HelveticaBoldOblique => "Helvetica-BoldOblique",
            Self::Courier => "Courier",
            Self::CourierBold => "Courier-Bold",
            Self::CourierOblique => "Courier-Oblique",
            Self::CourierBoldOblique => "Courier-BoldOblique",
        }
    }

    /// Advance width of `ch` in 1/1000 em.
    fn advance(&self, ch: char) -> u16 {
        let table = match self {
            Self::Courier | Self::CourierBold | Self::CourierOblique | Self::CourierBoldOblique => {
                return 600
            }
            Self::Helvetica | Self::HelveticaOblique => &HELVETICA,
            Self::HelveticaBold | Self::HelveticaBoldOblique => &HELVETICA_BOLD,
        };
        match ch {
            ' '..='~' => table[ch as usize - 32],
            '\u{2022}' => 350,
            '\u{2013}' => 556,
            '\u{2014}' => 1000,
            '\u{2018}' | '\u{2019}' => 222,
            '\u{201C}' | '\u{201D}' => 333,
            '\u{2026}' => 1000,
            _ => 556,
        }
    }

    /// Width of one character in points.
    pub fn char_width(&self, ch: char, font_size: f64) -> f64 {
        self.advance(ch) as f64 * font_size / 1000.0
    }

    /// Width of a string in points.
    pub fn measure(&self, text: &str, font_size: f64) -> f64 {
        text.chars().map(|ch| self.char_width(ch, font_size)).sum()
    }
}

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];
