//! # Style Definitions
//!
//! Named, immutable styles referenced by elements. A style is only ever read
//! by measurement and drawing; the layout engine never mutates one. Where a
//! node needs a variation (a right-aligned page number in a table of contents,
//! say) it derives a new value with [`StyleDefinition::with_alignment`].

use serde::{Deserialize, Serialize};

/// Text decoration applied when drawing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decoration {
    #[default]
    None,
    Bold,
    Underline,
    Italic,
    Strike,
}

/// Horizontal alignment of text inside its reserved size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
    Justified,
}

/// An RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f64, // 0.0 - 1.0
    pub g: f64,
    pub b: f64,
    pub a: f64,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 1.0,
    };

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Parse `#RRGGBB` (or the `#RGB` shorthand). Returns `None` when the
    /// string is not a hex color.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.strip_prefix('#').unwrap_or(hex);
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        let (r, g, b) = match hex.len() {
            3 => (
                channel(&hex[0..1].repeat(2))?,
                channel(&hex[1..2].repeat(2))?,
                channel(&hex[2..3].repeat(2))?,
            ),
            6 => (
                channel(hex.get(0..2)?)?,
                channel(hex.get(2..4)?)?,
                channel(hex.get(4..6)?)?,
            ),
            _ => return None,
        };
        Some(Self::rgb(
            r as f64 / 255.0,
            g as f64 / 255.0,
            b as f64 / 255.0,
        ))
    }

    /// Format as `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        let c = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", c(self.r), c(self.g), c(self.b))
    }
}

impl Default for Color {
    fn default() -> Self {
        Color::BLACK
    }
}

impl Serialize for HexColor {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_hex())
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Color::from_hex(&raw)
            .map(HexColor)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid color '{raw}', expected #RRGGBB")))
    }
}

/// A [`Color`] that travels through the document description as `#RRGGBB`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HexColor(pub Color);

/// A named style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDefinition {
    /// Unique (case-insensitive) identifier.
    pub id: String,
    #[serde(default = "default_font_family")]
    pub font_family: String,
    /// Font size in points.
    #[serde(default = "default_font_size")]
    pub font_size: f64,
    #[serde(default)]
    pub decoration: Decoration,
    #[serde(default)]
    pub alignment: Alignment,
    /// Extra space after every line of a block, in millimetres.
    #[serde(default)]
    pub line_padding: f64,
    /// Extra space after a whole block, in millimetres.
    #[serde(default)]
    pub block_padding: f64,
    #[serde(default)]
    pub color: HexColor,
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f64 {
    11.0
}

impl Default for StyleDefinition {
    fn default() -> Self {
        Self::named("default")
    }
}

impl StyleDefinition {
    /// A style with every property at its default value.
    pub fn named(id: &str) -> Self {
        Self {
            id: id.to_string(),
            font_family: default_font_family(),
            font_size: default_font_size(),
            decoration: Decoration::None,
            alignment: Alignment::Left,
            line_padding: 0.0,
            block_padding: 0.0,
            color: HexColor::default(),
        }
    }

    /// Derive a copy with a different alignment.
    pub fn with_alignment(&self, alignment: Alignment) -> Self {
        Self {
            alignment,
            ..self.clone()
        }
    }

    pub fn color(&self) -> Color {
        self.color.0
    }

    pub fn is_bold(&self) -> bool {
        self.decoration == Decoration::Bold
    }

    pub fn is_italic(&self) -> bool {
        self.decoration == Decoration::Italic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_digit_hex() {
        let c = Color::from_hex("#FF8000").unwrap();
        assert!((c.r - 1.0).abs() < 1e-9);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-9);
        assert_eq!(c.b, 0.0);
        assert_eq!(c.to_hex(), "#FF8000");
    }

    #[test]
    fn parses_shorthand_hex() {
        assert_eq!(Color::from_hex("#fff").unwrap().to_hex(), "#FFFFFF");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Color::from_hex("#12345").is_none());
        assert!(Color::from_hex("#GGGGGG").is_none());
    }

    #[test]
    fn style_deserializes_with_defaults() {
        let style: StyleDefinition =
            serde_json::from_str(r##"{ "id": "Heading", "fontSize": 18, "decoration": "Bold", "color": "#336699" }"##)
                .unwrap();
        assert_eq!(style.font_family, "Helvetica");
        assert_eq!(style.font_size, 18.0);
        assert!(style.is_bold());
        assert_eq!(style.color().to_hex(), "#336699");
    }

    #[test]
    fn derived_alignment_leaves_original_untouched() {
        let base = StyleDefinition::named("toc");
        let right = base.with_alignment(Alignment::Right);
        assert_eq!(base.alignment, Alignment::Left);
        assert_eq!(right.alignment, Alignment::Right);
        assert_eq!(right.id, "toc");
    }
}
