//! Engine tunables that are not part of a document description.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LayoutConfig {
    /// Width reserved for a bullet marker, in millimetres. Continuation
    /// lines of a bullet item are indented by the same amount.
    ///
    /// Defaults to `5.0`.
    pub bullet_indent: f64,

    /// Marker drawn in front of bullet items when the list names none.
    ///
    /// Defaults to `•`.
    pub bullet_symbol: String,

    /// Indent per chapter level for table-of-contents entries, in millimetres.
    ///
    /// Defaults to `4.0`.
    pub toc_indent: f64,

    /// Leader character filling the gap between a TOC title and its page number.
    ///
    /// Defaults to `.`.
    pub toc_leader: char,

    /// Resolution used to derive an image's physical size from its pixel size
    /// when the element does not give one.
    ///
    /// Defaults to `96.0`.
    pub image_dpi: f64,

    /// Number of digits reserved when measuring text whose page numbers are
    /// only known in the render pass.
    ///
    /// Defaults to `3`.
    pub page_number_digits: usize,

    /// Inner padding of table cells, in millimetres.
    ///
    /// Defaults to `1.0`.
    pub cell_padding: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            bullet_indent: 5.0,
            bullet_symbol: "\u{2022}".to_string(),
            toc_indent: 4.0,
            toc_leader: '.',
            image_dpi: 96.0,
            page_number_digits: 3,
            cell_padding: 1.0,
        }
    }
}

impl LayoutConfig {
    /// Load from JSON, filling in defaults for omitted fields.
    pub fn from_json(json: &str) -> Result<Self, crate::error::QuireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Placeholder text standing in for a page number during measurement.
    pub fn page_number_placeholder(&self) -> String {
        "9".repeat(self.page_number_digits.max(1))
    }

    /// Physical size, in millimetres, of one image pixel.
    pub fn pixel_size(&self) -> f64 {
        if self.image_dpi > 0.0 {
            25.4 / self.image_dpi
        } else {
            25.4 / 96.0
        }
    }
}
