//! # Drawing Backends
//!
//! The layout engine never rasterises anything itself. Measurement and
//! drawing go through [`DrawingBackend`], a narrow contract in the document's
//! physical unit (millimetres). Each backend owns the conversion to its own
//! device units.
//!
//! Two backends ship with the crate:
//! - [`RecordingBackend`], which keeps an in-memory log of draw operations
//!   and measures text with simple deterministic metrics;
//! - [`crate::pdf::PdfBackend`], which writes a PDF file.

use crate::error::BackendError;
use crate::geometry::{Point, Size};
use crate::style::{Alignment, StyleDefinition};

/// Millimetres per typographic point.
pub const MM_PER_PT: f64 = 25.4 / 72.0;

/// Handle of a page surface handed out by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(pub usize);

/// Measurement and drawing contract consumed by the compositor.
///
/// All calls are synchronous. An error from any call aborts the whole
/// compositor run.
pub trait DrawingBackend {
    /// Size of `text` drawn with `style` as a single line.
    fn measure_text(
        &self,
        text: &str,
        style: &StyleDefinition,
        reserved: Size,
    ) -> Result<Size, BackendError>;

    /// Acquire a drawing surface for one page.
    fn new_page_surface(&mut self, page_size: Size) -> Result<SurfaceId, BackendError>;

    /// Draw one line of text inside the reserved box at `position`.
    /// `is_last_fragment` tells justified text not to stretch.
    fn draw_text(
        &mut self,
        surface: SurfaceId,
        text: &str,
        position: Point,
        style: &StyleDefinition,
        reserved: Size,
        is_last_fragment: bool,
    ) -> Result<(), BackendError>;

    fn draw_line(
        &mut self,
        surface: SurfaceId,
        start: Point,
        end: Point,
        width: f64,
        style: &StyleDefinition,
    ) -> Result<(), BackendError>;

    fn draw_image(
        &mut self,
        surface: SurfaceId,
        position: Point,
        size: Size,
        data: &[u8],
        style: &StyleDefinition,
    ) -> Result<(), BackendError>;

    /// Outline a rectangle. Defaults to four [`DrawingBackend::draw_line`] calls.
    fn draw_rect(
        &mut self,
        surface: SurfaceId,
        position: Point,
        size: Size,
        width: f64,
        style: &StyleDefinition,
    ) -> Result<(), BackendError> {
        let tl = position;
        let tr = position.offset(size.width, 0.0);
        let br = position.offset(size.width, size.height);
        let bl = position.offset(0.0, size.height);
        self.draw_line(surface, tl, tr, width, style)?;
        self.draw_line(surface, tr, br, width, style)?;
        self.draw_line(surface, br, bl, width, style)?;
        self.draw_line(surface, bl, tl, width, style)
    }

    /// Release a surface. Called exactly once per surface.
    fn dispose_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError>;
}

/// How [`RecordingBackend`] measures text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextMetrics {
    /// Every character advances `0.5 × font size`; lines are `1.2 × font size`.
    Proportional,
    /// Every character advances `char_width` millimetres; every line is
    /// `line_height` millimetres tall, whatever the style.
    Monospace { char_width: f64, line_height: f64 },
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Text {
        surface: SurfaceId,
        text: String,
        position: Point,
        reserved: Size,
        style: String,
        alignment: Alignment,
        is_last_fragment: bool,
    },
    Line {
        surface: SurfaceId,
        start: Point,
        end: Point,
        width: f64,
    },
    Image {
        surface: SurfaceId,
        position: Point,
        size: Size,
        bytes: usize,
    },
}

impl DrawOp {
    pub fn surface(&self) -> SurfaceId {
        match self {
            DrawOp::Text { surface, .. } | DrawOp::Line { surface, .. } | DrawOp::Image { surface, .. } => *surface,
        }
    }
}

#[derive(Debug, Clone)]
struct RecordedSurface {
    size: Size,
    disposals: usize,
}

/// A backend that records draw calls instead of producing output.
#[derive(Debug, Clone)]
pub struct RecordingBackend {
    metrics: TextMetrics,
    surfaces: Vec<RecordedSurface>,
    ops: Vec<DrawOp>,
    fail_on_text: Option<String>,
    fail_on_measure: Option<String>,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::with_metrics(TextMetrics::Proportional)
    }

    pub fn with_metrics(metrics: TextMetrics) -> Self {
        Self {
            metrics,
            surfaces: Vec::new(),
            ops: Vec::new(),
            fail_on_text: None,
            fail_on_measure: None,
        }
    }

    pub fn monospace(char_width: f64, line_height: f64) -> Self {
        Self::with_metrics(TextMetrics::Monospace {
            char_width,
            line_height,
        })
    }

    /// Make `draw_text` fail for any text containing `needle`.
    pub fn fail_when_drawing(mut self, needle: &str) -> Self {
        self.fail_on_text = Some(needle.to_string());
        self
    }

    /// Make `measure_text` fail for any text containing `needle`.
    pub fn fail_when_measuring(mut self, needle: &str) -> Self {
        self.fail_on_measure = Some(needle.to_string());
        self
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn page_size(&self, surface: SurfaceId) -> Option<Size> {
        self.surfaces.get(surface.0).map(|s| s.size)
    }

    /// How many times a surface was disposed.
    pub fn disposals(&self, surface: SurfaceId) -> usize {
        self.surfaces.get(surface.0).map_or(0, |s| s.disposals)
    }

    /// Texts drawn on a surface, in draw order.
    pub fn texts_on(&self, surface: SurfaceId) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { surface: s, text, .. } if *s == surface => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Every text drawn, in draw order.
    pub fn all_texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    fn line_height(&self, style: &StyleDefinition) -> f64 {
        match self.metrics {
            TextMetrics::Proportional => style.font_size * 1.2 * MM_PER_PT,
            TextMetrics::Monospace { line_height, .. } => line_height,
        }
    }

    fn char_width(&self, style: &StyleDefinition) -> f64 {
        match self.metrics {
            TextMetrics::Proportional => style.font_size * 0.5 * MM_PER_PT,
            TextMetrics::Monospace { char_width, .. } => char_width,
        }
    }

    fn live_surface(&self, surface: SurfaceId) -> Result<&RecordedSurface, BackendError> {
        let s = self
            .surfaces
            .get(surface.0)
            .ok_or(BackendError::UnknownSurface(surface.0))?;
        if s.disposals > 0 {
            return Err(BackendError::Surface(format!(
                "surface #{} used after disposal",
                surface.0
            )));
        }
        Ok(s)
    }
}

impl DrawingBackend for RecordingBackend {
    fn measure_text(
        &self,
        text: &str,
        style: &StyleDefinition,
        _reserved: Size,
    ) -> Result<Size, BackendError> {
        if let Some(needle) = &self.fail_on_measure {
            if text.contains(needle.as_str()) {
                return Err(BackendError::Measure(format!("refusing to measure '{text}'")));
            }
        }
        let chars = text.chars().count() as f64;
        Ok(Size::new(chars * self.char_width(style), self.line_height(style)))
    }

    fn new_page_surface(&mut self, page_size: Size) -> Result<SurfaceId, BackendError> {
        self.surfaces.push(RecordedSurface {
            size: page_size,
            disposals: 0,
        });
        Ok(SurfaceId(self.surfaces.len() - 1))
    }

    fn draw_text(
        &mut self,
        surface: SurfaceId,
        text: &str,
        position: Point,
        style: &StyleDefinition,
        reserved: Size,
        is_last_fragment: bool,
    ) -> Result<(), BackendError> {
        self.live_surface(surface)?;
        if let Some(needle) = &self.fail_on_text {
            if text.contains(needle.as_str()) {
                return Err(BackendError::Draw(format!("refusing to draw '{text}'")));
            }
        }
        self.ops.push(DrawOp::Text {
            surface,
            text: text.to_string(),
            position,
            reserved,
            style: style.id.clone(),
            alignment: style.alignment,
            is_last_fragment,
        });
        Ok(())
    }

    fn draw_line(
        &mut self,
        surface: SurfaceId,
        start: Point,
        end: Point,
        width: f64,
        _style: &StyleDefinition,
    ) -> Result<(), BackendError> {
        self.live_surface(surface)?;
        self.ops.push(DrawOp::Line {
            surface,
            start,
            end,
            width,
        });
        Ok(())
    }

    fn draw_image(
        &mut self,
        surface: SurfaceId,
        position: Point,
        size: Size,
        data: &[u8],
        _style: &StyleDefinition,
    ) -> Result<(), BackendError> {
        self.live_surface(surface)?;
        self.ops.push(DrawOp::Image {
            surface,
            position,
            size,
            bytes: data.len(),
        });
        Ok(())
    }

    fn dispose_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        let s = self
            .surfaces
            .get_mut(surface.0)
            .ok_or(BackendError::UnknownSurface(surface.0))?;
        s.disposals += 1;
        if s.disposals > 1 {
            return Err(BackendError::Surface(format!(
                "surface #{} disposed twice",
                surface.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monospace_metrics_ignore_style() {
        let backend = RecordingBackend::monospace(2.0, 5.0);
        let mut style = StyleDefinition::default();
        style.font_size = 40.0;
        let size = backend.measure_text("abcd", &style, Size::ZERO).unwrap();
        assert_eq!(size, Size::new(8.0, 5.0));
    }

    #[test]
    fn draw_rect_is_four_lines() {
        let mut backend = RecordingBackend::new();
        let s = backend.new_page_surface(Size::new(100.0, 100.0)).unwrap();
        backend
            .draw_rect(s, Point::new(1.0, 1.0), Size::new(10.0, 5.0), 0.5, &StyleDefinition::default())
            .unwrap();
        assert_eq!(backend.ops().len(), 4);
        assert!(backend.ops().iter().all(|op| matches!(op, DrawOp::Line { .. })));
    }

    #[test]
    fn drawing_after_disposal_fails() {
        let mut backend = RecordingBackend::new();
        let s = backend.new_page_surface(Size::new(100.0, 100.0)).unwrap();
        backend.dispose_surface(s).unwrap();
        let style = StyleDefinition::default();
        assert!(backend
            .draw_text(s, "late", Point::ZERO, &style, Size::ZERO, true)
            .is_err());
        assert!(backend.dispose_surface(s).is_err());
        assert_eq!(backend.disposals(s), 2);
    }
}
