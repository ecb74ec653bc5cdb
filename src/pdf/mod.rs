//! # PDF Backend
//!
//! A [`DrawingBackend`] that writes a PDF 1.7 file.
//!
//! Every page surface collects its own content stream while the compositor
//! draws. Disposing a surface seals its page. [`PdfBackend::finish`] then
//! lays the objects out:
//!
//! ```text
//! %PDF-1.7
//! 1 0 obj  Catalog
//! 2 0 obj  Pages
//! 3 0 obj  shared Resources (fonts, images)
//! ...      fonts, image XObjects, one content stream + Page per page, Info
//! xref
//! trailer
//! %%EOF
//! ```
//!
//! Layout coordinates are millimetres from the top-left corner. PDF user
//! space is points from the bottom-left corner, so every position is scaled
//! and flipped on the way in.

use std::fmt::Write as FmtWrite;
use std::io::Write as IoWrite;

use log::debug;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::backend::{DrawingBackend, SurfaceId, MM_PER_PT};
use crate::error::BackendError;
use crate::font::{StandardFont, ASCENT, LINE_HEIGHT};
use crate::geometry::{Point, Size};
use crate::image_loader::{self, ImageSamples, LoadedImage};
use crate::model::Metadata;
use crate::style::{Alignment, Color, Decoration, StyleDefinition};

fn pt(mm: f64) -> f64 {
    mm / MM_PER_PT
}

#[derive(Debug)]
struct PdfPage {
    /// Page size in points.
    width: f64,
    height: f64,
    content: String,
    sealed: bool,
}

#[derive(Debug)]
struct EmbeddedImage {
    source: Vec<u8>,
    image: LoadedImage,
}

#[derive(Debug, Default)]
pub struct PdfBackend {
    metadata: Metadata,
    pages: Vec<PdfPage>,
    fonts: Vec<StandardFont>,
    images: Vec<EmbeddedImage>,
}

impl PdfBackend {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Self::default()
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_mut(&mut self, surface: SurfaceId) -> Result<&mut PdfPage, BackendError> {
        let page = self
            .pages
            .get_mut(surface.0)
            .ok_or(BackendError::UnknownSurface(surface.0))?;
        if page.sealed {
            return Err(BackendError::Surface(format!(
                "page {} is already finished",
                surface.0 + 1
            )));
        }
        Ok(page)
    }

    fn font_index(&mut self, font: StandardFont) -> usize {
        match self.fonts.iter().position(|f| *f == font) {
            Some(i) => i,
            None => {
                self.fonts.push(font);
                self.fonts.len() - 1
            }
        }
    }

    fn image_index(&mut self, data: &[u8]) -> Result<usize, BackendError> {
        if let Some(i) = self.images.iter().position(|img| img.source == data) {
            return Ok(i);
        }
        let image = image_loader::load(data)?;
        self.images.push(EmbeddedImage {
            source: data.to_vec(),
            image,
        });
        Ok(self.images.len() - 1)
    }

    /// Serialize the document. Every page must have been disposed.
    pub fn finish(self) -> Result<Vec<u8>, BackendError> {
        if let Some(open) = self.pages.iter().position(|p| !p.sealed) {
            return Err(BackendError::Surface(format!(
                "page {} was never finished",
                open + 1
            )));
        }

        let mut objects = ObjectTable::new();
        let catalog = objects.reserve();
        let pages_root = objects.reserve();
        let resources = objects.reserve();

        let font_ids: Vec<usize> = self
            .fonts
            .iter()
            .map(|font| {
                objects.push(
                    format!(
                        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                        font.pdf_name()
                    )
                    .into_bytes(),
                )
            })
            .collect();
        let image_ids: Vec<usize> = self
            .images
            .iter()
            .map(|embedded| write_image_xobject(&mut objects, &embedded.image))
            .collect();

        let mut resource_dict = String::from("<< /Font << ");
        for (i, id) in font_ids.iter().enumerate() {
            let _ = write!(resource_dict, "/F{i} {id} 0 R ");
        }
        resource_dict.push_str(">>");
        if !image_ids.is_empty() {
            resource_dict.push_str(" /XObject << ");
            for (i, id) in image_ids.iter().enumerate() {
                let _ = write!(resource_dict, "/Im{i} {id} 0 R ");
            }
            resource_dict.push_str(">>");
        }
        resource_dict.push_str(" >>");
        objects.set(resources, resource_dict.into_bytes());

        let mut page_ids = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let compressed = compress_to_vec_zlib(page.content.as_bytes(), 6);
            let mut stream = Vec::with_capacity(compressed.len() + 64);
            let _ = write!(
                stream,
                "<< /Length {} /Filter /FlateDecode >>\nstream\n",
                compressed.len()
            );
            stream.extend_from_slice(&compressed);
            stream.extend_from_slice(b"\nendstream");
            let content = objects.push(stream);

            let page_id = objects.push(
                format!(
                    "<< /Type /Page /Parent {pages_root} 0 R /MediaBox [0 0 {:.2} {:.2}] \
                     /Contents {content} 0 R /Resources {resources} 0 R >>",
                    page.width, page.height
                )
                .into_bytes(),
            );
            page_ids.push(page_id);
        }

        objects.set(
            catalog,
            format!("<< /Type /Catalog /Pages {pages_root} 0 R >>").into_bytes(),
        );
        let kids = page_ids
            .iter()
            .map(|id| format!("{id} 0 R"))
            .collect::<Vec<_>>()
            .join(" ");
        objects.set(
            pages_root,
            format!("<< /Type /Pages /Kids [{kids}] /Count {} >>", page_ids.len()).into_bytes(),
        );

        let mut info = String::from("<< ");
        if let Some(title) = &self.metadata.title {
            let _ = write!(info, "/Title ({}) ", escape_pdf_string(title));
        }
        if let Some(creator) = &self.metadata.creator {
            let _ = write!(info, "/Creator ({}) ", escape_pdf_string(creator));
        }
        info.push_str("/Producer (quire) >>");
        let info_id = objects.push(info.into_bytes());

        debug!(
            "pdf: {} page(s), {} font(s), {} image(s)",
            page_ids.len(),
            font_ids.len(),
            image_ids.len()
        );
        Ok(objects.serialize(catalog, info_id))
    }
}

impl DrawingBackend for PdfBackend {
    fn measure_text(
        &self,
        text: &str,
        style: &StyleDefinition,
        _reserved: Size,
    ) -> Result<Size, BackendError> {
        let font = StandardFont::for_style(style);
        Ok(Size::new(
            font.measure(text, style.font_size) * MM_PER_PT,
            style.font_size * LINE_HEIGHT * MM_PER_PT,
        ))
    }

    fn new_page_surface(&mut self, page_size: Size) -> Result<SurfaceId, BackendError> {
        if page_size.width <= 0.0 || page_size.height <= 0.0 {
            return Err(BackendError::Surface(format!(
                "invalid page size {}x{} mm",
                page_size.width, page_size.height
            )));
        }
        self.pages.push(PdfPage {
            width: pt(page_size.width),
            height: pt(page_size.height),
            content: String::new(),
            sealed: false,
        });
        Ok(SurfaceId(self.pages.len() - 1))
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
        let font = StandardFont::for_style(style);
        let font_index = self.font_index(font);
        let page = self.page_mut(surface)?;

        let size = style.font_size;
        let text_width = font.measure(text, size);
        let box_width = pt(reserved.width);
        let slack = (box_width - text_width).max(0.0);
        let spaces = text.chars().filter(|c| *c == ' ').count();

        let (offset, word_spacing) = match style.alignment {
            Alignment::Left => (0.0, 0.0),
            Alignment::Right => (slack, 0.0),
            Alignment::Center => (slack / 2.0, 0.0),
            Alignment::Justified if !is_last_fragment && spaces > 0 => {
                (0.0, slack / spaces as f64)
            }
            Alignment::Justified => (0.0, 0.0),
        };

        let x = pt(position.x) + offset;
        let baseline = page.height - pt(position.y) - ASCENT * size;
        let color = style.color();
        let s = &mut page.content;

        let _ = writeln!(s, "q");
        write_fill_color(s, color);
        let _ = writeln!(s, "BT");
        let _ = writeln!(s, "/F{font_index} {size:.1} Tf");
        if word_spacing > 0.0 {
            let _ = writeln!(s, "{word_spacing:.3} Tw");
        }
        let _ = writeln!(s, "{x:.2} {baseline:.2} Td");
        let _ = writeln!(s, "({}) Tj", encode_winansi(text));
        let _ = writeln!(s, "ET");

        let drawn_width = text_width + word_spacing * spaces as f64;
        let rule = match style.decoration {
            Decoration::Underline => Some(baseline - 0.12 * size),
            Decoration::Strike => Some(baseline + 0.3 * size),
            _ => None,
        };
        if let Some(y) = rule {
            write_stroke_color(s, color);
            let _ = writeln!(
                s,
                "{:.2} w\n{x:.2} {y:.2} m\n{:.2} {y:.2} l\nS",
                0.05 * size,
                x + drawn_width
            );
        }
        let _ = writeln!(s, "Q");
        Ok(())
    }

    fn draw_line(
        &mut self,
        surface: SurfaceId,
        start: Point,
        end: Point,
        width: f64,
        style: &StyleDefinition,
    ) -> Result<(), BackendError> {
        let page = self.page_mut(surface)?;
        let h = page.height;
        let s = &mut page.content;
        let _ = writeln!(s, "q");
        write_stroke_color(s, style.color());
        let _ = writeln!(
            s,
            "{:.3} w\n{:.2} {:.2} m\n{:.2} {:.2} l\nS\nQ",
            pt(width),
            pt(start.x),
            h - pt(start.y),
            pt(end.x),
            h - pt(end.y)
        );
        Ok(())
    }

    fn draw_rect(
        &mut self,
        surface: SurfaceId,
        position: Point,
        size: Size,
        width: f64,
        style: &StyleDefinition,
    ) -> Result<(), BackendError> {
        let page = self.page_mut(surface)?;
        let bottom = page.height - pt(position.y + size.height);
        let s = &mut page.content;
        let _ = writeln!(s, "q");
        write_stroke_color(s, style.color());
        let _ = writeln!(
            s,
            "{:.3} w\n{:.2} {:.2} {:.2} {:.2} re\nS\nQ",
            pt(width),
            pt(position.x),
            bottom,
            pt(size.width),
            pt(size.height)
        );
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
        self.page_mut(surface)?;
        let index = self.image_index(data)?;
        let page = self.page_mut(surface)?;
        let bottom = page.height - pt(position.y + size.height);
        let _ = writeln!(
            page.content,
            "q\n{:.4} 0 0 {:.4} {:.2} {:.2} cm\n/Im{index} Do\nQ",
            pt(size.width),
            pt(size.height),
            pt(position.x),
            bottom
        );
        Ok(())
    }

    fn dispose_surface(&mut self, surface: SurfaceId) -> Result<(), BackendError> {
        let page = self.page_mut(surface)?;
        page.sealed = true;
        Ok(())
    }
}

fn write_fill_color(s: &mut String, c: Color) {
    let _ = writeln!(s, "{:.3} {:.3} {:.3} rg", c.r, c.g, c.b);
}

fn write_stroke_color(s: &mut String, c: Color) {
    let _ = writeln!(s, "{:.3} {:.3} {:.3} RG", c.r, c.g, c.b);
}

/// PDF objects, numbered from 1.
struct ObjectTable {
    objects: Vec<Vec<u8>>,
}

impl ObjectTable {
    fn new() -> Self {
        Self {
            objects: Vec::new(),
        }
    }

    fn reserve(&mut self) -> usize {
        self.push(Vec::new())
    }

    fn push(&mut self, data: Vec<u8>) -> usize {
        self.objects.push(data);
        self.objects.len()
    }

    fn set(&mut self, id: usize, data: Vec<u8>) {
        self.objects[id - 1] = data;
    }

    fn serialize(&self, root: usize, info: usize) -> Vec<u8> {
        let mut output: Vec<u8> = Vec::new();
        let mut offsets = Vec::with_capacity(self.objects.len());

        output.extend_from_slice(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n");
        for (i, data) in self.objects.iter().enumerate() {
            offsets.push(output.len());
            let _ = write!(output, "{} 0 obj\n", i + 1);
            output.extend_from_slice(data);
            output.extend_from_slice(b"\nendobj\n");
        }

        let xref = output.len();
        let _ = write!(output, "xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1);
        for offset in &offsets {
            let _ = write!(output, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            output,
            "trailer\n<< /Size {} /Root {root} 0 R /Info {info} 0 R >>\nstartxref\n{xref}\n%%EOF\n",
            self.objects.len() + 1
        );
        output
    }
}

/// Write an image as an XObject (plus an SMask for translucent PNGs) and
/// return the XObject id.
fn write_image_xobject(objects: &mut ObjectTable, image: &LoadedImage) -> usize {
    let (w, h) = (image.width_px, image.height_px);
    match &image.samples {
        ImageSamples::Jpeg { data, gray } => {
            let mut obj = Vec::with_capacity(data.len() + 160);
            let _ = write!(
                obj,
                "<< /Type /XObject /Subtype /Image /Width {w} /Height {h} \
                 /ColorSpace /{} /BitsPerComponent 8 /Filter /DCTDecode /Length {} >>\nstream\n",
                if *gray { "DeviceGray" } else { "DeviceRGB" },
                data.len()
            );
            obj.extend_from_slice(data);
            obj.extend_from_slice(b"\nendstream");
            objects.push(obj)
        }
        ImageSamples::Rgb { rgb, alpha } => {
            let smask = alpha.as_ref().map(|alpha| {
                let compressed = compress_to_vec_zlib(alpha, 6);
                let mut obj = Vec::with_capacity(compressed.len() + 160);
                let _ = write!(
                    obj,
                    "<< /Type /XObject /Subtype /Image /Width {w} /Height {h} \
                     /ColorSpace /DeviceGray /BitsPerComponent 8 /Filter /FlateDecode /Length {} >>\nstream\n",
                    compressed.len()
                );
                obj.extend_from_slice(&compressed);
                obj.extend_from_slice(b"\nendstream");
                objects.push(obj)
            });

            let compressed = compress_to_vec_zlib(rgb, 6);
            let smask_ref = smask.map(|id| format!(" /SMask {id} 0 R")).unwrap_or_default();
            let mut obj = Vec::with_capacity(compressed.len() + 180);
            let _ = write!(
                obj,
                "<< /Type /XObject /Subtype /Image /Width {w} /Height {h} \
                 /ColorSpace /DeviceRGB /BitsPerComponent 8 /Filter /FlateDecode /Length {}{smask_ref} >>\nstream\n",
                compressed.len()
            );
            obj.extend_from_slice(&compressed);
            obj.extend_from_slice(b"\nendstream");
            objects.push(obj)
        }
    }
}

fn escape_pdf_string(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// Encode text as a WinAnsi literal string body. Characters outside the
/// encoding become `?`.
fn encode_winansi(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match to_winansi(ch).unwrap_or(b'?') {
            b'\\' => out.push_str("\\\\"),
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b @ 0x20..=0x7E => out.push(b as char),
            b => {
                let _ = write!(out, "\\{b:03o}");
            }
        }
    }
    out
}

fn to_winansi(ch: char) -> Option<u8> {
    let cp = ch as u32;
    if (0x20..=0x7E).contains(&cp) || (0xA0..=0xFF).contains(&cp) {
        return Some(cp as u8);
    }
    match cp {
        0x20AC => Some(0x80),
        0x201A => Some(0x82),
        0x0192 => Some(0x83),
        0x201E => Some(0x84),
        0x2026 => Some(0x85),
        0x2020 => Some(0x86),
        0x2021 => Some(0x87),
        0x02C6 => Some(0x88),
        0x2030 => Some(0x89),
        0x0160 => Some(0x8A),
        0x2039 => Some(0x8B),
        0x0152 => Some(0x8C),
        0x017D => Some(0x8E),
        0x2018 => Some(0x91),
        0x2019 => Some(0x92),
        0x201C => Some(0x93),
        0x201D => Some(0x94),
        0x2022 => Some(0x95),
        0x2013 => Some(0x96),
        0x2014 => Some(0x97),
        0x02DC => Some(0x98),
        0x2122 => Some(0x99),
        0x0161 => Some(0x9A),
        0x203A => Some(0x9B),
        0x0153 => Some(0x9C),
        0x017E => Some(0x9E),
        0x0178 => Some(0x9F),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    fn one_page() -> (PdfBackend, SurfaceId) {
        let mut backend = PdfBackend::new(Metadata::default());
        let s = backend.new_page_surface(Size::new(210.0, 297.0)).unwrap();
        (backend, s)
    }

    #[test]
    fn escapes_parentheses_and_backslashes() {
        assert_eq!(escape_pdf_string("a (b) \\c"), "a \\(b\\) \\\\c");
    }

    #[test]
    fn encodes_bullets_and_unknown_characters() {
        assert_eq!(encode_winansi("\u{2022} x"), "\\225 x");
        assert_eq!(encode_winansi("\u{4e2d}"), "?");
        assert_eq!(encode_winansi("(é)"), "\\(\\351\\)");
    }

    #[test]
    fn finished_document_is_well_formed() {
        let (mut backend, s) = one_page();
        let style = StyleDefinition::default();
        backend
            .draw_text(s, "Hello", Point::new(10.0, 10.0), &style, Size::new(100.0, 5.0), true)
            .unwrap();
        backend
            .draw_line(s, Point::new(0.0, 0.0), Point::new(50.0, 0.0), 0.3, &style)
            .unwrap();
        backend.dispose_surface(s).unwrap();
        let bytes = backend.finish().unwrap();

        assert!(bytes.starts_with(b"%PDF-1.7"));
        assert!(contains(&bytes, b"xref"));
        assert!(contains(&bytes, b"trailer"));
        assert!(contains(&bytes, b"/BaseFont /Helvetica"));
        assert!(contains(&bytes, b"/Count 1"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn metadata_goes_into_info() {
        let mut backend = PdfBackend::new(Metadata {
            title: Some("Report (draft)".to_string()),
            creator: Some("tests".to_string()),
        });
        let s = backend.new_page_surface(Size::new(100.0, 100.0)).unwrap();
        backend.dispose_surface(s).unwrap();
        let text = String::from_utf8_lossy(&backend.finish().unwrap()).into_owned();
        assert!(text.contains("/Title (Report \\(draft\\))"));
        assert!(text.contains("/Creator (tests)"));
    }

    #[test]
    fn unfinished_page_is_an_error() {
        let (backend, _) = one_page();
        assert!(matches!(backend.finish(), Err(BackendError::Surface(_))));
    }

    #[test]
    fn sealed_page_rejects_drawing_and_second_disposal() {
        let (mut backend, s) = one_page();
        backend.dispose_surface(s).unwrap();
        let style = StyleDefinition::default();
        assert!(backend
            .draw_line(s, Point::ZERO, Point::new(1.0, 1.0), 0.3, &style)
            .is_err());
        assert!(backend.dispose_surface(s).is_err());
        assert!(matches!(
            backend.dispose_surface(SurfaceId(9)),
            Err(BackendError::UnknownSurface(9))
        ));
    }

    #[test]
    fn measures_in_millimetres() {
        let backend = PdfBackend::default();
        let mut style = StyleDefinition::default();
        style.font_size = 12.0;
        let size = backend.measure_text(" ", &style, Size::ZERO).unwrap();
        assert!((size.width - 3.336 * MM_PER_PT).abs() < 1e-9);
        assert!((size.height - 14.4 * MM_PER_PT).abs() < 1e-9);
    }

    #[test]
    fn same_image_is_embedded_once() {
        let (mut backend, s) = one_page();
        let png = crate::image_loader::tests::png(2, 2, 255);
        let style = StyleDefinition::default();
        for y in [0.0, 20.0] {
            backend
                .draw_image(s, Point::new(0.0, y), Size::new(10.0, 10.0), &png, &style)
                .unwrap();
        }
        backend.dispose_surface(s).unwrap();
        let bytes = backend.finish().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Subtype /Image").count(), 1);
    }

    #[test]
    fn undecodable_image_is_a_backend_error() {
        let (mut backend, s) = one_page();
        let style = StyleDefinition::default();
        let result = backend.draw_image(s, Point::ZERO, Size::new(1.0, 1.0), b"nope", &style);
        assert!(matches!(result, Err(BackendError::Image(_))));
    }
}
