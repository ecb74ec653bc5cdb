//! # Quire
//!
//! Paginates documents made of fixed page areas.
//!
//! A document declares rectangular areas on the page (a body, a header
//! strip, a sidebar that only exists on the first page) and a flat list of
//! elements, each naming the area it flows into. Quire pours every area's
//! content into page after page, wrapping text, shrinking images and
//! splitting tables, until nothing but repeating content is left. Then it
//! draws the pages through a [`backend::DrawingBackend`].
//!
//! ## Architecture
//!
//! ```text
//! Input (JSON / API)
//!       ↓
//!   [model]     Document: areas, styles, resources, elements
//!       ↓
//!   [validate]  Messages about references that will not resolve
//!       ↓
//!   [layout]    Two-pass compositor: lay out every page, then render
//!       ↓
//!   [backend]   Measurement and drawing (PDF, or an in-memory recording)
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod font;
pub mod geometry;
pub mod image_loader;
pub mod layout;
pub mod model;
pub mod pdf;
pub mod style;
pub mod validate;

pub use config::LayoutConfig;
pub use error::{BackendError, QuireError};
pub use layout::{Composition, DocumentCompositor};
pub use model::Document;
pub use validate::{validate, Severity, ValidationMessage};

use backend::DrawingBackend;
use pdf::PdfBackend;

/// Lay out and render `document` against any backend.
pub fn compose(
    document: &Document,
    config: &LayoutConfig,
    backend: &mut dyn DrawingBackend,
) -> Result<Composition, QuireError> {
    DocumentCompositor::new(document, config).compose(backend)
}

/// Render `document` to PDF bytes.
pub fn render_pdf(document: &Document, config: &LayoutConfig) -> Result<Vec<u8>, QuireError> {
    let mut backend = PdfBackend::new(document.metadata.clone());
    compose(document, config, &mut backend)?;
    Ok(backend.finish()?)
}

/// Render a JSON document description to PDF bytes with default settings.
pub fn render_json(json: &str) -> Result<Vec<u8>, QuireError> {
    let document = Document::from_json(json)?;
    render_pdf(&document, &LayoutConfig::default())
}
