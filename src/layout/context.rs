//! Environments handed to render nodes.

use crate::backend::{DrawingBackend, SurfaceId};
use crate::config::LayoutConfig;
use crate::error::QuireError;
use crate::geometry::Size;
use crate::model::{Document, ElementId};
use crate::style::StyleDefinition;

use super::origin::PageLookup;
use super::registry::RenderTypeRegistry;

/// Read-only environment for building, expanding, measuring and splitting
/// nodes during the layout pass.
#[derive(Clone, Copy)]
pub struct LayoutContext<'a> {
    pub document: &'a Document,
    pub config: &'a LayoutConfig,
    pub registry: &'a RenderTypeRegistry,
    pub backend: &'a dyn DrawingBackend,
}

impl<'a> LayoutContext<'a> {
    pub fn style(&self, id: Option<&str>) -> &'a StyleDefinition {
        self.document.resolve_style(id)
    }

    pub fn measure_text(
        &self,
        text: &str,
        style: &StyleDefinition,
        reserved: Size,
    ) -> Result<Size, QuireError> {
        Ok(self.backend.measure_text(text, style, reserved)?)
    }
}

/// Environment for the render pass. Every page is already laid out, so page
/// numbers and forward references resolve here.
pub struct RenderContext<'a> {
    pub document: &'a Document,
    pub config: &'a LayoutConfig,
    pub registry: &'a RenderTypeRegistry,
    pub backend: &'a mut dyn DrawingBackend,
    pub pages: &'a PageLookup,
    pub surface: SurfaceId,
    pub page_index: usize,
    pub page_count: usize,
}

impl<'a> RenderContext<'a> {
    /// A measuring view of this context, for nodes that lay out children
    /// while rendering.
    pub fn layout(&self) -> LayoutContext<'_> {
        LayoutContext {
            document: self.document,
            config: self.config,
            registry: self.registry,
            backend: &*self.backend,
        }
    }

    pub fn style(&self, id: Option<&str>) -> &'a StyleDefinition {
        self.document.resolve_style(id)
    }

    /// 0-based page index an element first landed on.
    pub fn page_of(&self, element: ElementId) -> Option<usize> {
        self.pages.page_of(element)
    }
}
