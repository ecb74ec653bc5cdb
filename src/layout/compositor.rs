//! # Document Compositor
//!
//! Drives pagination in two passes:
//!
//! 1. **Layout.** One [`AreaCursor`] per area flows its backlog into page
//!    after page until only repeating content is left. Every page acquires
//!    its drawing surface here, and the placements of every area are kept
//!    in a [`PageLayoutRecord`].
//! 2. **Render.** With every page laid out, each element's first page is
//!    known, so nodes that refer forward (table of contents entries, page
//!    counts) render with final values. Each page surface is disposed right
//!    after its page is drawn.
//!
//! A backend error in either pass aborts the run. Surfaces that were
//! acquired and not yet disposed are disposed before the error is returned.

use log::{debug, info, warn};

use crate::backend::{DrawingBackend, SurfaceId};
use crate::config::LayoutConfig;
use crate::error::QuireError;
use crate::geometry::Size;
use crate::model::{Document, ElementId};

use super::arena::NodeArena;
use super::context::{LayoutContext, RenderContext};
use super::cursor::AreaCursor;
use super::node::RenderNode;
use super::origin::{OriginIndex, PageLookup};
use super::record::{PageLayoutRecord, Placement};
use super::registry::RenderTypeRegistry;

/// One laid out page.
#[derive(Debug, Clone)]
pub struct ComposedPage {
    pub index: usize,
    pub surface: SurfaceId,
    /// One record per area that existed on this page, in area order.
    pub records: Vec<PageLayoutRecord>,
}

/// Result of the layout pass.
#[derive(Debug, Clone)]
pub struct Composition {
    page_size: Size,
    pages: Vec<ComposedPage>,
    arena: NodeArena,
    origins: OriginIndex,
    lookup: PageLookup,
}

impl Composition {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_size(&self) -> Size {
        self.page_size
    }

    pub fn pages(&self) -> &[ComposedPage] {
        &self.pages
    }

    pub fn record(&self, page: usize, area: &str) -> Option<&PageLayoutRecord> {
        self.pages
            .get(page)?
            .records
            .iter()
            .find(|r| r.area == area)
    }

    /// Every record across all pages, in page order.
    pub fn records(&self) -> impl Iterator<Item = &PageLayoutRecord> {
        self.pages.iter().flat_map(|p| p.records.iter())
    }

    pub fn node(&self, placement: &Placement) -> &RenderNode {
        &self.arena[placement.node]
    }

    /// Texts of the nodes placed in `area` on `page`, in placement order.
    pub fn texts_in(&self, page: usize, area: &str) -> Vec<&str> {
        self.record(page, area)
            .map(|record| {
                record
                    .placements
                    .iter()
                    .filter_map(|p| self.arena[p.node].text())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 0-based index of the first page `element` landed on.
    pub fn page_of(&self, element: ElementId) -> Option<usize> {
        self.lookup.page_of(element)
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn origins(&self) -> &OriginIndex {
        &self.origins
    }
}

pub struct DocumentCompositor<'a> {
    document: &'a Document,
    config: &'a LayoutConfig,
    registry: RenderTypeRegistry,
}

impl<'a> DocumentCompositor<'a> {
    pub fn new(document: &'a Document, config: &'a LayoutConfig) -> Self {
        Self {
            document,
            config,
            registry: RenderTypeRegistry::standard(),
        }
    }

    pub fn with_registry(mut self, registry: RenderTypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    fn layout_context<'b>(&'b self, backend: &'b dyn DrawingBackend) -> LayoutContext<'b> {
        LayoutContext {
            document: self.document,
            config: self.config,
            registry: &self.registry,
            backend,
        }
    }

    /// Run both passes.
    pub fn compose(&self, backend: &mut dyn DrawingBackend) -> Result<Composition, QuireError> {
        let composition = self.layout(backend)?;
        self.render(&composition, backend)?;
        info!(
            "composed {} page(s) across {} area(s)",
            composition.page_count(),
            self.document.areas().len()
        );
        Ok(composition)
    }

    /// Layout pass. The returned composition holds one live surface per
    /// page; pass it to [`DocumentCompositor::render`] to draw and release
    /// them.
    pub fn layout(&self, backend: &mut dyn DrawingBackend) -> Result<Composition, QuireError> {
        let mut surfaces = Vec::new();
        match self.paginate(backend, &mut surfaces) {
            Ok(composition) => Ok(composition),
            Err(e) => {
                dispose_all(backend, &surfaces);
                Err(e)
            }
        }
    }

    fn paginate(
        &self,
        backend: &mut dyn DrawingBackend,
        surfaces: &mut Vec<SurfaceId>,
    ) -> Result<Composition, QuireError> {
        let page_size = self.document.page_size.dimensions();
        let mut arena = NodeArena::new();
        let mut origins = OriginIndex::new();
        let mut cursors = self.build_cursors(&*backend, &mut arena, &mut origins);

        let mut pages = Vec::new();
        loop {
            if cursors.iter().all(|c| c.only_repeats(&arena)) {
                break;
            }
            let index = pages.len();
            let surface = backend.new_page_surface(page_size)?;
            surfaces.push(surface);

            let ctx = self.layout_context(&*backend);
            let mut records = Vec::with_capacity(cursors.len());
            for cursor in &mut cursors {
                let mut record = PageLayoutRecord::new(index, &cursor.area().id, surface);
                record.placements = cursor.layout(&ctx, &mut arena)?;
                debug!(
                    "page {index}: area '{}' placed {} node(s), {} waiting",
                    record.area,
                    record.placements.len(),
                    cursor.backlog().len()
                );
                records.push(record);
            }
            pages.push(ComposedPage {
                index,
                surface,
                records,
            });

            cursors = cursors
                .into_iter()
                .filter_map(|cursor| cursor.next(&arena))
                .collect();
        }

        let all_records: Vec<PageLayoutRecord> =
            pages.iter().flat_map(|p| p.records.iter().cloned()).collect();
        let lookup = origins.resolve_pages(&arena, &all_records);
        debug!("layout pass done: {} page(s), {} node(s)", pages.len(), arena.len());

        Ok(Composition {
            page_size,
            pages,
            arena,
            origins,
            lookup,
        })
    }

    /// Build every area's backlog in document order.
    fn build_cursors(
        &self,
        backend: &dyn DrawingBackend,
        arena: &mut NodeArena,
        origins: &mut OriginIndex,
    ) -> Vec<AreaCursor> {
        let ctx = self.layout_context(backend);
        let mut cursors: Vec<AreaCursor> = self
            .document
            .areas()
            .iter()
            .map(|area| AreaCursor::new(area.clone(), self.document.area_origin(area)))
            .collect();

        for (id, element) in self.document.iter_elements() {
            let Some(cursor) = cursors.iter_mut().find(|c| c.area().id == element.area) else {
                warn!("{id}: area '{}' does not exist, element dropped", element.area);
                continue;
            };
            let nodes: Vec<_> = self
                .registry
                .build_expanded(&ctx, id, element)
                .into_iter()
                .map(|node| arena.alloc(node))
                .collect();
            origins.record(id, &element.area, nodes.clone());
            cursor.extend(nodes);
        }
        cursors
    }

    /// Render pass. Disposes every page surface of `composition` exactly
    /// once, whether or not rendering succeeds.
    pub fn render(
        &self,
        composition: &Composition,
        backend: &mut dyn DrawingBackend,
    ) -> Result<(), QuireError> {
        let page_count = composition.page_count();
        for (position, page) in composition.pages.iter().enumerate() {
            let drawn = self.render_page(composition, page, page_count, backend);
            let disposed = backend.dispose_surface(page.surface);
            let outcome = drawn.and_then(|()| disposed.map_err(QuireError::from));
            if let Err(e) = outcome {
                let rest: Vec<SurfaceId> = composition.pages[position + 1..]
                    .iter()
                    .map(|p| p.surface)
                    .collect();
                dispose_all(backend, &rest);
                return Err(e);
            }
        }
        Ok(())
    }

    fn render_page(
        &self,
        composition: &Composition,
        page: &ComposedPage,
        page_count: usize,
        backend: &mut dyn DrawingBackend,
    ) -> Result<(), QuireError> {
        let mut ctx = RenderContext {
            document: self.document,
            config: self.config,
            registry: &self.registry,
            backend,
            pages: &composition.lookup,
            surface: page.surface,
            page_index: page.index,
            page_count,
        };
        for record in &page.records {
            for placement in &record.placements {
                composition.arena[placement.node].render(&mut ctx, placement.position, placement.size)?;
            }
        }
        Ok(())
    }
}

/// Dispose surfaces after a failure. Errors here are logged, the original
/// failure is what gets reported.
fn dispose_all(backend: &mut dyn DrawingBackend, surfaces: &[SurfaceId]) {
    for surface in surfaces {
        if let Err(e) = backend.dispose_surface(*surface) {
            warn!("failed to dispose surface #{}: {e}", surface.0);
        }
    }
}
