//! A fixed-width box that packs nodes left to right, top to bottom.
//!
//! Used for table cells and for composite nodes measured or drawn as a unit.
//! Unlike an area, a box never stops at a node that does not fit: it splits
//! what it can, places the rest anyway when there is no height limit, and
//! sets aside what would exceed the limit.

use crate::error::QuireError;
use crate::geometry::{Point, Size, Spacing};

use super::context::{LayoutContext, RenderContext};
use super::node::RenderNode;

/// Split generations after which a node is placed as it is.
const MAX_SPLIT_DEPTH: usize = 1024;

/// A node placed in a box. `position` is relative to the box origin.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxPlacement {
    pub node: RenderNode,
    pub position: Point,
    pub size: Size,
}

#[derive(Debug, Clone)]
pub struct ConstrainedBox {
    max_width: f64,
    max_height: Option<f64>,
    x: f64,
    y: f64,
    row_height: f64,
    used_width: f64,
    placements: Vec<BoxPlacement>,
    overflow: Vec<RenderNode>,
}

impl ConstrainedBox {
    pub fn new(max_width: f64, max_height: Option<f64>) -> Self {
        Self {
            max_width,
            max_height,
            x: 0.0,
            y: 0.0,
            row_height: 0.0,
            used_width: 0.0,
            placements: Vec::new(),
            overflow: Vec::new(),
        }
    }

    /// Total height consumed, including the current row.
    pub fn height(&self) -> f64 {
        self.y + self.row_height
    }

    /// Widest row reached.
    pub fn used_width(&self) -> f64 {
        self.used_width
    }

    pub fn placements(&self) -> &[BoxPlacement] {
        &self.placements
    }

    /// Nodes that would have exceeded the height limit, in order.
    pub fn overflow(&self) -> &[RenderNode] {
        &self.overflow
    }

    fn available(&self) -> Size {
        Size::new(
            (self.max_width - self.x).max(0.0),
            self.max_height
                .map_or(f64::INFINITY, |h| (h - self.y).max(0.0)),
        )
    }

    pub fn pack<I>(&mut self, ctx: &LayoutContext, nodes: I) -> Result<(), QuireError>
    where
        I: IntoIterator<Item = RenderNode>,
    {
        for node in nodes {
            self.take(ctx, node)?;
        }
        Ok(())
    }

    /// Place one node, splitting it as needed.
    pub fn take(&mut self, ctx: &LayoutContext, node: RenderNode) -> Result<(), QuireError> {
        // Work list in reverse order, so fragments are taken before anything
        // that came after their parent.
        let mut pending = vec![(node, 0usize)];
        while let Some((node, depth)) = pending.pop() {
            if let Some(parts) = node.pre_expand(ctx) {
                pending.extend(parts.into_iter().rev().map(|p| (p, depth + 1)));
                continue;
            }
            if !self.overflow.is_empty() {
                self.overflow.push(node);
                continue;
            }
            if node.is_page_break() {
                self.end_row();
                continue;
            }

            let margin = node.margin(ctx.document);
            let available = self.available();
            let content = node.measure(ctx, available.shrink(margin))?;
            let total = content.grow(margin);
            if total.fits_within(available) {
                self.place(node, margin, content, total);
                continue;
            }

            if depth < MAX_SPLIT_DEPTH {
                if let Some(parts) = node.split_to_fit(ctx, available)? {
                    if !parts.is_empty() {
                        pending.extend(parts.into_iter().rev().map(|p| (p, depth + 1)));
                        continue;
                    }
                }
            }

            match self.max_height {
                Some(limit) if self.y + total.height > limit => self.overflow.push(node),
                _ => self.place(node, margin, content, total),
            }
        }
        Ok(())
    }

    fn place(&mut self, node: RenderNode, margin: Spacing, content: Size, total: Size) {
        let position = Point::new(self.x + margin.left, self.y + margin.top);
        self.used_width = self.used_width.max(self.x + total.width);
        self.row_height = self.row_height.max(total.height);
        let line_break = node.is_line_break();
        self.placements.push(BoxPlacement {
            node,
            position,
            size: content,
        });
        if line_break {
            self.end_row();
        } else {
            self.x += total.width;
        }
    }

    fn end_row(&mut self) {
        self.y += self.row_height;
        self.x = 0.0;
        self.row_height = 0.0;
    }

    /// Render every placed node with the box origin at `origin`.
    pub fn render(&self, ctx: &mut RenderContext, origin: Point) -> Result<(), QuireError> {
        for placement in &self.placements {
            let position = origin.offset(placement.position.x, placement.position.y);
            placement.node.render(ctx, position, placement.size)?;
        }
        Ok(())
    }
}
