//! # Area Cursor
//!
//! Flows an area's backlog of nodes into the area, one page at a time.
//!
//! Placement keeps document order: when a node cannot be placed (even after
//! splitting), the rest of the area waits for the next page. A node gets one
//! such failure; failing again drops it with a warning. That retry limit is
//! what guarantees pagination ends for content that can never fit, such as
//! a word wider than its area.

use std::collections::HashSet;

use log::{debug, warn};

use crate::error::QuireError;
use crate::geometry::{Point, Size, Spacing, EPSILON};
use crate::model::{AreaDefinition, Availability};

use super::arena::{NodeArena, NodeId};
use super::context::LayoutContext;
use super::node::RenderNode;
use super::record::Placement;

struct Fit {
    available: Size,
    margin: Spacing,
    content: Size,
    total: Size,
    fits: bool,
}

#[derive(Debug, Clone)]
pub struct AreaCursor {
    area: AreaDefinition,
    /// Page coordinates of the area's top-left corner.
    origin: Point,
    backlog: Vec<NodeId>,
    failed: HashSet<NodeId>,
}

impl AreaCursor {
    pub fn new(area: AreaDefinition, origin: Point) -> Self {
        Self {
            area,
            origin,
            backlog: Vec::new(),
            failed: HashSet::new(),
        }
    }

    pub fn area(&self) -> &AreaDefinition {
        &self.area
    }

    pub fn backlog(&self) -> &[NodeId] {
        &self.backlog
    }

    /// Queue nodes after the current backlog.
    pub fn extend<I: IntoIterator<Item = NodeId>>(&mut self, nodes: I) {
        self.backlog.extend(nodes);
    }

    /// True when nothing but repeating nodes is left.
    pub fn only_repeats(&self, arena: &NodeArena) -> bool {
        self.backlog.iter().all(|id| arena[*id].is_repeating())
    }

    /// Whether `id` fits at the cursor position `(x, y)`.
    pub fn can_place(
        &self,
        ctx: &LayoutContext,
        arena: &NodeArena,
        id: NodeId,
        x: f64,
        y: f64,
    ) -> Result<bool, QuireError> {
        Ok(self.fit(ctx, &arena[id], x, y)?.fits)
    }

    /// Measure `node` against the space left from `(x, y)`.
    fn fit(&self, ctx: &LayoutContext, node: &RenderNode, x: f64, y: f64) -> Result<Fit, QuireError> {
        let available = self.remaining(x, y);
        let margin = node.margin(ctx.document);
        let content = node.measure(ctx, available.shrink(margin))?;
        let total = content.grow(margin);
        Ok(Fit {
            available,
            margin,
            content,
            total,
            fits: total.fits_within(available),
        })
    }

    fn remaining(&self, x: f64, y: f64) -> Size {
        Size::new(
            (self.area.size.width - x).max(0.0),
            (self.area.size.height - y).max(0.0),
        )
    }

    /// Lay out as much of the backlog as fits on this page.
    pub fn layout(
        &mut self,
        ctx: &LayoutContext,
        arena: &mut NodeArena,
    ) -> Result<Vec<Placement>, QuireError> {
        let mut placements = Vec::new();
        let (mut x, mut y, mut row_height) = (0.0_f64, 0.0_f64, 0.0_f64);
        let mut i = 0;

        while i < self.backlog.len() {
            let id = self.backlog[i];
            let node = &arena[id];

            if node.is_page_break() {
                self.backlog.remove(i);
                debug!("area '{}': page break", self.area.id);
                break;
            }

            let Fit {
                available,
                margin,
                content,
                total,
                fits,
            } = self.fit(ctx, node, x, y)?;

            if fits {
                placements.push(Placement {
                    node: id,
                    position: self.origin.offset(x + margin.left, y + margin.top),
                    size: content,
                });
                if node.is_line_break() {
                    y += row_height.max(total.height);
                    x = 0.0;
                    row_height = 0.0;
                } else {
                    x += total.width;
                    row_height = row_height.max(total.height);
                }
                if node.is_repeating() {
                    i += 1;
                } else {
                    self.backlog.remove(i);
                }
                continue;
            }

            let at_top = x <= EPSILON && y <= EPSILON;
            if !at_top
                && node.prefers_fresh_area()
                && self.area.availability == Availability::Global
                && self.failed.insert(id)
            {
                debug!(
                    "area '{}': {} moves to the next page instead of shrinking",
                    self.area.id, node.origin
                );
                break;
            }

            if let Some(parts) = node.split_to_fit(ctx, available)? {
                let first_fits = match parts.first() {
                    Some(first) => self.fit(ctx, first, x, y)?.fits,
                    None => false,
                };
                if first_fits {
                    let fragments: Vec<NodeId> = parts
                        .into_iter()
                        .map(|part| arena.alloc_derived(part, id))
                        .collect();
                    self.backlog.splice(i..=i, fragments);
                    continue;
                }
            }

            if self.failed.insert(id) {
                debug!(
                    "area '{}': {} does not fit, deferring the rest of the area",
                    self.area.id, arena[id].origin
                );
                break;
            }
            warn!(
                "area '{}': dropping content of {} that does not fit after a retry",
                self.area.id, arena[id].origin
            );
            self.backlog.remove(i);
        }

        Ok(placements)
    }

    /// The cursor for the following page, if this area continues.
    pub fn next(self, arena: &NodeArena) -> Option<AreaCursor> {
        match self.area.availability {
            Availability::Global => Some(AreaCursor {
                area: self.area,
                origin: self.origin,
                backlog: self.backlog,
                failed: self.failed,
            }),
            Availability::FirstPageOnly => {
                let discarded = self
                    .backlog
                    .iter()
                    .filter(|id| !arena[**id].is_repeating())
                    .count();
                if discarded > 0 {
                    warn!(
                        target: "quire::first_page_only",
                        "area '{}' only exists on the first page; {} node(s) that did not fit are discarded",
                        self.area.id,
                        discarded
                    );
                }
                None
            }
        }
    }
}
