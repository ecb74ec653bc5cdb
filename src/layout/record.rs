//! What the layout pass decided for one area on one page.

use crate::backend::SurfaceId;
use crate::geometry::{Point, Size};

use super::arena::NodeId;

/// A node placed at a fixed position on a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub node: NodeId,
    /// Top-left corner of the content box, in page coordinates.
    pub position: Point,
    /// Content size reserved for the node (margin excluded).
    pub size: Size,
}

/// Placements of one area on one page, in placement order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayoutRecord {
    pub page_index: usize,
    pub area: String,
    pub surface: SurfaceId,
    pub placements: Vec<Placement>,
}

impl PageLayoutRecord {
    pub fn new(page_index: usize, area: &str, surface: SurfaceId) -> Self {
        Self {
            page_index,
            area: area.to_string(),
            surface,
            placements: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }
}
