//! # Area-Based Pagination
//!
//! A page is a set of fixed rectangles (areas). Every element names one
//! area, and each area is an independent flow: its elements become a
//! backlog of render nodes that is poured into the area page after page.
//!
//! ## How a page is filled
//!
//! 1. Each node is measured against the space left from the cursor.
//! 2. If it fits, it is placed and the cursor advances. Line-break nodes
//!    start a new row, other nodes continue the current one.
//! 3. If it does not fit, the node is asked to split: text wraps at the last
//!    whitespace before the overflow, images shrink, tables fall apart into
//!    rows. The fragments take the node's place in the backlog.
//! 4. If it cannot split, the area is done for this page and the node is
//!    retried on the next one. A second failure drops it.
//!
//! Pagination ends when nothing but repeating content (headers, footers,
//! page numbers) is left in any area.
//!
//! Nothing is drawn until every page is laid out. That is what lets a table
//! of contents print the page a later chapter landed on.

pub mod arena;
pub mod compositor;
pub mod constrained;
pub mod context;
pub mod cursor;
pub mod node;
pub mod numbering;
pub mod origin;
pub mod record;
pub mod registry;

pub use arena::{NodeArena, NodeId};
pub use compositor::{ComposedPage, Composition, DocumentCompositor};
pub use constrained::ConstrainedBox;
pub use context::{LayoutContext, RenderContext};
pub use cursor::AreaCursor;
pub use node::{NodeKind, RenderNode};
pub use origin::{OriginEntry, OriginIndex, PageLookup};
pub use record::{PageLayoutRecord, Placement};
pub use registry::{NodeConstructor, RenderTypeRegistry};
