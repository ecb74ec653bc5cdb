//! # Render Nodes
//!
//! A render node is the placeable expansion of one element for one
//! pagination run. Every kind answers the same questions (how big am I, what
//! margin do I want, do I end the current row, can I be split to fit a
//! smaller space) and knows how to draw itself once the layout pass has
//! decided where it goes.
//!
//! Kinds are a closed sum type, so adding one forces every `match` below to
//! handle it. Composite kinds (tables, tables of contents, bullet lists)
//! normally never reach an area: [`RenderNode::pre_expand`] replaces
//! them with their parts when the area backlog is built. They still measure
//! and render correctly as a unit, stacking their parts in a
//! [`ConstrainedBox`].

use std::iter;

use crate::error::QuireError;
use crate::geometry::{Point, Size, Spacing, EPSILON};
use crate::model::{ColumnWidth, Document, ElementId, ElementKind};
use crate::style::{Alignment, StyleDefinition};

use super::constrained::ConstrainedBox;
use super::context::{LayoutContext, RenderContext};
use super::numbering::chapter_label;

/// A placeable unit of content derived from one element.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode {
    /// The element this node was produced from. Nodes nested in table cells
    /// carry the table's id.
    pub origin: ElementId,
    /// Style id, resolved against the document at measure and render time.
    pub style: Option<String>,
    pub repeating: bool,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Text(TextNode),
    Line(LineNode),
    Rectangle(RectangleNode),
    Image(ImageNode),
    PageNumber(PageNumberNode),
    PageBreak,
    Table(TableNode),
    TableRow(TableRowNode),
    Contents(ContentsNode),
    ContentsEntry(ContentsEntryNode),
    BulletList(BulletListNode),
    Bullet(BulletNode),
}

/// One line of text (or, before expansion, a block containing line breaks).
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    /// Remaining text of this fragment.
    pub content: String,
    /// Prefix the chapter label of `origin` when drawing.
    pub numbered: bool,
    /// Last fragment of its block: takes block padding instead of line padding.
    pub last_fragment: bool,
    /// Produced by wrapping; indented by `hanging_indent`.
    pub continuation: bool,
    pub hanging_indent: f64,
}

impl TextNode {
    pub fn new(content: &str) -> Self {
        Self {
            content: content.to_string(),
            numbered: false,
            last_fragment: true,
            continuation: false,
            hanging_indent: 0.0,
        }
    }

    fn has_line_breaks(&self) -> bool {
        self.content.contains('\n')
    }

    /// Text prefix drawn before `content`.
    fn prefix(&self, document: &Document, origin: ElementId) -> String {
        if !self.numbered {
            return String::new();
        }
        match chapter_label(document, origin) {
            Some(label) if !label.is_empty() => format!("{label} "),
            _ => String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineNode {
    /// Start, relative to the placement position.
    pub from: Point,
    /// End, relative to the placement position.
    pub to: Point,
    pub width: f64,
    /// Space reserved in the flow.
    pub extent: Size,
}

impl LineNode {
    /// A line occupying its own bounding box, plus the stroke below it.
    pub fn standalone(from: Point, to: Point, width: f64) -> Self {
        let extent = Size::new(
            from.x.max(to.x).max(0.0),
            from.y.max(to.y).max(0.0) + width,
        );
        Self {
            from,
            to,
            width,
            extent,
        }
    }
}

/// An outline placed and dropped as one unit; drawn as its four edges.
#[derive(Debug, Clone, PartialEq)]
pub struct RectangleNode {
    pub size: Size,
    pub width: f64,
}

impl RectangleNode {
    /// The four edges, clockwise from the top-left corner, relative to the
    /// placement position.
    pub fn edges(&self) -> [LineNode; 4] {
        let (w, h) = (self.size.width, self.size.height);
        let edge = |from: Point, to: Point| LineNode {
            from,
            to,
            width: self.width,
            extent: self.size,
        };
        [
            edge(Point::new(0.0, 0.0), Point::new(w, 0.0)),
            edge(Point::new(w, 0.0), Point::new(w, h)),
            edge(Point::new(w, h), Point::new(0.0, h)),
            edge(Point::new(0.0, h), Point::new(0.0, 0.0)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageNode {
    pub resource: String,
    /// Unscaled physical size.
    pub size: Size,
    /// Current downscale factor.
    pub scale: f64,
}

impl ImageNode {
    pub fn scaled_size(&self) -> Size {
        Size::new(self.size.width * self.scale, self.size.height * self.scale)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageNumberNode {
    pub format: String,
}

impl PageNumberNode {
    fn resolve(&self, page: &str, pages: &str) -> String {
        self.format.replace("{page}", page).replace("{pages}", pages)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableNode {
    pub rows: Vec<TableRowNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRowNode {
    /// Fully expanded nodes of every cell.
    pub cells: Vec<Vec<RenderNode>>,
    pub columns: Vec<ColumnWidth>,
    pub borders: bool,
    /// Inner padding of each cell.
    pub padding: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentsNode {
    pub title: Option<String>,
    pub max_level: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentsEntryNode {
    /// The chapter heading this entry points at.
    pub chapter: ElementId,
    pub title: String,
    pub level: usize,
    pub indent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletListNode {
    pub items: Vec<String>,
    pub symbol: String,
    pub indent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BulletNode {
    pub symbol: String,
    pub width: f64,
}

impl RenderNode {
    pub fn new(origin: ElementId, kind: NodeKind) -> Self {
        Self {
            origin,
            style: None,
            repeating: false,
            kind,
        }
    }

    pub fn page_break(origin: ElementId) -> Self {
        Self::new(origin, NodeKind::PageBreak)
    }

    pub fn with_style(mut self, style: Option<&str>) -> Self {
        self.style = style.map(str::to_string);
        self
    }

    pub fn repeating(mut self, repeating: bool) -> Self {
        self.repeating = repeating;
        self
    }

    /// A new node sharing this node's origin, style and repetition, with a
    /// different kind.
    pub fn derive(&self, kind: NodeKind) -> RenderNode {
        RenderNode {
            origin: self.origin,
            style: self.style.clone(),
            repeating: self.repeating,
            kind,
        }
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub fn is_page_break(&self) -> bool {
        matches!(self.kind, NodeKind::PageBreak)
    }

    /// Images are only shrunk once they fail to fit an empty area; below
    /// other content they move to the next page first.
    pub fn prefers_fresh_area(&self) -> bool {
        matches!(self.kind, NodeKind::Image(_))
    }

    /// Whether placing this node ends the current row.
    pub fn is_line_break(&self) -> bool {
        match &self.kind {
            NodeKind::Bullet(_) => false,
            NodeKind::Text(_)
            | NodeKind::Line(_)
            | NodeKind::Rectangle(_)
            | NodeKind::Image(_)
            | NodeKind::PageNumber(_)
            | NodeKind::PageBreak
            | NodeKind::Table(_)
            | NodeKind::TableRow(_)
            | NodeKind::Contents(_)
            | NodeKind::ContentsEntry(_)
            | NodeKind::BulletList(_) => true,
        }
    }

    /// Plain text carried by this node, if any. Chapter labels are not
    /// included; they are resolved when rendering.
    pub fn text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(t) => Some(&t.content),
            NodeKind::ContentsEntry(e) => Some(&e.title),
            NodeKind::Bullet(b) => Some(&b.symbol),
            NodeKind::PageNumber(p) => Some(&p.format),
            _ => None,
        }
    }

    pub fn margin(&self, document: &Document) -> Spacing {
        let style = document.resolve_style(self.style.as_deref());
        match &self.kind {
            NodeKind::Text(t) => Spacing {
                left: if t.continuation { t.hanging_indent } else { 0.0 },
                bottom: if t.last_fragment {
                    style.block_padding
                } else {
                    style.line_padding
                },
                ..Spacing::ZERO
            },
            NodeKind::Image(_) | NodeKind::PageNumber(_) => Spacing::bottom(style.block_padding),
            NodeKind::ContentsEntry(e) => Spacing {
                left: e.indent,
                bottom: style.line_padding,
                ..Spacing::ZERO
            },
            NodeKind::Line(_)
            | NodeKind::Rectangle(_)
            | NodeKind::PageBreak
            | NodeKind::Table(_)
            | NodeKind::TableRow(_)
            | NodeKind::Contents(_)
            | NodeKind::BulletList(_)
            | NodeKind::Bullet(_) => Spacing::ZERO,
        }
    }

    /// Replace a node that always yields several nodes by its parts.
    /// Returns `None` for nodes that are placed as they are.
    pub fn pre_expand(&self, ctx: &LayoutContext) -> Option<Vec<RenderNode>> {
        match &self.kind {
            NodeKind::Text(t) if t.has_line_breaks() => Some(self.expand_lines(t)),
            NodeKind::Table(table) => Some(
                table
                    .rows
                    .iter()
                    .map(|row| self.derive(NodeKind::TableRow(row.clone())))
                    .collect(),
            ),
            NodeKind::Contents(contents) => Some(self.expand_contents(ctx, contents)),
            NodeKind::BulletList(list) => Some(self.expand_bullets(list)),
            _ => None,
        }
    }

    fn expand_lines(&self, text: &TextNode) -> Vec<RenderNode> {
        let lines: Vec<&str> = text.content.lines().collect();
        let count = lines.len();
        lines
            .into_iter()
            .enumerate()
            .map(|(i, line)| {
                self.derive(NodeKind::Text(TextNode {
                    content: line.to_string(),
                    numbered: text.numbered && i == 0,
                    last_fragment: text.last_fragment && i + 1 == count,
                    continuation: text.continuation || (i > 0 && text.hanging_indent > 0.0),
                    hanging_indent: text.hanging_indent,
                }))
            })
            .collect()
    }

    fn expand_contents(&self, ctx: &LayoutContext, contents: &ContentsNode) -> Vec<RenderNode> {
        let mut nodes = Vec::new();
        if let Some(title) = &contents.title {
            nodes.push(self.derive(NodeKind::Text(TextNode::new(title))));
        }
        let max_level = contents.max_level.unwrap_or(usize::MAX);
        for (id, element) in ctx.document.iter_elements() {
            if let ElementKind::ChapterHeading { text, level } = &element.kind {
                if *level > max_level {
                    continue;
                }
                let title = text.lines().next().unwrap_or_default().to_string();
                nodes.push(self.derive(NodeKind::ContentsEntry(ContentsEntryNode {
                    chapter: id,
                    title,
                    level: *level,
                    indent: *level as f64 * ctx.config.toc_indent,
                })));
            }
        }
        nodes
    }

    fn expand_bullets(&self, list: &BulletListNode) -> Vec<RenderNode> {
        let mut nodes = Vec::new();
        for item in &list.items {
            nodes.push(self.derive(NodeKind::Bullet(BulletNode {
                symbol: list.symbol.clone(),
                width: list.indent,
            })));
            let text = self.derive(NodeKind::Text(TextNode {
                hanging_indent: list.indent,
                ..TextNode::new(item)
            }));
            match &text.kind {
                NodeKind::Text(t) if t.has_line_breaks() => nodes.extend(text.expand_lines(t)),
                _ => nodes.push(text),
            }
        }
        nodes
    }

    /// Measure the content size (margin excluded) given the space available
    /// to the content.
    pub fn measure(&self, ctx: &LayoutContext, available: Size) -> Result<Size, QuireError> {
        let style = ctx.style(self.style.as_deref());
        match &self.kind {
            NodeKind::Text(t) => {
                let display = format!("{}{}", t.prefix(ctx.document, self.origin), t.content);
                ctx.measure_text(&display, style, available)
            }
            NodeKind::Line(line) => Ok(line.extent),
            NodeKind::Rectangle(rect) => Ok(rect.size),
            NodeKind::Image(image) => Ok(image.scaled_size()),
            NodeKind::PageNumber(p) => {
                let placeholder = ctx.config.page_number_placeholder();
                ctx.measure_text(&p.resolve(&placeholder, &placeholder), style, available)
            }
            NodeKind::PageBreak => Ok(Size::ZERO),
            NodeKind::TableRow(row) => {
                let (widths, boxes) = row.layout_cells(ctx, available.width)?;
                let height = boxes
                    .iter()
                    .map(|b| b.height() + 2.0 * row.padding)
                    .fold(0.0, f64::max);
                Ok(Size::new(widths.iter().sum(), height))
            }
            NodeKind::ContentsEntry(entry) => {
                let line = ctx.measure_text(&entry.title, style, available)?;
                Ok(Size::new(available.width, line.height))
            }
            NodeKind::Bullet(b) => {
                let symbol = ctx.measure_text(&b.symbol, style, available)?;
                Ok(Size::new(b.width.max(symbol.width), symbol.height))
            }
            NodeKind::Table(_) | NodeKind::Contents(_) | NodeKind::BulletList(_) => {
                let stacked = self.stack_parts(ctx, available.width)?;
                Ok(Size::new(stacked.used_width(), stacked.height()))
            }
        }
    }

    /// Try to split this node so that its first fragment fits in `max`
    /// (margin included). `None` means the node cannot be made smaller.
    pub fn split_to_fit(
        &self,
        ctx: &LayoutContext,
        max: Size,
    ) -> Result<Option<Vec<RenderNode>>, QuireError> {
        match &self.kind {
            NodeKind::Text(t) => self.split_text(ctx, t, max),
            NodeKind::Image(image) => {
                let inner = max.shrink(self.margin(ctx.document));
                let current = image.scaled_size();
                if current.width <= 0.0 || current.height <= 0.0 {
                    return Ok(None);
                }
                let ratio = (inner.width / current.width).min(inner.height / current.height);
                if !(ratio > 0.0) || ratio >= 1.0 {
                    return Ok(None);
                }
                Ok(Some(vec![self.derive(NodeKind::Image(ImageNode {
                    scale: image.scale * ratio,
                    ..image.clone()
                }))]))
            }
            NodeKind::Table(_) | NodeKind::Contents(_) | NodeKind::BulletList(_) => {
                Ok(self.pre_expand(ctx))
            }
            NodeKind::Line(_)
            | NodeKind::Rectangle(_)
            | NodeKind::PageNumber(_)
            | NodeKind::PageBreak
            | NodeKind::TableRow(_)
            | NodeKind::ContentsEntry(_)
            | NodeKind::Bullet(_) => Ok(None),
        }
    }

    /// Split at the last whitespace at or before the first character that
    /// overflows the available width.
    fn split_text(
        &self,
        ctx: &LayoutContext,
        text: &TextNode,
        max: Size,
    ) -> Result<Option<Vec<RenderNode>>, QuireError> {
        let style = ctx.style(self.style.as_deref());
        let inner = max.shrink(self.margin(ctx.document));
        let prefix = text.prefix(ctx.document, self.origin);
        let display = format!("{prefix}{}", text.content);

        let full = ctx.measure_text(&display, style, inner)?;
        if full.height > inner.height + EPSILON || full.width <= inner.width + EPSILON {
            return Ok(None);
        }

        let boundaries: Vec<usize> = display
            .char_indices()
            .map(|(i, _)| i)
            .chain(iter::once(display.len()))
            .collect();

        // Smallest prefix (in chars) wider than the available width.
        let (mut lo, mut hi) = (1, boundaries.len() - 1);
        while lo < hi {
            let mid = (lo + hi) / 2;
            let width = ctx.measure_text(&display[..boundaries[mid]], style, inner)?.width;
            if width > inner.width + EPSILON {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        let overflow_char = lo - 1;

        let Some((at, ws)) = display
            .char_indices()
            .take(overflow_char + 1)
            .filter(|(_, c)| c.is_whitespace())
            .last()
        else {
            return Ok(None);
        };
        if at <= prefix.len() {
            return Ok(None);
        }

        let head = display[prefix.len()..at].to_string();
        let tail = display[at + ws.len_utf8()..].to_string();
        log::debug!(
            "split text of {} at byte {}: {:?} | {:?}",
            self.origin,
            at - prefix.len(),
            head,
            tail
        );

        let mut fragments = vec![self.derive(NodeKind::Text(TextNode {
            content: head,
            last_fragment: text.last_fragment && tail.is_empty(),
            ..text.clone()
        }))];
        if !tail.is_empty() {
            fragments.push(self.derive(NodeKind::Text(TextNode {
                content: tail,
                numbered: false,
                continuation: true,
                ..text.clone()
            })));
        }
        Ok(Some(fragments))
    }

    /// Draw this node with its content box at `position`.
    pub fn render(
        &self,
        ctx: &mut RenderContext,
        position: Point,
        reserved: Size,
    ) -> Result<(), QuireError> {
        let style = ctx.style(self.style.as_deref());
        match &self.kind {
            NodeKind::Text(t) => {
                let display = format!("{}{}", t.prefix(ctx.document, self.origin), t.content);
                ctx.backend
                    .draw_text(ctx.surface, &display, position, style, reserved, t.last_fragment)?;
            }
            NodeKind::Line(line) => {
                ctx.backend.draw_line(
                    ctx.surface,
                    position.offset(line.from.x, line.from.y),
                    position.offset(line.to.x, line.to.y),
                    line.width,
                    style,
                )?;
            }
            NodeKind::Rectangle(rect) => {
                for edge in rect.edges() {
                    self.derive(NodeKind::Line(edge)).render(ctx, position, reserved)?;
                }
            }
            NodeKind::Image(image) => match ctx.document.resource(&image.resource) {
                Some(resource) => {
                    ctx.backend
                        .draw_image(ctx.surface, position, reserved, &resource.data, style)?;
                }
                None => log::warn!(
                    "{}: image resource '{}' disappeared before rendering",
                    self.origin,
                    image.resource
                ),
            },
            NodeKind::PageNumber(p) => {
                let text = p.resolve(
                    &(ctx.page_index + 1).to_string(),
                    &ctx.page_count.to_string(),
                );
                ctx.backend
                    .draw_text(ctx.surface, &text, position, style, reserved, true)?;
            }
            NodeKind::PageBreak => {}
            NodeKind::TableRow(row) => row.render(ctx, style, position, reserved)?,
            NodeKind::ContentsEntry(entry) => entry.render(ctx, style, position, reserved)?,
            NodeKind::Bullet(b) => {
                ctx.backend
                    .draw_text(ctx.surface, &b.symbol, position, style, reserved, true)?;
            }
            NodeKind::Table(_) | NodeKind::Contents(_) | NodeKind::BulletList(_) => {
                let stacked = self.stack_parts(&ctx.layout(), reserved.width)?;
                stacked.render(ctx, position)?;
            }
        }
        Ok(())
    }

    /// Lay out a composite node's parts one below the other.
    fn stack_parts(&self, ctx: &LayoutContext, width: f64) -> Result<ConstrainedBox, QuireError> {
        let mut stacked = ConstrainedBox::new(width, None);
        if let Some(parts) = self.pre_expand(ctx) {
            stacked.pack(ctx, parts)?;
        }
        Ok(stacked)
    }
}

impl TableRowNode {
    /// Resolve column widths for the available width.
    pub fn column_widths(&self, available: f64) -> Vec<f64> {
        resolve_columns(&self.columns, self.cells.len(), available)
    }

    /// Lay out every cell in its own box.
    fn layout_cells(
        &self,
        ctx: &LayoutContext,
        available: f64,
    ) -> Result<(Vec<f64>, Vec<ConstrainedBox>), QuireError> {
        let widths = self.column_widths(available);
        let mut boxes = Vec::with_capacity(widths.len());
        for (i, width) in widths.iter().enumerate() {
            let mut cell = ConstrainedBox::new((width - 2.0 * self.padding).max(0.0), None);
            if let Some(nodes) = self.cells.get(i) {
                cell.pack(ctx, nodes.iter().cloned())?;
            }
            boxes.push(cell);
        }
        Ok((widths, boxes))
    }

    fn render(
        &self,
        ctx: &mut RenderContext,
        style: &StyleDefinition,
        position: Point,
        reserved: Size,
    ) -> Result<(), QuireError> {
        let (widths, boxes) = self.layout_cells(&ctx.layout(), reserved.width)?;
        let mut x = position.x;
        for (width, cell) in widths.iter().zip(&boxes) {
            cell.render(ctx, Point::new(x + self.padding, position.y + self.padding))?;
            if self.borders {
                ctx.backend.draw_rect(
                    ctx.surface,
                    Point::new(x, position.y),
                    Size::new(*width, reserved.height),
                    0.2,
                    style,
                )?;
            }
            x += width;
        }
        Ok(())
    }
}

/// Column widths: fixed widths as given, fractions of the available width,
/// and whatever is left shared equally by unspecified columns.
pub fn resolve_columns(columns: &[ColumnWidth], cells: usize, available: f64) -> Vec<f64> {
    let count = columns.len().max(cells);
    if count == 0 {
        return Vec::new();
    }
    let specified: Vec<Option<f64>> = (0..count)
        .map(|i| {
            columns.get(i).map(|c| match c {
                ColumnWidth::Fixed(w) => w.max(0.0),
                ColumnWidth::Fraction(f) => (f * available).max(0.0),
            })
        })
        .collect();
    let used: f64 = specified.iter().flatten().sum();
    let open = specified.iter().filter(|w| w.is_none()).count();
    let share = if open > 0 {
        ((available - used) / open as f64).max(0.0)
    } else {
        0.0
    };
    specified.into_iter().map(|w| w.unwrap_or(share)).collect()
}

impl ContentsEntryNode {
    fn render(
        &self,
        ctx: &mut RenderContext,
        style: &StyleDefinition,
        position: Point,
        reserved: Size,
    ) -> Result<(), QuireError> {
        let title = match chapter_label(ctx.document, self.chapter) {
            Some(label) if !label.is_empty() => format!("{label} {}", self.title),
            _ => self.title.clone(),
        };
        let page = match ctx.page_of(self.chapter) {
            Some(index) => (index + 1).to_string(),
            None => {
                log::warn!(
                    "table of contents: {} was never placed, no page number",
                    self.chapter
                );
                "?".to_string()
            }
        };

        let (title_width, page_width, leader_width) = {
            let layout = ctx.layout();
            let leader = ctx.config.toc_leader.to_string();
            (
                layout.measure_text(&title, style, reserved)?.width,
                layout.measure_text(&page, style, reserved)?.width,
                layout.measure_text(&leader, style, reserved)?.width,
            )
        };
        let gap = reserved.width - title_width - page_width;
        let leaders = if leader_width > 0.0 {
            ((gap - 2.0 * leader_width) / leader_width).floor().max(0.0) as usize
        } else {
            0
        };
        let left = if leaders > 0 {
            format!("{title} {}", ctx.config.toc_leader.to_string().repeat(leaders))
        } else {
            title
        };

        ctx.backend
            .draw_text(ctx.surface, &left, position, style, reserved, true)?;
        let right = style.with_alignment(Alignment::Right);
        ctx.backend
            .draw_text(ctx.surface, &page, position, &right, reserved, true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DrawOp, DrawingBackend, RecordingBackend};
    use crate::config::LayoutConfig;
    use crate::layout::origin::PageLookup;
    use crate::layout::registry::RenderTypeRegistry;
    use crate::model::Element;

    struct Fixture {
        doc: Document,
        config: LayoutConfig,
        registry: RenderTypeRegistry,
        backend: RecordingBackend,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                doc: Document::new(),
                config: LayoutConfig::default(),
                registry: RenderTypeRegistry::standard(),
                backend: RecordingBackend::monospace(2.0, 5.0),
            }
        }

        fn ctx(&self) -> LayoutContext<'_> {
            LayoutContext {
                document: &self.doc,
                config: &self.config,
                registry: &self.registry,
                backend: &self.backend,
            }
        }
    }

    fn text_node(content: &str) -> RenderNode {
        RenderNode::new(ElementId(0), NodeKind::Text(TextNode::new(content)))
    }

    fn contents(nodes: &[RenderNode]) -> Vec<String> {
        nodes
            .iter()
            .map(|n| n.text().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn text_splits_at_last_whitespace_before_overflow() {
        let f = Fixture::new();
        let node = text_node("alpha beta gamma");
        // 11 chars fit in 22mm: "alpha beta " overflows at 'g'.
        let parts = node
            .split_to_fit(&f.ctx(), Size::new(22.0, 10.0))
            .unwrap()
            .unwrap();
        assert_eq!(contents(&parts), vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn split_fragments_rejoin_to_original() {
        let f = Fixture::new();
        let original = "the quick brown fox jumps over the lazy dog";
        let mut pending = vec![text_node(original)];
        let mut done = Vec::new();
        while let Some(node) = pending.pop() {
            match node.split_to_fit(&f.ctx(), Size::new(20.0, 10.0)).unwrap() {
                Some(mut parts) => {
                    let tail = parts.pop().unwrap();
                    done.extend(parts);
                    pending.push(tail);
                }
                None => done.push(node),
            }
        }
        assert_eq!(contents(&done).join(" "), original);
        assert!(done.len() > 2);
    }

    #[test]
    fn word_wider_than_area_cannot_split() {
        let f = Fixture::new();
        let node = text_node("incomprehensibilities");
        assert!(node
            .split_to_fit(&f.ctx(), Size::new(10.0, 10.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn text_taller_than_space_cannot_split() {
        let f = Fixture::new();
        let node = text_node("two words");
        assert!(node
            .split_to_fit(&f.ctx(), Size::new(4.0, 4.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn split_marks_head_and_tail() {
        let f = Fixture::new();
        let parts = text_node("aaaa bbbb")
            .split_to_fit(&f.ctx(), Size::new(12.0, 10.0))
            .unwrap()
            .unwrap();
        let NodeKind::Text(head) = &parts[0].kind else {
            panic!("head is text")
        };
        let NodeKind::Text(tail) = &parts[1].kind else {
            panic!("tail is text")
        };
        assert!(!head.last_fragment && !head.continuation);
        assert!(tail.last_fragment && tail.continuation);
    }

    #[test]
    fn multi_line_text_pre_expands_per_line() {
        let f = Fixture::new();
        let node = text_node("one\ntwo\nthree");
        let lines = node.pre_expand(&f.ctx()).unwrap();
        assert_eq!(contents(&lines), vec!["one", "two", "three"]);
        let last: Vec<bool> = lines
            .iter()
            .map(|n| matches!(&n.kind, NodeKind::Text(t) if t.last_fragment))
            .collect();
        assert_eq!(last, vec![false, false, true]);
    }

    #[test]
    fn rectangle_is_atomic_and_draws_its_four_edges() {
        let mut f = Fixture::new();
        let rect = RenderNode::new(
            ElementId(0),
            NodeKind::Rectangle(RectangleNode {
                size: Size::new(30.0, 10.0),
                width: 0.5,
            }),
        );
        assert!(rect.pre_expand(&f.ctx()).is_none());
        assert!(rect.is_line_break());
        assert!(rect
            .split_to_fit(&f.ctx(), Size::new(10.0, 50.0))
            .unwrap()
            .is_none());
        assert_eq!(
            rect.measure(&f.ctx(), Size::new(100.0, 100.0)).unwrap(),
            Size::new(30.0, 10.0)
        );

        let surface = f.backend.new_page_surface(Size::new(100.0, 100.0)).unwrap();
        let lookup = PageLookup::default();
        let mut ctx = RenderContext {
            document: &f.doc,
            config: &f.config,
            registry: &f.registry,
            backend: &mut f.backend,
            pages: &lookup,
            surface,
            page_index: 0,
            page_count: 1,
        };
        rect.render(&mut ctx, Point::new(5.0, 5.0), Size::new(30.0, 10.0))
            .unwrap();

        let edges: Vec<(Point, Point)> = f
            .backend
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Line { start, end, .. } => Some((*start, *end)),
                _ => None,
            })
            .collect();
        let p = Point::new;
        assert_eq!(
            edges,
            vec![
                (p(5.0, 5.0), p(35.0, 5.0)),
                (p(35.0, 5.0), p(35.0, 15.0)),
                (p(35.0, 15.0), p(5.0, 15.0)),
                (p(5.0, 15.0), p(5.0, 5.0)),
            ]
        );
    }

    #[test]
    fn contents_entry_draws_title_and_page_as_final_lines() {
        let mut f = Fixture::new();
        let entry = RenderNode::new(
            ElementId(0),
            NodeKind::ContentsEntry(ContentsEntryNode {
                chapter: ElementId(3),
                title: "Intro".to_string(),
                level: 1,
                indent: 0.0,
            }),
        );

        let surface = f.backend.new_page_surface(Size::new(100.0, 100.0)).unwrap();
        let lookup = PageLookup::default();
        let mut ctx = RenderContext {
            document: &f.doc,
            config: &f.config,
            registry: &f.registry,
            backend: &mut f.backend,
            pages: &lookup,
            surface,
            page_index: 0,
            page_count: 1,
        };
        entry
            .render(&mut ctx, Point::ZERO, Size::new(60.0, 5.0))
            .unwrap();

        let drawn: Vec<(&str, bool)> = f
            .backend
            .ops()
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text {
                    text,
                    is_last_fragment,
                    ..
                } => Some((text.as_str(), *is_last_fragment)),
                _ => None,
            })
            .collect();
        assert_eq!(drawn.len(), 2);
        assert!(drawn[0].0.starts_with("Intro "));
        assert_eq!(drawn[1].0, "?");
        assert!(drawn.iter().all(|(_, last)| *last));
    }

    #[test]
    fn image_splits_by_uniform_downscale() {
        let f = Fixture::new();
        let image = RenderNode::new(
            ElementId(0),
            NodeKind::Image(ImageNode {
                resource: "logo".to_string(),
                size: Size::new(40.0, 20.0),
                scale: 1.0,
            }),
        );
        let parts = image
            .split_to_fit(&f.ctx(), Size::new(20.0, 15.0))
            .unwrap()
            .unwrap();
        assert_eq!(parts.len(), 1);
        let size = parts[0].measure(&f.ctx(), Size::ZERO).unwrap();
        assert!((size.width - 20.0).abs() < 1e-9);
        assert!((size.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn chapter_text_measures_with_its_label() {
        let mut f = Fixture::new();
        f.doc.push_element(Element::chapter("Body", "One", 0));
        let second = f.doc.push_element(Element::chapter("Body", "Two", 1));
        let node = RenderNode::new(
            second,
            NodeKind::Text(TextNode {
                numbered: true,
                ..TextNode::new("Two")
            }),
        );
        // "1.1 Two" is 7 chars.
        let size = node.measure(&f.ctx(), Size::new(100.0, 100.0)).unwrap();
        assert_eq!(size.width, 14.0);
    }

    #[test]
    fn numbered_text_never_splits_inside_its_label() {
        let mut f = Fixture::new();
        let id = f.doc.push_element(Element::chapter("Body", "Overview", 0));
        let node = RenderNode::new(
            id,
            NodeKind::Text(TextNode {
                numbered: true,
                ..TextNode::new("Overview")
            }),
        );
        assert!(node
            .split_to_fit(&f.ctx(), Size::new(8.0, 10.0))
            .unwrap()
            .is_none());
    }

    #[test]
    fn margins_follow_style_paddings() {
        let mut f = Fixture::new();
        let mut style = StyleDefinition::named("Body");
        style.line_padding = 1.0;
        style.block_padding = 3.0;
        f.doc.add_style(style).unwrap();
        let mut node = text_node("x").with_style(Some("body"));
        assert_eq!(node.margin(&f.doc).bottom, 3.0);
        if let NodeKind::Text(t) = &mut node.kind {
            t.last_fragment = false;
        }
        assert_eq!(node.margin(&f.doc).bottom, 1.0);
    }

    #[test]
    fn columns_share_what_is_left() {
        let widths = resolve_columns(
            &[ColumnWidth::Fixed(20.0), ColumnWidth::Fraction(0.25)],
            4,
            100.0,
        );
        assert_eq!(widths, vec![20.0, 25.0, 27.5, 27.5]);
        assert_eq!(resolve_columns(&[], 2, 50.0), vec![25.0, 25.0]);
    }
}
