//! Render Type Registry: element tag → node constructor.
//!
//! The table is filled once, usually through [`RenderTypeRegistry::standard`].
//! Callers may swap in their own constructor for a tag with
//! [`RenderTypeRegistry::register`].

use std::collections::HashMap;

use log::warn;

use crate::geometry::Size;
use crate::image_loader;
use crate::model::{Element, ElementId, ElementKind, ElementTag};

use super::context::LayoutContext;
use super::node::{
    BulletListNode, ContentsNode, ImageNode, LineNode, NodeKind, PageNumberNode, RectangleNode,
    RenderNode, TableNode, TableRowNode, TextNode,
};

/// Builds the nodes for one element. `id` is the origin recorded on them.
pub type NodeConstructor = fn(&Element, ElementId, &LayoutContext) -> Vec<RenderNode>;

#[derive(Clone, Default)]
pub struct RenderTypeRegistry {
    constructors: HashMap<ElementTag, NodeConstructor>,
}

impl std::fmt::Debug for RenderTypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags: Vec<_> = self.constructors.keys().map(|t| t.as_str()).collect();
        tags.sort_unstable();
        f.debug_struct("RenderTypeRegistry").field("tags", &tags).finish()
    }
}

impl RenderTypeRegistry {
    /// An empty registry. Elements of unregistered kinds produce no nodes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a constructor for every element kind.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.register(ElementTag::TextBlock, build_text);
        registry.register(ElementTag::ChapterHeading, build_chapter);
        registry.register(ElementTag::Line, build_line);
        registry.register(ElementTag::Rectangle, build_rectangle);
        registry.register(ElementTag::Image, build_image);
        registry.register(ElementTag::PageNumberPlaceholder, build_page_number);
        registry.register(ElementTag::PageBreak, build_page_break);
        registry.register(ElementTag::Table, build_table);
        registry.register(ElementTag::TableOfContents, build_contents);
        registry.register(ElementTag::BulletList, build_bullets);
        registry
    }

    /// Register a constructor, returning the one it replaces.
    pub fn register(&mut self, tag: ElementTag, constructor: NodeConstructor) -> Option<NodeConstructor> {
        self.constructors.insert(tag, constructor)
    }

    pub fn constructor(&self, tag: ElementTag) -> Option<NodeConstructor> {
        self.constructors.get(&tag).copied()
    }

    /// Build the nodes of one element, as the constructor returns them.
    pub fn build(&self, ctx: &LayoutContext, id: ElementId, element: &Element) -> Vec<RenderNode> {
        match self.constructor(element.tag()) {
            Some(construct) => construct(element, id, ctx),
            None => {
                warn!("{id}: no constructor registered for {}", element.tag().as_str());
                Vec::new()
            }
        }
    }

    /// Build the nodes of one element and expand them completely.
    pub fn build_expanded(
        &self,
        ctx: &LayoutContext,
        id: ElementId,
        element: &Element,
    ) -> Vec<RenderNode> {
        expand_fully(ctx, self.build(ctx, id, element))
    }
}

/// Replace every node that pre-expands by its parts, recursively.
pub fn expand_fully(ctx: &LayoutContext, nodes: Vec<RenderNode>) -> Vec<RenderNode> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut pending: Vec<RenderNode> = nodes.into_iter().rev().collect();
    while let Some(node) = pending.pop() {
        match node.pre_expand(ctx) {
            Some(parts) => pending.extend(parts.into_iter().rev()),
            None => out.push(node),
        }
    }
    out
}

fn node(element: &Element, id: ElementId, kind: NodeKind) -> RenderNode {
    RenderNode::new(id, kind)
        .with_style(element.style.as_deref())
        .repeating(element.repeating)
}

fn build_text(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::TextBlock { text } => vec![node(element, id, NodeKind::Text(TextNode::new(text)))],
        _ => Vec::new(),
    }
}

fn build_chapter(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::ChapterHeading { text, .. } => {
            let text = TextNode {
                numbered: true,
                ..TextNode::new(text)
            };
            vec![node(element, id, NodeKind::Text(text))]
        }
        _ => Vec::new(),
    }
}

fn build_line(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::Line { from, to, width } => vec![node(
            element,
            id,
            NodeKind::Line(LineNode::standalone(*from, *to, *width)),
        )],
        _ => Vec::new(),
    }
}

fn build_rectangle(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::Rectangle { size, width } => vec![node(
            element,
            id,
            NodeKind::Rectangle(RectangleNode {
                size: *size,
                width: *width,
            }),
        )],
        _ => Vec::new(),
    }
}

fn build_image(element: &Element, id: ElementId, ctx: &LayoutContext) -> Vec<RenderNode> {
    let ElementKind::Image { resource, size } = &element.kind else {
        return Vec::new();
    };
    let Some(data) = ctx.document.resource(resource) else {
        warn!("{id}: image resource '{resource}' does not exist, element dropped");
        return Vec::new();
    };
    let size = match size {
        Some(size) => *size,
        None => match image_loader::dimensions(&data.data) {
            Ok((w, h)) => {
                let px = ctx.config.pixel_size();
                Size::new(w as f64 * px, h as f64 * px)
            }
            Err(e) => {
                warn!("{id}: image resource '{resource}' is unusable ({e}), element dropped");
                return Vec::new();
            }
        },
    };
    vec![node(
        element,
        id,
        NodeKind::Image(ImageNode {
            resource: resource.clone(),
            size,
            scale: 1.0,
        }),
    )]
}

fn build_page_number(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::PageNumberPlaceholder { format } => {
            let format = format.clone().unwrap_or_else(|| "{page}".to_string());
            vec![node(element, id, NodeKind::PageNumber(PageNumberNode { format }))]
        }
        _ => Vec::new(),
    }
}

fn build_page_break(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    vec![node(element, id, NodeKind::PageBreak)]
}

fn build_table(element: &Element, id: ElementId, ctx: &LayoutContext) -> Vec<RenderNode> {
    let ElementKind::Table {
        rows,
        columns,
        borders,
    } = &element.kind
    else {
        return Vec::new();
    };
    let rows = rows
        .iter()
        .map(|row| TableRowNode {
            cells: row
                .cells
                .iter()
                .map(|cell| {
                    cell.elements
                        .iter()
                        .flat_map(|nested| ctx.registry.build_expanded(ctx, id, nested))
                        .collect()
                })
                .collect(),
            columns: columns.clone(),
            borders: *borders,
            padding: ctx.config.cell_padding,
        })
        .collect();
    vec![node(element, id, NodeKind::Table(TableNode { rows }))]
}

fn build_contents(element: &Element, id: ElementId, _: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::TableOfContents {
            title, max_level, ..
        } => vec![node(
            element,
            id,
            NodeKind::Contents(ContentsNode {
                title: title.clone(),
                max_level: *max_level,
            }),
        )],
        _ => Vec::new(),
    }
}

fn build_bullets(element: &Element, id: ElementId, ctx: &LayoutContext) -> Vec<RenderNode> {
    match &element.kind {
        ElementKind::BulletList { items, symbol } => vec![node(
            element,
            id,
            NodeKind::BulletList(BulletListNode {
                items: items.clone(),
                symbol: symbol
                    .clone()
                    .unwrap_or_else(|| ctx.config.bullet_symbol.clone()),
                indent: ctx.config.bullet_indent,
            }),
        )],
        _ => Vec::new(),
    }
}
