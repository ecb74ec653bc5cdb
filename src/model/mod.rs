//! # Document Model
//!
//! The page-independent description of a document: named areas, named
//! styles, binary resources and an ordered stream of elements. Nothing in
//! here knows about pages; the layout engine decides where things land.
//!
//! Areas and styles are inserted through [`Document::add_area`] and
//! [`Document::add_style`], which reject duplicate identifiers before any
//! layout begins. Area ids are matched exactly; style ids are matched
//! case-insensitively.

use std::fmt;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::QuireError;
use crate::geometry::{Point, Size, Spacing};
use crate::style::StyleDefinition;

/// A complete document ready for composition.
#[derive(Debug, Clone)]
pub struct Document {
    pub metadata: Metadata,
    pub page_size: PageSize,
    /// Offset applied to every area's position.
    pub page_padding: Spacing,
    areas: Vec<AreaDefinition>,
    styles: Vec<StyleDefinition>,
    resources: Vec<Resource>,
    elements: Vec<Element>,
    fallback_style: StyleDefinition,
}

/// Document metadata passed through to the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: Option<String>,
    pub creator: Option<String>,
}

/// Standard page sizes in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum PageSize {
    #[default]
    A4,
    A3,
    A5,
    Letter,
    Legal,
    Custom {
        width: f64,
        height: f64,
    },
}

impl PageSize {
    /// Returns the page dimensions in millimetres.
    pub fn dimensions(&self) -> Size {
        match self {
            PageSize::A4 => Size::new(210.0, 297.0),
            PageSize::A3 => Size::new(297.0, 420.0),
            PageSize::A5 => Size::new(148.0, 210.0),
            PageSize::Letter => Size::new(215.9, 279.4),
            PageSize::Legal => Size::new(215.9, 355.6),
            PageSize::Custom { width, height } => Size::new(*width, *height),
        }
    }
}

/// Where an area exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    /// Present on every page.
    #[default]
    Global,
    /// Present on page 0 only.
    FirstPageOnly,
}

/// A fixed rectangle on the page that content flows into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaDefinition {
    pub id: String,
    #[serde(default)]
    pub availability: Availability,
    pub position: Point,
    pub size: Size,
}

impl AreaDefinition {
    pub fn new(id: &str, availability: Availability, position: Point, size: Size) -> Self {
        Self {
            id: id.to_string(),
            availability,
            position,
            size,
        }
    }
}

/// A named binary blob (image data).
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: String,
    pub data: Vec<u8>,
}

/// Stable handle of a top-level element: its index in document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementId(pub usize);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element #{}", self.0)
    }
}

/// A content unit with a target area and an optional style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Target area id. Ignored for elements nested in table cells.
    #[serde(default)]
    pub area: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    /// Render on every page instead of being consumed once.
    #[serde(default)]
    pub repeating: bool,
    #[serde(flatten)]
    pub kind: ElementKind,
}

/// The element variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ElementKind {
    TextBlock {
        text: String,
    },
    /// A numbered heading. Level 0 is the outermost.
    ChapterHeading {
        text: String,
        #[serde(default)]
        level: usize,
    },
    /// A line from `from` to `to`, relative to where it is placed.
    Line {
        from: Point,
        to: Point,
        #[serde(default = "default_stroke")]
        width: f64,
    },
    Rectangle {
        size: Size,
        #[serde(default = "default_stroke")]
        width: f64,
    },
    Image {
        resource: String,
        /// Physical size. Derived from the pixel size when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<Size>,
    },
    /// Renders the current page number. `{page}` and `{pages}` in `format`
    /// are replaced by the 1-based page number and the page count.
    PageNumberPlaceholder {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
    PageBreak,
    Table {
        rows: Vec<TableRow>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        columns: Vec<ColumnWidth>,
        #[serde(default)]
        borders: bool,
    },
    TableOfContents {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Deepest chapter level listed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_level: Option<usize>,
        /// Restart chapter numbering at this element.
        #[serde(default)]
        resets_numbering: bool,
    },
    BulletList {
        items: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        symbol: Option<String>,
    },
}

fn default_stroke() -> f64 {
    0.3
}

/// Discriminant of [`ElementKind`], used to key the render type registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementTag {
    TextBlock,
    ChapterHeading,
    Line,
    Rectangle,
    Image,
    PageNumberPlaceholder,
    PageBreak,
    Table,
    TableOfContents,
    BulletList,
}

impl ElementTag {
    pub const ALL: [ElementTag; 10] = [
        ElementTag::TextBlock,
        ElementTag::ChapterHeading,
        ElementTag::Line,
        ElementTag::Rectangle,
        ElementTag::Image,
        ElementTag::PageNumberPlaceholder,
        ElementTag::PageBreak,
        ElementTag::Table,
        ElementTag::TableOfContents,
        ElementTag::BulletList,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementTag::TextBlock => "TextBlock",
            ElementTag::ChapterHeading => "ChapterHeading",
            ElementTag::Line => "Line",
            ElementTag::Rectangle => "Rectangle",
            ElementTag::Image => "Image",
            ElementTag::PageNumberPlaceholder => "PageNumberPlaceholder",
            ElementTag::PageBreak => "PageBreak",
            ElementTag::Table => "Table",
            ElementTag::TableOfContents => "TableOfContents",
            ElementTag::BulletList => "BulletList",
        }
    }
}

impl Element {
    pub fn new(area: &str, kind: ElementKind) -> Self {
        Self {
            area: area.to_string(),
            style: None,
            repeating: false,
            kind,
        }
    }

    pub fn text(area: &str, text: &str) -> Self {
        Self::new(
            area,
            ElementKind::TextBlock {
                text: text.to_string(),
            },
        )
    }

    pub fn chapter(area: &str, text: &str, level: usize) -> Self {
        Self::new(
            area,
            ElementKind::ChapterHeading {
                text: text.to_string(),
                level,
            },
        )
    }

    pub fn with_style(mut self, style: &str) -> Self {
        self.style = Some(style.to_string());
        self
    }

    pub fn repeating(mut self) -> Self {
        self.repeating = true;
        self
    }

    pub fn tag(&self) -> ElementTag {
        match &self.kind {
            ElementKind::TextBlock { .. } => ElementTag::TextBlock,
            ElementKind::ChapterHeading { .. } => ElementTag::ChapterHeading,
            ElementKind::Line { .. } => ElementTag::Line,
            ElementKind::Rectangle { .. } => ElementTag::Rectangle,
            ElementKind::Image { .. } => ElementTag::Image,
            ElementKind::PageNumberPlaceholder { .. } => ElementTag::PageNumberPlaceholder,
            ElementKind::PageBreak => ElementTag::PageBreak,
            ElementKind::Table { .. } => ElementTag::Table,
            ElementKind::TableOfContents { .. } => ElementTag::TableOfContents,
            ElementKind::BulletList { .. } => ElementTag::BulletList,
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
}

/// One table cell holding nested elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableCell {
    #[serde(default)]
    pub elements: Vec<Element>,
}

/// Width of a table column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidth {
    /// Fixed width in millimetres.
    Fixed(f64),
    /// Fraction of the available width.
    Fraction(f64),
}

// ── Serialized form ────────────────────────────────────────────

/// The serialized shape of a document. Deserialization goes through this
/// type so that area and style insertion can enforce unique identifiers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default)]
    pub page_padding: Spacing,
    #[serde(default)]
    pub page_size: PageSize,
    #[serde(default)]
    pub areas: Vec<AreaDefinition>,
    #[serde(default)]
    pub styles: Vec<StyleDefinition>,
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default, alias = "resourceData")]
    pub resources: Vec<ResourceSource>,
}

/// A resource as it appears in the serialized form: base64 payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSource {
    pub id: String,
    pub data: String,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            metadata: Metadata::default(),
            page_size: PageSize::default(),
            page_padding: Spacing::ZERO,
            areas: Vec::new(),
            styles: Vec::new(),
            resources: Vec::new(),
            elements: Vec::new(),
            fallback_style: StyleDefinition::default(),
        }
    }

    /// Parse a document from its JSON description.
    pub fn from_json(json: &str) -> Result<Self, QuireError> {
        let source: DocumentSource = serde_json::from_str(json)?;
        Self::from_source(source)
    }

    /// Build a document from its serialized shape, enforcing unique ids.
    pub fn from_source(source: DocumentSource) -> Result<Self, QuireError> {
        let mut doc = Document::new();
        doc.metadata = Metadata {
            title: source.title,
            creator: source.creator,
        };
        doc.page_size = source.page_size;
        doc.page_padding = source.page_padding;
        for area in source.areas {
            doc.add_area(area)?;
        }
        for style in source.styles {
            doc.add_style(style)?;
        }
        for resource in source.resources {
            let data = base64::engine::general_purpose::STANDARD
                .decode(resource.data.trim())
                .map_err(|e| QuireError::Resource {
                    id: resource.id.clone(),
                    reason: format!("base64 decode error: {e}"),
                })?;
            doc.add_resource(&resource.id, data)?;
        }
        for element in source.elements {
            doc.push_element(element);
        }
        Ok(doc)
    }

    /// The serialized shape of this document.
    pub fn to_source(&self) -> DocumentSource {
        DocumentSource {
            title: self.metadata.title.clone(),
            creator: self.metadata.creator.clone(),
            page_padding: self.page_padding,
            page_size: self.page_size,
            areas: self.areas.clone(),
            styles: self.styles.clone(),
            elements: self.elements.clone(),
            resources: self
                .resources
                .iter()
                .map(|r| ResourceSource {
                    id: r.id.clone(),
                    data: base64::engine::general_purpose::STANDARD.encode(&r.data),
                })
                .collect(),
        }
    }

    /// Serialize to the JSON description.
    pub fn to_json(&self) -> Result<String, QuireError> {
        Ok(serde_json::to_string_pretty(&self.to_source())?)
    }

    pub fn add_area(&mut self, area: AreaDefinition) -> Result<(), QuireError> {
        if self.area(&area.id).is_some() {
            return Err(QuireError::DuplicateIdentifier {
                kind: "area",
                id: area.id,
            });
        }
        self.areas.push(area);
        Ok(())
    }

    pub fn add_style(&mut self, style: StyleDefinition) -> Result<(), QuireError> {
        if self.style(&style.id).is_some() {
            return Err(QuireError::DuplicateIdentifier {
                kind: "style",
                id: style.id,
            });
        }
        self.styles.push(style);
        Ok(())
    }

    pub fn add_resource(&mut self, id: &str, data: Vec<u8>) -> Result<(), QuireError> {
        if self.resource(id).is_some() {
            return Err(QuireError::DuplicateIdentifier {
                kind: "resource",
                id: id.to_string(),
            });
        }
        self.resources.push(Resource {
            id: id.to_string(),
            data,
        });
        Ok(())
    }

    /// Append an element and return its handle.
    pub fn push_element(&mut self, element: Element) -> ElementId {
        self.elements.push(element);
        ElementId(self.elements.len() - 1)
    }

    pub fn areas(&self) -> &[AreaDefinition] {
        &self.areas
    }

    pub fn styles(&self) -> &[StyleDefinition] {
        &self.styles
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    /// Elements with their handles, in document order.
    pub fn iter_elements(&self) -> impl Iterator<Item = (ElementId, &Element)> {
        self.elements
            .iter()
            .enumerate()
            .map(|(i, e)| (ElementId(i), e))
    }

    /// Look up an area by exact id.
    pub fn area(&self, id: &str) -> Option<&AreaDefinition> {
        self.areas.iter().find(|a| a.id == id)
    }

    /// Look up a style, ignoring case.
    pub fn style(&self, id: &str) -> Option<&StyleDefinition> {
        self.styles.iter().find(|s| ids_match_ignoring_case(&s.id, id))
    }

    pub fn resource(&self, id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.id == id)
    }

    /// The style an element draws with: its named style, or the default
    /// style when it names none or an unknown one.
    pub fn resolve_style(&self, id: Option<&str>) -> &StyleDefinition {
        id.and_then(|id| self.style(id))
            .or_else(|| self.style("default"))
            .unwrap_or(&self.fallback_style)
    }

    /// Absolute top-left of an area on the page.
    pub fn area_origin(&self, area: &AreaDefinition) -> Point {
        area.position
            .offset(self.page_padding.left, self.page_padding.top)
    }
}

fn ids_match_ignoring_case(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body() -> AreaDefinition {
        AreaDefinition::new("Body", Availability::Global, Point::ZERO, Size::new(100.0, 200.0))
    }

    #[test]
    fn duplicate_area_is_rejected() {
        let mut doc = Document::new();
        doc.add_area(body()).unwrap();
        let err = doc.add_area(body()).unwrap_err();
        assert!(matches!(
            err,
            QuireError::DuplicateIdentifier { kind: "area", .. }
        ));
    }

    #[test]
    fn area_ids_are_case_sensitive() {
        let mut doc = Document::new();
        doc.add_area(body()).unwrap();
        assert!(doc.area("Body").is_some());
        assert!(doc.area("body").is_none());
        let mut other = body();
        other.id = "body".to_string();
        assert!(doc.add_area(other).is_ok());
    }

    #[test]
    fn style_ids_are_case_insensitive() {
        let mut doc = Document::new();
        doc.add_style(StyleDefinition::named("Heading")).unwrap();
        assert!(doc.style("heading").is_some());
        let err = doc.add_style(StyleDefinition::named("HEADING")).unwrap_err();
        assert!(matches!(
            err,
            QuireError::DuplicateIdentifier { kind: "style", .. }
        ));
    }

    #[test]
    fn unknown_style_resolves_to_default() {
        let mut doc = Document::new();
        let mut default = StyleDefinition::named("Default");
        default.font_size = 9.0;
        doc.add_style(default).unwrap();
        assert_eq!(doc.resolve_style(Some("missing")).font_size, 9.0);
        assert_eq!(doc.resolve_style(None).font_size, 9.0);
    }

    #[test]
    fn parses_description() {
        let json = r##"{
            "title": "Report",
            "creator": "tests",
            "pageSize": "A5",
            "pagePadding": { "top": 10, "left": 12 },
            "areas": [
                { "id": "Body", "position": { "x": 0, "y": 20 }, "size": { "width": 120, "height": 160 } },
                { "id": "Cover", "availability": "FirstPageOnly", "position": { "x": 0, "y": 0 }, "size": { "width": 120, "height": 20 } }
            ],
            "styles": [ { "id": "H1", "fontSize": 16, "decoration": "Bold" } ],
            "elements": [
                { "type": "ChapterHeading", "area": "Body", "style": "H1", "text": "Intro", "level": 0 },
                { "type": "TextBlock", "area": "Body", "text": "Hello" },
                { "type": "PageNumberPlaceholder", "area": "Cover", "repeating": true, "format": "Page {page}" },
                { "type": "Table", "area": "Body", "columns": [ { "Fraction": 0.5 }, { "Fixed": 30 } ],
                  "rows": [ { "cells": [ { "elements": [ { "type": "TextBlock", "text": "a" } ] }, {} ] } ] },
                { "type": "TableOfContents", "area": "Body", "maxLevel": 1, "resetsNumbering": true },
                { "type": "PageBreak", "area": "Body" }
            ],
            "resourceData": [ { "id": "logo", "data": "AAEC" } ]
        }"##;
        let doc = Document::from_json(json).unwrap();
        assert_eq!(doc.metadata.title.as_deref(), Some("Report"));
        assert_eq!(doc.page_size.dimensions(), Size::new(148.0, 210.0));
        assert_eq!(doc.areas().len(), 2);
        assert_eq!(doc.area("Cover").unwrap().availability, Availability::FirstPageOnly);
        assert_eq!(doc.area_origin(doc.area("Body").unwrap()), Point::new(12.0, 30.0));
        assert_eq!(doc.resource("logo").unwrap().data, vec![0, 1, 2]);
        assert_eq!(doc.elements().len(), 6);
        assert_eq!(doc.elements()[2].tag(), ElementTag::PageNumberPlaceholder);
        assert!(doc.elements()[2].repeating);
        match &doc.elements()[4].kind {
            ElementKind::TableOfContents {
                max_level,
                resets_numbering,
                ..
            } => {
                assert_eq!(*max_level, Some(1));
                assert!(*resets_numbering);
            }
            other => panic!("expected table of contents, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_ids_in_description_fail_before_layout() {
        let json = r#"{
            "areas": [
                { "id": "A", "position": { "x": 0, "y": 0 }, "size": { "width": 1, "height": 1 } },
                { "id": "A", "position": { "x": 0, "y": 0 }, "size": { "width": 1, "height": 1 } }
            ]
        }"#;
        let err = Document::from_json(json).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate area identifier 'A'");
    }

    #[test]
    fn bad_base64_is_a_resource_error() {
        let json = r#"{ "resources": [ { "id": "img", "data": "!!!" } ] }"#;
        assert!(matches!(
            Document::from_json(json),
            Err(QuireError::Resource { .. })
        ));
    }

    #[test]
    fn json_round_trip_preserves_elements() {
        let mut doc = Document::new();
        doc.add_area(body()).unwrap();
        doc.push_element(Element::chapter("Body", "Intro", 0).with_style("H1"));
        let again = Document::from_json(&doc.to_json().unwrap()).unwrap();
        assert_eq!(again.elements(), doc.elements());
        assert_eq!(again.areas(), doc.areas());
    }
}
