//! Document validation.
//!
//! Validation never stops a run: an element naming an unknown area is simply
//! never placed, an unknown style falls back to the default one. The
//! messages exist so callers can tell the author what will go missing.

use std::fmt;

use serde::Serialize;

use crate::image_loader;
use crate::model::{Document, Element, ElementId, ElementKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMessage {
    pub severity: Severity,
    pub message: String,
    /// The top-level element concerned (the enclosing table for cell
    /// contents).
    pub element: ElementId,
    /// Location in the description, e.g. `elements[2].rows[0].cells[1].elements[0]`.
    pub path: String,
    /// Character offset of the element in the compact JSON form of the
    /// document, when it can be found.
    pub offset: Option<usize>,
}

impl fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({}", self.severity, self.message, self.path)?;
        if let Some(offset) = self.offset {
            write!(f, ", offset {offset}")?;
        }
        write!(f, ")")
    }
}

/// True if any message is an error.
pub fn has_errors(messages: &[ValidationMessage]) -> bool {
    messages.iter().any(|m| m.severity == Severity::Error)
}

/// Check every element of `document`, including elements nested in table
/// cells.
pub fn validate(document: &Document) -> Vec<ValidationMessage> {
    let mut v = Validator {
        document,
        json: serde_json::to_string(&document.to_source()).ok(),
        messages: Vec::new(),
    };
    let mut search_from = 0;
    for (id, element) in document.iter_elements() {
        let path = format!("elements[{}]", id.0);
        let offset = v.locate(element, search_from);
        if let Some(offset) = offset {
            search_from = offset;
        }
        v.check_area(id, element, &path, offset);
        v.check_element(id, element, &path, offset);
    }
    log::debug!("validation produced {} message(s)", v.messages.len());
    v.messages
}

struct Validator<'a> {
    document: &'a Document,
    json: Option<String>,
    messages: Vec<ValidationMessage>,
}

impl Validator<'_> {
    /// Character offset of the element's serialized form, searching from
    /// character `from`.
    fn locate(&self, element: &Element, from: usize) -> Option<usize> {
        let json = self.json.as_deref()?;
        let needle = serde_json::to_string(element).ok()?;
        let start = json.char_indices().nth(from).map_or(json.len(), |(i, _)| i);
        let byte = json[start..].find(&needle)? + start;
        Some(json[..byte].chars().count())
    }

    fn report(
        &mut self,
        severity: Severity,
        message: String,
        element: ElementId,
        path: &str,
        offset: Option<usize>,
    ) {
        self.messages.push(ValidationMessage {
            severity,
            message,
            element,
            path: path.to_string(),
            offset,
        });
    }

    fn check_area(&mut self, id: ElementId, element: &Element, path: &str, offset: Option<usize>) {
        if self.document.area(&element.area).is_some() {
            return;
        }
        let similar = self
            .document
            .areas()
            .iter()
            .find(|a| a.id.eq_ignore_ascii_case(&element.area));
        let message = match similar {
            Some(a) => format!(
                "unknown area '{}' (area ids are case-sensitive; did you mean '{}'?)",
                element.area, a.id
            ),
            None => format!("unknown area '{}'", element.area),
        };
        self.report(Severity::Error, message, id, path, offset);
    }

    fn check_element(
        &mut self,
        id: ElementId,
        element: &Element,
        path: &str,
        offset: Option<usize>,
    ) {
        if let Some(style) = &element.style {
            if self.document.style(style).is_none() {
                self.report(
                    Severity::Error,
                    format!("unknown style '{style}'"),
                    id,
                    path,
                    offset,
                );
            }
        }

        match &element.kind {
            ElementKind::TextBlock { text } => {
                if text.is_empty() {
                    self.report(Severity::Warning, "empty text block".to_string(), id, path, offset);
                }
                if text.contains('\n') {
                    self.report(
                        Severity::Info,
                        "text block contains a line break".to_string(),
                        id,
                        path,
                        offset,
                    );
                }
            }
            ElementKind::Image { resource, size } => match self.document.resource(resource) {
                None => self.report(
                    Severity::Error,
                    format!("unknown image resource '{resource}'"),
                    id,
                    path,
                    offset,
                ),
                Some(data) if size.is_none() => {
                    if let Err(e) = image_loader::dimensions(&data.data) {
                        self.report(
                            Severity::Warning,
                            format!("image resource '{resource}' has no usable size: {e}"),
                            id,
                            path,
                            offset,
                        );
                    }
                }
                Some(_) => {}
            },
            ElementKind::Table { rows, .. } => {
                for (r, row) in rows.iter().enumerate() {
                    for (c, cell) in row.cells.iter().enumerate() {
                        for (e, nested) in cell.elements.iter().enumerate() {
                            let nested_path =
                                format!("{path}.rows[{r}].cells[{c}].elements[{e}]");
                            let nested_offset = offset.and_then(|o| self.locate(nested, o));
                            self.check_element(id, nested, &nested_path, nested_offset);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Point, Size};
    use crate::model::{AreaDefinition, Availability, TableCell, TableRow};
    use crate::style::StyleDefinition;

    fn document() -> Document {
        let mut doc = Document::new();
        doc.add_area(AreaDefinition::new(
            "Body",
            Availability::Global,
            Point::ZERO,
            Size::new(100.0, 100.0),
        ))
        .unwrap();
        doc.add_style(StyleDefinition::named("Normal")).unwrap();
        doc
    }

    #[test]
    fn clean_document_has_no_messages() {
        let mut doc = document();
        doc.push_element(Element::text("Body", "hello").with_style("normal"));
        assert!(validate(&doc).is_empty());
    }

    #[test]
    fn area_ids_are_case_sensitive() {
        let mut doc = document();
        doc.push_element(Element::text("body", "hello"));
        let messages = validate(&doc);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].severity, Severity::Error);
        assert!(messages[0].message.contains("'Body'"));
        assert!(has_errors(&messages));
    }

    #[test]
    fn messages_serialize_with_their_element_index() {
        let mut doc = document();
        doc.push_element(Element::text("Body", "fine"));
        doc.push_element(Element::text("Footer", "lost"));
        let messages = validate(&doc);
        let json = serde_json::to_value(&messages[0]).unwrap();
        assert_eq!(json["element"], 1);
        assert_eq!(json["severity"], "Error");
        assert_eq!(json["path"], "elements[1]");
    }

    #[test]
    fn unknown_style_and_resource_are_errors() {
        let mut doc = document();
        doc.push_element(Element::text("Body", "x").with_style("Fancy"));
        doc.push_element(Element::new(
            "Body",
            ElementKind::Image {
                resource: "logo".to_string(),
                size: None,
            },
        ));
        let messages = validate(&doc);
        let errors: Vec<_> = messages.iter().map(|m| (m.severity, m.element)).collect();
        assert_eq!(
            errors,
            vec![(Severity::Error, ElementId(0)), (Severity::Error, ElementId(1))]
        );
    }

    #[test]
    fn text_content_checks() {
        let mut doc = document();
        doc.push_element(Element::text("Body", ""));
        doc.push_element(Element::text("Body", "a\nb"));
        let severities: Vec<_> = validate(&doc).iter().map(|m| m.severity).collect();
        assert_eq!(severities, vec![Severity::Warning, Severity::Info]);
    }

    #[test]
    fn offsets_point_at_the_element() {
        let mut doc = document();
        doc.push_element(Element::text("Body", "fine"));
        doc.push_element(Element::text("Nowhere", "lost"));
        let messages = validate(&doc);
        let json = serde_json::to_string(&doc.to_source()).unwrap();
        let offset = messages[0].offset.unwrap();
        let tail: String = json.chars().skip(offset).collect();
        assert!(tail.starts_with(&serde_json::to_string(&doc.elements()[1]).unwrap()));
        assert_eq!(messages[0].path, "elements[1]");
    }

    #[test]
    fn nested_cell_elements_are_checked_except_their_area() {
        let mut doc = document();
        doc.push_element(Element::new(
            "Body",
            ElementKind::Table {
                rows: vec![TableRow {
                    cells: vec![TableCell {
                        elements: vec![Element::text("", "").with_style("Missing")],
                    }],
                }],
                columns: Vec::new(),
                borders: false,
            },
        ));
        let messages = validate(&doc);
        let severities: Vec<_> = messages.iter().map(|m| m.severity).collect();
        assert_eq!(severities, vec![Severity::Error, Severity::Warning]);
        assert!(messages
            .iter()
            .all(|m| m.path == "elements[0].rows[0].cells[0].elements[0]"));
        assert!(messages.iter().all(|m| m.offset.is_some()));
    }
}
