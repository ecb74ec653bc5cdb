//! Hierarchical chapter numbering.
//!
//! Labels are computed on demand by scanning the document from the start up
//! to the heading in question, so a heading's number never depends on where
//! (or whether) earlier content was placed.

use crate::model::{Document, ElementId, ElementKind};

/// Per-level chapter counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChapterCounters {
    levels: Vec<u32>,
}

impl ChapterCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter a heading at `level`.
    ///
    /// Deeper counters are reset, the counter at `level` is incremented and
    /// any ancestor still at zero is promoted to one.
    pub fn enter(&mut self, level: usize) {
        if level >= self.levels.len() {
            self.levels.resize(level + 1, 0);
        }
        for deeper in self.levels.iter_mut().skip(level + 1) {
            *deeper = 0;
        }
        self.levels[level] += 1;
        for ancestor in self.levels.iter_mut().take(level) {
            if *ancestor == 0 {
                *ancestor = 1;
            }
        }
    }

    pub fn reset(&mut self) {
        self.levels.clear();
    }

    /// The label for a heading at `level`, e.g. `2.1`. Trailing zero levels
    /// are left out.
    pub fn label(&self, level: usize) -> String {
        let end = (level + 1).min(self.levels.len());
        let mut parts = &self.levels[..end];
        while let Some((0, rest)) = parts.split_last() {
            parts = rest;
        }
        parts
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Compute the label of the chapter heading `target`. Returns `None` if
/// `target` is not a chapter heading.
pub fn chapter_label(document: &Document, target: ElementId) -> Option<String> {
    let mut counters = ChapterCounters::new();
    for (id, element) in document.iter_elements() {
        match &element.kind {
            ElementKind::TableOfContents {
                resets_numbering: true,
                ..
            } => counters.reset(),
            ElementKind::ChapterHeading { level, .. } => {
                counters.enter(*level);
                if id == target {
                    return Some(counters.label(*level));
                }
            }
            _ => {}
        }
        if id >= target {
            break;
        }
    }
    None
}
