//! Origin Index: which area and which nodes every element produced.
//!
//! Entries are written once, when area backlogs are built. After the layout
//! pass the index is resolved against the page records into a
//! [`PageLookup`], which is what forward references (table of contents
//! entries) read during rendering.

use std::collections::HashMap;

use crate::model::ElementId;

use super::arena::{NodeArena, NodeId};
use super::record::PageLayoutRecord;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginEntry {
    pub area: String,
    /// Nodes built for the element, before any splitting.
    pub nodes: Vec<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct OriginIndex {
    entries: HashMap<ElementId, OriginEntry>,
}

impl OriginIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the nodes built for `element`. Recording an element twice
    /// keeps the first entry.
    pub fn record(&mut self, element: ElementId, area: &str, nodes: Vec<NodeId>) {
        self.entries.entry(element).or_insert_with(|| OriginEntry {
            area: area.to_string(),
            nodes,
        });
    }

    pub fn get(&self, element: ElementId) -> Option<&OriginEntry> {
        self.entries.get(&element)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the first page each element landed on.
    ///
    /// Placed fragments are traced back to the node their element produced.
    pub fn resolve_pages(&self, arena: &NodeArena, records: &[PageLayoutRecord]) -> PageLookup {
        let owners: HashMap<NodeId, ElementId> = self
            .entries
            .iter()
            .flat_map(|(element, entry)| entry.nodes.iter().map(move |node| (*node, *element)))
            .collect();

        let mut first_page = HashMap::new();
        for record in records {
            for placement in &record.placements {
                if let Some(element) = owners.get(&arena.root_of(placement.node)) {
                    first_page.entry(*element).or_insert(record.page_index);
                }
            }
        }
        PageLookup { first_page }
    }
}

/// Resolved element → page index mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLookup {
    first_page: HashMap<ElementId, usize>,
}

impl PageLookup {
    /// 0-based index of the first page `element` was placed on.
    pub fn page_of(&self, element: ElementId) -> Option<usize> {
        self.first_page.get(&element).copied()
    }
}
