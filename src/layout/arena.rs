//! Per-run storage for render nodes.
//!
//! Nodes live in one arena per pagination run and everything refers to them
//! by [`NodeId`]. Split fragments remember the node they were derived from,
//! so a fragment can always be traced back to the node its element produced.

use std::ops::Index;

use super::node::RenderNode;

/// Stable handle of a node in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Slot {
    node: RenderNode,
    derived_from: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: RenderNode) -> NodeId {
        self.slots.push(Slot {
            node,
            derived_from: None,
        });
        NodeId(self.slots.len() - 1)
    }

    /// Allocate a fragment derived from `parent`.
    pub fn alloc_derived(&mut self, node: RenderNode, parent: NodeId) -> NodeId {
        self.slots.push(Slot {
            node,
            derived_from: Some(parent),
        });
        NodeId(self.slots.len() - 1)
    }

    pub fn get(&self, id: NodeId) -> Option<&RenderNode> {
        self.slots.get(id.0).map(|s| &s.node)
    }

    pub fn derived_from(&self, id: NodeId) -> Option<NodeId> {
        self.slots.get(id.0).and_then(|s| s.derived_from)
    }

    /// Follow `derived_from` links back to the node an element produced.
    pub fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.derived_from(current) {
            current = parent;
        }
        current
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl Index<NodeId> for NodeArena {
    type Output = RenderNode;

    fn index(&self, id: NodeId) -> &RenderNode {
        &self.slots[id.0].node
    }
}
