//! Physical node primitives
//!
//! This module defines the widget node kinds and the node table that stores
//! the physical render tree in Structure of Arrays (SoA) format.

use zerocopy::{Immutable, IntoBytes, KnownLayout};

/// Widget kind of a physical node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoBytes, Immutable, KnownLayout)]
#[repr(u8)]
pub enum NodeKind {
    /// The document-level container every parse starts from
    Root = 0,
    /// Block container laying out its children
    Layout = 1,
    /// Inline run hosting text fragments and inline elements
    TextRun = 2,
    Button = 3,
    CheckBox = 4,
    /// Single-line text input
    TextField = 5,
    /// Free-text input; the only kind that keeps its trailing markup content
    TextArea = 6,
    /// Fixed-choice container (drop-down)
    Spinner = 7,
}

impl NodeKind {
    /// Whether block content is parsed into this node
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Layout)
    }
}

/// Physical node ID (1-indexed, 0 = none)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(0);

    pub fn is_valid(self) -> bool {
        self.0 != 0
    }

    /// Zero-based row index into the tables (out of range for NONE)
    pub fn index(self) -> usize {
        (self.0 as usize).wrapping_sub(1)
    }
}

/// Node table storing physical nodes in Structure of Arrays (SoA) format
#[derive(Default, Debug, PartialEq)]
pub struct NodeTable {
    /// Node kinds
    pub kinds: Vec<NodeKind>,
    /// Parent node IDs (NONE = detached)
    pub parents: Vec<NodeId>,
    /// First child node IDs
    pub first_children: Vec<NodeId>,
    /// Last child node IDs, so appends don't walk the sibling chain
    pub last_children: Vec<NodeId>,
    /// Next sibling node IDs
    pub next_siblings: Vec<NodeId>,
}

impl NodeTable {
    /// Create a new empty node table
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of nodes
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    fn contains(&self, id: NodeId) -> bool {
        id.is_valid() && id.index() < self.kinds.len()
    }

    /// Create a new node appended as the last child of `parent` and return its ID
    pub fn create_node(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.kinds.len() as u32 + 1);

        self.kinds.push(kind);
        self.parents.push(NodeId::NONE);
        self.first_children.push(NodeId::NONE);
        self.last_children.push(NodeId::NONE);
        self.next_siblings.push(NodeId::NONE);

        if self.contains(parent) {
            self.attach(id, parent);
        }

        id
    }

    /// Link a detached node as the last child of `parent`
    fn attach(&mut self, id: NodeId, parent: NodeId) {
        debug_assert!(!self.parents[id.index()].is_valid());
        self.parents[id.index()] = parent;

        let parent_idx = parent.index();
        let last = self.last_children[parent_idx];
        if last.is_valid() {
            self.next_siblings[last.index()] = id;
        } else {
            self.first_children[parent_idx] = id;
        }
        self.last_children[parent_idx] = id;
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.contains(id).then(|| self.kinds[id.index()])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        if !self.contains(id) {
            return None;
        }
        let parent = self.parents[id.index()];
        parent.is_valid().then_some(parent)
    }

    /// Get children of a node
    pub fn get_children(&self, id: NodeId) -> Vec<NodeId> {
        if !self.contains(id) {
            return Vec::new();
        }

        let mut children = Vec::new();
        let mut child = self.first_children[id.index()];
        while child.is_valid() {
            children.push(child);
            child = self.next_siblings[child.index()];
        }
        children
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_table() {
        let mut table = NodeTable::new();

        let root = table.create_node(NodeKind::Root, NodeId::NONE);
        assert_eq!(root, NodeId(1));

        let layout = table.create_node(NodeKind::Layout, root);
        let run = table.create_node(NodeKind::TextRun, root);
        assert_eq!(table.parent(layout), Some(root));
        assert_eq!(table.parent(root), None);

        assert_eq!(table.get_children(root), vec![layout, run]);
        assert!(table.get_children(layout).is_empty());
    }

    #[test]
    fn test_invalid_ids() {
        let table = NodeTable::new();
        assert!(table.kind(NodeId::NONE).is_none());
        assert!(table.kind(NodeId(7)).is_none());
        assert!(table.get_children(NodeId(7)).is_empty());
    }

    #[test]
    fn test_container_kinds() {
        assert!(NodeKind::Root.is_container());
        assert!(NodeKind::Layout.is_container());
        assert!(!NodeKind::Spinner.is_container());
    }
}
