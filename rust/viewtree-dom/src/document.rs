//! Parsed documents
//!
//! A [`Document`] pairs the physical render tree with the logical element
//! tree built from the same markup.

use std::sync::atomic::{AtomicU64, Ordering};

use zerocopy::{Immutable, IntoBytes, KnownLayout};

use crate::inline::InlineRun;
use crate::logical::{ElementId, LogicalElement, LogicalTree};
use crate::primitives::{NodeId, NodeKind, NodeTable};
use crate::properties::PropertyTable;

/// Physical tree snapshot magic number "VTPT"
pub const MAGIC_NUMBER: u32 = 0x56545054;
/// Current snapshot format version
pub const FORMAT_VERSION: u32 = 1;

const NO_ID: u32 = u32::MAX;

/// Identifies the document a resource request belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DocumentHandle(pub u64);

impl DocumentHandle {
    /// Allocate a process-unique handle
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// The physical render tree: node structure plus widget state
#[derive(Debug, PartialEq)]
pub struct PhysicalTree {
    nodes: NodeTable,
    props: PropertyTable,
    root: NodeId,
}

impl Default for PhysicalTree {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicalTree {
    /// Create a tree holding only the root container
    pub fn new() -> Self {
        let mut nodes = NodeTable::new();
        let root = nodes.create_node(NodeKind::Root, NodeId::NONE);
        let mut props = PropertyTable::new();
        props.resize(nodes.len());
        Self { nodes, props, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &NodeTable {
        &self.nodes
    }

    pub fn props(&self) -> &PropertyTable {
        &self.props
    }

    pub fn props_mut(&mut self) -> &mut PropertyTable {
        &mut self.props
    }

    /// Append a new node of `kind` as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.nodes.create_node(kind, parent);
        self.props.resize(self.nodes.len());
        if kind == NodeKind::TextRun {
            self.props.runs[id.index()] = Some(InlineRun::new());
        }
        id
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.nodes.kind(id)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.parent(id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get_children(id)
    }

    /// The view element wrapping `id`, if any
    pub fn element(&self, id: NodeId) -> Option<ElementId> {
        self.props.element(id)
    }

    pub fn run(&self, id: NodeId) -> Option<&InlineRun> {
        self.props.run(id)
    }

    pub fn run_mut(&mut self, id: NodeId) -> Option<&mut InlineRun> {
        self.props.run_mut(id)
    }

    /// Text shown by a node: run text for inline runs, widget text otherwise
    pub fn text(&self, id: NodeId) -> &str {
        match self.run(id) {
            Some(run) => run.text(),
            None => self.props.text(id),
        }
    }

    /// Write a deterministic binary snapshot of the tree
    pub fn write_binary(&self) -> Vec<u8> {
        let mut buf = Vec::new();

        buf.extend_from_slice(&MAGIC_NUMBER.to_le_bytes());
        buf.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        buf.extend_from_slice(&(self.nodes.len() as u32).to_le_bytes());

        for idx in 0..self.nodes.len() {
            let id = NodeId(idx as u32 + 1);
            let record = NodeRecord {
                kind: self.nodes.kinds[idx] as u8,
                checked: self.props.checked[idx] as u8,
                parent: self.nodes.parents[idx].0,
                first_child: self.nodes.first_children[idx].0,
                next_sibling: self.nodes.next_siblings[idx].0,
                element: self.props.elements[idx].map_or(NO_ID, |e| e.0),
                selection: self.props.selections[idx].map_or(NO_ID, |s| s as u32),
            };
            buf.extend_from_slice(record.as_bytes());

            write_str(&mut buf, self.text(id));

            let options = &self.props.options[idx];
            buf.extend_from_slice(&(options.len() as u32).to_le_bytes());
            for option in options {
                write_str(&mut buf, option);
            }

            let spans = self.run(id).map_or(&[][..], InlineRun::spans);
            buf.extend_from_slice(&(spans.len() as u32).to_le_bytes());
            for span in spans {
                buf.extend_from_slice(&span.element.0.to_le_bytes());
                buf.extend_from_slice(&(span.start as u32).to_le_bytes());
                buf.extend_from_slice(&span.end.map_or(NO_ID, |e| e as u32).to_le_bytes());
            }
        }

        buf
    }
}

/// Fixed-size part of a node in the binary snapshot
#[derive(Clone, Copy, Debug, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
struct NodeRecord {
    kind: u8,
    checked: u8,
    parent: u32,
    first_child: u32,
    next_sibling: u32,
    element: u32,
    selection: u32,
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Logical and physical trees produced by one parse
#[derive(Debug)]
pub struct Document {
    pub handle: DocumentHandle,
    pub logical: LogicalTree,
    pub physical: PhysicalTree,
}

impl Document {
    pub fn new(handle: DocumentHandle) -> Self {
        Self {
            handle,
            logical: LogicalTree::new(),
            physical: PhysicalTree::new(),
        }
    }

    /// The view element wrapping a physical node
    pub fn view_element(&self, node: NodeId) -> Option<&LogicalElement> {
        self.physical
            .element(node)
            .and_then(|id| self.logical.get(id))
    }

    /// View elements wrapping the direct children of the physical root
    pub fn top_level_views(&self) -> Vec<ElementId> {
        self.physical
            .children(self.physical.root())
            .into_iter()
            .filter_map(|node| self.physical.element(node))
            .collect()
    }

    /// Whether both trees match another document's, ignoring the handle
    pub fn same_structure(&self, other: &Document) -> bool {
        self.logical == other.logical && self.physical == other.physical
    }
}
