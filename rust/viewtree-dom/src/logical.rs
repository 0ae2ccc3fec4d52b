//! Logical element tree
//!
//! The semantic side of a parsed document. Elements live in an arena owned by
//! [`LogicalTree`] and refer to each other by [`ElementId`]. View elements
//! point at the physical node they wrap; text elements point at the inline
//! runs their content was laid out in.

use indexmap::IndexMap;

use crate::primitives::NodeId;
use crate::properties::CssStyles;

/// Attribute mapping with unique keys, in source order
pub type Attributes = IndexMap<String, String>;

/// Logical element ID (0-indexed arena slot)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub u32);

impl ElementId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Ordered content of a text element
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InlineContent {
    /// Normalized text fragment, exactly as it was added to the run
    Text(String),
    Element(ElementId),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ElementKind {
    /// Grouping without a physical counterpart
    Virtual,
    /// Wraps exactly one physical node
    View { node: NodeId },
    /// Member of one or more inline runs; the first run owns the element,
    /// later ones hold segments resumed after a block interruption
    Text {
        runs: Vec<NodeId>,
        content: Vec<InlineContent>,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogicalElement {
    pub name: String,
    pub attributes: Attributes,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    pub kind: ElementKind,
    /// Filled in by the style engine after parsing
    pub style: Option<CssStyles>,
}

impl LogicalElement {
    fn new(name: &str, attributes: Attributes, kind: ElementKind) -> Self {
        Self {
            name: name.to_string(),
            attributes,
            parent: None,
            children: Vec::new(),
            kind,
            style: None,
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self.kind, ElementKind::Virtual)
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, ElementKind::View { .. })
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ElementKind::Text { .. })
    }

    /// Physical node of a view element
    pub fn node(&self) -> Option<NodeId> {
        match self.kind {
            ElementKind::View { node } => Some(node),
            _ => None,
        }
    }

    /// The inline run a text element was created in
    pub fn owning_run(&self) -> Option<NodeId> {
        match &self.kind {
            ElementKind::Text { runs, .. } => runs.first().copied(),
            _ => None,
        }
    }

    pub fn runs(&self) -> &[NodeId] {
        match &self.kind {
            ElementKind::Text { runs, .. } => runs,
            _ => &[],
        }
    }

    pub fn inline_content(&self) -> &[InlineContent] {
        match &self.kind {
            ElementKind::Text { content, .. } => content,
            _ => &[],
        }
    }

    /// Whitespace-separated `class` attribute entries
    pub fn classes(&self) -> impl Iterator<Item = &str> + '_ {
        self.attribute("class").unwrap_or("").split_whitespace()
    }
}

/// Arena of logical elements
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogicalTree {
    elements: Vec<LogicalElement>,
}

impl LogicalTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&LogicalElement> {
        self.elements.get(id.index())
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut LogicalElement> {
        self.elements.get_mut(id.index())
    }

    pub fn iter(&self) -> impl Iterator<Item = (ElementId, &LogicalElement)> + '_ {
        self.elements
            .iter()
            .enumerate()
            .map(|(idx, element)| (ElementId(idx as u32), element))
    }

    /// Elements without a logical parent, in creation order
    pub fn roots(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.iter()
            .filter(|(_, element)| element.parent.is_none())
            .map(|(id, _)| id)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.get(id).map_or(&[], |element| element.children.as_slice())
    }

    fn push(&mut self, element: LogicalElement) -> ElementId {
        let id = ElementId(self.elements.len() as u32);
        self.elements.push(element);
        id
    }

    pub fn create_virtual(&mut self, name: &str, attributes: Attributes) -> ElementId {
        self.push(LogicalElement::new(name, attributes, ElementKind::Virtual))
    }

    pub fn create_view(&mut self, name: &str, attributes: Attributes, node: NodeId) -> ElementId {
        self.push(LogicalElement::new(name, attributes, ElementKind::View { node }))
    }

    /// Create a text element owned by `run`. Attributes are copied in later,
    /// once the cursor sits on the element's opening tag.
    pub fn create_text(&mut self, name: &str, run: NodeId) -> ElementId {
        self.push(LogicalElement::new(
            name,
            Attributes::new(),
            ElementKind::Text {
                runs: vec![run],
                content: Vec::new(),
            },
        ))
    }

    /// Link `child` as the last child of `parent`
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) {
        if parent.index() >= self.elements.len() || child.index() >= self.elements.len() {
            log::warn!("append_child: unknown element {parent:?} or {child:?}");
            return;
        }
        debug_assert!(self.elements[child.index()].parent.is_none());
        self.elements[child.index()].parent = Some(parent);

        let parent_element = &mut self.elements[parent.index()];
        parent_element.children.push(child);
        if let ElementKind::Text { content, .. } = &mut parent_element.kind {
            content.push(InlineContent::Element(child));
        }
    }

    /// Append a normalized text fragment to a text element. Empty fragments
    /// are dropped.
    pub fn append_text(&mut self, id: ElementId, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(ElementKind::Text { content, .. }) = self.get_mut(id).map(|e| &mut e.kind) {
            content.push(InlineContent::Text(text));
        }
    }

    /// Record that a text element continues in `run`
    pub fn note_run(&mut self, id: ElementId, run: NodeId) {
        if let Some(ElementKind::Text { runs, .. }) = self.get_mut(id).map(|e| &mut e.kind) {
            if runs.last() != Some(&run) {
                runs.push(run);
            }
        }
    }

    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: &str) {
        if let Some(element) = self.get_mut(id) {
            element.attributes.insert(name.to_string(), value.to_string());
        }
    }

    /// Concatenated inline text of an element and its descendants
    pub fn text_content(&self, id: ElementId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: ElementId, out: &mut String) {
        let Some(element) = self.get(id) else {
            return;
        };
        match &element.kind {
            ElementKind::Text { content, .. } => {
                for item in content {
                    match item {
                        InlineContent::Text(text) => out.push_str(text),
                        InlineContent::Element(child) => self.collect_text(*child, out),
                    }
                }
            }
            _ => {
                for child in &element.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_linking() {
        let mut tree = LogicalTree::new();
        let body = tree.create_view("body", Attributes::new(), NodeId(2));
        let form = tree.create_virtual("form", Attributes::new());
        tree.append_child(body, form);

        assert_eq!(tree.children(body), &[form]);
        assert_eq!(tree.get(form).unwrap().parent, Some(body));
        assert_eq!(tree.roots().collect::<Vec<_>>(), vec![body]);
        assert_eq!(tree.get(body).unwrap().node(), Some(NodeId(2)));
    }

    #[test]
    fn test_text_element_content() {
        let mut tree = LogicalTree::new();
        let b = tree.create_text("b", NodeId(3));
        tree.append_text(b, "bold ".to_string());
        let i = tree.create_text("i", NodeId(3));
        tree.append_child(b, i);
        tree.append_text(i, "italic".to_string());
        tree.append_text(b, String::new());

        let element = tree.get(b).unwrap();
        assert_eq!(
            element.inline_content(),
            &[
                InlineContent::Text("bold ".to_string()),
                InlineContent::Element(i)
            ]
        );
        assert_eq!(tree.text_content(b), "bold italic");
    }

    #[test]
    fn test_note_run_keeps_owner_first() {
        let mut tree = LogicalTree::new();
        let a = tree.create_text("a", NodeId(4));
        tree.note_run(a, NodeId(4));
        tree.note_run(a, NodeId(6));
        let element = tree.get(a).unwrap();
        assert_eq!(element.runs(), &[NodeId(4), NodeId(6)]);
        assert_eq!(element.owning_run(), Some(NodeId(4)));
    }

    #[test]
    fn test_attributes_keep_last_value() {
        let mut tree = LogicalTree::new();
        let span = tree.create_text("span", NodeId(1));
        tree.set_attribute(span, "class", "a b");
        tree.set_attribute(span, "class", "c");
        let element = tree.get(span).unwrap();
        assert_eq!(element.attributes.len(), 1);
        assert_eq!(element.classes().collect::<Vec<_>>(), vec!["c"]);
    }
}
