//! Node properties
//!
//! Computed style values attached to logical elements, and the per-node
//! widget state table of the physical tree.

use crate::inline::InlineRun;
use crate::logical::ElementId;
use crate::primitives::NodeId;

/// RGBA color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color { r: 0, g: 0, b: 0, a: 0 };
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa` (the leading `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
        match hex.len() {
            3 => {
                let r = channel(0..1)? * 17;
                let g = channel(1..2)? * 17;
                let b = channel(2..3)? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?, 255)),
            8 => Some(Self::new(
                channel(0..2)?,
                channel(2..4)?,
                channel(4..6)?,
                channel(6..8)?,
            )),
            _ => None,
        }
    }
}

/// Length value with auto flag
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Length {
    pub value: f32,
    pub is_auto: bool,
}

impl Length {
    pub const AUTO: Length = Length { value: 0.0, is_auto: true };

    pub fn px(value: f32) -> Self {
        Self { value, is_auto: false }
    }
}

/// Four per-side values (margin, padding, border width)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn uniform(value: f32) -> Self {
        Self { top: value, right: value, bottom: value, left: value }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Display {
    None,
    #[default]
    Block,
    Inline,
    InlineBlock,
    Table,
    TableRow,
    TableCell,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Float {
    #[default]
    None,
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Clear {
    #[default]
    None,
    Left,
    Right,
    Both,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
    Dotted,
    Dashed,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Start,
    Left,
    Right,
    Center,
    Justify,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FontStyle {
    #[default]
    Normal,
    Italic,
}

/// Computed CSS styles for a logical element
#[derive(Clone, Debug, PartialEq)]
pub struct CssStyles {
    // Positioning
    pub position: Position,
    pub float: Float,
    pub clear: Clear,
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
    pub z_index: i32,

    // Box model
    pub width: Length,
    pub height: Length,
    pub min_width: Length,
    pub max_width: Length,
    pub min_height: Length,
    pub max_height: Length,
    pub margin: Edges,
    pub padding: Edges,

    // Borders
    pub border_width: Edges,
    pub border_style: BorderStyle,
    pub border_color: Color,

    // Display & visibility
    pub display: Display,
    pub visibility: bool,
    pub overflow: Overflow,

    // Text (inherited)
    pub color: Color,
    pub font_size: f32,
    pub font_weight: FontWeight,
    pub font_style: FontStyle,
    pub line_height: f32,
    pub line_height_normal: bool,
    pub text_align: TextAlign,

    pub background_color: Color,
    pub has_background: bool,
}

impl Default for CssStyles {
    fn default() -> Self {
        Self {
            position: Position::Static,
            float: Float::None,
            clear: Clear::None,
            top: Length::AUTO,
            right: Length::AUTO,
            bottom: Length::AUTO,
            left: Length::AUTO,
            z_index: 0,

            width: Length::AUTO,
            height: Length::AUTO,
            min_width: Length::px(0.0),
            max_width: Length::px(f32::INFINITY),
            min_height: Length::px(0.0),
            max_height: Length::px(f32::INFINITY),
            margin: Edges::default(),
            padding: Edges::default(),

            border_width: Edges::default(),
            border_style: BorderStyle::None,
            border_color: Color::BLACK,

            display: Display::Block,
            visibility: true,
            overflow: Overflow::Visible,

            color: Color::BLACK,
            font_size: 16.0,
            font_weight: FontWeight::Normal,
            font_style: FontStyle::Normal,
            line_height: 16.0,
            line_height_normal: true,
            text_align: TextAlign::Start,

            background_color: Color::TRANSPARENT,
            has_background: false,
        }
    }
}

impl CssStyles {
    /// Initial values for a child of `parent`: inherited properties carry over,
    /// everything else resets.
    pub fn inherit_from(parent: &CssStyles) -> Self {
        Self {
            visibility: parent.visibility,
            color: parent.color,
            font_size: parent.font_size,
            font_weight: parent.font_weight,
            font_style: parent.font_style,
            line_height: parent.line_height,
            line_height_normal: parent.line_height_normal,
            text_align: parent.text_align,
            ..Self::default()
        }
    }
}

/// Widget state table storing per-node properties in SoA format
#[derive(Default, Debug, PartialEq)]
pub struct PropertyTable {
    /// Back-reference to the view element wrapping the node
    pub elements: Vec<Option<ElementId>>,
    /// Text shown by buttons and text inputs
    pub text_content: Vec<String>,
    /// Check box state
    pub checked: Vec<bool>,
    /// Option labels of a spinner
    pub options: Vec<Vec<String>>,
    /// Initially selected option of a spinner
    pub selections: Vec<Option<usize>>,
    /// Content of inline runs
    pub runs: Vec<Option<InlineRun>>,
}

impl PropertyTable {
    /// Create a new empty property table
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize all arrays to accommodate n nodes
    pub fn resize(&mut self, n: usize) {
        self.elements.resize(n, None);
        self.text_content.resize(n, String::new());
        self.checked.resize(n, false);
        self.options.resize(n, Vec::new());
        self.selections.resize(n, None);
        self.runs.resize_with(n, || None);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, node: NodeId) -> Option<ElementId> {
        self.elements.get(node.index()).copied().flatten()
    }

    pub fn set_element(&mut self, node: NodeId, element: ElementId) {
        if let Some(slot) = self.elements.get_mut(node.index()) {
            *slot = Some(element);
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) {
        if let Some(slot) = self.text_content.get_mut(node.index()) {
            *slot = text.into();
        }
    }

    pub fn text(&self, node: NodeId) -> &str {
        self.text_content.get(node.index()).map_or("", String::as_str)
    }

    pub fn set_checked(&mut self, node: NodeId, checked: bool) {
        if let Some(slot) = self.checked.get_mut(node.index()) {
            *slot = checked;
        }
    }

    pub fn set_options(&mut self, node: NodeId, options: Vec<String>, selection: Option<usize>) {
        let idx = node.index();
        if idx < self.options.len() {
            self.options[idx] = options;
            self.selections[idx] = selection;
        }
    }

    pub fn run(&self, node: NodeId) -> Option<&InlineRun> {
        self.runs.get(node.index()).and_then(Option::as_ref)
    }

    pub fn run_mut(&mut self, node: NodeId) -> Option<&mut InlineRun> {
        self.runs.get_mut(node.index()).and_then(Option::as_mut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("ff0000"), Some(Color::new(255, 0, 0, 255)));
        assert_eq!(Color::from_hex("#00000080"), Some(Color::new(0, 0, 0, 128)));
        assert_eq!(Color::from_hex("#12"), None);
        assert_eq!(Color::from_hex("#zzz"), None);
    }

    #[test]
    fn test_inherit_from_keeps_text_properties_only() {
        let mut parent = CssStyles::default();
        parent.color = Color::new(255, 0, 0, 255);
        parent.font_size = 20.0;
        parent.margin = Edges::uniform(8.0);
        parent.has_background = true;

        let child = CssStyles::inherit_from(&parent);
        assert_eq!(child.color, parent.color);
        assert_eq!(child.font_size, 20.0);
        assert_eq!(child.margin, Edges::default());
        assert!(!child.has_background);
    }

    #[test]
    fn test_property_table_resize() {
        let mut props = PropertyTable::new();
        props.resize(2);
        props.set_text(NodeId(2), "hello");
        props.set_options(NodeId(1), vec!["a".into()], Some(0));

        assert_eq!(props.text(NodeId(2)), "hello");
        assert_eq!(props.selections[0], Some(0));
        assert!(props.run(NodeId(1)).is_none());
        assert_eq!(props.element(NodeId(1)), None);
    }
}
