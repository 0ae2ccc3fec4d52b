//! Physical node creation
//!
//! The processor asks a [`NodeFactory`] which widget a block tag becomes.
//! Factories only describe the widget; the processor attaches it to the tree.

use viewtree_dom::{Attributes, NodeKind};

/// Widget description returned by a factory
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Widget {
    pub kind: NodeKind,
    /// Initial text, e.g. a button label or field value
    pub text: Option<String>,
    pub checked: bool,
}

impl Widget {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            text: None,
            checked: false,
        }
    }

    pub fn with_text(mut self, text: Option<&str>) -> Self {
        self.text = text.map(str::to_string);
        self
    }
}

/// Maps a block tag and its attributes to a widget. Must be deterministic.
pub trait NodeFactory {
    fn create_node(&self, tag_name: &str, attributes: &Attributes) -> Widget;
}

/// Form-control aware default factory
#[derive(Clone, Copy, Debug, Default)]
pub struct WidgetFactory;

impl NodeFactory for WidgetFactory {
    fn create_node(&self, tag_name: &str, attributes: &Attributes) -> Widget {
        let attribute = |name: &str| attributes.get(name).map(String::as_str);

        match tag_name {
            "input" => {
                let input_type = attribute("type").unwrap_or("text").to_ascii_lowercase();
                let mut widget = match input_type.as_str() {
                    "button" | "submit" | "reset" => Widget::new(NodeKind::Button),
                    "checkbox" => Widget::new(NodeKind::CheckBox),
                    _ => Widget::new(NodeKind::TextField),
                };
                widget.checked =
                    widget.kind == NodeKind::CheckBox && attribute("checked").is_some();
                widget.with_text(attribute("value"))
            }
            "textarea" => Widget::new(NodeKind::TextArea),
            "select" => Widget::new(NodeKind::Spinner),
            _ => Widget::new(NodeKind::Layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_input_types() {
        let factory = WidgetFactory;
        for (input_type, kind) in [
            ("submit", NodeKind::Button),
            ("RESET", NodeKind::Button),
            ("checkbox", NodeKind::CheckBox),
            ("password", NodeKind::TextField),
        ] {
            let widget = factory.create_node("input", &attrs(&[("type", input_type)]));
            assert_eq!(widget.kind, kind, "type={input_type}");
        }
        assert_eq!(
            factory.create_node("input", &Attributes::new()).kind,
            NodeKind::TextField
        );
    }

    #[test]
    fn test_input_value_and_checked() {
        let factory = WidgetFactory;
        let button = factory.create_node("input", &attrs(&[("type", "button"), ("value", "Go")]));
        assert_eq!(button.text.as_deref(), Some("Go"));

        let checkbox = factory.create_node("input", &attrs(&[("type", "checkbox"), ("checked", "")]));
        assert!(checkbox.checked);

        let field = factory.create_node("input", &attrs(&[("checked", "")]));
        assert!(!field.checked);
        assert_eq!(field.text, None);
    }

    #[test]
    fn test_other_tags() {
        let factory = WidgetFactory;
        let none = Attributes::new();
        assert_eq!(factory.create_node("textarea", &none).kind, NodeKind::TextArea);
        assert_eq!(factory.create_node("select", &none).kind, NodeKind::Spinner);
        assert_eq!(factory.create_node("button", &none).kind, NodeKind::Layout);
        assert_eq!(factory.create_node("div", &none), Widget::new(NodeKind::Layout));
    }
}
