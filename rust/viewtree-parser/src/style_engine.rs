//! Style cascade over the logical tree
//!
//! [`StyleSheet`] collects rules from `<style>` blocks (and anything else fed
//! to [`StyleEngine::ingest`]) and computes a [`CssStyles`] for every element
//! of a subtree once parsing has finished.

use cssparser::{Parser, ParserInput, Token as CssToken};
use url::Url;
use viewtree_dom::{CssStyles, ElementId, LogicalElement, LogicalTree};

use crate::css_parser::{apply_declarations, parse_declarations, parse_stylesheet, Declaration};

/// Style collaborator of the processor
pub trait StyleEngine {
    /// Add the rules of a style sheet. `base` is the location relative
    /// references in the sheet resolve against.
    fn ingest(&mut self, text: &str, base: Option<&Url>);

    /// Compute and store styles for `element` and its descendants
    fn apply(&self, tree: &mut LogicalTree, element: ElementId, inherited: Option<&CssStyles>);
}

/// (id selectors, class selectors, type selectors)
pub type Specificity = (u32, u32, u32);

/// One element test: `tag.class#id`, or `*`
#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    universal: bool,
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none() && self.id.is_none() && self.classes.is_empty() && !self.universal
    }

    fn matches(&self, element: &LogicalElement) -> bool {
        self.tag
            .as_ref()
            .map_or(true, |tag| element.name.eq_ignore_ascii_case(tag))
            && self
                .id
                .as_ref()
                .map_or(true, |id| element.attribute("id") == Some(id.as_str()))
            && self
                .classes
                .iter()
                .all(|class| element.classes().any(|c| c == class))
    }
}

/// Compounds joined by descendant combinators; the last one is the subject
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selector {
    compounds: Vec<Compound>,
}

impl Selector {
    pub fn specificity(&self) -> Specificity {
        self.compounds.iter().fold((0, 0, 0), |(ids, classes, tags), c| {
            (
                ids + c.id.is_some() as u32,
                classes + c.classes.len() as u32,
                tags + c.tag.is_some() as u32,
            )
        })
    }

    pub fn matches(&self, tree: &LogicalTree, id: ElementId) -> bool {
        let Some((subject, ancestors)) = self.compounds.split_last() else {
            return false;
        };
        let Some(element) = tree.get(id) else {
            return false;
        };
        if !subject.matches(element) {
            return false;
        }

        let mut parent = element.parent;
        for compound in ancestors.iter().rev() {
            loop {
                let Some(ancestor) = parent.and_then(|p| tree.get(p)) else {
                    return false;
                };
                parent = ancestor.parent;
                if compound.matches(ancestor) {
                    break;
                }
            }
        }
        true
    }
}

/// Parse a comma-separated selector list. Selectors using unsupported
/// syntax (attributes, pseudo-classes, other combinators) are dropped.
pub fn parse_selector_list(text: &str) -> Vec<Selector> {
    let mut input = ParserInput::new(text);
    let mut parser = Parser::new(&mut input);

    let mut selectors = Vec::new();
    let mut compounds = Vec::new();
    let mut compound = Compound::default();
    let mut expect_class = false;
    let mut valid = true;

    let mut finish = |compounds: &mut Vec<Compound>, compound: &mut Compound, valid: &mut bool| {
        if !compound.is_empty() {
            compounds.push(std::mem::take(compound));
        }
        if *valid && !compounds.is_empty() {
            selectors.push(Selector {
                compounds: std::mem::take(compounds),
            });
        } else if !*valid {
            log::debug!("dropping unsupported selector in {text:?}");
        }
        compounds.clear();
        *valid = true;
    };

    while let Ok(token) = parser.next_including_whitespace() {
        match token {
            CssToken::Ident(name) if expect_class => {
                compound.classes.push(name.to_string());
                expect_class = false;
            }
            CssToken::Ident(name) if compound.is_empty() => {
                compound.tag = Some(name.to_ascii_lowercase());
            }
            CssToken::Delim('.') if !expect_class => expect_class = true,
            CssToken::Delim('*') if compound.is_empty() => compound.universal = true,
            CssToken::IDHash(id) | CssToken::Hash(id) if !expect_class => {
                compound.id = Some(id.to_string());
            }
            CssToken::WhiteSpace(_) if !expect_class => {
                if !compound.is_empty() {
                    compounds.push(std::mem::take(&mut compound));
                }
            }
            CssToken::Comma => {
                valid &= !expect_class;
                expect_class = false;
                finish(&mut compounds, &mut compound, &mut valid);
            }
            _ => valid = false,
        }
    }
    valid &= !expect_class;
    finish(&mut compounds, &mut compound, &mut valid);

    selectors
}

/// A selector with its declarations, in cascade position
#[derive(Clone, Debug)]
pub struct StyleRule {
    pub selector: Selector,
    pub declarations: Vec<Declaration>,
    pub specificity: Specificity,
    /// Source order across every ingested sheet
    pub order: usize,
    /// Location of the sheet the rule came from
    pub base: Option<Url>,
}

/// Default [`StyleEngine`]
#[derive(Clone, Debug, Default)]
pub struct StyleSheet {
    rules: Vec<StyleRule>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Styles for one element, given the styles of its parent
    pub fn compute(
        &self,
        tree: &LogicalTree,
        element: ElementId,
        inherited: Option<&CssStyles>,
    ) -> CssStyles {
        let mut styles = inherited.map(CssStyles::inherit_from).unwrap_or_default();

        let mut matching: Vec<&StyleRule> = self
            .rules
            .iter()
            .filter(|rule| rule.selector.matches(tree, element))
            .collect();
        matching.sort_by_key(|rule| (rule.specificity, rule.order));
        for rule in matching {
            apply_declarations(&mut styles, &rule.declarations);
        }

        if let Some(inline) = tree.get(element).and_then(|e| e.attribute("style")) {
            apply_declarations(&mut styles, &parse_declarations(inline));
        }
        styles
    }
}

impl StyleEngine for StyleSheet {
    fn ingest(&mut self, text: &str, base: Option<&Url>) {
        for rule in parse_stylesheet(text) {
            for selector in parse_selector_list(&rule.selector) {
                let order = self.rules.len();
                self.rules.push(StyleRule {
                    specificity: selector.specificity(),
                    selector,
                    declarations: rule.declarations.clone(),
                    order,
                    base: base.cloned(),
                });
            }
        }
        log::debug!("style sheet holds {} rules", self.rules.len());
    }

    fn apply(&self, tree: &mut LogicalTree, element: ElementId, inherited: Option<&CssStyles>) {
        let styles = self.compute(tree, element, inherited);
        let children = tree.children(element).to_vec();
        for child in children {
            self.apply(tree, child, Some(&styles));
        }
        if let Some(target) = tree.get_mut(element) {
            target.style = Some(styles);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use viewtree_dom::{Attributes, Color, FontWeight, NodeId};

    fn attrs(pairs: &[(&str, &str)]) -> Attributes {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// body > div#main.box > span.note
    fn sample_tree() -> (LogicalTree, ElementId, ElementId, ElementId) {
        let mut tree = LogicalTree::new();
        let body = tree.create_view("body", Attributes::new(), NodeId(2));
        let div = tree.create_view("div", attrs(&[("id", "main"), ("class", "box wide")]), NodeId(3));
        let span = tree.create_text("span", NodeId(4));
        tree.set_attribute(span, "class", "note");
        tree.append_child(body, div);
        tree.append_child(div, span);
        (tree, body, div, span)
    }

    #[test]
    fn test_parse_selector_list() {
        let selectors = parse_selector_list("div.box , #main,*, body span.note");
        assert_eq!(selectors.len(), 4);
        assert_eq!(selectors[0].specificity(), (0, 1, 1));
        assert_eq!(selectors[1].specificity(), (1, 0, 0));
        assert_eq!(selectors[2].specificity(), (0, 0, 0));
        assert_eq!(selectors[3].specificity(), (0, 1, 2));
    }

    #[test]
    fn test_unsupported_selectors_are_dropped() {
        let selectors = parse_selector_list("a:hover, div > p, input[type], p");
        assert_eq!(selectors.len(), 1);
        assert!(parse_selector_list("p.").is_empty());
    }

    #[test]
    fn test_selector_matching() {
        let (tree, body, div, span) = sample_tree();
        let matches = |text: &str, id| parse_selector_list(text)[0].matches(&tree, id);

        assert!(matches("div", div));
        assert!(matches(".box.wide", div));
        assert!(matches("#main", div));
        assert!(!matches("#other", div));
        assert!(matches("body .note", span));
        assert!(matches("body div span", span));
        assert!(!matches("span div", span));
        assert!(matches("*", body));
    }

    #[test]
    fn test_cascade_order() {
        let (mut tree, body, div, span) = sample_tree();
        let mut sheet = StyleSheet::new();
        sheet.ingest(
            "#main { color: blue } div { color: red; font-weight: bold } .note { color: green }",
            None,
        );
        sheet.ingest("div { color: black }", None);
        assert_eq!(sheet.len(), 4);

        sheet.apply(&mut tree, body, None);

        let div_style = tree.get(div).unwrap().style.clone().unwrap();
        // The id rule outranks both type rules despite coming first
        assert_eq!(div_style.color, Color::new(0, 0, 0xff, 0xff));
        assert_eq!(div_style.font_weight, FontWeight::Bold);

        let span_style = tree.get(span).unwrap().style.clone().unwrap();
        assert_eq!(span_style.color, Color::new(0, 0x80, 0, 0xff));
        // Inherited from the div
        assert_eq!(span_style.font_weight, FontWeight::Bold);
        assert!(tree.get(body).unwrap().style.is_some());
    }

    #[test]
    fn test_style_attribute_wins() {
        let (mut tree, body, div, _) = sample_tree();
        tree.set_attribute(div, "style", "color: white");
        let mut sheet = StyleSheet::new();
        sheet.ingest("#main { color: blue }", None);
        sheet.apply(&mut tree, body, None);
        assert_eq!(tree.get(div).unwrap().style.as_ref().unwrap().color, Color::WHITE);
    }

    #[test]
    fn test_rules_record_base() {
        let base = Url::parse("https://example.com/css/site.css").unwrap();
        let mut sheet = StyleSheet::new();
        sheet.ingest("p, b { color: red }", Some(&base));
        assert_eq!(sheet.rules().len(), 2);
        assert_eq!(sheet.rules()[1].base.as_ref(), Some(&base));
        assert_eq!(sheet.rules()[1].order, 1);
    }
}
