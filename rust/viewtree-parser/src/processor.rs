//! Markup to view tree processor
//!
//! [`HtmlProcessor`] walks a [`TokenCursor`] once, front to back, and builds
//! the physical widget tree and the logical element tree side by side.
//!
//! Block tags become widget nodes. Inline tags are laid out into inline runs:
//! consecutive inline content of one container shares a run. When a block tag
//! shows up inside an open inline element, the run is sealed and the element
//! stays on the container's open stack; the next inline content of that
//! container reopens the stacked elements in a fresh run and continues inside
//! them, so the element still ends only at its own end tag.
//!
//! Every routine documents where the cursor must be on entry and on return.
//! Nesting is bounded by [`ParseOptions::max_depth`]; deeper markup fails the
//! parse with [`ParseError::TooDeep`].

use url::Url;
use viewtree_dom::{
    contains_text, Document, DocumentHandle, ElementId, InlineRun, NodeId, NodeKind,
};

use crate::context::{PageContext, ParseOptions};
use crate::cursor::{EventKind, HtmlCursor, TagClass, TokenCursor};
use crate::error::{ParseError, Result};
use crate::factory::{NodeFactory, WidgetFactory};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpaqueKind {
    Script,
    Title,
    Style,
}

/// How the container dispatcher handles a start tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TagRole {
    /// Document wrapper; content belongs to the enclosing containers
    Transparent,
    /// References a resource, has no content and no node
    Resource,
    /// Content is flattened to text and never becomes nodes
    Opaque(OpaqueKind),
    Logical,
    Inline,
    Block,
}

impl TagRole {
    fn of(tag_name: &str, class: TagClass) -> Self {
        match tag_name {
            "html" => TagRole::Transparent,
            "link" | "meta" | "base" => TagRole::Resource,
            "script" => TagRole::Opaque(OpaqueKind::Script),
            "title" => TagRole::Opaque(OpaqueKind::Title),
            "style" => TagRole::Opaque(OpaqueKind::Style),
            _ if is_inline(tag_name, class) => TagRole::Inline,
            _ if class == TagClass::Logical => TagRole::Logical,
            _ => TagRole::Block,
        }
    }
}

/// Inline-flow tags plus the `img` leaf
fn is_inline(tag_name: &str, class: TagClass) -> bool {
    class == TagClass::InlineFlow || tag_name == "img"
}

/// How an inline element's content loop ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InlineOutcome {
    /// Own end tag consumed, element popped from the open stack
    Closed,
    /// Stopped on a block tag; the element stays on the open stack
    Interrupted,
}

/// Builds documents from token cursors. Holds no per-parse state, so one
/// instance can serve any number of sequential parses.
pub struct HtmlProcessor {
    factory: Box<dyn NodeFactory>,
    options: ParseOptions,
}

impl Default for HtmlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl HtmlProcessor {
    pub fn new() -> Self {
        Self {
            factory: Box::new(WidgetFactory),
            options: ParseOptions::default(),
        }
    }

    pub fn with_factory(mut self, factory: impl NodeFactory + 'static) -> Self {
        self.factory = Box::new(factory);
        self
    }

    pub fn with_options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Parse a whole document. The cursor must not have been advanced yet.
    pub fn parse<C: TokenCursor>(&self, cursor: &mut C, page: &mut PageContext) -> Result<Document> {
        let mut ctx = ParseContext::new(cursor, page, self.factory.as_ref(), self.options.max_depth);
        ctx.parse_document()?;

        let ParseContext {
            mut document, page, ..
        } = ctx;

        if self.options.apply_styles {
            let roots: Vec<ElementId> = document.logical.roots().collect();
            for root in roots {
                page.style_engine().apply(&mut document.logical, root, None);
            }
        }

        log::debug!(
            "document {}: {} nodes, {} elements",
            document.handle.0,
            document.physical.len(),
            document.logical.len()
        );
        Ok(document)
    }

    /// Tokenize `html` with a default [`HtmlCursor`] and parse it
    pub fn parse_str(&self, html: &str, page: &mut PageContext) -> Result<Document> {
        let mut cursor = HtmlCursor::new(html);
        self.parse(&mut cursor, page)
    }
}

/// State of one parse call
struct ParseContext<'a, C: TokenCursor> {
    cursor: &'a mut C,
    page: &'a mut PageContext,
    factory: &'a dyn NodeFactory,
    document: Document,
    /// Starts as the page base URL; `<base href>` replaces it
    base: Option<Url>,
    /// Containers, inline elements and flattened tags currently entered
    depth: usize,
    max_depth: usize,
}

impl<'a, C: TokenCursor> ParseContext<'a, C> {
    fn new(
        cursor: &'a mut C,
        page: &'a mut PageContext,
        factory: &'a dyn NodeFactory,
        max_depth: usize,
    ) -> Self {
        let base = page.base_url().cloned();
        Self {
            cursor,
            page,
            factory,
            document: Document::new(DocumentHandle::next()),
            base,
            depth: 0,
            max_depth,
        }
    }

    /// Enter one nesting level. A failed routine leaves the depth raised;
    /// the context is dropped with the failed parse.
    fn descend(&mut self) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(ParseError::TooDeep {
                limit: self.max_depth,
                position: self.cursor.position_description(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn unexpected(&self, expected: &'static str) -> ParseError {
        ParseError::unexpected(
            expected,
            self.cursor.event_kind(),
            self.cursor.position_description(),
        )
    }

    /// Pre: START_DOCUMENT. Post: END_DOCUMENT.
    fn parse_document(&mut self) -> Result<()> {
        if self.cursor.event_kind() != EventKind::StartDocument {
            return Err(self.unexpected("start of document"));
        }
        self.cursor.advance()?;

        let root = self.document.physical.root();
        self.parse_container_content(root, None)?;

        if self.cursor.event_kind() != EventKind::EndDocument {
            return Err(self.unexpected("end of document"));
        }
        Ok(())
    }

    /// Pre: on the first child event, or already on the closing event.
    /// Post: on the container's end tag, or END_DOCUMENT.
    fn parse_container_content(&mut self, physical: NodeId, logical: Option<ElementId>) -> Result<()> {
        self.descend()?;
        let mut pending: Option<NodeId> = None;
        let mut open: Vec<ElementId> = Vec::new();

        loop {
            match self.cursor.event_kind() {
                EventKind::EndDocument => break,
                EventKind::EndTag => {
                    // An interrupted element ending right after block content
                    if !self.closes_innermost(&open) {
                        break;
                    }
                    open.pop();
                    self.cursor.advance()?;
                }
                EventKind::StartTag => {
                    self.parse_child_tag(physical, logical, &mut pending, &mut open)?;
                }
                EventKind::Text => {
                    let has_parent = logical.is_some() || !open.is_empty();
                    if has_parent && contains_text(self.cursor.text()) {
                        let run = self.pending_run(physical, &mut pending);
                        if open.is_empty() {
                            self.append_text(run, None);
                            self.cursor.advance()?;
                        } else {
                            self.resume_or_start(run, logical, &mut open)?;
                        }
                    } else {
                        self.cursor.advance()?;
                    }
                }
                EventKind::StartDocument => return Err(self.unexpected("container content")),
            }
        }

        if !open.is_empty() {
            log::debug!(
                "{} inline elements still open at {}",
                open.len(),
                self.cursor.position_description()
            );
        }
        self.ascend();
        Ok(())
    }

    fn closes_innermost(&self, open: &[ElementId]) -> bool {
        open.last()
            .and_then(|&id| self.document.logical.get(id))
            .map_or(false, |element| element.name == self.cursor.tag_name())
    }

    /// Pre: on a START_TAG inside a container. Post: behind the element, or
    /// on the interrupting tag when inline content was cut short.
    fn parse_child_tag(
        &mut self,
        physical: NodeId,
        logical: Option<ElementId>,
        pending: &mut Option<NodeId>,
        open: &mut Vec<ElementId>,
    ) -> Result<()> {
        let name = self.cursor.tag_name().to_string();

        match TagRole::of(&name, self.cursor.classify(&name)) {
            TagRole::Transparent => {
                self.cursor.advance()?;
                self.parse_container_content(physical, logical)?;
                self.expect_end_tag()
            }
            TagRole::Resource => {
                self.reference_resource(&name);
                self.cursor.advance()?;
                self.accumulate_text()?;
                self.expect_end_tag()
            }
            TagRole::Opaque(kind) => {
                self.cursor.advance()?;
                let text = self.accumulate_text()?;
                if kind == OpaqueKind::Style {
                    self.page.style_engine_mut().ingest(&text, self.base.as_ref());
                } else {
                    log::debug!("discarding <{name}> content ({} bytes)", text.len());
                }
                self.expect_end_tag()
            }
            TagRole::Logical => {
                let element = self
                    .document
                    .logical
                    .create_virtual(&name, self.cursor.attributes());
                if let Some(parent) = logical {
                    self.document.logical.append_child(parent, element);
                }
                self.cursor.advance()?;
                self.parse_container_content(physical, Some(element))?;
                self.expect_end_tag()
            }
            TagRole::Inline => {
                let run = self.pending_run(physical, pending);
                self.resume_or_start(run, logical, open)
            }
            TagRole::Block => {
                *pending = None;
                self.parse_block(&name, physical, logical)
            }
        }
    }

    /// Handle `link`, `base` and `meta` while the cursor is on the tag
    fn reference_resource(&mut self, tag_name: &str) {
        match tag_name {
            "link" => {
                let is_style_sheet = self.cursor.attribute_value("rel").map_or(false, |rel| {
                    rel.split_whitespace()
                        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
                });
                let Some(href) = self.cursor.attribute_value("href").filter(|_| is_style_sheet)
                else {
                    return;
                };
                match PageContext::resolve(self.base.as_ref(), href) {
                    Ok(location) => {
                        log::debug!("requesting style sheet {location}");
                        self.page
                            .requester()
                            .request_style_sheet(self.document.handle, location);
                    }
                    Err(err) => log::error!("Error resolving stylesheet URL {href}: {err}"),
                }
            }
            "base" => {
                let Some(href) = self.cursor.attribute_value("href") else {
                    return;
                };
                match PageContext::resolve(self.base.as_ref(), href) {
                    Ok(base) => self.base = Some(base),
                    Err(err) => log::error!("Error resolving base URL {href}: {err}"),
                }
            }
            _ => {}
        }
    }

    /// Pre: on the block's START_TAG. Post: behind its end tag.
    fn parse_block(&mut self, name: &str, physical: NodeId, logical: Option<ElementId>) -> Result<()> {
        let attributes = self.cursor.attributes();
        let widget = self.factory.create_node(name, &attributes);

        let node = self.document.physical.append(physical, widget.kind);
        let props = self.document.physical.props_mut();
        if let Some(text) = widget.text {
            props.set_text(node, text);
        }
        props.set_checked(node, widget.checked);

        let element = self.document.logical.create_view(name, attributes, node);
        self.document.physical.props_mut().set_element(node, element);
        if let Some(parent) = logical {
            self.document.logical.append_child(parent, element);
        }
        self.cursor.advance()?;

        if widget.kind.is_container() {
            self.parse_container_content(node, Some(element))?;
        } else if widget.kind == NodeKind::Spinner {
            let (options, selection) = self.collect_options()?;
            self.document
                .physical
                .props_mut()
                .set_options(node, options, selection);
        } else {
            let content = self.accumulate_text()?;
            if widget.kind == NodeKind::TextArea {
                self.document.physical.props_mut().set_text(node, content);
            } else if contains_text(&content) {
                log::debug!("discarding content of <{name}>: {content:?}");
            }
        }
        self.expect_end_tag()
    }

    /// Pre: behind the container's START_TAG. Post: on its end tag.
    ///
    /// Returns the `option` labels in order and the index of the last one
    /// marked `selected`.
    fn collect_options(&mut self) -> Result<(Vec<String>, Option<usize>)> {
        let mut options = Vec::new();
        let mut selection = None;

        loop {
            match self.cursor.event_kind() {
                EventKind::EndTag => return Ok((options, selection)),
                EventKind::StartTag => {
                    let is_option = self.cursor.tag_name() == "option";
                    let selected = self.cursor.attribute_value("selected").is_some();
                    self.cursor.advance()?;
                    let content = self.accumulate_text()?;
                    self.cursor.advance()?;

                    if is_option {
                        options.push(InlineRun::new().append_normalized(&content));
                        if selected {
                            selection = Some(options.len() - 1);
                        }
                    }
                }
                EventKind::Text => {
                    self.cursor.advance()?;
                }
                _ => return Err(self.unexpected("option or end tag")),
            }
        }
    }

    /// Pre: behind an element's START_TAG. Post: on its end tag.
    ///
    /// Concatenates all text inside, walking through nested tags.
    fn accumulate_text(&mut self) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.cursor.event_kind() {
                EventKind::EndTag => return Ok(text),
                EventKind::Text => {
                    text.push_str(self.cursor.text());
                    self.cursor.advance()?;
                }
                EventKind::StartTag => {
                    self.descend()?;
                    self.cursor.advance()?;
                    text.push_str(&self.accumulate_text()?);
                    self.cursor.advance()?;
                    self.ascend();
                }
                _ => return Err(self.unexpected("text or tag")),
            }
        }
    }

    /// Pre: on an END_TAG. Post: behind it.
    fn expect_end_tag(&mut self) -> Result<()> {
        if self.cursor.event_kind() != EventKind::EndTag {
            return Err(self.unexpected("end tag"));
        }
        self.cursor.advance()?;
        Ok(())
    }

    fn pending_run(&mut self, physical: NodeId, pending: &mut Option<NodeId>) -> NodeId {
        *pending.get_or_insert_with(|| self.document.physical.append(physical, NodeKind::TextRun))
    }

    /// Append the current TEXT payload to `run`, and to `element` if given
    fn append_text(&mut self, run: NodeId, element: Option<ElementId>) {
        let added = match self.document.physical.run_mut(run) {
            Some(inline) => inline.append_normalized(self.cursor.text()),
            None => return,
        };
        if let Some(element) = element {
            self.document.logical.append_text(element, added);
        }
    }

    /// End the current segment of `element` in `run`
    fn seal(&mut self, run: NodeId, element: ElementId) {
        if let Some(inline) = self.document.physical.run_mut(run) {
            inline.close_span(element);
        }
    }

    /// Pre: on TEXT or an inline START_TAG. Post: behind the inline content,
    /// or on the block tag that interrupted it.
    ///
    /// With open elements from an earlier interruption, they are reopened in
    /// `run` and their content continues innermost first.
    fn resume_or_start(
        &mut self,
        run: NodeId,
        logical: Option<ElementId>,
        open: &mut Vec<ElementId>,
    ) -> Result<()> {
        if !open.is_empty() {
            for &element in open.iter() {
                self.document.logical.note_run(element, run);
                if let Some(inline) = self.document.physical.run_mut(run) {
                    inline.open_span(element);
                }
            }
            return self.resume_open_elements(run, open);
        }

        match self.cursor.event_kind() {
            EventKind::Text => {
                self.append_text(run, None);
                self.cursor.advance()?;
                Ok(())
            }
            EventKind::StartTag => {
                let element = self.document.logical.create_text(self.cursor.tag_name(), run);
                if let Some(parent) = logical {
                    self.document.logical.append_child(parent, element);
                }
                self.build_inline_subtree(run, element, open)?;
                Ok(())
            }
            _ => Err(self.unexpected("text or inline tag")),
        }
    }

    /// Continue the open elements from the innermost outwards until the
    /// stack is empty or a block tag interrupts again.
    fn resume_open_elements(&mut self, run: NodeId, open: &mut Vec<ElementId>) -> Result<()> {
        while !open.is_empty() {
            if self.continue_inline(run, open)? == InlineOutcome::Interrupted {
                break;
            }
        }
        Ok(())
    }

    /// Pre: on `element`'s START_TAG. Post: behind its end tag when
    /// [`InlineOutcome::Closed`], on the interrupting tag otherwise.
    fn build_inline_subtree(
        &mut self,
        run: NodeId,
        element: ElementId,
        open: &mut Vec<ElementId>,
    ) -> Result<InlineOutcome> {
        self.descend()?;
        open.push(element);
        for index in 0..self.cursor.attribute_count() {
            self.document.logical.set_attribute(
                element,
                self.cursor.attribute_name(index),
                self.cursor.attribute_value_at(index),
            );
        }

        let line_break = self.cursor.tag_name() == "br";
        if let Some(inline) = self.document.physical.run_mut(run) {
            inline.open_span(element);
            if line_break {
                inline.append_line_break();
            }
        }
        if line_break {
            self.document.logical.append_text(element, "\n".to_string());
        }

        self.cursor.advance()?;
        let outcome = self.continue_inline(run, open)?;
        self.ascend();
        Ok(outcome)
    }

    /// Content loop of the innermost open element.
    ///
    /// Pre: inside that element. Post: as for [`Self::build_inline_subtree`].
    fn continue_inline(&mut self, run: NodeId, open: &mut Vec<ElementId>) -> Result<InlineOutcome> {
        let Some(&element) = open.last() else {
            return Ok(InlineOutcome::Closed);
        };

        loop {
            match self.cursor.event_kind() {
                EventKind::Text => {
                    self.append_text(run, Some(element));
                    self.cursor.advance()?;
                }
                EventKind::StartTag => {
                    let name = self.cursor.tag_name().to_string();
                    if !is_inline(&name, self.cursor.classify(&name)) {
                        self.seal(run, element);
                        return Ok(InlineOutcome::Interrupted);
                    }
                    let child = self.document.logical.create_text(&name, run);
                    self.document.logical.append_child(element, child);
                    if self.build_inline_subtree(run, child, open)? == InlineOutcome::Interrupted {
                        self.seal(run, element);
                        return Ok(InlineOutcome::Interrupted);
                    }
                }
                EventKind::EndTag => {
                    self.seal(run, element);
                    open.pop();
                    self.cursor.advance()?;
                    return Ok(InlineOutcome::Closed);
                }
                _ => return Err(self.unexpected("inline content")),
            }
        }
    }
}
