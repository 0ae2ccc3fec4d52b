//! Pull-style token cursor over HTML
//!
//! [`HtmlCursor`] runs the html5ever tokenizer once over the whole input and
//! records a flat token tape of interned strings. The tape is balanced while
//! it is recorded: void elements get an end tag, a few optional end tags are
//! implied, stray end tags are dropped and everything still open at the end
//! of input is closed. Consumers can therefore rely on the XML pull contract
//! that every START_TAG has a matching END_TAG.

use std::cell::RefCell;
use std::fmt;
use std::io::Read;

use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, Tag, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use markup5ever::LocalName;
use tendril::StrTendril;
use viewtree_dom::Attributes;

use crate::error::{ParseError, Result};
use crate::string_interner::{StringId, StringPool};

/// Kind of the event the cursor is positioned on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    /// Pseudo-root state before the first advance
    StartDocument,
    StartTag,
    EndTag,
    Text,
    EndDocument,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            EventKind::StartDocument => "START_DOCUMENT",
            EventKind::StartTag => "START_TAG",
            EventKind::EndTag => "END_TAG",
            EventKind::Text => "TEXT",
            EventKind::EndDocument => "END_DOCUMENT",
        })
    }
}

/// Static content classification of a tag
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagClass {
    /// Contributes a logical grouping only, no physical node
    Logical,
    /// Content flows into an inline run
    InlineFlow,
    None,
}

/// Classification table shared by every cursor
pub fn classify(tag_name: &str) -> TagClass {
    match tag_name {
        "head" | "form" | "tbody" | "thead" | "tfoot" | "colgroup" => TagClass::Logical,
        "a" | "abbr" | "acronym" | "b" | "bdi" | "bdo" | "big" | "br" | "cite" | "code" | "del"
        | "dfn" | "em" | "font" | "i" | "ins" | "kbd" | "label" | "mark" | "q" | "s" | "samp"
        | "small" | "span" | "strike" | "strong" | "sub" | "sup" | "time" | "tt" | "u"
        | "var" => TagClass::InlineFlow,
        _ => TagClass::None,
    }
}

/// Elements that never have content; the tape closes them right away
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Open elements implicitly closed when a start tag of `name` arrives
fn implied_end_tags(name: &str) -> &'static [&'static str] {
    match name {
        "li" => &["li"],
        "option" => &["option"],
        "p" => &["p"],
        "dt" | "dd" => &["dt", "dd"],
        "tr" => &["td", "th", "tr"],
        "td" | "th" => &["td", "th"],
        _ => &[],
    }
}

/// Tokenizer state for elements whose content is not markup
fn raw_kind(name: &LocalName) -> Option<RawKind> {
    match &**name {
        "script" => Some(RawKind::ScriptData),
        "style" => Some(RawKind::Rawtext),
        "title" | "textarea" => Some(RawKind::Rcdata),
        _ => None,
    }
}

/// Pull interface the processor consumes
pub trait TokenCursor {
    /// Move to the next event. Advancing past END_DOCUMENT stays there.
    fn advance(&mut self) -> Result<EventKind>;

    fn event_kind(&self) -> EventKind;

    /// Name of the current START_TAG or END_TAG; empty otherwise
    fn tag_name(&self) -> &str;

    /// Attribute count of the current START_TAG
    fn attribute_count(&self) -> usize;

    fn attribute_name(&self, index: usize) -> &str;

    fn attribute_value_at(&self, index: usize) -> &str;

    fn attribute_value(&self, name: &str) -> Option<&str> {
        (0..self.attribute_count())
            .find(|&i| self.attribute_name(i) == name)
            .map(|i| self.attribute_value_at(i))
    }

    /// Payload of the current TEXT event; empty otherwise
    fn text(&self) -> &str;

    /// Static classification of `tag_name`, independent of the input
    fn classify(&self, tag_name: &str) -> TagClass {
        classify(tag_name)
    }

    /// Human-readable description of the current position, for errors
    fn position_description(&self) -> String;

    /// Snapshot of the current START_TAG's attributes
    fn attributes(&self) -> Attributes {
        (0..self.attribute_count())
            .map(|i| {
                (
                    self.attribute_name(i).to_string(),
                    self.attribute_value_at(i).to_string(),
                )
            })
            .collect()
    }
}

/// Cursor options
#[derive(Clone, Debug, Default)]
pub struct CursorOptions {
    /// Report tokenizer parse errors as fatal instead of logging them
    pub strict: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TapeKind {
    StartTag,
    EndTag,
    Text,
    /// Tokenizer error recorded in strict mode; `value` holds the message
    Error,
}

/// One entry of the token tape
#[derive(Clone, Copy, Debug)]
struct TapeToken {
    kind: TapeKind,
    /// Tag name
    name: StringId,
    /// Text payload or error message
    value: StringId,
    attrs_start: u32,
    attrs_len: u32,
    line: u64,
}

/// Records the balanced token tape while the tokenizer runs
struct TapeBuilder {
    tokens: Vec<TapeToken>,
    attrs: Vec<(StringId, StringId)>,
    strings: StringPool,
    /// Names of elements still open, outermost first
    open: Vec<StringId>,
    /// Character data not yet flushed into a TEXT token
    text: String,
    text_line: u64,
    strict: bool,
}

impl TapeBuilder {
    fn new(options: &CursorOptions) -> Self {
        Self {
            tokens: Vec::new(),
            attrs: Vec::new(),
            strings: StringPool::new(),
            open: Vec::new(),
            text: String::new(),
            text_line: 1,
            strict: options.strict,
        }
    }

    fn push(&mut self, kind: TapeKind, name: StringId, value: StringId, line: u64) {
        self.tokens.push(TapeToken {
            kind,
            name,
            value,
            attrs_start: 0,
            attrs_len: 0,
            line,
        });
    }

    fn flush_text(&mut self) {
        if self.text.is_empty() {
            return;
        }
        let text = std::mem::take(&mut self.text);
        let value = self.strings.intern(&text);
        self.push(TapeKind::Text, StringId::NONE, value, self.text_line);
    }

    fn characters(&mut self, text: &str, line: u64) {
        if self.text.is_empty() {
            self.text_line = line;
        }
        self.text.push_str(text);
    }

    fn close_top(&mut self, line: u64) {
        if let Some(name) = self.open.pop() {
            self.push(TapeKind::EndTag, name, StringId::NONE, line);
        }
    }

    fn start_tag(&mut self, tag: &Tag, line: u64) {
        self.flush_text();

        let implied = implied_end_tags(&tag.name);
        while let Some(&top) = self.open.last() {
            if !implied.contains(&self.strings.resolve(top)) {
                break;
            }
            self.close_top(line);
        }

        let name = self.strings.intern(&tag.name);
        let attrs_start = self.attrs.len() as u32;
        for attr in &tag.attrs {
            let attr_name = self.strings.intern(&attr.name.local);
            let attr_value = self.strings.intern(&attr.value);
            self.attrs.push((attr_name, attr_value));
        }
        self.tokens.push(TapeToken {
            kind: TapeKind::StartTag,
            name,
            value: StringId::NONE,
            attrs_start,
            attrs_len: self.attrs.len() as u32 - attrs_start,
            line,
        });

        if tag.self_closing || VOID_ELEMENTS.contains(&&*tag.name) {
            self.push(TapeKind::EndTag, name, StringId::NONE, line);
        } else {
            self.open.push(name);
        }
    }

    fn end_tag(&mut self, tag: &Tag, line: u64) {
        self.flush_text();

        let target = self.strings.get_id(&tag.name);
        let depth = target.and_then(|id| self.open.iter().rposition(|&open| open == id));
        match depth {
            Some(depth) => {
                while self.open.len() > depth {
                    self.close_top(line);
                }
            }
            None => log::warn!("line {line}: dropping stray end tag </{}>", &*tag.name),
        }
    }

    fn error(&mut self, message: &str, line: u64) {
        if self.strict {
            self.flush_text();
            let value = self.strings.intern(message);
            self.push(TapeKind::Error, StringId::NONE, value, line);
        } else {
            log::debug!("line {line}: tokenizer: {message}");
        }
    }

    fn finish(&mut self, line: u64) {
        self.flush_text();
        while !self.open.is_empty() {
            self.close_top(line);
        }
    }
}

/// Wrapper to implement the TokenSink trait over a shared builder
struct TapeSink<'a> {
    builder: &'a RefCell<TapeBuilder>,
}

impl TokenSink for TapeSink<'_> {
    type Handle = ();

    fn process_token(&self, token: Token, line_number: u64) -> TokenSinkResult<()> {
        let mut builder = self.builder.borrow_mut();
        match token {
            Token::TagToken(tag) => match tag.kind {
                TagKind::StartTag => {
                    builder.start_tag(&tag, line_number);
                    if !tag.self_closing {
                        if let Some(kind) = raw_kind(&tag.name) {
                            return TokenSinkResult::RawData(kind);
                        }
                    }
                }
                TagKind::EndTag => builder.end_tag(&tag, line_number),
            },
            Token::CharacterTokens(text) => builder.characters(&text, line_number),
            Token::ParseError(message) => builder.error(&message, line_number),
            Token::EOFToken => builder.finish(line_number),
            Token::CommentToken(_) | Token::DoctypeToken(_) | Token::NullCharacterToken => {}
        }
        TokenSinkResult::Continue
    }
}

/// Token cursor over a balanced html5ever token tape
pub struct HtmlCursor {
    tokens: Vec<TapeToken>,
    attrs: Vec<(StringId, StringId)>,
    strings: StringPool,
    /// None before the first advance
    position: Option<usize>,
}

impl HtmlCursor {
    pub fn new(html: &str) -> Self {
        Self::with_options(html, &CursorOptions::default())
    }

    pub fn with_options(html: &str, options: &CursorOptions) -> Self {
        let builder = RefCell::new(TapeBuilder::new(options));

        {
            let sink = TapeSink { builder: &builder };
            let tok = Tokenizer::new(sink, TokenizerOpts::default());
            let mut buffer = BufferQueue::default();
            buffer.push_back(StrTendril::from(html));
            let _ = tok.feed(&mut buffer);
            tok.end();
        }

        let builder = builder.into_inner();
        Self {
            tokens: builder.tokens,
            attrs: builder.attrs,
            strings: builder.strings,
            position: None,
        }
    }

    /// Read the whole markup source, then tokenize it
    pub fn from_reader<R: Read>(mut reader: R, options: &CursorOptions) -> Result<Self> {
        let mut html = String::new();
        if let Err(err) = reader.read_to_string(&mut html) {
            let position = format!("{}, byte {}", EventKind::StartDocument, html.len());
            return Err(ParseError::io(err, position));
        }
        Ok(Self::with_options(&html, options))
    }

    /// Number of events between START_DOCUMENT and END_DOCUMENT
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    fn current(&self) -> Option<&TapeToken> {
        self.position.and_then(|p| self.tokens.get(p))
    }

    fn attr(&self, index: usize) -> Option<(StringId, StringId)> {
        let token = self.current().filter(|t| t.kind == TapeKind::StartTag)?;
        if index >= token.attrs_len as usize {
            return None;
        }
        self.attrs.get(token.attrs_start as usize + index).copied()
    }
}

impl TokenCursor for HtmlCursor {
    fn advance(&mut self) -> Result<EventKind> {
        let next = self.position.map_or(0, |p| p + 1).min(self.tokens.len());
        self.position = Some(next);

        if let Some(token) = self.current().filter(|t| t.kind == TapeKind::Error) {
            return Err(ParseError::Markup {
                position: format!("line {}", token.line),
                message: self.strings.resolve(token.value).to_string(),
            });
        }
        Ok(self.event_kind())
    }

    fn event_kind(&self) -> EventKind {
        match (self.position, self.current()) {
            (None, _) => EventKind::StartDocument,
            (Some(_), None) => EventKind::EndDocument,
            (Some(_), Some(token)) => match token.kind {
                TapeKind::StartTag => EventKind::StartTag,
                TapeKind::EndTag => EventKind::EndTag,
                TapeKind::Text | TapeKind::Error => EventKind::Text,
            },
        }
    }

    fn tag_name(&self) -> &str {
        match self.current() {
            Some(token) if matches!(token.kind, TapeKind::StartTag | TapeKind::EndTag) => {
                self.strings.resolve(token.name)
            }
            _ => "",
        }
    }

    fn attribute_count(&self) -> usize {
        self.current()
            .filter(|t| t.kind == TapeKind::StartTag)
            .map_or(0, |t| t.attrs_len as usize)
    }

    fn attribute_name(&self, index: usize) -> &str {
        self.attr(index).map_or("", |(name, _)| self.strings.resolve(name))
    }

    fn attribute_value_at(&self, index: usize) -> &str {
        self.attr(index).map_or("", |(_, value)| self.strings.resolve(value))
    }

    fn text(&self) -> &str {
        match self.current() {
            Some(token) if token.kind == TapeKind::Text => self.strings.resolve(token.value),
            _ => "",
        }
    }

    fn position_description(&self) -> String {
        let kind = self.event_kind();
        match (self.current(), kind) {
            (Some(token), EventKind::StartTag) => {
                format!("line {}, {kind} <{}>", token.line, self.tag_name())
            }
            (Some(token), EventKind::EndTag) => {
                format!("line {}, {kind} </{}>", token.line, self.tag_name())
            }
            (Some(token), _) => format!("line {}, {kind}", token.line),
            (None, _) => match self.tokens.last() {
                Some(last) if kind == EventKind::EndDocument => {
                    format!("line {}, {kind}", last.line)
                }
                _ => kind.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Render every event after START_DOCUMENT in a compact form
    fn events(html: &str) -> Vec<String> {
        let mut cursor = HtmlCursor::new(html);
        let mut out = Vec::new();
        loop {
            match cursor.advance().unwrap() {
                EventKind::StartTag => out.push(format!("<{}>", cursor.tag_name())),
                EventKind::EndTag => out.push(format!("</{}>", cursor.tag_name())),
                EventKind::Text => out.push(format!("{:?}", cursor.text())),
                EventKind::EndDocument => break,
                EventKind::StartDocument => unreachable!(),
            }
        }
        out
    }

    #[test]
    fn test_basic_parsing() {
        assert_eq!(
            events("<div><p>Hello</p></div>"),
            vec!["<div>", "<p>", "\"Hello\"", "</p>", "</div>"]
        );
    }

    #[test]
    fn test_starts_before_first_event() {
        let mut cursor = HtmlCursor::new("<p>x</p>");
        assert_eq!(cursor.event_kind(), EventKind::StartDocument);
        assert_eq!(cursor.position_description(), "START_DOCUMENT");
        assert_eq!(cursor.advance().unwrap(), EventKind::StartTag);
    }

    #[test]
    fn test_attributes() {
        let mut cursor = HtmlCursor::new(r#"<div id="main" class="container">Test</div>"#);
        cursor.advance().unwrap();

        assert_eq!(cursor.attribute_count(), 2);
        assert_eq!(cursor.attribute_name(0), "id");
        assert_eq!(cursor.attribute_value_at(1), "container");
        assert_eq!(cursor.attribute_value("id"), Some("main"));
        assert_eq!(cursor.attribute_value("style"), None);

        let attrs = cursor.attributes();
        assert_eq!(attrs.get_index(0), Some((&"id".to_string(), &"main".to_string())));

        cursor.advance().unwrap();
        assert_eq!(cursor.attribute_count(), 0);
        assert_eq!(cursor.attribute_name(0), "");
    }

    #[test]
    fn test_valueless_attribute_reads_empty() {
        let mut cursor = HtmlCursor::new("<option selected>x</option>");
        cursor.advance().unwrap();
        assert_eq!(cursor.attribute_value("selected"), Some(""));
    }

    #[test]
    fn test_void_and_self_closing_get_end_tags() {
        assert_eq!(
            events("<br><img src='test.png'/><x-icon/>"),
            vec!["<br>", "</br>", "<img>", "</img>", "<x-icon>", "</x-icon>"]
        );
    }

    #[test]
    fn test_comments_and_doctype_are_skipped() {
        assert_eq!(
            events("<!DOCTYPE html><p>a<!-- note -->b</p>"),
            vec!["<p>", "\"ab\"", "</p>"]
        );
    }

    #[test]
    fn test_raw_text_content_is_one_text_event() {
        assert_eq!(
            events("<script>if (a < b) { x('<b>') }</script>"),
            vec!["<script>", "\"if (a < b) { x('<b>') }\"", "</script>"]
        );
        assert_eq!(
            events("<title>A &amp; <i>B</i></title>"),
            vec!["<title>", "\"A & <i>B</i>\"", "</title>"]
        );
    }

    #[test]
    fn test_implied_end_tags() {
        assert_eq!(
            events("<ul><li>a<li>b</ul>"),
            vec!["<ul>", "<li>", "\"a\"", "</li>", "<li>", "\"b\"", "</li>", "</ul>"]
        );
    }

    #[test]
    fn test_unbalanced_markup_is_balanced() {
        assert_eq!(
            events("</span><div><b>x</div>"),
            vec!["<div>", "<b>", "\"x\"", "</b>", "</div>"]
        );
        assert_eq!(events("<p><i>open"), vec!["<p>", "<i>", "\"open\"", "</i>", "</p>"]);
    }

    #[test]
    fn test_advance_past_end_stays_at_end() {
        let mut cursor = HtmlCursor::new("");
        assert_eq!(cursor.advance().unwrap(), EventKind::EndDocument);
        assert_eq!(cursor.advance().unwrap(), EventKind::EndDocument);
        assert_eq!(cursor.token_count(), 0);
    }

    #[test]
    fn test_position_description() {
        let mut cursor = HtmlCursor::new("<div>\n<p>x</p></div>");
        cursor.advance().unwrap();
        assert_eq!(cursor.position_description(), "line 1, START_TAG <div>");
        cursor.advance().unwrap();
        cursor.advance().unwrap();
        assert_eq!(cursor.position_description(), "line 2, START_TAG <p>");
        while cursor.advance().unwrap() != EventKind::EndDocument {}
        assert!(cursor.position_description().ends_with("END_DOCUMENT"));
    }

    #[test]
    fn test_strict_mode_reports_tokenizer_errors() {
        let options = CursorOptions { strict: true };
        let mut cursor = HtmlCursor::with_options("<p>ok</p><div class=\"a\"b>x</div>", &options);
        let mut result = Ok(EventKind::StartDocument);
        for _ in 0..16 {
            result = cursor.advance();
            if result.is_err() {
                break;
            }
        }
        assert!(matches!(result, Err(ParseError::Markup { .. })));

        let mut lenient = HtmlCursor::new("<div class=\"a\"b>x</div>");
        assert_eq!(lenient.advance().unwrap(), EventKind::StartTag);
    }

    #[test]
    fn test_from_reader() {
        let source = std::io::Cursor::new("<b>hi</b>".as_bytes());
        let mut cursor = HtmlCursor::from_reader(source, &CursorOptions::default()).unwrap();
        cursor.advance().unwrap();
        assert_eq!(cursor.tag_name(), "b");
    }

    #[test]
    fn test_from_reader_io_error_has_position() {
        struct FailingReader;

        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed"))
            }
        }

        match HtmlCursor::from_reader(FailingReader, &CursorOptions::default()) {
            Err(ParseError::Io { position, source }) => {
                assert_eq!(position, format!("{}, byte 0", EventKind::StartDocument));
                assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe);
            }
            _ => panic!("expected an IO error"),
        }
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify("form"), TagClass::Logical);
        assert_eq!(classify("span"), TagClass::InlineFlow);
        assert_eq!(classify("br"), TagClass::InlineFlow);
        assert_eq!(classify("img"), TagClass::None);
        assert_eq!(classify("div"), TagClass::None);

        let cursor = HtmlCursor::new("");
        assert_eq!(cursor.classify("b"), TagClass::InlineFlow);
    }
}
