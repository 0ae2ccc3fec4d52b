//! Inline runs
//!
//! An inline run is the content of a `TextRun` node: one contiguous piece of
//! normalized text plus the spans of the text elements laid over it.

use crate::logical::ElementId;

/// Characters the markup treats as insignificant whitespace (anything up to
/// and including the space character).
pub fn is_insignificant(c: char) -> bool {
    c <= ' '
}

/// Whether `text` holds anything besides insignificant whitespace
pub fn contains_text(text: &str) -> bool {
    text.chars().any(|c| !is_insignificant(c))
}

/// Byte range of one text element segment inside a run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextSpan {
    pub element: ElementId,
    pub start: usize,
    /// `None` while the element is still open in this run
    pub end: Option<usize>,
}

impl TextSpan {
    pub fn is_sealed(&self) -> bool {
        self.end.is_some()
    }
}

/// Text content of a `TextRun` node
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InlineRun {
    text: String,
    /// A collapsed whitespace run waiting for the next visible character
    pending_space: bool,
    spans: Vec<TextSpan>,
}

impl InlineRun {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn spans(&self) -> &[TextSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.spans.is_empty()
    }

    /// Append `text` with whitespace runs collapsed to one space. Leading
    /// whitespace at the start of the run or after a line break is dropped,
    /// trailing whitespace is held back until visible text follows.
    ///
    /// Returns the fragment that was actually added to the run.
    pub fn append_normalized(&mut self, text: &str) -> String {
        let mut added = String::new();
        for c in text.chars() {
            if is_insignificant(c) {
                if !self.text.is_empty() && !self.text.ends_with('\n') {
                    self.pending_space = true;
                }
                continue;
            }
            if self.pending_space {
                self.text.push(' ');
                added.push(' ');
                self.pending_space = false;
            }
            self.text.push(c);
            added.push(c);
        }
        added
    }

    pub fn append_line_break(&mut self) {
        self.pending_space = false;
        self.text.push('\n');
    }

    /// Start a new segment for `element` at the current end of the text
    pub fn open_span(&mut self, element: ElementId) {
        self.spans.push(TextSpan {
            element,
            start: self.text.len(),
            end: None,
        });
    }

    /// Seal the most recent open segment of `element`. Returns false if the
    /// element has no open segment in this run.
    pub fn close_span(&mut self, element: ElementId) -> bool {
        let end = self.text.len();
        match self
            .spans
            .iter_mut()
            .rev()
            .find(|span| span.element == element && !span.is_sealed())
        {
            Some(span) => {
                span.end = Some(end);
                true
            }
            None => false,
        }
    }

    /// Segments of `element` in this run, in text order
    pub fn spans_of(&self, element: ElementId) -> impl Iterator<Item = &TextSpan> + '_ {
        self.spans.iter().filter(move |span| span.element == element)
    }

    /// Text covered by a sealed span
    pub fn span_text(&self, span: &TextSpan) -> &str {
        let end = span.end.unwrap_or(self.text.len());
        self.text.get(span.start..end).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_text() {
        assert!(!contains_text(""));
        assert!(!contains_text(" \n\t\r "));
        assert!(contains_text("  x "));
    }

    #[test]
    fn test_normalization_collapses_and_trims() {
        let mut run = InlineRun::new();
        assert_eq!(run.append_normalized("  a \n b "), "a b");
        assert_eq!(run.text(), "a b");
    }

    #[test]
    fn test_trailing_space_emitted_before_next_fragment() {
        let mut run = InlineRun::new();
        run.append_normalized("Hello ");
        assert_eq!(run.append_normalized("world"), " world");
        assert_eq!(run.append_normalized("\n\n"), "");
        assert_eq!(run.text(), "Hello world");
    }

    #[test]
    fn test_fragments_join_without_space() {
        let mut run = InlineRun::new();
        run.append_normalized("foo");
        run.append_normalized("bar");
        assert_eq!(run.text(), "foobar");
    }

    #[test]
    fn test_line_break_drops_following_whitespace() {
        let mut run = InlineRun::new();
        run.append_normalized("one ");
        run.append_line_break();
        run.append_normalized("  two");
        assert_eq!(run.text(), "one\ntwo");
    }

    #[test]
    fn test_spans_seal_latest_segment() {
        let element = ElementId(3);
        let mut run = InlineRun::new();
        run.open_span(element);
        run.append_normalized("bold");
        assert!(run.close_span(element));
        run.open_span(element);
        run.append_normalized(" more");
        assert!(run.close_span(element));
        assert!(!run.close_span(element));

        let texts: Vec<_> = run.spans_of(element).map(|s| run.span_text(s)).collect();
        assert_eq!(texts, vec!["bold", " more"]);
    }
}
