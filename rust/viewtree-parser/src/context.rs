//! Per-page configuration and collaborators

use std::fmt;

use url::Url;
use viewtree_dom::DocumentHandle;

use crate::style_engine::{StyleEngine, StyleSheet};

/// Issues requests for resources referenced by the markup.
/// Requests are fire-and-forget; failures are the requester's concern.
pub trait ResourceRequester {
    fn request_style_sheet(&self, document: DocumentHandle, location: Url);
}

/// Requester that only logs what it was asked for
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopRequester;

impl ResourceRequester for NoopRequester {
    fn request_style_sheet(&self, document: DocumentHandle, location: Url) {
        log::debug!("document {}: not fetching style sheet {location}", document.0);
    }
}

/// Default limit for nested containers and inline elements
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Processor options
#[derive(Clone, Debug)]
pub struct ParseOptions {
    /// Run the style engine over the finished logical tree
    pub apply_styles: bool,
    /// Deepest element nesting accepted before the parse fails
    pub max_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            apply_styles: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Everything a parse needs to know about the page it builds
pub struct PageContext {
    base_url: Option<Url>,
    style_engine: Box<dyn StyleEngine>,
    requester: Box<dyn ResourceRequester>,
}

impl Default for PageContext {
    fn default() -> Self {
        Self {
            base_url: None,
            style_engine: Box::new(StyleSheet::new()),
            requester: Box::new(NoopRequester),
        }
    }
}

impl fmt::Debug for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageContext")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PageContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn with_style_engine(mut self, engine: impl StyleEngine + 'static) -> Self {
        self.style_engine = Box::new(engine);
        self
    }

    pub fn with_requester(mut self, requester: impl ResourceRequester + 'static) -> Self {
        self.requester = Box::new(requester);
        self
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    pub fn style_engine(&self) -> &dyn StyleEngine {
        self.style_engine.as_ref()
    }

    pub fn style_engine_mut(&mut self) -> &mut dyn StyleEngine {
        self.style_engine.as_mut()
    }

    pub fn requester(&self) -> &dyn ResourceRequester {
        self.requester.as_ref()
    }

    /// Resolve `href` against `base`, or parse it as absolute without one
    pub fn resolve(base: Option<&Url>, href: &str) -> Result<Url, url::ParseError> {
        match base {
            Some(base) => base.join(href),
            None => Url::parse(href),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_against_base() {
        let base = Url::parse("https://example.com/docs/index.html").unwrap();
        let resolved = PageContext::resolve(Some(&base), "../css/site.css").unwrap();
        assert_eq!(resolved.as_str(), "https://example.com/css/site.css");
    }

    #[test]
    fn test_relative_without_base_fails() {
        assert_eq!(
            PageContext::resolve(None, "site.css"),
            Err(url::ParseError::RelativeUrlWithoutBase)
        );
        assert!(PageContext::resolve(None, "file:///tmp/site.css").is_ok());
    }

    #[test]
    fn test_builders() {
        let base = Url::parse("https://example.com/").unwrap();
        let page = PageContext::new().with_base_url(base.clone());
        assert_eq!(page.base_url(), Some(&base));
        assert!(PageContext::default().base_url().is_none());
        let options = ParseOptions::default();
        assert!(options.apply_styles);
        assert_eq!(options.max_depth, DEFAULT_MAX_DEPTH);
    }
}
