//! viewtree parser - HTML to physical and logical view trees
//!
//! This crate provides:
//! - A pull-style token cursor over HTML using html5ever
//! - The recursive-descent processor building both trees in one pass
//! - A CSS style engine using cssparser
//! - Node factory and resource requester collaborators
//!
//! The processor is also exposed through a C ABI (see [`ffi`]).

pub mod string_interner;
pub mod error;
pub mod cursor;
pub mod factory;
pub mod css_parser;
pub mod style_engine;
pub mod context;
pub mod processor;
pub mod ffi;

pub use context::{NoopRequester, PageContext, ParseOptions, ResourceRequester, DEFAULT_MAX_DEPTH};
pub use cursor::{classify, CursorOptions, EventKind, HtmlCursor, TagClass, TokenCursor};
pub use error::{ParseError, Result};
pub use factory::{NodeFactory, Widget, WidgetFactory};
pub use processor::HtmlProcessor;
pub use string_interner::{StringId, StringPool};
pub use style_engine::{StyleEngine, StyleSheet};
