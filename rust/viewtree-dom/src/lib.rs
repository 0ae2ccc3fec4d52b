//! viewtree DOM - physical render tree and logical element tree
//!
//! This crate provides the two trees a parse produces:
//! - the physical tree of widget nodes (SoA node and property tables)
//! - the logical tree of virtual, view and text elements
//! - inline runs with their whitespace normalization and element spans

pub mod primitives;
pub mod properties;
pub mod inline;
pub mod logical;
pub mod document;

pub use primitives::{NodeId, NodeKind, NodeTable};
pub use properties::{
    BorderStyle, Clear, Color, CssStyles, Display, Edges, Float, FontStyle, FontWeight, Length,
    Overflow, Position, PropertyTable, TextAlign,
};
pub use inline::{contains_text, is_insignificant, InlineRun, TextSpan};
pub use logical::{Attributes, ElementId, ElementKind, InlineContent, LogicalElement, LogicalTree};
pub use document::{Document, DocumentHandle, PhysicalTree};
