//! Fatal parse errors
//!
//! A parse either yields a complete document or exactly one of these.
//! Resource and style resolution problems are not errors; they are logged
//! where they happen and parsing continues.

use crate::cursor::EventKind;

/// Result type alias for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Reading the markup source failed
    #[error("IO error at {position}: {source}")]
    Io {
        /// Cursor position description
        position: String,
        #[source]
        source: std::io::Error,
    },

    /// The tokenizer rejected the markup (strict mode only)
    #[error("Malformed markup at {position}: {message}")]
    Markup {
        /// Cursor position description
        position: String,
        message: String,
    },

    /// Elements nest deeper than the configured limit
    #[error("Nesting deeper than {limit} levels at {position}")]
    TooDeep {
        limit: usize,
        /// Cursor position description
        position: String,
    },

    /// An event the current routine's grammar does not allow
    #[error("Unexpected {found:?} at {position}, expected {expected}")]
    UnexpectedEvent {
        expected: &'static str,
        found: EventKind,
        /// Cursor position description
        position: String,
    },
}

impl ParseError {
    pub fn io(source: std::io::Error, position: String) -> Self {
        ParseError::Io { position, source }
    }

    pub fn unexpected(expected: &'static str, found: EventKind, position: String) -> Self {
        ParseError::UnexpectedEvent {
            expected,
            found,
            position,
        }
    }
}
