//! Parser error types.

use oxide_schema_core::SchemaError;

use crate::lexer::{line_at, Span, TokenKind};

/// A parse error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {}..{}", span.start, span.end)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// The actual token found.
    pub found: Option<TokenKind>,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            expected: None,
            found: None,
        }
    }

    /// Creates an "unexpected token" error.
    #[must_use]
    pub fn unexpected(expected: impl Into<String>, found: TokenKind, span: Span) -> Self {
        let expected: String = expected.into();
        if found == TokenKind::Eof {
            return Self::unexpected_eof(expected, span);
        }
        Self {
            message: format!("Unexpected token: expected {expected}, found {found:?}"),
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }

    /// Creates an "unexpected end of input" error.
    #[must_use]
    pub fn unexpected_eof(expected: impl Into<String>, span: Span) -> Self {
        let expected: String = expected.into();
        Self {
            message: format!("Unexpected end of input: expected {expected}"),
            span,
            expected: Some(expected),
            found: Some(TokenKind::Eof),
        }
    }

    /// Converts into a [`SchemaError::Syntax`] carrying the 1-based line
    /// of the error within `source`.
    #[must_use]
    pub fn into_schema_error(self, source: &str) -> SchemaError {
        SchemaError::Syntax {
            line: line_at(source, self.span.start),
            message: self.message,
        }
    }
}
