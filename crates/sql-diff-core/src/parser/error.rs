//! Parser error types.

use serde::Serialize;

use crate::lexer::{Span, TokenKind};

/// A parse error: malformed or unsupported DDL.
///
/// Always fatal for the invocation that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseError {
    /// The error message.
    pub message: String,
    /// The location of the error.
    pub span: Span,
    /// Expected tokens (if applicable).
    pub expected: Option<String>,
    /// Description of the token actually found.
    pub found: Option<String>,
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
    pub fn unexpected(expected: impl Into<String>, found: &TokenKind, span: Span) -> Self {
        let expected: String = expected.into();
        let found = found.describe();
        Self {
            message: format!("expected {expected}, found {found}"),
            span,
            expected: Some(expected),
            found: Some(found),
        }
    }

    /// Creates an error for a construct the parser recognizes but cannot
    /// reduce to the schema model.
    #[must_use]
    pub fn unsupported(construct: impl Into<String>, span: Span) -> Self {
        Self::new(format!("unsupported construct: {}", construct.into()), span)
    }

    /// Byte offset of the error in the input.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.span.start
    }

    /// 1-based line and column of the error in `input`.
    #[must_use]
    pub fn line_col(&self, input: &str) -> (usize, usize) {
        self.span.line_col(input)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at position {}..{}",
            self.message, self.span.start, self.span.end
        )
    }
}

impl std::error::Error for ParseError {}
