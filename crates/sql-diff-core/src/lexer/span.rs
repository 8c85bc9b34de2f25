//! Byte ranges into the DDL text.

use serde::Serialize;

/// A half-open byte range `[start, end)` in the input text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl Span {
    /// Creates a new span.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Length of the span in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Returns true if the span covers no input.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Span running from the start of `self` to the end of `other`.
    #[must_use]
    pub const fn to(self, other: Self) -> Self {
        let end = if other.end > self.end {
            other.end
        } else {
            self.end
        };
        Self {
            start: self.start,
            end,
        }
    }

    /// The source text covered by this span, if it lies within `input`.
    #[must_use]
    pub fn slice(self, input: &str) -> Option<&str> {
        input.get(self.start..self.end)
    }

    /// 1-based line and column of the span start.
    #[must_use]
    pub fn line_col(self, input: &str) -> (usize, usize) {
        let mut line = 1;
        let mut col = 1;
        for (offset, c) in input.char_indices() {
            if offset >= self.start {
                break;
            }
            if c == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        (line, col)
    }
}
