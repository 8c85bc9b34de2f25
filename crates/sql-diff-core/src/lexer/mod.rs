//! DDL lexer.
//!
//! A hand-written tokenizer producing a stream of [`Token`]s with byte
//! [`Span`]s, shared by every dialect the parser understands.

mod span;
mod token;
mod tokenizer;

pub use span::Span;
pub use token::{Keyword, Token, TokenKind};
pub use tokenizer::Lexer;
