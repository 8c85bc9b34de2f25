//! DDL parser.
//!
//! A hand-written recursive descent parser over the [`crate::lexer`] token
//! stream. It accepts the `CREATE TABLE`, `CREATE INDEX` and `COMMENT ON`
//! subset of MySQL, PostgreSQL and SQLite DDL and rejects everything else
//! with an explicit [`ParseError`].

mod error;
#[allow(clippy::module_inception)]
mod parser;

pub use error::ParseError;
pub use parser::{parse, Parser};
