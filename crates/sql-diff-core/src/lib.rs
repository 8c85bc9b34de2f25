//! # sql-diff-core
//!
//! AST-based SQL schema diff and DDL synthesis.
//!
//! This crate provides:
//! - A hand-written DDL lexer and recursive descent parser for the
//!   `CREATE TABLE` subset of MySQL, PostgreSQL and SQLite
//! - A normalized, dialect-independent schema model
//! - A structural differencer that refuses to guess ambiguous renames
//! - A statement planner rendering ordered DDL for a dialect descriptor
//! - A report and a simulator that replays plans against the model
//!
//! The crate performs no I/O. Options and dialects are plain values passed
//! into every call, and every model type is `Send + Sync`.
//!
//! ## Diffing two tables
//!
//! ```rust
//! use sql_diff_core::{diff_tables, plan, Dialect, DiffOptions, Schema};
//!
//! let source = Schema::parse("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))")?;
//! let target = Schema::parse(
//!     "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100), email VARCHAR(255))",
//! )?;
//!
//! let changes = diff_tables(
//!     source.single_table().unwrap(),
//!     target.single_table().unwrap(),
//!     &DiffOptions::default(),
//! );
//! let plan = plan(&changes, &Dialect::generic())?;
//!
//! assert_eq!(plan.to_sql(), "ALTER TABLE users ADD COLUMN email VARCHAR(255);");
//! # Ok::<(), sql_diff_core::Error>(())
//! ```
//!
//! ## Ambiguous renames
//!
//! When several target columns are equally plausible renames of a source
//! column, the change set carries an ambiguity report and the columns are
//! dropped and added instead:
//!
//! ```rust
//! use sql_diff_core::{diff_tables, DiffOptions, Schema};
//!
//! let source = Schema::parse("CREATE TABLE t (id INT, email TEXT)")?;
//! let target = Schema::parse("CREATE TABLE t (id INT, email_home TEXT, email_work TEXT)")?;
//! let changes = diff_tables(
//!     source.single_table().unwrap(),
//!     target.single_table().unwrap(),
//!     &DiffOptions::default(),
//! );
//!
//! assert_eq!(changes.ambiguities.len(), 1);
//! assert!(changes.require_unambiguous().is_err());
//! # Ok::<(), sql_diff_core::Error>(())
//! ```

pub mod ast;
pub mod diff;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod plan;
pub mod report;
pub mod schema;
pub mod simulate;

pub use diff::{
    diff_pair, diff_schema, diff_tables, pair_tables, AmbiguousRename, AmbiguousRenameError,
    Change, ChangeKind, ChangeSet, DiffOptions, DiffWarning, OptionsError, RenameHint, RiskReason,
    TypeCompatibility,
};
pub use error::{Error, Result};
pub use lexer::{Lexer, Token, TokenKind};
pub use parser::{parse, ParseError, Parser};
pub use plan::{plan, plan_batch, Dialect, Phase, Plan, PlanError, Statement, UnsupportedOperation};
pub use report::{summarize, summarize_all, BatchReport, Report};
pub use schema::{Column, ColumnType, Constraint, Index, Schema, SchemaError, Table};
pub use simulate::{replay, replay_schema, SimulationError};
