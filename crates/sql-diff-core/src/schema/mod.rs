//! Normalized schema model.
//!
//! A [`Table`] is the dialect-independent form of a `CREATE TABLE`
//! statement: inline column constraints are lifted to table constraints,
//! defaults are normalized, and index names are synthesized where the DDL
//! leaves them out. A [`Schema`] groups the tables of one DDL text.

mod column;
mod constraint;
mod error;
mod extract;
mod table;

pub use column::{normalize_default, normalize_expression, Column, ColumnType};
pub use constraint::{Constraint, ConstraintKind, Index};
pub use error::SchemaError;
pub use table::{object_names_eq, KeyParticipation, Schema, Table};

pub(crate) use table::with_name;

/// Compares two identifiers under the given case sensitivity.
#[must_use]
pub fn names_eq(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}
