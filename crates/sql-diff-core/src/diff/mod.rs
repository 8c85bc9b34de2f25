//! Structural diff between schema models.
//!
//! [`diff_tables`] compares two [`Table`](crate::schema::Table)s and produces
//! a [`ChangeSet`] of atomic [`Change`]s. Columns are matched by name first;
//! the leftovers go through the rename [`resolve`]r, which refuses to guess
//! when several candidates are equally plausible. Constraints and indexes are
//! matched by structural signature, so auto-generated names do not produce
//! spurious changes.
//!
//! Type changes are classified by [`classify`] and risky ones carry
//! [`RiskReason`]s; risks are reported, never enforced.

mod change;
mod compat;
mod differ;
mod options;
mod resolve;
mod similarity;

pub use change::{
    AmbiguousRename, AmbiguousRenameError, Change, ChangeKind, ChangeSet, ColumnPosition,
    DiffWarning, RenameCandidate,
};
pub use compat::{classify, modify_risks, RiskReason, TypeCompatibility};
pub use differ::{diff_pair, diff_schema, diff_tables, pair_tables};
pub use options::{DiffOptions, OptionsError, RenameHint};
pub use resolve::{resolve, ColumnRename, Resolution};
pub use similarity::{levenshtein, name_similarity, similarity};
