//! Table constraints and indexes.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::column::normalize_expression;
use super::names_eq;
use crate::ast::{ForeignKeyRef, IndexColumn, ReferentialAction};

/// A table constraint.
///
/// Identity is the name when one is given, otherwise the structural
/// [`Constraint::signature`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// `CONSTRAINT name`, if given.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What the constraint enforces.
    #[serde(flatten)]
    pub kind: ConstraintKind,
}

/// Constraint kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "constraint", rename_all = "snake_case")]
pub enum ConstraintKind {
    /// `PRIMARY KEY (columns)`.
    PrimaryKey {
        /// Key columns.
        columns: Vec<IndexColumn>,
    },
    /// `UNIQUE (columns)`.
    Unique {
        /// Key columns.
        columns: Vec<IndexColumn>,
    },
    /// `FOREIGN KEY (columns) REFERENCES ...`.
    ForeignKey {
        /// Referencing columns.
        columns: Vec<String>,
        /// Referenced table, columns and actions.
        references: ForeignKeyRef,
    },
    /// `CHECK (expression)`.
    Check {
        /// The expression as written.
        expression: String,
    },
}

impl Constraint {
    /// Creates an unnamed constraint.
    #[must_use]
    pub const fn new(kind: ConstraintKind) -> Self {
        Self { name: None, kind }
    }

    /// Creates a named constraint.
    #[must_use]
    pub fn named(name: impl Into<String>, kind: ConstraintKind) -> Self {
        Self {
            name: Some(name.into()),
            kind,
        }
    }

    /// Returns true for primary keys.
    #[must_use]
    pub const fn is_primary_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::PrimaryKey { .. })
    }

    /// Returns true for foreign keys.
    #[must_use]
    pub const fn is_foreign_key(&self) -> bool {
        matches!(self.kind, ConstraintKind::ForeignKey { .. })
    }

    /// Short lower-case label of the kind: `primary key`, `unique`, ...
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self.kind {
            ConstraintKind::PrimaryKey { .. } => "primary key",
            ConstraintKind::Unique { .. } => "unique",
            ConstraintKind::ForeignKey { .. } => "foreign key",
            ConstraintKind::Check { .. } => "check",
        }
    }

    /// Names of the local columns the constraint covers. Empty for checks.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        match &self.kind {
            ConstraintKind::PrimaryKey { columns } | ConstraintKind::Unique { columns } => {
                columns.iter().map(|c| c.name.as_str()).collect()
            }
            ConstraintKind::ForeignKey { columns, .. } => {
                columns.iter().map(String::as_str).collect()
            }
            ConstraintKind::Check { .. } => Vec::new(),
        }
    }

    /// Returns true if the constraint covers the given column.
    #[must_use]
    pub fn references_column(&self, column: &str, case_sensitive: bool) -> bool {
        self.columns()
            .iter()
            .any(|c| names_eq(c, column, case_sensitive))
    }

    /// Renames every reference to a local column.
    pub fn rename_column(&mut self, from: &str, to: &str, case_sensitive: bool) {
        match &mut self.kind {
            ConstraintKind::PrimaryKey { columns } | ConstraintKind::Unique { columns } => {
                for column in columns {
                    if names_eq(&column.name, from, case_sensitive) {
                        column.name = to.to_string();
                    }
                }
            }
            ConstraintKind::ForeignKey { columns, .. } => {
                for column in columns {
                    if names_eq(column, from, case_sensitive) {
                        *column = to.to_string();
                    }
                }
            }
            ConstraintKind::Check { .. } => {}
        }
    }

    /// Structural signature: kind, normalized columns, reference target and
    /// actions for foreign keys, normalized expression for checks. Names are
    /// not part of the signature.
    #[must_use]
    pub fn signature(&self, case_sensitive: bool) -> String {
        let fold = |name: &str| fold_name(name, case_sensitive);
        match &self.kind {
            ConstraintKind::PrimaryKey { columns } => {
                format!("PK({})", index_columns_signature(columns, case_sensitive))
            }
            ConstraintKind::Unique { columns } => {
                format!("UQ({})", index_columns_signature(columns, case_sensitive))
            }
            ConstraintKind::ForeignKey {
                columns,
                references,
            } => {
                let local: Vec<String> = columns.iter().map(|c| fold(c)).collect();
                let remote: Vec<String> = references.columns.iter().map(|c| fold(c)).collect();
                let table = match &references.table.schema {
                    Some(schema) => format!("{}.{}", fold(schema), fold(&references.table.name)),
                    None => fold(&references.table.name),
                };
                format!(
                    "FK({})->{table}({}) ON DELETE {} ON UPDATE {}",
                    local.join(","),
                    remote.join(","),
                    action_signature(references.on_delete),
                    action_signature(references.on_update),
                )
            }
            ConstraintKind::Check { expression } => {
                format!("CK({})", normalize_expression(expression))
            }
        }
    }
}

/// `NO ACTION` is what an omitted action means.
fn action_signature(action: Option<ReferentialAction>) -> &'static str {
    match action {
        None | Some(ReferentialAction::NoAction) => "NO ACTION",
        Some(action) => action.as_sql(),
    }
}

/// An index on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    /// Index name; synthesized from the first column when the DDL omits it.
    pub name: String,
    /// Indexed columns in order.
    pub columns: Vec<IndexColumn>,
    /// `UNIQUE`.
    #[serde(default)]
    pub unique: bool,
    /// Non-default method: `FULLTEXT`, `SPATIAL`, `HASH`, `GIN`, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Index {
    /// Returns true if the index covers the given column.
    #[must_use]
    pub fn references_column(&self, column: &str, case_sensitive: bool) -> bool {
        self.columns
            .iter()
            .any(|c| names_eq(&c.name, column, case_sensitive))
    }

    /// Renames every reference to a column.
    pub fn rename_column(&mut self, from: &str, to: &str, case_sensitive: bool) {
        for column in &mut self.columns {
            if names_eq(&column.name, from, case_sensitive) {
                column.name = to.to_string();
            }
        }
    }

    /// Structural signature: uniqueness, method and columns. The name is not
    /// part of the signature.
    #[must_use]
    pub fn signature(&self, case_sensitive: bool) -> String {
        format!(
            "{}{}({})",
            if self.unique { "UIDX" } else { "IDX" },
            self.method
                .as_deref()
                .map(|m| format!(" {}", m.to_ascii_uppercase()))
                .unwrap_or_default(),
            index_columns_signature(&self.columns, case_sensitive)
        )
    }
}

fn index_columns_signature(columns: &[IndexColumn], case_sensitive: bool) -> String {
    let mut out = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&fold_name(&column.name, case_sensitive));
        if let Some(length) = column.length {
            let _ = write!(out, "({length})");
        }
        if column.descending {
            out.push_str(" DESC");
        }
    }
    out
}

fn fold_name(name: &str, case_sensitive: bool) -> String {
    if case_sensitive {
        name.to_string()
    } else {
        name.to_ascii_lowercase()
    }
}
