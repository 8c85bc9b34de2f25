//! Atomic schema changes and change sets.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::compat::{classify, modify_risks, RiskReason, TypeCompatibility};
use crate::ast::ObjectName;
use crate::schema::{Column, Constraint, Index, Table};

/// Where an added column goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnPosition {
    /// Appended after the last column.
    End,
    /// Before every other column.
    First,
    /// Directly after the named column.
    After(String),
}

/// An atomic change. Each carries enough data to be rendered on its own and
/// to compute its inverse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    /// Add a column.
    AddColumn {
        /// Table (target name).
        table: ObjectName,
        /// The new column.
        column: Column,
        /// Where it goes.
        position: ColumnPosition,
    },
    /// Drop a column.
    DropColumn {
        /// Table (target name).
        table: ObjectName,
        /// The dropped column as it was.
        column: Column,
    },
    /// Change a column's attributes.
    ModifyColumn {
        /// Table (target name).
        table: ObjectName,
        /// Column before, under its current name.
        old: Column,
        /// Column after.
        new: Column,
        /// How the type changed.
        compatibility: TypeCompatibility,
        /// Data-loss risks.
        risks: Vec<RiskReason>,
    },
    /// Rename a column, keeping its attributes.
    RenameColumn {
        /// Table (target name).
        table: ObjectName,
        /// Current name.
        old_name: String,
        /// New name.
        new_name: String,
        /// The column's definition before any modification.
        column: Column,
    },
    /// Add a constraint.
    AddConstraint {
        /// Table (target name).
        table: ObjectName,
        /// The constraint.
        constraint: Constraint,
    },
    /// Drop a constraint.
    DropConstraint {
        /// Table (target name).
        table: ObjectName,
        /// The constraint as it is in the source.
        constraint: Constraint,
    },
    /// Replace a constraint that keeps its identity but changes shape.
    ReplaceConstraint {
        /// Table (target name).
        table: ObjectName,
        /// Source constraint.
        old: Constraint,
        /// Target constraint.
        new: Constraint,
    },
    /// Add an index.
    AddIndex {
        /// Table (target name).
        table: ObjectName,
        /// The index.
        index: Index,
    },
    /// Drop an index.
    DropIndex {
        /// Table (target name).
        table: ObjectName,
        /// The index as it is in the source.
        index: Index,
    },
    /// Replace an index that keeps its name but changes shape.
    ReplaceIndex {
        /// Table (target name).
        table: ObjectName,
        /// Source index.
        old: Index,
        /// Target index.
        new: Index,
    },
    /// Rename the table.
    RenameTable {
        /// New name.
        table: ObjectName,
        /// Current name.
        old_name: ObjectName,
    },
    /// Set, change or remove a table option.
    SetTableOption {
        /// Table (target name).
        table: ObjectName,
        /// Upper-cased option name.
        name: String,
        /// Current value, `None` when unset.
        old: Option<String>,
        /// New value, `None` to remove.
        new: Option<String>,
    },
    /// Create a table.
    CreateTable {
        /// Table name.
        table: ObjectName,
        /// Full definition.
        definition: Table,
    },
    /// Drop a table.
    DropTable {
        /// Table name.
        table: ObjectName,
        /// Definition being dropped.
        definition: Table,
    },
}

/// Discriminant of a [`Change`], ordered the way reports and plans sort
/// changes within a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// [`Change::RenameTable`].
    RenameTable,
    /// [`Change::DropConstraint`].
    DropConstraint,
    /// [`Change::DropIndex`].
    DropIndex,
    /// [`Change::RenameColumn`].
    RenameColumn,
    /// [`Change::DropColumn`].
    DropColumn,
    /// [`Change::ModifyColumn`].
    ModifyColumn,
    /// [`Change::CreateTable`].
    CreateTable,
    /// [`Change::AddColumn`].
    AddColumn,
    /// [`Change::ReplaceConstraint`].
    ReplaceConstraint,
    /// [`Change::AddConstraint`].
    AddConstraint,
    /// [`Change::ReplaceIndex`].
    ReplaceIndex,
    /// [`Change::AddIndex`].
    AddIndex,
    /// [`Change::SetTableOption`].
    SetTableOption,
    /// [`Change::DropTable`].
    DropTable,
}

impl ChangeKind {
    /// Lower-case label, e.g. `add column`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::RenameTable => "rename table",
            Self::DropConstraint => "drop constraint",
            Self::DropIndex => "drop index",
            Self::RenameColumn => "rename column",
            Self::DropColumn => "drop column",
            Self::ModifyColumn => "modify column",
            Self::CreateTable => "create table",
            Self::AddColumn => "add column",
            Self::ReplaceConstraint => "replace constraint",
            Self::AddConstraint => "add constraint",
            Self::ReplaceIndex => "replace index",
            Self::AddIndex => "add index",
            Self::SetTableOption => "set table option",
            Self::DropTable => "drop table",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Change {
    /// Builds a [`Change::ModifyColumn`], classifying the type change and its
    /// risks.
    #[must_use]
    pub fn modify_column(table: ObjectName, old: Column, new: Column) -> Self {
        let compatibility = classify(&old.column_type, &new.column_type);
        let risks = modify_risks(&old, &new, compatibility);
        Self::ModifyColumn {
            table,
            old,
            new,
            compatibility,
            risks,
        }
    }

    /// The table this change applies to, by its target name.
    #[must_use]
    pub const fn table(&self) -> &ObjectName {
        match self {
            Self::AddColumn { table, .. }
            | Self::DropColumn { table, .. }
            | Self::ModifyColumn { table, .. }
            | Self::RenameColumn { table, .. }
            | Self::AddConstraint { table, .. }
            | Self::DropConstraint { table, .. }
            | Self::ReplaceConstraint { table, .. }
            | Self::AddIndex { table, .. }
            | Self::DropIndex { table, .. }
            | Self::ReplaceIndex { table, .. }
            | Self::RenameTable { table, .. }
            | Self::SetTableOption { table, .. }
            | Self::CreateTable { table, .. }
            | Self::DropTable { table, .. } => table,
        }
    }

    /// The change's kind.
    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        match self {
            Self::AddColumn { .. } => ChangeKind::AddColumn,
            Self::DropColumn { .. } => ChangeKind::DropColumn,
            Self::ModifyColumn { .. } => ChangeKind::ModifyColumn,
            Self::RenameColumn { .. } => ChangeKind::RenameColumn,
            Self::AddConstraint { .. } => ChangeKind::AddConstraint,
            Self::DropConstraint { .. } => ChangeKind::DropConstraint,
            Self::ReplaceConstraint { .. } => ChangeKind::ReplaceConstraint,
            Self::AddIndex { .. } => ChangeKind::AddIndex,
            Self::DropIndex { .. } => ChangeKind::DropIndex,
            Self::ReplaceIndex { .. } => ChangeKind::ReplaceIndex,
            Self::RenameTable { .. } => ChangeKind::RenameTable,
            Self::SetTableOption { .. } => ChangeKind::SetTableOption,
            Self::CreateTable { .. } => ChangeKind::CreateTable,
            Self::DropTable { .. } => ChangeKind::DropTable,
        }
    }

    /// Name of the object the change touches: column, constraint, index or
    /// option. Unnamed constraints are described by their kind.
    #[must_use]
    pub fn object_name(&self) -> String {
        match self {
            Self::AddColumn { column, .. } | Self::DropColumn { column, .. } => column.name.clone(),
            Self::ModifyColumn { new, .. } => new.name.clone(),
            Self::RenameColumn { new_name, .. } => new_name.clone(),
            Self::AddConstraint { constraint, .. } | Self::DropConstraint { constraint, .. } => {
                constraint_label(constraint)
            }
            Self::ReplaceConstraint { new, .. } => constraint_label(new),
            Self::AddIndex { index, .. } | Self::DropIndex { index, .. } => index.name.clone(),
            Self::ReplaceIndex { new, .. } => new.name.clone(),
            Self::SetTableOption { name, .. } => name.clone(),
            Self::RenameTable { table, .. }
            | Self::CreateTable { table, .. }
            | Self::DropTable { table, .. } => table.to_string(),
        }
    }

    /// 1-based column ordinal for column changes, 0 otherwise.
    #[must_use]
    pub const fn ordinal(&self) -> usize {
        match self {
            Self::AddColumn { column, .. }
            | Self::DropColumn { column, .. }
            | Self::RenameColumn { column, .. } => column.position,
            Self::ModifyColumn { new, .. } => new.position,
            _ => 0,
        }
    }

    /// Stable sort key: table, column ordinal, kind, object name.
    #[must_use]
    pub fn sort_key(&self) -> (String, usize, ChangeKind, String) {
        (
            self.table().to_string().to_ascii_lowercase(),
            self.ordinal(),
            self.kind(),
            self.object_name(),
        )
    }

    /// Data-loss risks of the change.
    #[must_use]
    pub fn risks(&self) -> Vec<RiskReason> {
        match self {
            Self::ModifyColumn { risks, .. } => risks.clone(),
            Self::DropColumn { .. } => vec![RiskReason::ColumnDropped],
            Self::DropTable { .. } => vec![RiskReason::TableDropped],
            _ => Vec::new(),
        }
    }

    /// Returns true when the change may lose data.
    #[must_use]
    pub fn risk_of_data_loss(&self) -> bool {
        !self.risks().is_empty()
    }

    /// The change that undoes this one.
    #[must_use]
    pub fn inverse(&self) -> Self {
        match self.clone() {
            Self::AddColumn { table, column, .. } => Self::DropColumn { table, column },
            Self::DropColumn { table, column } => Self::AddColumn {
                table,
                column,
                position: ColumnPosition::End,
            },
            Self::ModifyColumn {
                table, old, new, ..
            } => Self::modify_column(table, new, old),
            Self::RenameColumn {
                table,
                old_name,
                new_name,
                column,
            } => Self::RenameColumn {
                table,
                column: column.renamed(new_name.clone()),
                old_name: new_name,
                new_name: old_name,
            },
            Self::AddConstraint { table, constraint } => Self::DropConstraint { table, constraint },
            Self::DropConstraint { table, constraint } => Self::AddConstraint { table, constraint },
            Self::ReplaceConstraint { table, old, new } => Self::ReplaceConstraint {
                table,
                old: new,
                new: old,
            },
            Self::AddIndex { table, index } => Self::DropIndex { table, index },
            Self::DropIndex { table, index } => Self::AddIndex { table, index },
            Self::ReplaceIndex { table, old, new } => Self::ReplaceIndex {
                table,
                old: new,
                new: old,
            },
            Self::RenameTable { table, old_name } => Self::RenameTable {
                table: old_name,
                old_name: table,
            },
            Self::SetTableOption {
                table,
                name,
                old,
                new,
            } => Self::SetTableOption {
                table,
                name,
                old: new,
                new: old,
            },
            Self::CreateTable { table, definition } => Self::DropTable { table, definition },
            Self::DropTable { table, definition } => Self::CreateTable { table, definition },
        }
    }
}

fn constraint_label(constraint: &Constraint) -> String {
    constraint.name.clone().unwrap_or_else(|| {
        let columns = constraint.columns();
        if columns.is_empty() {
            constraint.label().to_string()
        } else {
            format!("{} ({})", constraint.label(), columns.join(", "))
        }
    })
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RenameColumn {
                table,
                old_name,
                new_name,
                ..
            } => write!(f, "rename column {table}.{old_name} to {new_name}"),
            Self::RenameTable { table, old_name } => {
                write!(f, "rename table {old_name} to {table}")
            }
            Self::CreateTable { table, .. } | Self::DropTable { table, .. } => {
                write!(f, "{} {table}", self.kind())
            }
            _ => write!(f, "{} {}.{}", self.kind(), self.table(), self.object_name()),
        }
    }
}

/// A scored rename candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameCandidate {
    /// Source column.
    pub from: String,
    /// Target column.
    pub to: String,
    /// Combined score in `[0, 1]`.
    pub score: f64,
}

/// Equally plausible renames the resolver refused to choose between. Every
/// column involved is diffed as a drop and an add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmbiguousRename {
    /// Table (target name).
    pub table: ObjectName,
    /// Source columns involved.
    pub sources: Vec<String>,
    /// Target columns involved.
    pub targets: Vec<String>,
    /// The competing candidates.
    pub candidates: Vec<RenameCandidate>,
}

impl fmt::Display for AmbiguousRename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let candidates: Vec<String> = self
            .candidates
            .iter()
            .map(|c| format!("{} -> {} ({:.2})", c.from, c.to, c.score))
            .collect();
        write!(
            f,
            "ambiguous rename in {}: {}",
            self.table,
            candidates.join(", ")
        )
    }
}

/// Informational findings that do not become DDL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum DiffWarning {
    /// The relative order of columns present on both sides changed.
    ColumnOrderChanged {
        /// Table (target name).
        table: ObjectName,
        /// Order in the source, using target names.
        old_order: Vec<String>,
        /// Order in the target.
        new_order: Vec<String>,
    },
    /// A table option differs.
    TableOptionChanged {
        /// Table (target name).
        table: ObjectName,
        /// Option name.
        name: String,
        /// Source value.
        old: Option<String>,
        /// Target value.
        new: Option<String>,
        /// Whether the change is rendered as DDL.
        rendered: bool,
    },
    /// A rename hint did not apply.
    RenameHintIgnored {
        /// Table (target name).
        table: ObjectName,
        /// Hint as given.
        hint: String,
        /// Why it was ignored.
        reason: String,
    },
}

impl fmt::Display for DiffWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ColumnOrderChanged {
                table,
                old_order,
                new_order,
            } => write!(
                f,
                "column order of {table} changed: ({}) -> ({})",
                old_order.join(", "),
                new_order.join(", ")
            ),
            Self::TableOptionChanged {
                table,
                name,
                old,
                new,
                rendered,
            } => {
                write!(
                    f,
                    "table option {name} of {table} changed: {} -> {}",
                    old.as_deref().unwrap_or("(unset)"),
                    new.as_deref().unwrap_or("(unset)")
                )?;
                if !rendered {
                    f.write_str(" (not rendered)")?;
                }
                Ok(())
            }
            Self::RenameHintIgnored {
                table,
                hint,
                reason,
            } => write!(f, "rename hint '{hint}' ignored for {table}: {reason}"),
        }
    }
}

/// The changes between a source table and a target table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeSet {
    /// Source table name.
    pub source_table: ObjectName,
    /// Target table name.
    pub target_table: ObjectName,
    /// Atomic changes; order carries no meaning.
    pub changes: Vec<Change>,
    /// Renames the resolver refused to guess.
    #[serde(default)]
    pub ambiguities: Vec<AmbiguousRename>,
    /// Informational warnings.
    #[serde(default)]
    pub warnings: Vec<DiffWarning>,
}

impl ChangeSet {
    /// Creates an empty change set.
    #[must_use]
    pub const fn new(source_table: ObjectName, target_table: ObjectName) -> Self {
        Self {
            source_table,
            target_table,
            changes: Vec::new(),
            ambiguities: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Returns true when there is nothing to do and nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.ambiguities.is_empty() && self.warnings.is_empty()
    }

    /// Returns true when any change may lose data.
    #[must_use]
    pub fn risk_of_data_loss(&self) -> bool {
        self.changes.iter().any(Change::risk_of_data_loss)
    }

    /// Changes in stable order (table, ordinal, kind, object).
    #[must_use]
    pub fn sorted_changes(&self) -> Vec<&Change> {
        let mut changes: Vec<&Change> = self.changes.iter().collect();
        changes.sort_by_cached_key(|c| c.sort_key());
        changes
    }

    /// The change set that undoes this one. Ambiguity reports and warnings
    /// are not carried over.
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            source_table: self.target_table.clone(),
            target_table: self.source_table.clone(),
            changes: self.changes.iter().map(Change::inverse).collect(),
            ambiguities: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Fails when the resolver left renames undecided.
    ///
    /// # Errors
    ///
    /// Returns an [`AmbiguousRenameError`] carrying every ambiguity report.
    pub fn require_unambiguous(&self) -> Result<&Self, AmbiguousRenameError> {
        if self.ambiguities.is_empty() {
            Ok(self)
        } else {
            Err(AmbiguousRenameError {
                ambiguities: self.ambiguities.clone(),
            })
        }
    }
}

/// Renames could not be decided without user input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} ambiguous rename(s): {}", .ambiguities.len(), join_ambiguities(.ambiguities))]
pub struct AmbiguousRenameError {
    /// The undecided renames.
    pub ambiguities: Vec<AmbiguousRename>,
}

fn join_ambiguities(ambiguities: &[AmbiguousRename]) -> String {
    ambiguities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
