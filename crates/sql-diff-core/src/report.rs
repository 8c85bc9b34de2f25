//! Diff report: a read-only, ordered projection of a change set.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::ast::{IndexColumn, ObjectName};
use crate::diff::{
    AmbiguousRename, Change, ChangeKind, ChangeSet, ColumnPosition, DiffWarning, RiskReason,
};
use crate::schema::{Column, Constraint, ConstraintKind, Index};

/// What happened to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// Created.
    Added,
    /// Dropped.
    Removed,
    /// Changed in place or replaced.
    Modified,
    /// Renamed.
    Renamed,
}

impl Category {
    /// Category of a change kind.
    #[must_use]
    pub const fn of(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::AddColumn
            | ChangeKind::AddConstraint
            | ChangeKind::AddIndex
            | ChangeKind::CreateTable => Self::Added,
            ChangeKind::DropColumn
            | ChangeKind::DropConstraint
            | ChangeKind::DropIndex
            | ChangeKind::DropTable => Self::Removed,
            ChangeKind::ModifyColumn
            | ChangeKind::ReplaceConstraint
            | ChangeKind::ReplaceIndex
            | ChangeKind::SetTableOption => Self::Modified,
            ChangeKind::RenameColumn | ChangeKind::RenameTable => Self::Renamed,
        }
    }

    /// One-character marker used in text output.
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Modified => '~',
            Self::Renamed => '>',
        }
    }
}

/// One reported change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    /// Table (target name).
    pub table: ObjectName,
    /// Column ordinal, 0 for table-level objects.
    pub ordinal: usize,
    /// Change kind.
    pub kind: ChangeKind,
    /// Added, removed, modified or renamed.
    pub category: Category,
    /// Column, constraint, index or option name.
    pub object: String,
    /// Human-readable detail.
    pub detail: String,
    /// Data-loss risks.
    pub risks: Vec<RiskReason>,
    /// Whether any risk is present.
    pub risk_of_data_loss: bool,
}

/// Entry counts per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    /// Added objects.
    pub added: usize,
    /// Removed objects.
    pub removed: usize,
    /// Modified objects.
    pub modified: usize,
    /// Renamed objects.
    pub renamed: usize,
    /// Entries at risk of data loss.
    pub at_risk: usize,
}

impl Counts {
    /// Number of entries across all categories.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.added + self.removed + self.modified + self.renamed
    }

    fn record(&mut self, entry: &ReportEntry) {
        match entry.category {
            Category::Added => self.added += 1,
            Category::Removed => self.removed += 1,
            Category::Modified => self.modified += 1,
            Category::Renamed => self.renamed += 1,
        }
        if entry.risk_of_data_loss {
            self.at_risk += 1;
        }
    }

    fn merge(&mut self, other: Self) {
        self.added += other.added;
        self.removed += other.removed;
        self.modified += other.modified;
        self.renamed += other.renamed;
        self.at_risk += other.at_risk;
    }
}

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} added, {} removed, {} modified, {} renamed",
            self.added, self.removed, self.modified, self.renamed
        )?;
        if self.at_risk > 0 {
            write!(f, ", {} at risk of data loss", self.at_risk)?;
        }
        Ok(())
    }
}

/// Summary of one change set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    /// Source table name.
    pub source_table: ObjectName,
    /// Target table name.
    pub target_table: ObjectName,
    /// Entries ordered by table, column ordinal, kind and object.
    pub entries: Vec<ReportEntry>,
    /// Entry indices per change kind.
    pub by_kind: BTreeMap<ChangeKind, Vec<usize>>,
    /// Indices of entries at risk of data loss.
    pub at_risk: Vec<usize>,
    /// Counts per category.
    pub counts: Counts,
    /// Renames left undecided.
    pub ambiguities: Vec<AmbiguousRename>,
    /// Informational warnings.
    pub warnings: Vec<DiffWarning>,
}

impl Report {
    /// Returns true when there is nothing to report.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.ambiguities.is_empty() && self.warnings.is_empty()
    }

    /// Returns true when any entry may lose data.
    #[must_use]
    pub fn has_risks(&self) -> bool {
        !self.at_risk.is_empty()
    }

    /// Entries of one kind, in report order.
    pub fn entries_of(&self, kind: ChangeKind) -> impl Iterator<Item = &ReportEntry> {
        self.by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&i| &self.entries[i])
    }

    /// Entries at risk of data loss, in report order.
    pub fn risky_entries(&self) -> impl Iterator<Item = &ReportEntry> {
        self.at_risk.iter().map(|&i| &self.entries[i])
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source_table == self.target_table {
            writeln!(f, "{}: {}", self.target_table, self.counts)?;
        } else {
            writeln!(
                f,
                "{} -> {}: {}",
                self.source_table, self.target_table, self.counts
            )?;
        }
        if self.is_empty() {
            return writeln!(f, "  no differences");
        }
        for entry in &self.entries {
            write!(
                f,
                "  {} {} {}",
                entry.category.marker(),
                entry.kind.label(),
                entry.object
            )?;
            if !entry.detail.is_empty() {
                write!(f, ": {}", entry.detail)?;
            }
            if entry.risk_of_data_loss {
                let risks: Vec<String> = entry.risks.iter().map(ToString::to_string).collect();
                write!(f, " [risk: {}]", risks.join(", "))?;
            }
            writeln!(f)?;
        }
        for ambiguity in &self.ambiguities {
            writeln!(f, "  ? {ambiguity}")?;
        }
        for warning in &self.warnings {
            writeln!(f, "  ! {warning}")?;
        }
        Ok(())
    }
}

/// Summaries of several change sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchReport {
    /// One report per change set, in input order.
    pub reports: Vec<Report>,
    /// Totals across reports.
    pub counts: Counts,
}

impl BatchReport {
    /// Returns true when no report has anything to say.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.iter().all(Report::is_empty)
    }

    /// Returns true when any entry may lose data.
    #[must_use]
    pub fn has_risks(&self) -> bool {
        self.reports.iter().any(Report::has_risks)
    }

    /// Every ambiguity across reports.
    pub fn ambiguities(&self) -> impl Iterator<Item = &AmbiguousRename> {
        self.reports.iter().flat_map(|r| r.ambiguities.iter())
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No differences.");
        }
        for report in &self.reports {
            write!(f, "{report}")?;
        }
        writeln!(f, "Total: {}", self.counts)
    }
}

// ================================================================
// Summaries
// ================================================================

/// Summarizes a change set.
#[must_use]
pub fn summarize(change_set: &ChangeSet) -> Report {
    let entries: Vec<ReportEntry> = change_set
        .sorted_changes()
        .into_iter()
        .map(entry)
        .collect();

    let mut by_kind: BTreeMap<ChangeKind, Vec<usize>> = BTreeMap::new();
    let mut at_risk = Vec::new();
    let mut counts = Counts::default();
    for (i, entry) in entries.iter().enumerate() {
        by_kind.entry(entry.kind).or_default().push(i);
        if entry.risk_of_data_loss {
            at_risk.push(i);
        }
        counts.record(entry);
    }

    Report {
        source_table: change_set.source_table.clone(),
        target_table: change_set.target_table.clone(),
        entries,
        by_kind,
        at_risk,
        counts,
        ambiguities: change_set.ambiguities.clone(),
        warnings: change_set.warnings.clone(),
    }
}

/// Summarizes several change sets.
#[must_use]
pub fn summarize_all(change_sets: &[ChangeSet]) -> BatchReport {
    let reports: Vec<Report> = change_sets.iter().map(summarize).collect();
    let mut counts = Counts::default();
    for report in &reports {
        counts.merge(report.counts);
    }
    BatchReport { reports, counts }
}

fn entry(change: &Change) -> ReportEntry {
    let kind = change.kind();
    let risks = change.risks();
    ReportEntry {
        table: change.table().clone(),
        ordinal: change.ordinal(),
        kind,
        category: Category::of(kind),
        object: change.object_name(),
        detail: detail(change),
        risk_of_data_loss: !risks.is_empty(),
        risks,
    }
}

fn detail(change: &Change) -> String {
    match change {
        Change::AddColumn {
            column, position, ..
        } => {
            let mut text = column_summary(column);
            match position {
                ColumnPosition::End => {}
                ColumnPosition::First => text.push_str(" (first)"),
                ColumnPosition::After(prev) => text.push_str(&format!(" (after {prev})")),
            }
            text
        }
        Change::DropColumn { column, .. } => column_summary(column),
        Change::ModifyColumn {
            old,
            new,
            compatibility,
            ..
        } => {
            let mut parts = Vec::new();
            if old.column_type != new.column_type {
                parts.push(format!(
                    "type {} -> {} ({compatibility})",
                    type_summary(old),
                    type_summary(new)
                ));
            }
            if old.nullable != new.nullable {
                parts.push(format!(
                    "{} -> {}",
                    null_label(old.nullable),
                    null_label(new.nullable)
                ));
            }
            if old.default != new.default {
                parts.push(format!(
                    "default {} -> {}",
                    old.default.as_deref().unwrap_or("none"),
                    new.default.as_deref().unwrap_or("none")
                ));
            }
            if old.auto_increment != new.auto_increment {
                parts.push(if new.auto_increment {
                    "auto-increment added".to_string()
                } else {
                    "auto-increment removed".to_string()
                });
            }
            if old.on_update != new.on_update {
                parts.push("on update changed".to_string());
            }
            if old.comment != new.comment {
                parts.push("comment changed".to_string());
            }
            parts.join("; ")
        }
        Change::RenameColumn {
            old_name, new_name, ..
        } => format!("{old_name} -> {new_name}"),
        Change::AddConstraint { constraint, .. } | Change::DropConstraint { constraint, .. } => {
            constraint_summary(constraint)
        }
        Change::ReplaceConstraint { old, new, .. } => format!(
            "{} -> {}",
            constraint_summary(old),
            constraint_summary(new)
        ),
        Change::AddIndex { index, .. } | Change::DropIndex { index, .. } => index_summary(index),
        Change::ReplaceIndex { old, new, .. } => {
            format!("{} -> {}", index_summary(old), index_summary(new))
        }
        Change::RenameTable { table, old_name } => format!("{old_name} -> {table}"),
        Change::SetTableOption { old, new, .. } => format!(
            "{} -> {}",
            old.as_deref().unwrap_or("(unset)"),
            new.as_deref().unwrap_or("(unset)")
        ),
        Change::CreateTable { definition, .. } | Change::DropTable { definition, .. } => {
            format!("{} column(s)", definition.columns.len())
        }
    }
}

const fn null_label(nullable: bool) -> &'static str {
    if nullable {
        "NULL"
    } else {
        "NOT NULL"
    }
}

fn type_summary(column: &Column) -> String {
    let mut text = column.column_type.render();
    if column.column_type.unsigned {
        text.push_str(" UNSIGNED");
    }
    text
}

fn column_summary(column: &Column) -> String {
    let mut text = type_summary(column);
    if !column.nullable {
        text.push_str(" NOT NULL");
    }
    if let Some(default) = &column.default {
        text.push_str(&format!(" DEFAULT {default}"));
    }
    if column.auto_increment {
        text.push_str(" AUTO_INCREMENT");
    }
    text
}

fn column_list(columns: &[IndexColumn]) -> String {
    columns
        .iter()
        .map(|c| c.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn constraint_summary(constraint: &Constraint) -> String {
    match &constraint.kind {
        ConstraintKind::PrimaryKey { columns } => format!("PRIMARY KEY ({})", column_list(columns)),
        ConstraintKind::Unique { columns } => format!("UNIQUE ({})", column_list(columns)),
        ConstraintKind::ForeignKey {
            columns,
            references,
        } => format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            columns.join(", "),
            references.table,
            references.columns.join(", ")
        ),
        ConstraintKind::Check { expression } => format!("CHECK ({expression})"),
    }
}

fn index_summary(index: &Index) -> String {
    let mut text = String::new();
    if index.unique {
        text.push_str("UNIQUE ");
    }
    if let Some(method) = &index.method {
        text.push_str(&format!("{method} "));
    }
    text.push_str(&format!("INDEX ({})", column_list(&index.columns)));
    text
}
