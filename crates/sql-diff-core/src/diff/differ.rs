//! Structural differencer.

use std::collections::BTreeSet;

use tracing::debug;

use super::change::{Change, ChangeSet, ColumnPosition, DiffWarning};
use super::options::DiffOptions;
use super::resolve::{resolve, ColumnRename};
use crate::schema::{object_names_eq, with_name, Column, Constraint, Index, Schema, Table};

// ================================================================
// Table diff
// ================================================================

/// Computes the changes turning `source` into `target`.
///
/// Every change names the target table. The result is a pure function of
/// the inputs: diffing a table with itself yields an empty change set.
#[must_use]
pub fn diff_tables(source: &Table, target: &Table, options: &DiffOptions) -> ChangeSet {
    let cs = options.case_sensitive;
    let table = target.name.clone();
    let mut set = ChangeSet::new(source.name.clone(), target.name.clone());

    if !object_names_eq(&source.name, &target.name, cs) {
        debug!(from = %source.name, to = %target.name, "Table renamed");
        set.changes.push(Change::RenameTable {
            table: table.clone(),
            old_name: source.name.clone(),
        });
    }

    // Columns matched by name.
    let mut matched: Vec<(&Column, &Column)> = Vec::new();
    let mut unmatched_source: Vec<&Column> = Vec::new();
    for column in &source.columns {
        match target.column(&column.name, cs) {
            Some(other) => matched.push((column, other)),
            None => unmatched_source.push(column),
        }
    }
    let unmatched_target: Vec<&Column> = target
        .columns
        .iter()
        .filter(|c| source.column(&c.name, cs).is_none())
        .collect();

    let resolution = resolve(
        &table,
        &unmatched_source,
        &unmatched_target,
        source,
        target,
        options,
    );

    for (old, new) in &matched {
        if !old.attributes_eq(new) {
            set.changes
                .push(Change::modify_column(table.clone(), (*old).clone(), (*new).clone()));
        }
    }

    for rename in &resolution.renames {
        let (Some(old), Some(new)) = (
            source.column(&rename.from, cs),
            target.column(&rename.to, cs),
        ) else {
            continue;
        };
        set.changes.push(Change::RenameColumn {
            table: table.clone(),
            old_name: old.name.clone(),
            new_name: new.name.clone(),
            column: old.clone(),
        });
        if !old.attributes_eq(new) {
            set.changes.push(Change::modify_column(
                table.clone(),
                old.renamed(new.name.clone()),
                new.clone(),
            ));
        }
    }

    for name in &resolution.dropped {
        if let Some(column) = source.column(name, cs) {
            set.changes.push(Change::DropColumn {
                table: table.clone(),
                column: column.clone(),
            });
        }
    }

    for name in &resolution.added {
        if let Some(index) = target.column_index(name, cs) {
            set.changes.push(Change::AddColumn {
                table: table.clone(),
                column: target.columns[index].clone(),
                position: added_position(target, index, &resolution.added, cs),
            });
        }
    }

    diff_constraints(source, target, &resolution.renames, options, &mut set);
    diff_indexes(source, target, &resolution.renames, options, &mut set);
    diff_options(source, target, options, &mut set);

    if let Some(warning) = column_order_warning(source, target, &matched, &resolution.renames, options)
    {
        set.warnings.push(warning);
    }

    set.ambiguities = resolution.ambiguities;
    set.warnings.extend(resolution.warnings);

    debug!(
        table = %table,
        changes = set.changes.len(),
        ambiguities = set.ambiguities.len(),
        warnings = set.warnings.len(),
        "Diffed table"
    );
    set
}

/// `End` when every later target column is new too, `First` at the front,
/// otherwise after the preceding target column.
fn added_position(target: &Table, index: usize, added: &[String], cs: bool) -> ColumnPosition {
    let is_added = |c: &Column| added.iter().any(|a| crate::schema::names_eq(a, &c.name, cs));
    if target.columns[index + 1..].iter().all(is_added) {
        ColumnPosition::End
    } else if index == 0 {
        ColumnPosition::First
    } else {
        ColumnPosition::After(target.columns[index - 1].name.clone())
    }
}

// ================================================================
// Constraints and indexes
// ================================================================

/// Maps the source's column references through the accepted renames.
fn apply_renames<T: Clone>(
    items: &[T],
    renames: &[ColumnRename],
    cs: bool,
    rename: impl Fn(&mut T, &str, &str, bool),
) -> Vec<T> {
    items
        .iter()
        .map(|item| {
            let mut mapped = item.clone();
            for r in renames {
                rename(&mut mapped, &r.from, &r.to, cs);
            }
            mapped
        })
        .collect()
}

/// Signature matching shared by constraints and indexes. Returns the
/// unmatched source positions and the unmatched target positions.
fn match_signatures(source: &[String], target: &[String]) -> (Vec<usize>, Vec<usize>) {
    let mut target_used = vec![false; target.len()];
    let mut unmatched = Vec::new();
    for (i, sig) in source.iter().enumerate() {
        let hit = target
            .iter()
            .enumerate()
            .position(|(j, other)| !target_used[j] && other == sig);
        match hit {
            Some(j) => target_used[j] = true,
            None => unmatched.push(i),
        }
    }
    let remaining = (0..target.len()).filter(|&j| !target_used[j]).collect();
    (unmatched, remaining)
}

/// Two constraints share an identity when both are primary keys or both
/// carry the same name.
fn same_constraint_identity(a: &Constraint, b: &Constraint, cs: bool) -> bool {
    if a.is_primary_key() && b.is_primary_key() {
        return true;
    }
    match (&a.name, &b.name) {
        (Some(x), Some(y)) => crate::schema::names_eq(x, y, cs),
        _ => false,
    }
}

fn diff_constraints(
    source: &Table,
    target: &Table,
    renames: &[ColumnRename],
    options: &DiffOptions,
    set: &mut ChangeSet,
) {
    let cs = options.case_sensitive;
    let mapped = apply_renames(&source.constraints, renames, cs, Constraint::rename_column);
    let signature = |c: &Constraint| with_name(c.signature(cs), c.name.as_deref(), options);
    let source_sigs: Vec<String> = mapped.iter().map(signature).collect();
    let target_sigs: Vec<String> = target.constraints.iter().map(signature).collect();
    let (unmatched, mut remaining) = match_signatures(&source_sigs, &target_sigs);

    let table = &target.name;
    for i in unmatched {
        let old = &source.constraints[i];
        let replacement = remaining
            .iter()
            .position(|&j| same_constraint_identity(&mapped[i], &target.constraints[j], cs));
        match replacement {
            Some(k) => {
                let j = remaining.remove(k);
                debug!(table = %table, constraint = %old.label(), "Constraint replaced");
                set.changes.push(Change::ReplaceConstraint {
                    table: table.clone(),
                    old: old.clone(),
                    new: target.constraints[j].clone(),
                });
            }
            None => set.changes.push(Change::DropConstraint {
                table: table.clone(),
                constraint: old.clone(),
            }),
        }
    }
    for j in remaining {
        set.changes.push(Change::AddConstraint {
            table: table.clone(),
            constraint: target.constraints[j].clone(),
        });
    }
}

fn diff_indexes(
    source: &Table,
    target: &Table,
    renames: &[ColumnRename],
    options: &DiffOptions,
    set: &mut ChangeSet,
) {
    let cs = options.case_sensitive;
    let mapped = apply_renames(&source.indexes, renames, cs, Index::rename_column);
    let signature = |i: &Index| with_name(i.signature(cs), Some(&i.name), options);
    let source_sigs: Vec<String> = mapped.iter().map(signature).collect();
    let target_sigs: Vec<String> = target.indexes.iter().map(signature).collect();
    let (unmatched, mut remaining) = match_signatures(&source_sigs, &target_sigs);

    let table = &target.name;
    for i in unmatched {
        let old = &source.indexes[i];
        let replacement = remaining.iter().position(|&j| {
            crate::schema::names_eq(&old.name, &target.indexes[j].name, cs)
        });
        match replacement {
            Some(k) => {
                let j = remaining.remove(k);
                debug!(table = %table, index = %old.name, "Index replaced");
                set.changes.push(Change::ReplaceIndex {
                    table: table.clone(),
                    old: old.clone(),
                    new: target.indexes[j].clone(),
                });
            }
            None => set.changes.push(Change::DropIndex {
                table: table.clone(),
                index: old.clone(),
            }),
        }
    }
    for j in remaining {
        set.changes.push(Change::AddIndex {
            table: table.clone(),
            index: target.indexes[j].clone(),
        });
    }
}

// ================================================================
// Table options and column order
// ================================================================

fn diff_options(source: &Table, target: &Table, options: &DiffOptions, set: &mut ChangeSet) {
    let names: BTreeSet<&String> = source.options.keys().chain(target.options.keys()).collect();
    for name in names {
        let old = source.options.get(name);
        let new = target.options.get(name);
        if old == new {
            continue;
        }
        set.warnings.push(DiffWarning::TableOptionChanged {
            table: target.name.clone(),
            name: name.clone(),
            old: old.cloned(),
            new: new.cloned(),
            rendered: options.include_table_options,
        });
        if options.include_table_options {
            set.changes.push(Change::SetTableOption {
                table: target.name.clone(),
                name: name.clone(),
                old: old.cloned(),
                new: new.cloned(),
            });
        }
    }
}

fn column_order_warning(
    source: &Table,
    target: &Table,
    matched: &[(&Column, &Column)],
    renames: &[ColumnRename],
    options: &DiffOptions,
) -> Option<DiffWarning> {
    let cs = options.case_sensitive;
    // Source order of the surviving columns, under their target names.
    let old_order: Vec<String> = source
        .columns
        .iter()
        .filter_map(|c| {
            matched
                .iter()
                .find(|(s, _)| std::ptr::eq(*s, c))
                .map(|(_, t)| t.name.clone())
                .or_else(|| {
                    renames
                        .iter()
                        .find(|r| r.from == c.name)
                        .map(|r| r.to.clone())
                })
        })
        .collect();
    let new_order: Vec<String> = target
        .columns
        .iter()
        .filter(|c| old_order.iter().any(|n| crate::schema::names_eq(n, &c.name, cs)))
        .map(|c| c.name.clone())
        .collect();
    let same = old_order.len() == new_order.len()
        && old_order
            .iter()
            .zip(&new_order)
            .all(|(a, b)| crate::schema::names_eq(a, b, cs));
    if same {
        None
    } else {
        Some(DiffWarning::ColumnOrderChanged {
            table: target.name.clone(),
            old_order,
            new_order,
        })
    }
}

// ================================================================
// Schema diff
// ================================================================

/// Pairs the tables of two schemas by name, in key order. A table present
/// on one side only is paired with `None`.
#[must_use]
pub fn pair_tables<'a>(
    source: &'a Schema,
    target: &'a Schema,
) -> Vec<(Option<&'a Table>, Option<&'a Table>)> {
    let keys: BTreeSet<&str> = source
        .entries()
        .map(|(k, _)| k)
        .chain(target.entries().map(|(k, _)| k))
        .collect();
    keys.into_iter()
        .map(|key| (source.get_by_key(key), target.get_by_key(key)))
        .collect()
}

/// Diffs one pair produced by [`pair_tables`]. Returns `None` when the
/// tables are identical.
///
/// A table only in the target yields a [`Change::CreateTable`] and a table
/// only in the source a [`Change::DropTable`]. Table options of created
/// tables are kept only with `include_table_options`.
#[must_use]
pub fn diff_pair(
    source: Option<&Table>,
    target: Option<&Table>,
    options: &DiffOptions,
) -> Option<ChangeSet> {
    match (source, target) {
        (Some(s), Some(t)) => Some(diff_tables(s, t, options)).filter(|set| !set.is_empty()),
        (None, Some(t)) => {
            let mut definition = t.clone();
            if !options.include_table_options {
                definition.options.clear();
            }
            debug!(table = %t.name, "Table created");
            let mut set = ChangeSet::new(t.name.clone(), t.name.clone());
            set.changes.push(Change::CreateTable {
                table: t.name.clone(),
                definition,
            });
            Some(set)
        }
        (Some(s), None) => {
            debug!(table = %s.name, "Table dropped");
            let mut set = ChangeSet::new(s.name.clone(), s.name.clone());
            set.changes.push(Change::DropTable {
                table: s.name.clone(),
                definition: s.clone(),
            });
            Some(set)
        }
        (None, None) => None,
    }
}

/// Diffs every table of two schemas, matched by name. Unchanged tables are
/// left out.
#[must_use]
pub fn diff_schema(source: &Schema, target: &Schema, options: &DiffOptions) -> Vec<ChangeSet> {
    pair_tables(source, target)
        .into_iter()
        .filter_map(|(s, t)| diff_pair(s, t, options))
        .collect()
}
