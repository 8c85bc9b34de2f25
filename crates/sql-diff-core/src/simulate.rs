//! Plan simulator.
//!
//! Replays the changes of a [`Plan`] against an in-memory schema model, in
//! execution order. Each change is checked against the state left by the
//! ones before it, which is how plans are verified without a database: a
//! plan that drops a column still covered by an index, or touches an object
//! that does not exist yet, fails here the same way it would fail on a
//! server. Identifiers are matched case-insensitively.

use tracing::{debug, trace};

use crate::ast::ObjectName;
use crate::diff::{Change, ColumnPosition};
use crate::plan::Plan;
use crate::schema::{names_eq, object_names_eq, Constraint, ConstraintKind, Index, Schema, Table};

/// A change cannot be applied to the current state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimulationError {
    /// The change targets a table that does not exist.
    #[error("table '{table}' does not exist")]
    UnknownTable {
        /// Table name.
        table: String,
    },

    /// A table is created or renamed onto an existing name.
    #[error("table '{table}' already exists")]
    TableExists {
        /// Table name.
        table: String,
    },

    /// A column, constraint or index does not exist.
    #[error("{object} '{name}' does not exist in table '{table}'")]
    Missing {
        /// Table name.
        table: String,
        /// Object kind.
        object: &'static str,
        /// Object name.
        name: String,
    },

    /// A column, constraint or index already exists.
    #[error("{object} '{name}' already exists in table '{table}'")]
    AlreadyExists {
        /// Table name.
        table: String,
        /// Object kind.
        object: &'static str,
        /// Object name.
        name: String,
    },

    /// A dropped column is still covered by a constraint or index.
    #[error("cannot drop column '{column}' of table '{table}': still used by {used_by}")]
    ColumnInUse {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// The object that covers it.
        used_by: String,
    },

    /// A dropped table is still referenced by a foreign key.
    #[error("cannot drop table '{table}': referenced by a foreign key on '{referenced_by}'")]
    TableInUse {
        /// Table name.
        table: String,
        /// Referencing table.
        referenced_by: String,
    },

    /// A single-table replay met a change for another table.
    #[error("change for table '{found}' cannot be applied to table '{expected}'")]
    ForeignTable {
        /// The replayed table.
        expected: String,
        /// The table the change names.
        found: String,
    },
}

// ================================================================
// Replay
// ================================================================

/// Replays a plan against a single table.
///
/// # Errors
///
/// Returns the first [`SimulationError`]; the plan then cannot run
/// against `source`.
pub fn replay(source: &Table, plan: &Plan) -> Result<Table, SimulationError> {
    let mut table = source.clone();
    for change in plan.changes() {
        trace!(change = %change, "Replaying change");
        match change {
            Change::RenameTable { table: to, old_name } => {
                if !object_names_eq(&table.name, old_name, false) {
                    return Err(foreign_table(&table, old_name));
                }
                table.name = to.clone();
            }
            Change::CreateTable { table: name, .. } | Change::DropTable { table: name, .. } => {
                return Err(foreign_table(&table, name));
            }
            _ => {
                if !object_names_eq(&table.name, change.table(), false) {
                    return Err(foreign_table(&table, change.table()));
                }
                apply(&mut table, change)?;
            }
        }
    }
    debug!(table = %table.name, statements = plan.len(), "Replayed plan");
    Ok(table)
}

/// Replays a plan against a schema. Table renames and column renames are
/// propagated to foreign keys of every table.
///
/// # Errors
///
/// Returns the first [`SimulationError`].
pub fn replay_schema(source: &Schema, plan: &Plan) -> Result<Schema, SimulationError> {
    let mut schema = source.clone();
    for change in plan.changes() {
        trace!(change = %change, "Replaying change");
        apply_to_schema(&mut schema, change)?;
    }
    debug!(tables = schema.len(), statements = plan.len(), "Replayed plan");
    Ok(schema)
}

/// Applies one change to a schema.
///
/// # Errors
///
/// Returns a [`SimulationError`] when the change does not fit the schema.
pub fn apply_to_schema(schema: &mut Schema, change: &Change) -> Result<(), SimulationError> {
    match change {
        Change::CreateTable { table, definition } => {
            if schema.contains(table) {
                return Err(SimulationError::TableExists {
                    table: table.to_string(),
                });
            }
            let mut definition = definition.clone();
            definition.name = table.clone();
            definition.renumber();
            schema.insert(definition);
        }
        Change::DropTable { table, .. } => {
            if !schema.contains(table) {
                return Err(unknown_table(table));
            }
            if let Some(referencing) = schema
                .tables()
                .filter(|t| !object_names_eq(&t.name, table, false))
                .find(|t| references_table(t, table))
            {
                return Err(SimulationError::TableInUse {
                    table: table.to_string(),
                    referenced_by: referencing.name.to_string(),
                });
            }
            schema.remove(table);
        }
        Change::RenameTable { table, old_name } => {
            let Some(mut renamed) = schema.remove(old_name) else {
                return Err(unknown_table(old_name));
            };
            if schema.contains(table) {
                let existing = table.to_string();
                schema.insert(renamed);
                return Err(SimulationError::TableExists { table: existing });
            }
            renamed.name = table.clone();
            schema.insert(renamed);
            for other in schema.tables_mut() {
                for constraint in &mut other.constraints {
                    if let ConstraintKind::ForeignKey { references, .. } = &mut constraint.kind {
                        if object_names_eq(&references.table, old_name, false) {
                            references.table = table.clone();
                        }
                    }
                }
            }
        }
        Change::DropColumn { table, column } => {
            if let Some(referencing) = schema
                .tables()
                .filter(|t| !object_names_eq(&t.name, table, false))
                .find(|t| references_column(t, table, &column.name))
            {
                return Err(SimulationError::ColumnInUse {
                    table: table.to_string(),
                    column: column.name.clone(),
                    used_by: format!("a foreign key on '{}'", referencing.name),
                });
            }
            let target = schema.get_mut(table).ok_or_else(|| unknown_table(table))?;
            apply(target, change)?;
        }
        Change::RenameColumn {
            table,
            old_name,
            new_name,
            ..
        } => {
            let target = schema.get_mut(table).ok_or_else(|| unknown_table(table))?;
            apply(target, change)?;
            for other in schema.tables_mut() {
                if object_names_eq(&other.name, table, false) {
                    continue;
                }
                for constraint in &mut other.constraints {
                    if let ConstraintKind::ForeignKey { references, .. } = &mut constraint.kind {
                        if object_names_eq(&references.table, table, false) {
                            for column in &mut references.columns {
                                if names_eq(column, old_name, false) {
                                    column.clone_from(new_name);
                                }
                            }
                        }
                    }
                }
            }
        }
        _ => {
            let table = change.table();
            let target = schema.get_mut(table).ok_or_else(|| unknown_table(table))?;
            apply(target, change)?;
        }
    }
    Ok(())
}

/// Applies one table-level change. Table creation, drop and rename are
/// schema-level and rejected here.
///
/// # Errors
///
/// Returns a [`SimulationError`] when the change does not fit the table.
pub fn apply(table: &mut Table, change: &Change) -> Result<(), SimulationError> {
    match change {
        Change::AddColumn {
            column, position, ..
        } => {
            if table.column(&column.name, false).is_some() {
                return Err(exists(table, "column", &column.name));
            }
            let at = match position {
                ColumnPosition::End => table.columns.len(),
                ColumnPosition::First => 0,
                ColumnPosition::After(previous) => {
                    table
                        .column_index(previous, false)
                        .ok_or_else(|| missing(table, "column", previous))?
                        + 1
                }
            };
            table.columns.insert(at, column.clone());
            table.renumber();
        }
        Change::DropColumn { column, .. } => {
            let Some(at) = table.column_index(&column.name, false) else {
                return Err(missing(table, "column", &column.name));
            };
            if let Some(used_by) = column_user(table, &column.name) {
                return Err(SimulationError::ColumnInUse {
                    table: table.name.to_string(),
                    column: column.name.clone(),
                    used_by,
                });
            }
            table.columns.remove(at);
            table.renumber();
        }
        Change::ModifyColumn { new, .. } => {
            let Some(at) = table.column_index(&new.name, false) else {
                return Err(missing(table, "column", &new.name));
            };
            table.columns[at] = new.clone();
            table.renumber();
        }
        Change::RenameColumn {
            old_name, new_name, ..
        } => {
            let Some(at) = table.column_index(old_name, false) else {
                return Err(missing(table, "column", old_name));
            };
            if !names_eq(old_name, new_name, false) && table.column(new_name, false).is_some() {
                return Err(exists(table, "column", new_name));
            }
            table.columns[at].name.clone_from(new_name);
            for constraint in &mut table.constraints {
                constraint.rename_column(old_name, new_name, false);
                if let ConstraintKind::ForeignKey { references, .. } = &mut constraint.kind {
                    // Self-references follow the rename too.
                    if object_names_eq(&references.table, &table.name, false) {
                        for column in &mut references.columns {
                            if names_eq(column, old_name, false) {
                                column.clone_from(new_name);
                            }
                        }
                    }
                }
            }
            for index in &mut table.indexes {
                index.rename_column(old_name, new_name, false);
            }
        }
        Change::AddConstraint { constraint, .. } => add_constraint(table, constraint)?,
        Change::DropConstraint { constraint, .. } => drop_constraint(table, constraint)?,
        Change::ReplaceConstraint { old, new, .. } => {
            drop_constraint(table, old)?;
            add_constraint(table, new)?;
        }
        Change::AddIndex { index, .. } => add_index(table, index)?,
        Change::DropIndex { index, .. } => drop_index(table, index)?,
        Change::ReplaceIndex { old, new, .. } => {
            drop_index(table, old)?;
            add_index(table, new)?;
        }
        Change::SetTableOption { name, new, .. } => match new {
            Some(value) => {
                table.options.insert(name.to_ascii_uppercase(), value.clone());
            }
            None => {
                table.options.remove(&name.to_ascii_uppercase());
            }
        },
        Change::RenameTable { table: name, .. }
        | Change::CreateTable { table: name, .. }
        | Change::DropTable { table: name, .. } => return Err(foreign_table(table, name)),
    }
    Ok(())
}

// ================================================================
// Constraints and indexes
// ================================================================

fn add_constraint(table: &mut Table, constraint: &Constraint) -> Result<(), SimulationError> {
    let label = describe(constraint);
    if constraint.is_primary_key() && table.primary_key().is_some() {
        return Err(exists(table, "constraint", "primary key"));
    }
    if find_constraint(table, constraint).is_some() {
        return Err(exists(table, "constraint", &label));
    }
    if let Some(name) = &constraint.name {
        if table
            .constraints
            .iter()
            .any(|c| c.name.as_deref().is_some_and(|n| names_eq(n, name, false)))
        {
            return Err(exists(table, "constraint", name));
        }
    }
    for column in constraint.columns() {
        if table.column(column, false).is_none() {
            return Err(missing(table, "column", column));
        }
    }
    table.constraints.push(constraint.clone());
    Ok(())
}

fn drop_constraint(table: &mut Table, constraint: &Constraint) -> Result<(), SimulationError> {
    let Some(at) = find_constraint(table, constraint) else {
        return Err(missing(table, "constraint", &describe(constraint)));
    };
    table.constraints.remove(at);
    Ok(())
}

/// Named constraints are found by name, unnamed ones by signature.
fn find_constraint(table: &Table, constraint: &Constraint) -> Option<usize> {
    match &constraint.name {
        Some(name) => table
            .constraints
            .iter()
            .position(|c| c.name.as_deref().is_some_and(|n| names_eq(n, name, false))),
        None => {
            let signature = constraint.signature(false);
            table
                .constraints
                .iter()
                .position(|c| c.signature(false) == signature)
        }
    }
}

fn add_index(table: &mut Table, index: &Index) -> Result<(), SimulationError> {
    if table.index(&index.name, false).is_some() {
        return Err(exists(table, "index", &index.name));
    }
    for column in &index.columns {
        if table.column(&column.name, false).is_none() {
            return Err(missing(table, "column", &column.name));
        }
    }
    table.indexes.push(index.clone());
    Ok(())
}

fn drop_index(table: &mut Table, index: &Index) -> Result<(), SimulationError> {
    let Some(at) = table
        .indexes
        .iter()
        .position(|i| names_eq(&i.name, &index.name, false))
    else {
        return Err(missing(table, "index", &index.name));
    };
    table.indexes.remove(at);
    Ok(())
}

// ================================================================
// Helpers
// ================================================================

fn describe(constraint: &Constraint) -> String {
    constraint.name.clone().unwrap_or_else(|| {
        format!("{} ({})", constraint.label(), constraint.columns().join(", "))
    })
}

/// First constraint or index of the table covering `column`.
fn column_user(table: &Table, column: &str) -> Option<String> {
    if let Some(constraint) = table
        .constraints
        .iter()
        .find(|c| c.references_column(column, false))
    {
        return Some(format!("{} '{}'", constraint.label(), describe(constraint)));
    }
    table
        .indexes
        .iter()
        .find(|i| i.references_column(column, false))
        .map(|index| format!("index '{}'", index.name))
}

fn references_table(table: &Table, referenced: &ObjectName) -> bool {
    table.constraints.iter().any(|c| match &c.kind {
        ConstraintKind::ForeignKey { references, .. } => {
            object_names_eq(&references.table, referenced, false)
        }
        _ => false,
    })
}

fn references_column(table: &Table, referenced: &ObjectName, column: &str) -> bool {
    table.constraints.iter().any(|c| match &c.kind {
        ConstraintKind::ForeignKey { references, .. } => {
            object_names_eq(&references.table, referenced, false)
                && references.columns.iter().any(|c| names_eq(c, column, false))
        }
        _ => false,
    })
}

fn unknown_table(table: &ObjectName) -> SimulationError {
    SimulationError::UnknownTable {
        table: table.to_string(),
    }
}

fn foreign_table(table: &Table, found: &ObjectName) -> SimulationError {
    SimulationError::ForeignTable {
        expected: table.name.to_string(),
        found: found.to_string(),
    }
}

fn missing(table: &Table, object: &'static str, name: &str) -> SimulationError {
    SimulationError::Missing {
        table: table.name.to_string(),
        object,
        name: name.to_string(),
    }
}

fn exists(table: &Table, object: &'static str, name: &str) -> SimulationError {
    SimulationError::AlreadyExists {
        table: table.name.to_string(),
        object,
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_schema, diff_tables, DiffOptions};
    use crate::plan::{plan, plan_batch, Dialect};

    fn table(sql: &str) -> Table {
        Schema::parse(sql)
            .unwrap()
            .into_tables()
            .into_iter()
            .next()
            .unwrap()
    }

    fn round_trip(source: &str, target: &str, dialect: &Dialect) {
        let options = DiffOptions::default();
        let source = table(source);
        let target = table(target);
        let changes = diff_tables(&source, &target, &options);
        let plan = plan(&changes, dialect).unwrap();
        let replayed = replay(&source, &plan).unwrap();
        assert!(
            replayed.structurally_eq(&target, &options),
            "replayed:\n{replayed:#?}\ntarget:\n{target:#?}"
        );
    }

    #[test]
    fn test_round_trip_columns_and_keys() {
        round_trip(
            "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50), age INT, KEY idx_age (age))",
            "CREATE TABLE users (id BIGINT PRIMARY KEY, full_name VARCHAR(80) NOT NULL, \
             email VARCHAR(255), UNIQUE KEY uq_email (email))",
            &Dialect::mysql(),
        );
    }

    #[test]
    fn test_round_trip_table_rename() {
        round_trip(
            "CREATE TABLE users (id INT, name TEXT)",
            "CREATE TABLE accounts (id INT, name TEXT, created_at TIMESTAMP)",
            &Dialect::postgres(),
        );
    }

    #[test]
    fn test_add_column_honours_position() {
        let mut t = table("CREATE TABLE t (a INT, c INT)");
        let t_name = t.name.clone();
        let b = table("CREATE TABLE x (b INT)").columns[0].clone();
        apply(
            &mut t,
            &Change::AddColumn {
                table: t_name.clone(),
                column: b,
                position: ColumnPosition::After("A".into()),
            },
        )
        .unwrap();
        let names: Vec<(&str, usize)> = t
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.position))
            .collect();
        assert_eq!(names, vec![("a", 1), ("b", 2), ("c", 3)]);
    }

    #[test]
    fn test_drop_indexed_column_fails() {
        let mut t = table("CREATE TABLE t (a INT, b INT, KEY idx_b (b))");
        let t_name = t.name.clone();
        let column = t.columns[1].clone();
        let err = apply(
            &mut t,
            &Change::DropColumn {
                table: t_name.clone(),
                column,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::ColumnInUse { ref used_by, .. } if used_by == "index 'idx_b'"));
    }

    #[test]
    fn test_missing_and_existing_objects() {
        let mut t = table("CREATE TABLE t (a INT)");
        let t_name = t.name.clone();
        let ghost = table("CREATE TABLE x (ghost INT)").columns[0].clone();
        let err = apply(
            &mut t,
            &Change::DropColumn {
                table: t_name.clone(),
                column: ghost,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::Missing { object: "column", .. }));

        let a = t.columns[0].clone();
        let err = apply(
            &mut t,
            &Change::AddColumn {
                table: t_name.clone(),
                column: a,
                position: ColumnPosition::End,
            },
        )
        .unwrap_err();
        assert!(matches!(err, SimulationError::AlreadyExists { object: "column", .. }));
    }

    #[test]
    fn test_rename_rewrites_indexes() {
        let mut t = table("CREATE TABLE t (a INT, KEY idx_a (a))");
        let t_name = t.name.clone();
        let column = t.columns[0].clone();
        apply(
            &mut t,
            &Change::RenameColumn {
                table: t_name.clone(),
                old_name: "a".into(),
                new_name: "b".into(),
                column,
            },
        )
        .unwrap();
        assert!(t.indexes[0].references_column("b", true));
    }

    #[test]
    fn test_single_table_replay_rejects_other_tables() {
        let source = table("CREATE TABLE t (a INT)");
        let changes = diff_tables(
            &table("CREATE TABLE u (a INT)"),
            &table("CREATE TABLE u (a INT, b INT)"),
            &DiffOptions::default(),
        );
        let plan = plan(&changes, &Dialect::generic()).unwrap();
        assert!(matches!(
            replay(&source, &plan),
            Err(SimulationError::ForeignTable { .. })
        ));
    }

    #[test]
    fn test_schema_round_trip_with_foreign_keys() {
        let options = DiffOptions::default();
        let source = Schema::parse(
            "CREATE TABLE users (id INT PRIMARY KEY);
             CREATE TABLE legacy (id INT PRIMARY KEY, user_id INT REFERENCES users (id));",
        )
        .unwrap();
        let target = Schema::parse(
            "CREATE TABLE users (id INT PRIMARY KEY, email TEXT);
             CREATE TABLE orders (id INT PRIMARY KEY, user_id INT REFERENCES users (id));",
        )
        .unwrap();
        let sets = diff_schema(&source, &target, &options);
        let plan = plan_batch(&sets, &Dialect::postgres()).unwrap();
        let replayed = replay_schema(&source, &plan).unwrap();
        assert!(replayed.structurally_eq(&target, &options));
    }

    #[test]
    fn test_drop_referenced_table_fails() {
        let mut schema = Schema::parse(
            "CREATE TABLE users (id INT PRIMARY KEY);
             CREATE TABLE orders (id INT, user_id INT REFERENCES users (id));",
        )
        .unwrap();
        let users = schema.get(&ObjectName::bare("users")).unwrap().clone();
        let err = apply_to_schema(
            &mut schema,
            &Change::DropTable {
                table: users.name.clone(),
                definition: users,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            SimulationError::TableInUse {
                table: "users".into(),
                referenced_by: "orders".into(),
            }
        );
    }

    #[test]
    fn test_table_rename_rewrites_references() {
        let mut schema = Schema::parse(
            "CREATE TABLE users (id INT PRIMARY KEY);
             CREATE TABLE orders (id INT, user_id INT REFERENCES users (id));",
        )
        .unwrap();
        apply_to_schema(
            &mut schema,
            &Change::RenameTable {
                table: ObjectName::bare("accounts"),
                old_name: ObjectName::bare("users"),
            },
        )
        .unwrap();
        let orders = schema.get(&ObjectName::bare("orders")).unwrap();
        let fk = orders.constraints.iter().find(|c| c.is_foreign_key()).unwrap();
        match &fk.kind {
            ConstraintKind::ForeignKey { references, .. } => {
                assert_eq!(references.table, ObjectName::bare("accounts"));
            }
            _ => unreachable!(),
        }
    }
}
