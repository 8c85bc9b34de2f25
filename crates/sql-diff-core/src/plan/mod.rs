//! Statement planner.
//!
//! Turns a [`ChangeSet`] into an ordered [`Plan`] of DDL statements for a
//! [`Dialect`]. Statements are ordered by [`Phase`] so that drops of keys
//! and indexes precede the column changes they depend on, columns exist
//! before the constraints that reference them, and foreign keys to tables
//! outside the diff come last. Within a phase the order is fully
//! determined by the changes, so planning the same change set twice gives
//! byte-identical output.

mod dialect;
mod render;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

pub use dialect::{
    AutoIncrementSyntax, ColumnCommentSyntax, CreateIndexSyntax, Dialect, DropConstraintSyntax,
    DropIndexSyntax, ImplicitNaming, ModifyColumnSyntax, QuotePolicy, RenameColumnSyntax,
};

use self::render::{Body, Fragment, Renderer};
use crate::ast::ObjectName;
use crate::diff::{Change, ChangeSet};
use crate::schema::{ConstraintKind, Schema};

/// Execution phases, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// `RENAME TO`.
    RenameTable,
    /// Foreign keys are dropped before the keys they reference.
    DropForeignKey,
    /// Other constraints.
    DropConstraint,
    /// Indexes.
    DropIndex,
    /// Column renames, before modifications that use the new name.
    RenameColumn,
    /// Column drops.
    DropColumn,
    /// Column modifications.
    ModifyColumn,
    /// New tables, without their foreign keys and indexes.
    CreateTable,
    /// New columns.
    AddColumn,
    /// New constraints, foreign keys within the diff included.
    AddConstraint,
    /// New indexes.
    AddIndex,
    /// Table options.
    TableOption,
    /// Table drops.
    DropTable,
    /// Foreign keys referencing tables outside the diff.
    DeferredForeignKey,
}

/// One executable statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// The DDL text, without a trailing semicolon.
    pub sql: String,
    /// Phase the statement belongs to.
    pub phase: Phase,
    /// Table the statement acts on.
    pub table: ObjectName,
    /// The atomic changes the statement realizes. Replacements appear as
    /// their drop and add halves, created tables without their foreign keys
    /// and indexes.
    pub changes: Vec<Change>,
}

/// Ordered statements realizing one or more change sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Plan {
    /// Name of the dialect the plan was rendered for.
    pub dialect: String,
    /// Statements in execution order.
    pub statements: Vec<Statement>,
}

impl Plan {
    /// Returns true when there is nothing to execute.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of statements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Every atomic change, in execution order.
    pub fn changes(&self) -> impl Iterator<Item = &Change> {
        self.statements.iter().flat_map(|s| s.changes.iter())
    }

    /// Statements joined by `;\n`, each terminated by `;`.
    #[must_use]
    pub fn to_sql(&self) -> String {
        self.statements
            .iter()
            .map(|s| format!("{};", s.sql))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

/// A change with no renderable form under a dialect.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{dialect}: cannot {change}: {reason}")]
pub struct UnsupportedOperation {
    /// Dialect name.
    pub dialect: String,
    /// The change as found in the change set.
    pub change: Box<Change>,
    /// What the dialect lacks.
    pub reason: String,
}

/// Planning failed for some changes.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanError {
    /// Some changes cannot be rendered. `partial` holds the plan of every
    /// change that could.
    #[error("{} change(s) cannot be rendered for {dialect}: {}", .failures.len(), join_failures(.failures))]
    Unsupported {
        /// Dialect name.
        dialect: String,
        /// One entry per failed change.
        failures: Vec<UnsupportedOperation>,
        /// Plan of the renderable changes.
        partial: Box<Plan>,
    },
}

impl PlanError {
    /// The failed changes.
    #[must_use]
    pub fn failures(&self) -> &[UnsupportedOperation] {
        match self {
            Self::Unsupported { failures, .. } => failures,
        }
    }

    /// The plan of every change that could be rendered.
    #[must_use]
    pub fn partial(&self) -> &Plan {
        match self {
            Self::Unsupported { partial, .. } => partial,
        }
    }
}

fn join_failures(failures: &[UnsupportedOperation]) -> String {
    failures
        .iter()
        .map(|f| format!("{} ({})", f.change, f.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

// ================================================================
// Planning
// ================================================================

/// Plans a single change set.
///
/// # Errors
///
/// Returns [`PlanError::Unsupported`] when any change cannot be rendered
/// under `dialect`; the error carries the partial plan.
pub fn plan(change_set: &ChangeSet, dialect: &Dialect) -> Result<Plan, PlanError> {
    plan_batch(std::slice::from_ref(change_set), dialect)
}

/// Plans several change sets as one batch. Phases apply across the batch:
/// every table is created before any foreign key is added.
///
/// # Errors
///
/// Returns [`PlanError::Unsupported`] when any change cannot be rendered
/// under `dialect`; the error carries the partial plan.
pub fn plan_batch(change_sets: &[ChangeSet], dialect: &Dialect) -> Result<Plan, PlanError> {
    let in_diff: BTreeSet<String> = change_sets
        .iter()
        .filter(|set| {
            !set
                .changes
                .iter()
                .any(|c| matches!(c, Change::DropTable { .. }))
        })
        .map(|set| Schema::key(&set.target_table))
        .collect();
    let drop_levels = drop_levels(change_sets);

    let mut fragments: Vec<Fragment> = Vec::new();
    let mut failures = Vec::new();
    for set in change_sets {
        let renderer = Renderer::new(dialect, &set.source_table, &in_diff);
        for change in set.sorted_changes() {
            match renderer.render(change) {
                Ok(rendered) => fragments.extend(rendered),
                Err(reason) => {
                    warn!(dialect = %dialect.name, change = %change, reason = %reason, "Unsupported change");
                    failures.push(UnsupportedOperation {
                        dialect: dialect.name.clone(),
                        change: Box::new(change.clone()),
                        reason,
                    });
                }
            }
        }
    }

    for fragment in &mut fragments {
        if fragment.phase == Phase::DropTable {
            fragment.rank = drop_levels
                .get(&Schema::key(&fragment.table))
                .copied()
                .unwrap_or_default();
        }
    }
    fragments.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    let plan = Plan {
        dialect: dialect.name.clone(),
        statements: group(fragments, dialect),
    };
    debug!(
        dialect = %dialect.name,
        statements = plan.statements.len(),
        failures = failures.len(),
        "Planned changes"
    );

    if failures.is_empty() {
        Ok(plan)
    } else {
        Err(PlanError::Unsupported {
            dialect: dialect.name.clone(),
            failures,
            partial: Box::new(plan),
        })
    }
}

/// Turns sorted fragments into statements, merging consecutive clauses on
/// the same table and phase when the dialect allows it.
fn group(fragments: Vec<Fragment>, dialect: &Dialect) -> Vec<Statement> {
    let mut statements: Vec<Statement> = Vec::new();
    let mut open_alter = false;
    for fragment in fragments {
        let Fragment {
            phase,
            table,
            body,
            change,
            ..
        } = fragment;
        match body {
            Body::Clause(clause) => {
                let merge = dialect.multi_clause_alter
                    && open_alter
                    && statements.last().is_some_and(|last| {
                        last.phase == phase && Schema::key(&last.table) == Schema::key(&table)
                    });
                match statements.last_mut() {
                    Some(last) if merge => {
                        last.sql.push_str(", ");
                        last.sql.push_str(&clause);
                        last.changes.extend(change);
                    }
                    _ => {
                        statements.push(Statement {
                            sql: format!("ALTER TABLE {} {clause}", dialect.quote_object(&table)),
                            phase,
                            table,
                            changes: change.into_iter().collect(),
                        });
                        open_alter = true;
                    }
                }
            }
            Body::Statement(sql) => {
                statements.push(Statement {
                    sql,
                    phase,
                    table,
                    changes: change.into_iter().collect(),
                });
                open_alter = false;
            }
        }
    }
    statements
}

/// Orders dropped tables so that a table is dropped before the tables its
/// foreign keys reference.
fn drop_levels(change_sets: &[ChangeSet]) -> BTreeMap<String, usize> {
    let dropped: BTreeMap<String, Vec<String>> = change_sets
        .iter()
        .flat_map(|set| set.changes.iter())
        .filter_map(|change| match change {
            Change::DropTable { table, definition } => {
                let referenced = definition
                    .constraints
                    .iter()
                    .filter_map(|c| match &c.kind {
                        ConstraintKind::ForeignKey { references, .. } => {
                            Some(Schema::key(&references.table))
                        }
                        _ => None,
                    })
                    .collect();
                Some((Schema::key(table), referenced))
            }
            _ => None,
        })
        .collect();

    let mut levels: BTreeMap<String, usize> = dropped.keys().map(|k| (k.clone(), 0)).collect();
    // Bounded relaxation; reference cycles stop growing after `len` rounds.
    for _ in 0..dropped.len() {
        let mut changed = false;
        for (table, referenced) in &dropped {
            let level = levels.get(table).copied().unwrap_or_default();
            for other in referenced {
                if other == table {
                    continue;
                }
                if let Some(other_level) = levels.get_mut(other) {
                    if *other_level <= level {
                        *other_level = level + 1;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{diff_schema, diff_tables, DiffOptions};
    use crate::schema::Table;

    fn table(sql: &str) -> Table {
        Schema::parse(sql)
            .unwrap()
            .into_tables()
            .into_iter()
            .next()
            .unwrap()
    }

    fn sqls(plan: &Plan) -> Vec<&str> {
        plan.statements.iter().map(|s| s.sql.as_str()).collect()
    }

    fn plan_for(source: &str, target: &str, dialect: &Dialect) -> Result<Plan, PlanError> {
        let set = diff_tables(&table(source), &table(target), &DiffOptions::default());
        plan(&set, dialect)
    }

    #[test]
    fn test_add_column_scenario() {
        for dialect in [Dialect::generic(), Dialect::mysql(), Dialect::postgres()] {
            let plan = plan_for(
                "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))",
                "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100), email VARCHAR(255))",
                &dialect,
            )
            .unwrap();
            assert_eq!(sqls(&plan), vec!["ALTER TABLE users ADD COLUMN email VARCHAR(255)"]);
            assert_eq!(plan.to_sql(), "ALTER TABLE users ADD COLUMN email VARCHAR(255);");
        }
    }

    #[test]
    fn test_multi_clause_merging() {
        let source = "CREATE TABLE t (a INT)";
        let target = "CREATE TABLE t (a INT, c INT, d INT)";
        let mysql = plan_for(source, target, &Dialect::mysql()).unwrap();
        assert_eq!(sqls(&mysql), vec!["ALTER TABLE t ADD COLUMN c INT, ADD COLUMN d INT"]);
        assert_eq!(mysql.statements[0].changes.len(), 2);

        let generic = plan_for(source, target, &Dialect::generic()).unwrap();
        assert_eq!(
            sqls(&generic),
            vec!["ALTER TABLE t ADD COLUMN c INT", "ALTER TABLE t ADD COLUMN d INT"]
        );
    }

    #[test]
    fn test_rename_precedes_modify() {
        let plan = plan_for(
            "CREATE TABLE t (id INT, name VARCHAR(50))",
            "CREATE TABLE t (id INT, full_name VARCHAR(100))",
            &Dialect::postgres(),
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                "ALTER TABLE t RENAME COLUMN name TO full_name",
                "ALTER TABLE t ALTER COLUMN full_name TYPE VARCHAR(100)",
            ]
        );
    }

    #[test]
    fn test_mysql57_uses_change_column() {
        let plan = plan_for(
            "CREATE TABLE t (id INT, name VARCHAR(50) NOT NULL)",
            "CREATE TABLE t (id INT, full_name VARCHAR(50) NOT NULL)",
            &Dialect::mysql57(),
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec!["ALTER TABLE t CHANGE COLUMN name full_name VARCHAR(50) NOT NULL"]
        );
    }

    #[test]
    fn test_index_drop_precedes_column_drop() {
        let plan = plan_for(
            "CREATE TABLE t (id INT, legacy INT, KEY idx_legacy (legacy))",
            "CREATE TABLE t (id INT)",
            &Dialect::postgres(),
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec!["DROP INDEX idx_legacy", "ALTER TABLE t DROP COLUMN legacy"]
        );
    }

    #[test]
    fn test_implicit_constraint_names() {
        let source = "CREATE TABLE t (a INT UNIQUE)";
        let target = "CREATE TABLE t (a INT)";
        let pg = plan_for(source, target, &Dialect::postgres()).unwrap();
        assert_eq!(sqls(&pg), vec!["ALTER TABLE t DROP CONSTRAINT t_a_key"]);

        let mysql = plan_for(source, target, &Dialect::mysql()).unwrap();
        assert_eq!(sqls(&mysql), vec!["ALTER TABLE t DROP INDEX a"]);

        let err = plan_for(source, target, &Dialect::generic()).unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert!(err.failures()[0].reason.contains("unnamed unique"));
    }

    #[test]
    fn test_unsupported_keeps_partial_plan() {
        let err = plan_for(
            "CREATE TABLE t (a INT, b VARCHAR(10))",
            "CREATE TABLE t (a BIGINT, b VARCHAR(10), c INT)",
            &Dialect::sqlite(),
        )
        .unwrap_err();
        assert_eq!(err.failures().len(), 1);
        assert!(matches!(*err.failures()[0].change, Change::ModifyColumn { .. }));
        assert_eq!(sqls(err.partial()), vec!["ALTER TABLE t ADD COLUMN c INT"]);
    }

    #[test]
    fn test_foreign_key_outside_diff_is_deferred() {
        let plan = plan_for(
            "CREATE TABLE orders (id INT, user_id INT)",
            "CREATE TABLE orders (id INT, user_id INT, total INT, \
             FOREIGN KEY (user_id) REFERENCES users (id))",
            &Dialect::postgres(),
        )
        .unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                "ALTER TABLE orders ADD COLUMN total INT",
                "ALTER TABLE orders ADD FOREIGN KEY (user_id) REFERENCES users (id)",
            ]
        );
        assert_eq!(plan.statements[1].phase, Phase::DeferredForeignKey);
    }

    #[test]
    fn test_batch_creates_tables_before_foreign_keys() {
        let target = Schema::parse(
            "CREATE TABLE b (id INT, a_id INT REFERENCES a (id));
             CREATE TABLE a (id INT PRIMARY KEY);",
        )
        .unwrap();
        let sets = diff_schema(&Schema::new(), &target, &DiffOptions::default());
        let plan = plan_batch(&sets, &Dialect::postgres()).unwrap();
        assert_eq!(
            sqls(&plan),
            vec![
                "CREATE TABLE a (\n    id INT NOT NULL,\n    PRIMARY KEY (id)\n)",
                "CREATE TABLE b (\n    id INT,\n    a_id INT\n)",
                "ALTER TABLE b ADD FOREIGN KEY (a_id) REFERENCES a (id)",
            ]
        );
        assert_eq!(plan.statements[2].phase, Phase::AddConstraint);
    }

    #[test]
    fn test_dropped_tables_referencing_others_go_first() {
        let source = Schema::parse(
            "CREATE TABLE a (id INT PRIMARY KEY);
             CREATE TABLE b (id INT, a_id INT REFERENCES a (id));",
        )
        .unwrap();
        let sets = diff_schema(&source, &Schema::new(), &DiffOptions::default());
        let plan = plan_batch(&sets, &Dialect::generic()).unwrap();
        assert_eq!(sqls(&plan), vec!["DROP TABLE b", "DROP TABLE a"]);
    }

    #[test]
    fn test_sqlite_autoincrement_is_inline() {
        let target = Schema::parse(
            "CREATE TABLE t (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT) WITHOUT ROWID",
        )
        .unwrap();
        let options = DiffOptions::default().with_include_table_options(true);
        let sets = diff_schema(&Schema::new(), &target, &options);
        let plan = plan_batch(&sets, &Dialect::sqlite()).unwrap();
        assert_eq!(
            sqls(&plan),
            vec!["CREATE TABLE t (\n    id INTEGER PRIMARY KEY AUTOINCREMENT,\n    name TEXT\n) WITHOUT ROWID"]
        );
    }

    #[test]
    fn test_planning_is_deterministic() {
        let source = "CREATE TABLE t (a INT, b INT, c INT, KEY (b), UNIQUE KEY uk (c))";
        let target = "CREATE TABLE t (a BIGINT NOT NULL, c INT, d INT, e INT, KEY (d))";
        let first = plan_for(source, target, &Dialect::mysql()).unwrap();
        let second = plan_for(source, target, &Dialect::mysql()).unwrap();
        assert_eq!(first.to_sql(), second.to_sql());
    }
}
