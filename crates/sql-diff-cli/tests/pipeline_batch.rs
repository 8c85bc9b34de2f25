//! The diff pipeline across several tables.

mod common;

use common::{outcome, outcome_with, SHOP_V1, SHOP_V2};
use sql_diff_cli::pipeline::{self, diff_schemas, DiffRequest};
use sql_diff_core::{diff_schema, ChangeKind, Dialect, DiffOptions, RenameHint, Schema};

#[test]
fn test_parallel_fan_out_matches_sequential_diff() {
    let source = Schema::parse(SHOP_V1).unwrap();
    let target = Schema::parse(SHOP_V2).unwrap();
    let options = DiffOptions::default();
    assert_eq!(
        diff_schemas(&source, &target, &options),
        diff_schema(&source, &target, &options)
    );
}

#[test]
fn test_batch_outcome() {
    let outcome = outcome(SHOP_V1, SHOP_V2, &Dialect::mysql());
    let tables: Vec<&str> = outcome
        .change_sets
        .iter()
        .map(|set| set.target_table.name.as_str())
        .collect();
    assert_eq!(tables, vec!["audit", "customers", "orders", "refunds"]);
    assert_eq!(outcome.report.counts.added, 2);
    assert_eq!(outcome.report.counts.removed, 1);
    assert_eq!(outcome.report.counts.modified, 1);
    assert!(outcome.report.has_risks());
    assert!(outcome.plan_error.is_none());
    assert!(outcome.check(false).is_ok());

    let sql = outcome.plan.to_sql();
    assert!(sql.contains("DROP TABLE audit;"));
    assert!(sql.contains("MODIFY COLUMN total DECIMAL(8,2)"));
}

#[test]
fn test_rename_hint_from_options() {
    let options = DiffOptions::default()
        .with_detect_renames(false)
        .with_rename_hint(RenameHint::new("name", "full_name").for_table("users"));
    let outcome = outcome_with(
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE users (id INT PRIMARY KEY, full_name VARCHAR(50))",
        &options,
        &Dialect::postgres(),
    );
    let set = &outcome.change_sets[0];
    assert_eq!(set.changes.len(), 1);
    assert_eq!(set.changes[0].kind(), ChangeKind::RenameColumn);
    assert_eq!(
        outcome.plan.to_sql(),
        "ALTER TABLE users RENAME COLUMN name TO full_name;"
    );
}

fn exit_code(source: &str, target: &str, options: &DiffOptions) -> i32 {
    let dialect = Dialect::generic();
    pipeline::run(&DiffRequest {
        source,
        target,
        options,
        dialect: &dialect,
    })
    .unwrap_err()
    .exit_code()
}

#[test]
fn test_invalid_input_exit_codes() {
    let options = DiffOptions::default();
    assert_eq!(exit_code("CREATE TABLE t (id INT", "CREATE TABLE t (id INT)", &options), 2);
    assert_eq!(exit_code("CREATE TABLE t (a INT, a INT)", "CREATE TABLE t (a INT)", &options), 2);

    let bad = DiffOptions::default().with_rename_threshold(-0.5);
    assert_eq!(exit_code("CREATE TABLE t (a INT)", "CREATE TABLE t (a INT)", &bad), 1);
}
