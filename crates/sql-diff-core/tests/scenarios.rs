//! End-to-end scenarios: DDL in, change set, plan and report out.

mod common;

use common::{diff, plan_sql, table};
use sql_diff_core::diff::ColumnPosition;
use sql_diff_core::{
    plan, replay, summarize, Change, ChangeKind, Dialect, DiffOptions, RiskReason,
};

// =============================================================================
// Added column
// =============================================================================

const USERS_V1: &str = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))";
const USERS_V2: &str =
    "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100), email VARCHAR(255))";

#[test]
fn test_added_column_is_a_single_change() {
    let changes = diff(USERS_V1, USERS_V2);
    assert_eq!(changes.changes.len(), 1);
    match &changes.changes[0] {
        Change::AddColumn {
            column, position, ..
        } => {
            assert_eq!(column.name, "email");
            assert_eq!(column.position, 3);
            assert_eq!(*position, ColumnPosition::End);
        }
        other => panic!("Expected AddColumn, got {other:?}"),
    }
    assert!(changes.ambiguities.is_empty());
    assert!(changes.warnings.is_empty());
}

#[test]
fn test_added_column_renders_one_statement() {
    for dialect in [Dialect::generic(), Dialect::postgres(), Dialect::sqlite()] {
        assert_eq!(
            plan_sql(USERS_V1, USERS_V2, &dialect),
            vec!["ALTER TABLE users ADD COLUMN email VARCHAR(255)"],
            "dialect {}",
            dialect.name
        );
    }
}

#[test]
fn test_added_column_report() {
    let report = summarize(&diff(USERS_V1, USERS_V2));
    assert_eq!(report.counts.added, 1);
    assert_eq!(report.entries.len(), 1);
    assert_eq!(report.entries[0].object, "email");
    assert!(!report.has_risks());
}

// =============================================================================
// Renamed column
// =============================================================================

#[test]
fn test_renamed_column() {
    let changes = diff(
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE users (id INT PRIMARY KEY, full_name VARCHAR(50))",
    );
    assert_eq!(changes.changes.len(), 1);
    assert!(matches!(
        &changes.changes[0],
        Change::RenameColumn { old_name, new_name, .. }
            if old_name == "name" && new_name == "full_name"
    ));
}

#[test]
fn test_renamed_column_per_dialect() {
    let source = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))";
    let target = "CREATE TABLE users (id INT PRIMARY KEY, full_name VARCHAR(50))";
    assert_eq!(
        plan_sql(source, target, &Dialect::postgres()),
        vec!["ALTER TABLE users RENAME COLUMN name TO full_name"]
    );
    assert_eq!(
        plan_sql(source, target, &Dialect::mysql57()),
        vec!["ALTER TABLE users CHANGE COLUMN name full_name VARCHAR(50)"]
    );
}

#[test]
fn test_rename_can_be_disabled() {
    let changes = common::diff_with(
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE users (id INT PRIMARY KEY, full_name VARCHAR(50))",
        &DiffOptions::default().with_detect_renames(false),
    );
    let kinds: Vec<ChangeKind> = changes.sorted_changes().iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![ChangeKind::DropColumn, ChangeKind::AddColumn]);
    assert!(changes.risk_of_data_loss());
}

// =============================================================================
// Narrowed column
// =============================================================================

#[test]
fn test_narrowed_decimal_is_flagged_but_planned() {
    let source = "CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(10,2))";
    let target = "CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(5,2))";
    let changes = diff(source, target);
    assert_eq!(changes.changes.len(), 1);
    let change = &changes.changes[0];
    assert_eq!(change.kind(), ChangeKind::ModifyColumn);
    assert!(change.risk_of_data_loss());
    assert_eq!(change.risks(), vec![RiskReason::TypeNarrowing]);

    let plan = plan(&changes, &Dialect::mysql()).unwrap();
    assert_eq!(
        plan.to_sql(),
        "ALTER TABLE orders MODIFY COLUMN amount DECIMAL(5,2);"
    );

    let report = summarize(&changes);
    assert!(report.has_risks());
    assert_eq!(report.counts.at_risk, 1);
    assert!(report.entries[0].risk_of_data_loss);
}

#[test]
fn test_narrowed_decimal_round_trips() {
    let source = table("CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(10,2))");
    let target = table("CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(5,2))");
    let options = DiffOptions::default();
    let changes = sql_diff_core::diff_tables(&source, &target, &options);
    let plan = plan(&changes, &Dialect::postgres()).unwrap();
    assert_eq!(
        plan.to_sql(),
        "ALTER TABLE orders ALTER COLUMN amount TYPE DECIMAL(5,2);"
    );
    let replayed = replay(&source, &plan).unwrap();
    assert!(replayed.structurally_eq(&target, &options));
}

// =============================================================================
// Ambiguity
// =============================================================================

#[test]
fn test_ambiguous_rename_is_reported() {
    let changes = diff(
        "CREATE TABLE contacts (id INT, email TEXT)",
        "CREATE TABLE contacts (id INT, email_home TEXT, email_work TEXT)",
    );
    assert_eq!(changes.ambiguities.len(), 1);
    let ambiguity = &changes.ambiguities[0];
    assert_eq!(ambiguity.sources, vec!["email".to_string()]);
    assert_eq!(
        ambiguity.targets,
        vec!["email_home".to_string(), "email_work".to_string()]
    );
    assert!(!changes
        .changes
        .iter()
        .any(|c| c.kind() == ChangeKind::RenameColumn));

    let err = changes.require_unambiguous().unwrap_err();
    assert_eq!(err.ambiguities.len(), 1);
}

#[test]
fn test_rename_hint_settles_ambiguity() {
    let options = DiffOptions::default()
        .with_rename_hint("email=email_work".parse().unwrap());
    let changes = common::diff_with(
        "CREATE TABLE contacts (id INT, email TEXT)",
        "CREATE TABLE contacts (id INT, email_home TEXT, email_work TEXT)",
        &options,
    );
    assert!(changes.ambiguities.is_empty());
    assert!(changes.require_unambiguous().is_ok());
    let kinds: Vec<ChangeKind> = changes.sorted_changes().iter().map(|c| c.kind()).collect();
    assert_eq!(kinds, vec![ChangeKind::RenameColumn, ChangeKind::AddColumn]);
}
