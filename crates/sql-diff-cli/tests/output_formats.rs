//! Human, JSON and DDL renderings of a diff.

mod common;

use common::{outcome, USERS_V1, USERS_V2};
use sql_diff_cli::ai::Analysis;
use sql_diff_cli::output::{ddl_script, render_human, render_json, write_file};
use sql_diff_core::Dialect;

#[test]
fn test_human_report_without_color() {
    let outcome = outcome(USERS_V1, USERS_V2, &Dialect::mysql());
    let text = render_human(&outcome, Some(&outcome.plan), None, false);
    assert!(text.starts_with("users: 1 added, 0 removed, 0 modified, 0 renamed\n"));
    assert!(text.contains("  + add column email"));
    assert!(text.contains("Total: 1 added"));
    assert!(text.contains("-- DDL (mysql)\nALTER TABLE users ADD COLUMN email VARCHAR(255);\n"));
    assert!(!text.contains('\u{1b}'));
}

#[test]
fn test_human_report_for_identical_schemas() {
    let outcome = outcome(USERS_V1, USERS_V1, &Dialect::mysql());
    let text = render_human(&outcome, Some(&outcome.plan), None, false);
    assert_eq!(text, "No differences.\n");
}

#[test]
fn test_human_report_withheld_plan_and_analysis() {
    let outcome = outcome(
        "CREATE TABLE t (id INT, email TEXT)",
        "CREATE TABLE t (id INT, email_home TEXT, email_work TEXT)",
        &Dialect::generic(),
    );
    let analysis = Analysis {
        summary: "Two address columns.".to_string(),
        risks: vec!["email data is lost".to_string()],
        ..Analysis::default()
    };
    let text = render_human(&outcome, outcome.publishable_plan(false), Some(&analysis), false);
    assert!(text.contains("  ? ambiguous rename in t"));
    assert!(text.contains("DDL withheld"));
    assert!(!text.contains("DROP COLUMN"));
    assert!(text.contains("AI analysis\nTwo address columns.\n"));
    assert!(text.contains("Risks\n  - email data is lost\n"));
}

#[test]
fn test_json_document() {
    let outcome = outcome(USERS_V1, USERS_V2, &Dialect::postgres());
    let text = render_json(&outcome, Some(&outcome.plan), None).unwrap();
    let json: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["identical"], false);
    assert_eq!(json["sql"], "ALTER TABLE users ADD COLUMN email VARCHAR(255);");
    assert_eq!(json["plan"]["dialect"], "postgres");
    assert_eq!(json["report"]["counts"]["added"], 1);
    assert!(json["unsupported"].as_array().unwrap().is_empty());
    assert!(json.get("analysis").is_none());
}

#[test]
fn test_json_lists_unsupported_changes() {
    let outcome = outcome(
        "CREATE TABLE t (id INT, amount DECIMAL(10,2))",
        "CREATE TABLE t (id INT, amount DECIMAL(12,2))",
        &Dialect::sqlite(),
    );
    let json: serde_json::Value =
        serde_json::from_str(&render_json(&outcome, Some(&outcome.plan), None).unwrap()).unwrap();
    let unsupported = json["unsupported"].as_array().unwrap();
    assert_eq!(unsupported.len(), 1);
    assert!(unsupported[0].as_str().unwrap().starts_with("sqlite: cannot"));
}

#[test]
fn test_ddl_script_and_file() {
    let outcome = outcome(USERS_V1, USERS_V2, &Dialect::generic());
    let script = ddl_script(&outcome.plan);
    assert_eq!(script, "ALTER TABLE users ADD COLUMN email VARCHAR(255);\n");

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("migration.sql");
    write_file(&path, &script).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), script);

    let missing = dir.path().join("no-such-dir").join("out.sql");
    assert_eq!(write_file(&missing, &script).unwrap_err().exit_code(), 1);
}

#[test]
fn test_empty_plan_gives_empty_script() {
    let outcome = outcome(USERS_V1, USERS_V1, &Dialect::generic());
    assert_eq!(ddl_script(&outcome.plan), "");
}
