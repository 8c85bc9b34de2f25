//! Tests for DDL parsing and parse errors.

mod common;
use common::*;

use sql_diff_core::ast::Statement;

#[test]
fn test_empty_input_has_no_statements() {
    assert!(parse_ok("").is_empty());
    assert!(parse_ok("  ;; -- nothing here\n").is_empty());
}

#[test]
fn test_dump_with_comments_and_separators() {
    let statements = parse_ok(
        "-- generated dump
         /* tables */
         CREATE TABLE a (id INT); # mysql style comment
         ;
         CREATE TABLE IF NOT EXISTS b (id INT);
         CREATE INDEX idx_b ON b (id);",
    );
    assert_eq!(statements.len(), 3);
    assert!(matches!(&statements[0], Statement::CreateTable(t) if t.name.name == "a"));
    assert!(matches!(&statements[1], Statement::CreateTable(t) if t.if_not_exists));
    assert!(matches!(&statements[2], Statement::CreateIndex(_)));
}

#[test]
fn test_quoted_identifiers_in_every_style() {
    let statements = parse_ok("CREATE TABLE `a b` (\"c d\" INT, [e f] INT)");
    let Statement::CreateTable(t) = &statements[0] else {
        panic!("expected CREATE TABLE");
    };
    assert_eq!(t.name.name, "a b");
    let names: Vec<&str> = t.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["c d", "e f"]);
}

#[test]
fn test_error_unclosed_paren() {
    let _ = parse_err("CREATE TABLE t (id INT");
}

#[test]
fn test_error_missing_table_name() {
    let _ = parse_err("CREATE TABLE (id INT)");
}

#[test]
fn test_error_not_ddl() {
    let err = parse_err("SELECT * FROM users");
    assert_eq!(err.position(), 0);
    assert!(err.message.contains("unsupported"));
}

#[test]
fn test_error_unterminated_string() {
    let _ = parse_err("CREATE TABLE t (a VARCHAR(5) DEFAULT 'x)");
}

#[test]
fn test_error_missing_separator_between_statements() {
    let _ = parse_err("CREATE TABLE a (id INT) CREATE TABLE b (id INT)");
}

#[test]
fn test_error_in_second_statement_is_reported() {
    let sql = "CREATE TABLE a (id INT);\nCREATE TABLE b (id INT,)";
    let err = parse_err(sql);
    assert_eq!(err.line_col(sql).0, 2);
}

#[test]
fn test_error_unterminated_block_comment() {
    let sql = "CREATE TABLE t (a INT) /* CREATE TABLE u (b INT)";
    let err = parse_err(sql);
    assert!(err.message.contains("unterminated block comment"));
    assert_eq!(err.position(), sql.find("/*").unwrap());
}

#[test]
fn test_schema_parse_rejects_unterminated_block_comment() {
    let err = sql_diff_core::Schema::parse("CREATE TABLE t (a INT);\n/* CREATE TABLE u (b INT);");
    assert!(err.is_err());
}
