//! Parsing of chat completion answers.

use sql_diff_cli::ai::{clean_sql_response, parse_analysis};

#[test]
fn test_parse_sectioned_analysis() {
    let response = "\
## Summary
The target adds an email column.
It is nullable.

## Suggestions
- Add a unique index on email
* Backfill existing rows

## Risks
- Long lock on large tables

## Best Practices
- Use utf8mb4 for text columns
";
    let analysis = parse_analysis(response);
    assert_eq!(analysis.summary, "The target adds an email column.\nIt is nullable.");
    assert_eq!(
        analysis.suggestions,
        vec!["Add a unique index on email", "Backfill existing rows"]
    );
    assert_eq!(analysis.risks, vec!["Long lock on large tables"]);
    assert_eq!(analysis.best_practices, vec!["Use utf8mb4 for text columns"]);
}

#[test]
fn test_unstructured_answer_becomes_summary() {
    let response = "Looks fine to me, nothing to add.";
    let analysis = parse_analysis(response);
    assert_eq!(analysis.summary, response);
    assert!(analysis.suggestions.is_empty());
    assert!(analysis.risks.is_empty());
}

#[test]
fn test_lines_outside_bullets_are_ignored_in_lists() {
    let analysis = parse_analysis("## Summary\nok\n## Risks\nnone really\n- data loss\n");
    assert_eq!(analysis.risks, vec!["data loss"]);
}

#[test]
fn test_unknown_heading_keeps_current_section() {
    let analysis = parse_analysis("## Suggestions\n- one\n## Misc\n- two\n");
    assert_eq!(analysis.suggestions, vec!["one", "two"]);
}

#[test]
fn test_clean_fenced_create_table() {
    let response = "Here is the table:\n```sql\nCREATE TABLE users (\n  id BIGINT PRIMARY KEY\n);\n```\nLet me know!";
    assert_eq!(
        clean_sql_response(response),
        "CREATE TABLE users (\n  id BIGINT PRIMARY KEY\n)"
    );
}

#[test]
fn test_clean_alter_statements_without_semicolons() {
    let response = "```mysql\nALTER TABLE users ADD COLUMN age INT\nALTER TABLE users ADD INDEX idx_age (age)\n```";
    assert_eq!(
        clean_sql_response(response),
        "ALTER TABLE users ADD COLUMN age INT\nALTER TABLE users ADD INDEX idx_age (age)"
    );
}

#[test]
fn test_clean_plain_text_is_trimmed() {
    assert_eq!(clean_sql_response("  SELECT 1;  "), "SELECT 1");
}
