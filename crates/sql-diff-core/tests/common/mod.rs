#![allow(dead_code)]

use sql_diff_core::ast::Statement;
use sql_diff_core::{
    diff_tables, parse, plan, ChangeSet, Dialect, DiffOptions, ParseError, Plan, Schema, Table,
};

pub fn parse_ok(sql: &str) -> Vec<Statement> {
    parse(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"))
}

pub fn parse_err(sql: &str) -> ParseError {
    parse(sql).expect_err(&format!("Expected parse error for: {sql}"))
}

pub fn schema(sql: &str) -> Schema {
    Schema::parse(sql).unwrap_or_else(|e| panic!("Failed to parse: {sql}\nError: {e}"))
}

pub fn table(sql: &str) -> Table {
    let schema = schema(sql);
    schema
        .single_table()
        .cloned()
        .unwrap_or_else(|| panic!("Expected exactly one table in: {sql}"))
}

pub fn diff(source: &str, target: &str) -> ChangeSet {
    diff_with(source, target, &DiffOptions::default())
}

pub fn diff_with(source: &str, target: &str, options: &DiffOptions) -> ChangeSet {
    diff_tables(&table(source), &table(target), options)
}

pub fn plan_sql(source: &str, target: &str, dialect: &Dialect) -> Vec<String> {
    let changes = diff(source, target);
    let plan: Plan = plan(&changes, dialect)
        .unwrap_or_else(|e| panic!("Planning failed for {}: {e}", dialect.name));
    plan.statements.into_iter().map(|s| s.sql).collect()
}

/// Table pairs exercising columns, keys, indexes, renames and type changes.
pub const PAIRS: &[(&str, &str)] = &[
    (
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))",
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100), email VARCHAR(255))",
    ),
    (
        "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(50))",
        "CREATE TABLE users (id INT PRIMARY KEY, full_name VARCHAR(50))",
    ),
    (
        "CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(10,2))",
        "CREATE TABLE orders (id INT PRIMARY KEY, amount DECIMAL(5,2))",
    ),
    (
        "CREATE TABLE items (id INT, sku VARCHAR(20), price INT, KEY idx_price (price))",
        "CREATE TABLE items (id BIGINT NOT NULL, sku VARCHAR(40), UNIQUE KEY uq_sku (sku))",
    ),
    (
        "CREATE TABLE posts (id INT PRIMARY KEY, title TEXT, created DATE)",
        "CREATE TABLE articles (id INT PRIMARY KEY, title TEXT NOT NULL DEFAULT '', created_at DATE)",
    ),
    (
        "CREATE TABLE t (a INT, b INT, CONSTRAINT ck_a CHECK (a > 0))",
        "CREATE TABLE t (a INT, b INT, c INT DEFAULT 0, CONSTRAINT ck_a CHECK (a >= 0))",
    ),
    (
        "CREATE TABLE t (id INT PRIMARY KEY, status VARCHAR(10) DEFAULT 'new')",
        "CREATE TABLE t (id INT PRIMARY KEY, status VARCHAR(10) DEFAULT 'open', note TEXT)",
    ),
];
