//! Shared helpers for the CLI integration tests.

#![allow(dead_code)]

use sql_diff_cli::pipeline::{self, DiffRequest, Outcome};
use sql_diff_core::{Dialect, DiffOptions};

pub const USERS_V1: &str = "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100))";
pub const USERS_V2: &str =
    "CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(100), email VARCHAR(255))";

pub const SHOP_V1: &str = "
CREATE TABLE customers (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL);
CREATE TABLE orders (id INT PRIMARY KEY, customer_id INT NOT NULL, total DECIMAL(10,2));
CREATE TABLE audit (id INT PRIMARY KEY, note TEXT);
";

pub const SHOP_V2: &str = "
CREATE TABLE customers (id INT PRIMARY KEY, email VARCHAR(255) NOT NULL, phone VARCHAR(32));
CREATE TABLE orders (id INT PRIMARY KEY, customer_id INT NOT NULL, total DECIMAL(8,2));
CREATE TABLE refunds (id INT PRIMARY KEY, amount DECIMAL(10,2) NOT NULL);
";

/// Runs the pipeline with default options.
pub fn outcome(source: &str, target: &str, dialect: &Dialect) -> Outcome {
    outcome_with(source, target, &DiffOptions::default(), dialect)
}

/// Runs the pipeline with the given options.
pub fn outcome_with(source: &str, target: &str, options: &DiffOptions, dialect: &Dialect) -> Outcome {
    pipeline::run(&DiffRequest {
        source,
        target,
        options,
        dialect,
    })
    .unwrap()
}
