//! # sql-diff-cli
//!
//! Library half of the `sql-diff` binary: configuration, interactive input,
//! the diff pipeline, output formats, the optional AI client and its
//! progress spinner.

pub mod ai;
pub mod config;
pub mod error;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod spinner;

pub use config::{AiConfig, Config, ConfigError};
pub use error::{CliError, Result};
pub use pipeline::{DiffRequest, Outcome};
