//! Crate-level error type.

use crate::diff::{AmbiguousRenameError, OptionsError};
use crate::parser::ParseError;
use crate::plan::PlanError;
use crate::schema::SchemaError;
use crate::simulate::SimulationError;

/// Any error the engine reports.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Malformed or unsupported DDL.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The DDL violates a table invariant.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Invalid diff options.
    #[error("invalid options: {0}")]
    Options(#[from] OptionsError),

    /// Renames the resolver refused to decide.
    #[error(transparent)]
    AmbiguousRename(#[from] AmbiguousRenameError),

    /// Changes the dialect cannot express.
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// A plan does not apply to its source.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),
}

/// Result type of the engine.
pub type Result<T> = std::result::Result<T, Error>;
