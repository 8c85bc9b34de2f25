//! Error type of the command-line tool and its exit codes.

use std::path::PathBuf;

use crate::config::ConfigError;

/// Exit status for success.
pub const EXIT_OK: i32 = 0;
/// Exit status for errors without a dedicated code.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status for malformed or invalid DDL.
pub const EXIT_INVALID_SQL: i32 = 2;
/// Exit status for renames that need a decision from the user.
pub const EXIT_AMBIGUOUS: i32 = 3;
/// Exit status for changes the dialect cannot express.
pub const EXIT_UNSUPPORTED: i32 = 4;

/// Any failure of the command-line tool.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Engine failure.
    #[error(transparent)]
    Core(#[from] sql_diff_core::Error),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Reading or writing a file failed.
    #[error("cannot access {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Reading standard input or writing standard output failed.
    #[error("terminal I/O failed: {0}")]
    Terminal(#[from] std::io::Error),

    /// JSON output could not be produced.
    #[error("cannot serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// A dialect descriptor file is invalid.
    #[error("invalid dialect file {}: {message}", .path.display())]
    DialectFile {
        /// File path.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Arguments that parse but do not make sense together.
    #[error("{0}")]
    Usage(String),

    /// The AI provider call failed.
    #[error("AI request failed: {0:#}")]
    Ai(anyhow::Error),
}

impl CliError {
    /// Process exit status for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Core(sql_diff_core::Error::Parse(_) | sql_diff_core::Error::Schema(_)) => {
                EXIT_INVALID_SQL
            }
            Self::Core(sql_diff_core::Error::AmbiguousRename(_)) => EXIT_AMBIGUOUS,
            Self::Core(sql_diff_core::Error::Plan(_)) => EXIT_UNSUPPORTED,
            _ => EXIT_FAILURE,
        }
    }
}

/// Result type of the command-line tool.
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use sql_diff_core::{AmbiguousRenameError, Schema};

    use super::*;

    #[test]
    fn test_exit_codes() {
        let parse = Schema::parse("CREATE TABLE (").unwrap_err();
        assert_eq!(CliError::from(parse).exit_code(), EXIT_INVALID_SQL);

        let ambiguous = sql_diff_core::Error::from(AmbiguousRenameError {
            ambiguities: Vec::new(),
        });
        assert_eq!(CliError::from(ambiguous).exit_code(), EXIT_AMBIGUOUS);

        let usage = CliError::Usage("no source".to_string());
        assert_eq!(usage.exit_code(), EXIT_FAILURE);
        assert_eq!(CliError::Ai(anyhow::anyhow!("timeout")).exit_code(), EXIT_FAILURE);
    }
}
