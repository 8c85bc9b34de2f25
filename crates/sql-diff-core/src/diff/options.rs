//! Options controlling a diff run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::schema::names_eq;

/// Options passed explicitly into every diff call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffOptions {
    /// Treat a constraint or index name change as a change.
    pub compare_names: bool,
    /// Compare identifiers case-sensitively.
    pub case_sensitive: bool,
    /// Match dropped and added columns as renames heuristically.
    pub detect_renames: bool,
    /// Minimum score for a rename candidate, in `[0, 1]`.
    pub rename_threshold: f64,
    /// Weight of name similarity against structural similarity, in `[0, 1]`.
    pub name_weight: f64,
    /// Candidates within this distance of the best score compete with it.
    pub ambiguity_margin: f64,
    /// Render table option changes as DDL instead of only warning.
    pub include_table_options: bool,
    /// Renames declared by the user; applied before any heuristic.
    pub rename_hints: Vec<RenameHint>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            compare_names: false,
            case_sensitive: false,
            detect_renames: true,
            rename_threshold: 0.75,
            name_weight: 0.5,
            ambiguity_margin: 0.0,
            include_table_options: false,
            rename_hints: Vec::new(),
        }
    }
}

impl DiffOptions {
    /// Creates the default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets [`DiffOptions::compare_names`].
    #[must_use]
    pub const fn with_compare_names(mut self, value: bool) -> Self {
        self.compare_names = value;
        self
    }

    /// Sets [`DiffOptions::case_sensitive`].
    #[must_use]
    pub const fn with_case_sensitive(mut self, value: bool) -> Self {
        self.case_sensitive = value;
        self
    }

    /// Sets [`DiffOptions::detect_renames`].
    #[must_use]
    pub const fn with_detect_renames(mut self, value: bool) -> Self {
        self.detect_renames = value;
        self
    }

    /// Sets [`DiffOptions::rename_threshold`].
    #[must_use]
    pub const fn with_rename_threshold(mut self, value: f64) -> Self {
        self.rename_threshold = value;
        self
    }

    /// Sets [`DiffOptions::ambiguity_margin`].
    #[must_use]
    pub const fn with_ambiguity_margin(mut self, value: f64) -> Self {
        self.ambiguity_margin = value;
        self
    }

    /// Sets [`DiffOptions::include_table_options`].
    #[must_use]
    pub const fn with_include_table_options(mut self, value: bool) -> Self {
        self.include_table_options = value;
        self
    }

    /// Adds a rename hint.
    #[must_use]
    pub fn with_rename_hint(mut self, hint: RenameHint) -> Self {
        self.rename_hints.push(hint);
        self
    }

    /// Compares two identifiers under these options.
    #[must_use]
    pub fn names_eq(&self, a: &str, b: &str) -> bool {
        names_eq(a, b, self.case_sensitive)
    }

    /// Checks that numeric options are within range.
    ///
    /// # Errors
    ///
    /// Returns an [`OptionsError`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), OptionsError> {
        for (field, value) in [
            ("rename_threshold", self.rename_threshold),
            ("name_weight", self.name_weight),
            ("ambiguity_margin", self.ambiguity_margin),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(OptionsError::OutOfRange {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }
}

/// A user-declared column rename: `[table.]old=new`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameHint {
    /// Table the hint applies to; `None` applies to every table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Source column name.
    pub from: String,
    /// Target column name.
    pub to: String,
}

impl RenameHint {
    /// Creates a hint for any table.
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            table: None,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Restricts the hint to one table.
    #[must_use]
    pub fn for_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }
}

impl FromStr for RenameHint {
    type Err = OptionsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || OptionsError::InvalidRenameHint(s.to_string());
        let (left, to) = s.split_once('=').ok_or_else(invalid)?;
        let (table, from) = match left.rsplit_once('.') {
            Some((table, from)) => (Some(table.trim().to_string()), from),
            None => (None, left),
        };
        let (from, to) = (from.trim(), to.trim());
        if from.is_empty() || to.is_empty() || table.as_deref() == Some("") {
            return Err(invalid());
        }
        Ok(Self {
            table,
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

impl fmt::Display for RenameHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{table}.")?;
        }
        write!(f, "{}={}", self.from, self.to)
    }
}

/// Invalid diff options.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OptionsError {
    /// A numeric option is outside `[0, 1]`.
    #[error("option '{field}' must be between 0 and 1, got {value}")]
    OutOfRange {
        /// Option name.
        field: String,
        /// Offending value.
        value: f64,
    },

    /// A rename hint is not of the form `[table.]old=new`.
    #[error("invalid rename hint '{0}', expected [table.]old=new")]
    InvalidRenameHint(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = DiffOptions::default();
        assert!(options.detect_renames);
        assert!(!options.compare_names);
        assert!((options.rename_threshold - 0.75).abs() < f64::EPSILON);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let err = DiffOptions::default()
            .with_rename_threshold(1.5)
            .validate()
            .unwrap_err();
        assert!(matches!(err, OptionsError::OutOfRange { ref field, .. } if field == "rename_threshold"));
    }

    #[test]
    fn test_parse_rename_hints() {
        assert_eq!(
            "name=full_name".parse::<RenameHint>().unwrap(),
            RenameHint::new("name", "full_name")
        );
        assert_eq!(
            "app.users.name = full_name".parse::<RenameHint>().unwrap(),
            RenameHint::new("name", "full_name").for_table("app.users")
        );
        assert!("name".parse::<RenameHint>().is_err());
        assert!("=x".parse::<RenameHint>().is_err());
        assert!(".a=b".parse::<RenameHint>().is_err());
    }

    #[test]
    fn test_deserialize_partial_options() {
        let options: DiffOptions =
            serde_json::from_str(r#"{"compare_names": true, "rename_threshold": 0.9}"#).unwrap();
        assert!(options.compare_names);
        assert!(options.detect_renames);
        assert!((options.rename_threshold - 0.9).abs() < f64::EPSILON);
    }
}
