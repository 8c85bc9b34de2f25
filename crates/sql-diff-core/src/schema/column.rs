//! Columns and column types.

use serde::{Deserialize, Serialize};

use crate::ast::{DataType, TypeKind};

/// Declared type of a column.
///
/// Equality ignores [`ColumnType::raw`]: `INT` and `INTEGER` are the same
/// type, and so are `varchar(10)` and `VARCHAR (10)`.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct ColumnType {
    /// The type as written, whitespace-normalized. Used for rendering.
    pub raw: String,
    /// Normalized data type.
    pub data_type: DataType,
    /// MySQL `UNSIGNED`.
    #[serde(default)]
    pub unsigned: bool,
    /// Column character set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Column collation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collation: Option<String>,
}

impl ColumnType {
    /// A type rendered with its canonical spelling.
    #[must_use]
    pub fn new(data_type: DataType) -> Self {
        Self {
            raw: data_type.to_sql(),
            data_type,
            unsigned: false,
            charset: None,
            collation: None,
        }
    }

    /// Normalized kind of the type.
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.data_type.kind()
    }

    /// Returns true if the raw text is a PostgreSQL `SERIAL` pseudo-type.
    #[must_use]
    pub fn is_serial(&self) -> bool {
        let upper = self.raw.to_ascii_uppercase();
        matches!(
            upper.as_str(),
            "SERIAL" | "SERIAL2" | "SERIAL4" | "SERIAL8" | "SMALLSERIAL" | "BIGSERIAL"
        )
    }

    /// Text used when rendering the type into DDL.
    ///
    /// The raw spelling is kept except for `SERIAL` pseudo-types, whose
    /// auto-increment behaviour is rendered separately.
    #[must_use]
    pub fn render(&self) -> String {
        if self.is_serial() {
            self.data_type.to_sql()
        } else {
            self.raw.clone()
        }
    }
}

impl PartialEq for ColumnType {
    fn eq(&self, other: &Self) -> bool {
        self.data_type == other.data_type
            && self.unsigned == other.unsigned
            && opt_eq_ignore_case(self.charset.as_deref(), other.charset.as_deref())
            && opt_eq_ignore_case(self.collation.as_deref(), other.collation.as_deref())
    }
}

fn opt_eq_ignore_case(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// A column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as written.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column accepts `NULL`.
    pub nullable: bool,
    /// Normalized default expression; `None` when there is no default or
    /// the default is `NULL`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// 1-based ordinal position within the table.
    pub position: usize,
    /// `AUTO_INCREMENT`, identity or serial column.
    #[serde(default)]
    pub auto_increment: bool,
    /// Column comment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// MySQL `ON UPDATE` expression.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_update: Option<String>,
}

impl Column {
    /// Creates a nullable column without default at position 0.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: true,
            default: None,
            position: 0,
            auto_increment: false,
            comment: None,
            on_update: None,
        }
    }

    /// Compares everything except the name and position.
    #[must_use]
    pub fn attributes_eq(&self, other: &Self) -> bool {
        self.column_type == other.column_type
            && self.nullable == other.nullable
            && self.default == other.default
            && self.auto_increment == other.auto_increment
            && self.comment == other.comment
            && self.on_update == other.on_update
    }

    /// Returns a copy of this column under another name.
    #[must_use]
    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

/// Normalizes a SQL expression for comparison.
///
/// Outside string literals and quoted identifiers, keywords are upper-cased
/// and whitespace runs collapse to a single space. Whitespace next to
/// parentheses and commas is removed.
#[must_use]
pub fn normalize_expression(expr: &str) -> String {
    let mut out = String::with_capacity(expr.len());
    let mut chars = expr.trim().chars().peekable();
    let mut pending_space = false;
    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                flush_space(&mut out, &mut pending_space, c);
                out.push(c);
                while let Some(inner) = chars.next() {
                    out.push(inner);
                    if inner == c {
                        if chars.peek() == Some(&c) {
                            out.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            c if c.is_whitespace() => pending_space = true,
            c => {
                flush_space(&mut out, &mut pending_space, c);
                out.push(c.to_ascii_uppercase());
            }
        }
    }
    out
}

fn flush_space(out: &mut String, pending: &mut bool, next: char) {
    if *pending {
        let tight_before = matches!(next, ')' | ',');
        let tight_after = out.ends_with('(') || out.is_empty();
        if !tight_before && !tight_after {
            out.push(' ');
        }
        *pending = false;
    }
}

/// Normalizes a `DEFAULT` expression; `DEFAULT NULL` means no default.
#[must_use]
pub fn normalize_default(expr: &str) -> Option<String> {
    let normalized = normalize_expression(expr);
    if normalized == "NULL" || normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}
