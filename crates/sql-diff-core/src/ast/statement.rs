//! DDL statement types.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::DataType;
use crate::lexer::Span;

/// A parsed DDL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `CREATE TABLE`.
    CreateTable(CreateTableStatement),
    /// `CREATE INDEX`.
    CreateIndex(CreateIndexStatement),
    /// `COMMENT ON TABLE` / `COMMENT ON COLUMN`.
    CommentOn(CommentOnStatement),
}

impl Statement {
    /// Location of the whole statement in the input.
    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::CreateTable(s) => s.span,
            Self::CreateIndex(s) => s.span,
            Self::CommentOn(s) => s.span,
        }
    }
}

/// A possibly schema-qualified object name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectName {
    /// Schema (or database) qualifier.
    pub schema: Option<String>,
    /// Object name.
    pub name: String,
}

impl ObjectName {
    /// Unqualified name.
    #[must_use]
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{schema}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStatement {
    /// Table name.
    pub name: ObjectName,
    /// `TEMPORARY` / `TEMP`.
    pub temporary: bool,
    /// `IF NOT EXISTS`.
    pub if_not_exists: bool,
    /// Column definitions in declaration order.
    pub columns: Vec<ColumnDef>,
    /// Table-level constraints.
    pub constraints: Vec<TableConstraintDef>,
    /// Inline index definitions (`KEY`, `INDEX`, `UNIQUE KEY`, ...).
    pub indexes: Vec<IndexDef>,
    /// Trailing table options.
    pub options: Vec<TableOption>,
    /// Location in the input.
    pub span: Span,
}

/// A column definition inside `CREATE TABLE`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name.
    pub name: String,
    /// Normalized data type.
    pub data_type: DataType,
    /// The type as written, whitespace-normalized.
    pub type_text: String,
    /// `UNSIGNED`.
    pub unsigned: bool,
    /// `CHARACTER SET x`.
    pub charset: Option<String>,
    /// `COLLATE x`.
    pub collation: Option<String>,
    /// Column constraints and attributes in source order.
    pub constraints: Vec<ColumnConstraintDef>,
    /// Location in the input.
    pub span: Span,
}

/// A column constraint, optionally named with `CONSTRAINT name`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnConstraintDef {
    /// Constraint name.
    pub name: Option<String>,
    /// The constraint itself.
    pub kind: ColumnConstraint,
    /// Location in the input.
    pub span: Span,
}

/// Column-level constraints and attributes.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConstraint {
    /// `NULL`.
    Null,
    /// `NOT NULL`.
    NotNull,
    /// `DEFAULT expr`, captured verbatim.
    Default(String),
    /// `PRIMARY KEY`.
    PrimaryKey,
    /// `UNIQUE [KEY]`.
    Unique,
    /// `AUTO_INCREMENT`, `AUTOINCREMENT`, `GENERATED ... AS IDENTITY` or a
    /// `SERIAL` pseudo-type.
    AutoIncrement,
    /// `COMMENT 'text'`.
    Comment(String),
    /// `REFERENCES table (columns) ...`.
    References(ForeignKeyRef),
    /// `CHECK (expr)`, captured verbatim without the outer parentheses.
    Check(String),
    /// MySQL `ON UPDATE expr`.
    OnUpdate(String),
}

/// Target of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyRef {
    /// Referenced table.
    pub table: ObjectName,
    /// Referenced columns; empty means the referenced primary key.
    pub columns: Vec<String>,
    /// `ON DELETE` action.
    pub on_delete: Option<ReferentialAction>,
    /// `ON UPDATE` action.
    pub on_update: Option<ReferentialAction>,
}

/// Foreign key referential actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferentialAction {
    /// `CASCADE`.
    Cascade,
    /// `RESTRICT`.
    Restrict,
    /// `SET NULL`.
    SetNull,
    /// `SET DEFAULT`.
    SetDefault,
    /// `NO ACTION`.
    NoAction,
}

impl ReferentialAction {
    /// SQL spelling of the action.
    #[must_use]
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Restrict => "RESTRICT",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
            Self::NoAction => "NO ACTION",
        }
    }
}

/// A table-level constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct TableConstraintDef {
    /// `CONSTRAINT name`.
    pub name: Option<String>,
    /// The constraint.
    pub kind: TableConstraint,
    /// Location in the input.
    pub span: Span,
}

/// Table-level constraint kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum TableConstraint {
    /// `PRIMARY KEY (cols)`.
    PrimaryKey(Vec<IndexColumn>),
    /// `UNIQUE (cols)`.
    Unique(Vec<IndexColumn>),
    /// `FOREIGN KEY (cols) REFERENCES ...`.
    ForeignKey {
        /// Referencing columns.
        columns: Vec<String>,
        /// Referenced table and actions.
        references: ForeignKeyRef,
    },
    /// `CHECK (expr)`.
    Check(String),
}

/// One column of a key or index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IndexColumn {
    /// Column name.
    pub name: String,
    /// MySQL prefix length, `KEY (name(10))`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// `DESC`.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub descending: bool,
}

impl IndexColumn {
    /// A plain ascending column reference.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
            descending: false,
        }
    }
}

/// Flavour of an inline index definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// `INDEX` / `KEY`.
    Plain,
    /// `UNIQUE INDEX` / `UNIQUE KEY`.
    Unique,
    /// `FULLTEXT`.
    Fulltext,
    /// `SPATIAL`.
    Spatial,
}

/// An inline index definition.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDef {
    /// Index name, if given.
    pub name: Option<String>,
    /// Index flavour.
    pub kind: IndexKind,
    /// `USING method`.
    pub method: Option<String>,
    /// Indexed columns.
    pub columns: Vec<IndexColumn>,
    /// Location in the input.
    pub span: Span,
}

/// A table option such as `ENGINE=InnoDB`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOption {
    /// Upper-cased option name (`CHARACTER SET` is normalized to `CHARSET`).
    pub name: String,
    /// Value, `None` for flag options like `WITHOUT ROWID`.
    pub value: Option<String>,
}

/// `CREATE INDEX` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateIndexStatement {
    /// Index name.
    pub name: String,
    /// Indexed table.
    pub table: ObjectName,
    /// `UNIQUE`.
    pub unique: bool,
    /// `USING method`.
    pub method: Option<String>,
    /// Indexed columns.
    pub columns: Vec<IndexColumn>,
    /// Location in the input.
    pub span: Span,
}

/// What a `COMMENT ON` statement annotates.
#[derive(Debug, Clone, PartialEq)]
pub enum CommentTarget {
    /// `COMMENT ON TABLE t`.
    Table(ObjectName),
    /// `COMMENT ON COLUMN t.c`.
    Column {
        /// Owning table.
        table: ObjectName,
        /// Column name.
        column: String,
    },
}

/// `COMMENT ON ... IS ...` statement.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentOnStatement {
    /// Annotated object.
    pub target: CommentTarget,
    /// Comment text, `None` for `IS NULL`.
    pub comment: Option<String>,
    /// Location in the input.
    pub span: Span,
}
