//! Abstract Syntax Tree (AST) types for DDL statements.

mod statement;
mod types;

pub use statement::{
    ColumnConstraint, ColumnConstraintDef, ColumnDef, CommentOnStatement, CommentTarget,
    CreateIndexStatement, CreateTableStatement, ForeignKeyRef, IndexColumn, IndexDef, IndexKind,
    ObjectName, ReferentialAction, Statement, TableConstraint, TableConstraintDef, TableOption,
};
pub use types::{DataType, LobSize, TypeKind};
