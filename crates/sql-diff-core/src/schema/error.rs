//! Schema extraction errors.

/// The parsed DDL violates a table invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// The same table is created twice.
    #[error("table '{table}' is defined more than once")]
    DuplicateTable {
        /// Table name.
        table: String,
    },

    /// A column name appears twice in one table.
    #[error("column '{column}' is defined more than once in table '{table}'")]
    DuplicateColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A key, index or comment names a column the table does not have.
    #[error("{object} on table '{table}' references unknown column '{column}'")]
    UnknownColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
        /// What referenced the column.
        object: String,
    },

    /// More than one primary key.
    #[error("table '{table}' has more than one primary key")]
    MultiplePrimaryKeys {
        /// Table name.
        table: String,
    },

    /// A column is declared both `NULL` and `NOT NULL`.
    #[error("column '{column}' in table '{table}' is declared both NULL and NOT NULL")]
    ConflictingNullability {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A `CREATE INDEX` or `COMMENT ON` targets a table not defined in the
    /// same input.
    #[error("{statement} references unknown table '{table}'")]
    UnknownTable {
        /// Table name.
        table: String,
        /// Statement that referenced it.
        statement: String,
    },

    /// A table defines no columns.
    #[error("table '{table}' defines no columns")]
    EmptyTable {
        /// Table name.
        table: String,
    },
}
