//! Builds the schema model from parsed DDL.

use tracing::{debug, trace};

use super::column::{normalize_default, Column, ColumnType};
use super::constraint::{Constraint, ConstraintKind, Index};
use super::error::SchemaError;
use super::table::{Schema, Table};
use crate::ast::{
    ColumnConstraint, ColumnDef, CommentOnStatement, CommentTarget, CreateIndexStatement,
    CreateTableStatement, IndexColumn, IndexDef, IndexKind, ObjectName, Statement,
    TableConstraint,
};

/// Table option that records a counter value rather than structure.
const AUTO_INCREMENT_OPTION: &str = "AUTO_INCREMENT";

impl Schema {
    /// Parses DDL text and extracts its tables.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Parse`] for malformed SQL and
    /// [`crate::Error::Schema`] when the DDL violates a table invariant.
    pub fn parse(sql: &str) -> crate::Result<Self> {
        let statements = crate::parser::parse(sql)?;
        Ok(Self::from_statements(&statements)?)
    }

    /// Builds a schema from parsed statements, applied in order.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] when a statement violates a table invariant.
    pub fn from_statements(statements: &[Statement]) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        for statement in statements {
            match statement {
                Statement::CreateTable(create) => {
                    let table = Table::from_create(create)?;
                    if schema.contains(&table.name) {
                        return Err(SchemaError::DuplicateTable {
                            table: table.name.to_string(),
                        });
                    }
                    debug!(table = %table.name, columns = table.columns.len(), "extracted table");
                    schema.insert(table);
                }
                Statement::CreateIndex(create) => apply_create_index(&mut schema, create)?,
                Statement::CommentOn(comment) => apply_comment(&mut schema, comment)?,
            }
        }
        Ok(schema)
    }
}

impl Table {
    /// Builds a table from a `CREATE TABLE` statement.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for duplicate columns, unknown key columns,
    /// several primary keys or conflicting nullability.
    pub fn from_create(create: &CreateTableStatement) -> Result<Self, SchemaError> {
        let table_name = create.name.to_string();
        if create.columns.is_empty() {
            return Err(SchemaError::EmptyTable { table: table_name });
        }

        let mut table = Self::new(create.name.clone());
        let mut primary_keys: Vec<Constraint> = Vec::new();

        for (i, def) in create.columns.iter().enumerate() {
            if table.column(&def.name, false).is_some() {
                return Err(SchemaError::DuplicateColumn {
                    table: table_name,
                    column: def.name.clone(),
                });
            }
            let (mut column, constraints) = column_from_def(&table_name, def)?;
            column.position = i + 1;
            table.columns.push(column);
            for constraint in constraints {
                if constraint.is_primary_key() {
                    primary_keys.push(constraint);
                } else {
                    table.constraints.push(constraint);
                }
            }
        }

        for def in &create.constraints {
            let kind = match &def.kind {
                TableConstraint::PrimaryKey(columns) => ConstraintKind::PrimaryKey {
                    columns: columns.clone(),
                },
                TableConstraint::Unique(columns) => ConstraintKind::Unique {
                    columns: columns.clone(),
                },
                TableConstraint::ForeignKey {
                    columns,
                    references,
                } => ConstraintKind::ForeignKey {
                    columns: columns.clone(),
                    references: references.clone(),
                },
                TableConstraint::Check(expression) => ConstraintKind::Check {
                    expression: expression.clone(),
                },
            };
            let constraint = Constraint {
                name: def.name.clone(),
                kind,
            };
            if constraint.is_primary_key() {
                primary_keys.push(constraint);
            } else {
                table.constraints.push(constraint);
            }
        }

        if primary_keys.len() > 1 {
            return Err(SchemaError::MultiplePrimaryKeys { table: table_name });
        }
        if let Some(primary_key) = primary_keys.pop() {
            for name in primary_key.columns() {
                if let Some(column) = table.column_mut(name, false) {
                    column.nullable = false;
                }
            }
            table.constraints.insert(0, primary_key);
        }

        for constraint in &table.constraints {
            let object = format!("{} constraint", constraint.label());
            check_columns(&table, &object, constraint.columns())?;
        }

        for def in &create.indexes {
            let index = index_from_def(&table, def);
            check_columns(
                &table,
                &format!("index '{}'", index.name),
                index.columns.iter().map(|c| c.name.as_str()),
            )?;
            table.indexes.push(index);
        }

        for option in &create.options {
            if option.name == AUTO_INCREMENT_OPTION {
                trace!(table = %table.name, "dropping AUTO_INCREMENT counter option");
                continue;
            }
            table
                .options
                .insert(option.name.clone(), option.value.clone().unwrap_or_default());
        }

        Ok(table)
    }
}

/// Converts a column definition, returning the constraints it declares
/// inline normalized to table constraints.
fn column_from_def(
    table: &str,
    def: &ColumnDef,
) -> Result<(Column, Vec<Constraint>), SchemaError> {
    let mut column = Column::new(
        def.name.clone(),
        ColumnType {
            raw: def.type_text.clone(),
            data_type: def.data_type.clone(),
            unsigned: def.unsigned,
            charset: def.charset.clone(),
            collation: def.collation.clone(),
        },
    );
    let mut constraints = Vec::new();
    let mut explicit_null = false;
    let mut explicit_not_null = false;

    for constraint in &def.constraints {
        let name = constraint.name.clone();
        match &constraint.kind {
            ColumnConstraint::Null => explicit_null = true,
            ColumnConstraint::NotNull => explicit_not_null = true,
            ColumnConstraint::Default(expr) => column.default = normalize_default(expr),
            ColumnConstraint::AutoIncrement => column.auto_increment = true,
            ColumnConstraint::Comment(text) => column.comment = Some(text.clone()),
            ColumnConstraint::OnUpdate(expr) => {
                column.on_update = Some(super::normalize_expression(expr));
            }
            ColumnConstraint::PrimaryKey => constraints.push(Constraint {
                name,
                kind: ConstraintKind::PrimaryKey {
                    columns: vec![IndexColumn::named(def.name.clone())],
                },
            }),
            ColumnConstraint::Unique => constraints.push(Constraint {
                name,
                kind: ConstraintKind::Unique {
                    columns: vec![IndexColumn::named(def.name.clone())],
                },
            }),
            ColumnConstraint::References(references) => constraints.push(Constraint {
                name,
                kind: ConstraintKind::ForeignKey {
                    columns: vec![def.name.clone()],
                    references: references.clone(),
                },
            }),
            ColumnConstraint::Check(expression) => constraints.push(Constraint {
                name,
                kind: ConstraintKind::Check {
                    expression: expression.clone(),
                },
            }),
        }
    }

    if explicit_null && explicit_not_null {
        return Err(SchemaError::ConflictingNullability {
            table: table.to_string(),
            column: def.name.clone(),
        });
    }
    column.nullable = !explicit_not_null;
    Ok((column, constraints))
}

/// Converts an inline index, synthesizing a name MySQL style when the DDL
/// omits one: the first column, then `_2`, `_3`, ... on collision.
fn index_from_def(table: &Table, def: &IndexDef) -> Index {
    let name = def.name.clone().unwrap_or_else(|| {
        let base = def
            .columns
            .first()
            .map_or_else(|| "index".to_string(), |c| c.name.clone());
        synthesize_index_name(table, &base)
    });
    let method = match def.kind {
        IndexKind::Fulltext => Some("FULLTEXT".to_string()),
        IndexKind::Spatial => Some("SPATIAL".to_string()),
        IndexKind::Plain | IndexKind::Unique => normalize_method(def.method.as_deref()),
    };
    Index {
        name,
        columns: def.columns.clone(),
        unique: def.kind == IndexKind::Unique,
        method,
    }
}

fn synthesize_index_name(table: &Table, base: &str) -> String {
    if table.index(base, false).is_none() {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}_{n}");
        if table.index(&candidate, false).is_none() {
            return candidate;
        }
        n += 1;
    }
}

/// `BTREE` is the default method everywhere and is dropped.
fn normalize_method(method: Option<&str>) -> Option<String> {
    method
        .map(str::to_ascii_uppercase)
        .filter(|m| m != "BTREE")
}

fn check_columns<'a>(
    table: &Table,
    object: &str,
    columns: impl IntoIterator<Item = &'a str>,
) -> Result<(), SchemaError> {
    for column in columns {
        if table.column(column, false).is_none() {
            return Err(SchemaError::UnknownColumn {
                table: table.name.to_string(),
                column: column.to_string(),
                object: object.to_string(),
            });
        }
    }
    Ok(())
}

/// Finds the table a `CREATE INDEX` or `COMMENT ON` refers to. An
/// unqualified name also matches a qualified table with that bare name.
fn find_table<'a>(
    schema: &'a mut Schema,
    name: &ObjectName,
    statement: &str,
) -> Result<&'a mut Table, SchemaError> {
    let key = if schema.contains(name) {
        Some(Schema::key(name))
    } else if name.schema.is_none() {
        let mut matches = schema
            .entries()
            .filter(|(_, t)| t.name.name.eq_ignore_ascii_case(&name.name))
            .map(|(k, _)| k.to_string());
        match (matches.next(), matches.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    } else {
        None
    };
    let unknown = || SchemaError::UnknownTable {
        table: name.to_string(),
        statement: statement.to_string(),
    };
    let key = key.ok_or_else(unknown)?;
    schema.get_mut_by_key(&key).ok_or_else(unknown)
}

fn apply_create_index(schema: &mut Schema, create: &CreateIndexStatement) -> Result<(), SchemaError> {
    let table = find_table(schema, &create.table, "CREATE INDEX")?;
    let (unique, method) = match create.method.as_deref() {
        Some(m @ ("FULLTEXT" | "SPATIAL")) => (false, Some(m.to_string())),
        other => (create.unique, normalize_method(other)),
    };
    let index = Index {
        name: create.name.clone(),
        columns: create.columns.clone(),
        unique,
        method,
    };
    check_columns(
        table,
        &format!("index '{}'", index.name),
        index.columns.iter().map(|c| c.name.as_str()),
    )?;
    debug!(table = %table.name, index = %index.name, "extracted index");
    table.indexes.push(index);
    Ok(())
}

fn apply_comment(schema: &mut Schema, comment: &CommentOnStatement) -> Result<(), SchemaError> {
    match &comment.target {
        CommentTarget::Table(name) => {
            let table = find_table(schema, name, "COMMENT ON TABLE")?;
            match &comment.comment {
                Some(text) => {
                    table.options.insert("COMMENT".to_string(), text.clone());
                }
                None => {
                    table.options.remove("COMMENT");
                }
            }
        }
        CommentTarget::Column { table, column } => {
            let table = find_table(schema, table, "COMMENT ON COLUMN")?;
            let table_name = table.name.to_string();
            let target = table
                .column_mut(column, false)
                .ok_or_else(|| SchemaError::UnknownColumn {
                    table: table_name,
                    column: column.clone(),
                    object: "COMMENT ON COLUMN".to_string(),
                })?;
            target.comment.clone_from(&comment.comment);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DataType;

    fn single(sql: &str) -> Table {
        Schema::parse(sql).unwrap().into_tables().remove(0)
    }

    #[test]
    fn test_inline_constraints_become_table_constraints() {
        let t = single(
            "CREATE TABLE orders (
                id INT PRIMARY KEY,
                code VARCHAR(10) UNIQUE,
                user_id INT REFERENCES users(id),
                qty INT CHECK (qty > 0)
            )",
        );
        let labels: Vec<_> = t.constraints.iter().map(Constraint::label).collect();
        assert_eq!(labels, vec!["primary key", "unique", "foreign key", "check"]);
        assert!(!t.columns[0].nullable);
        assert!(t.columns[1].nullable);
    }

    #[test]
    fn test_default_null_is_no_default() {
        let t = single("CREATE TABLE t (a INT DEFAULT NULL, b INT DEFAULT 0)");
        assert_eq!(t.columns[0].default, None);
        assert_eq!(t.columns[1].default.as_deref(), Some("0"));
    }

    #[test]
    fn test_auto_increment_option_is_dropped() {
        let t = single("CREATE TABLE t (id INT) ENGINE=InnoDB AUTO_INCREMENT=42");
        assert_eq!(t.options.get("ENGINE").map(String::as_str), Some("InnoDB"));
        assert!(!t.options.contains_key("AUTO_INCREMENT"));
    }

    #[test]
    fn test_index_names_are_synthesized() {
        let t = single("CREATE TABLE t (a INT, b INT, KEY (a), KEY (a, b), UNIQUE KEY (b))");
        let names: Vec<_> = t.indexes.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["a", "a_2", "b"]);
        assert!(t.indexes[2].unique);
    }

    #[test]
    fn test_btree_method_is_normalized_away() {
        let t = single("CREATE TABLE t (a INT, b TEXT, KEY ia (a) USING BTREE, FULLTEXT KEY fb (b))");
        assert_eq!(t.indexes[0].method, None);
        assert_eq!(t.indexes[1].method.as_deref(), Some("FULLTEXT"));
    }

    #[test]
    fn test_create_index_and_comments_attach_to_tables() {
        let schema = Schema::parse(
            "CREATE TABLE public.users (id INT, email TEXT);
             CREATE UNIQUE INDEX users_email ON users (email);
             COMMENT ON COLUMN users.email IS 'login';
             COMMENT ON TABLE public.users IS 'people';",
        )
        .unwrap();
        let t = schema.single_table().unwrap();
        assert_eq!(t.indexes[0].name, "users_email");
        assert!(t.indexes[0].unique);
        assert_eq!(t.columns[1].comment.as_deref(), Some("login"));
        assert_eq!(t.options.get("COMMENT").map(String::as_str), Some("people"));
    }

    #[test]
    fn test_serial_is_auto_increment_integer() {
        let t = single("CREATE TABLE t (id SERIAL PRIMARY KEY)");
        assert_eq!(t.columns[0].column_type.data_type, DataType::Integer(None));
        assert!(t.columns[0].auto_increment);
    }

    #[test]
    fn test_invariant_violations() {
        let cases = [
            ("CREATE TABLE t (a INT, A INT)", "defined more than once"),
            ("CREATE TABLE t (a INT, PRIMARY KEY (b))", "unknown column 'b'"),
            ("CREATE TABLE t (a INT PRIMARY KEY, b INT, PRIMARY KEY (b))", "more than one primary key"),
            ("CREATE TABLE t (a INT NULL NOT NULL)", "both NULL and NOT NULL"),
            ("CREATE TABLE t (a INT); CREATE TABLE T (b INT)", "more than once"),
            ("CREATE TABLE t (a INT); CREATE INDEX i ON u (a)", "unknown table 'u'"),
            ("CREATE TABLE t (a INT, KEY k (zz))", "unknown column 'zz'"),
        ];
        for (sql, expected) in cases {
            let err = Schema::parse(sql).unwrap_err().to_string();
            assert!(err.contains(expected), "{sql}: {err}");
        }
    }
}
