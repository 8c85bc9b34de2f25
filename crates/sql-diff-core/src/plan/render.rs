//! Rendering of atomic changes into DDL fragments.

use std::collections::BTreeSet;

use super::dialect::{
    AutoIncrementSyntax, ColumnCommentSyntax, CreateIndexSyntax, Dialect, DropConstraintSyntax,
    DropIndexSyntax, ImplicitNaming, ModifyColumnSyntax, RenameColumnSyntax,
};
use super::Phase;
use crate::ast::{IndexColumn, ObjectName};
use crate::diff::{Change, ChangeKind, ColumnPosition};
use crate::schema::{Column, Constraint, ConstraintKind, Index, Schema, Table};

/// Body of a fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Body {
    /// A clause of `ALTER TABLE <table>`, mergeable with its neighbours.
    Clause(String),
    /// A complete statement.
    Statement(String),
}

/// One rendered piece of a change, with everything needed to sort it.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub phase: Phase,
    /// Orders tables within a phase ahead of their names; set for drops.
    pub rank: usize,
    pub table: ObjectName,
    pub ordinal: usize,
    pub kind: ChangeKind,
    pub object: String,
    pub step: usize,
    pub body: Body,
    /// The lowered change this fragment realizes; set on its first fragment.
    pub change: Option<Change>,
}

impl Fragment {
    pub fn sort_key(&self) -> (Phase, usize, String, usize, ChangeKind, &str, usize, &str) {
        let text = match &self.body {
            Body::Clause(s) | Body::Statement(s) => s.as_str(),
        };
        (
            self.phase,
            self.rank,
            Schema::key(&self.table),
            self.ordinal,
            self.kind,
            self.object.as_str(),
            self.step,
            text,
        )
    }
}

type Rendered = Result<Vec<(Phase, Body)>, String>;

/// Renders the changes of one change set.
pub(crate) struct Renderer<'a> {
    dialect: &'a Dialect,
    /// Name of the table before any rename; implicit constraint names
    /// derive from it.
    source_table: &'a ObjectName,
    /// Keys of the tables taking part in the diff.
    in_diff: &'a BTreeSet<String>,
}

impl<'a> Renderer<'a> {
    pub const fn new(
        dialect: &'a Dialect,
        source_table: &'a ObjectName,
        in_diff: &'a BTreeSet<String>,
    ) -> Self {
        Self {
            dialect,
            source_table,
            in_diff,
        }
    }

    /// Lowers and renders one change. Either every lowered piece renders or
    /// the whole change fails with a reason.
    pub fn render(&self, change: &Change) -> Result<Vec<Fragment>, String> {
        let mut fragments = Vec::new();
        for lowered in self.lower(change) {
            let pieces = self.render_lowered(&lowered)?;
            let ordinal = lowered.ordinal();
            let object = lowered.object_name();
            let kind = lowered.kind();
            let table = lowered.table().clone();
            let mut change = Some(lowered);
            for (step, (phase, body)) in pieces.into_iter().enumerate() {
                fragments.push(Fragment {
                    phase,
                    rank: 0,
                    table: table.clone(),
                    ordinal,
                    kind,
                    object: object.clone(),
                    step,
                    body,
                    change: change.take(),
                });
            }
        }
        Ok(fragments)
    }

    /// Splits replacements into drop + add, and pulls foreign keys and
    /// indexes out of created tables.
    fn lower(&self, change: &Change) -> Vec<Change> {
        match change {
            Change::ReplaceConstraint { table, old, new } => vec![
                Change::DropConstraint {
                    table: table.clone(),
                    constraint: old.clone(),
                },
                Change::AddConstraint {
                    table: table.clone(),
                    constraint: new.clone(),
                },
            ],
            Change::ReplaceIndex { table, old, new } => vec![
                Change::DropIndex {
                    table: table.clone(),
                    index: old.clone(),
                },
                Change::AddIndex {
                    table: table.clone(),
                    index: new.clone(),
                },
            ],
            Change::CreateTable { table, definition } => {
                let mut created = definition.clone();
                let mut rest = Vec::new();
                if self.dialect.add_constraint {
                    let (foreign, others): (Vec<Constraint>, Vec<Constraint>) = created
                        .constraints
                        .into_iter()
                        .partition(Constraint::is_foreign_key);
                    created.constraints = others;
                    rest.extend(foreign.into_iter().map(|constraint| Change::AddConstraint {
                        table: table.clone(),
                        constraint,
                    }));
                }
                rest.extend(
                    std::mem::take(&mut created.indexes)
                        .into_iter()
                        .map(|index| Change::AddIndex {
                            table: table.clone(),
                            index,
                        }),
                );
                let mut lowered = vec![Change::CreateTable {
                    table: table.clone(),
                    definition: created,
                }];
                lowered.extend(rest);
                lowered
            }
            other => vec![other.clone()],
        }
    }

    fn render_lowered(&self, change: &Change) -> Rendered {
        let d = self.dialect;
        match change {
            Change::RenameTable { table, old_name } => {
                if !d.rename_table {
                    return Err("table renames are not supported".to_string());
                }
                if !opt_eq_ignore_case(table.schema.as_deref(), old_name.schema.as_deref()) {
                    return Err("moving a table between schemas is not supported".to_string());
                }
                Ok(vec![(
                    Phase::RenameTable,
                    Body::Statement(format!(
                        "ALTER TABLE {} RENAME TO {}",
                        d.quote_object(old_name),
                        d.quote(&table.name)
                    )),
                )])
            }
            Change::RenameColumn {
                table,
                old_name,
                new_name,
                column,
            } => {
                let sql = match d.rename_column {
                    RenameColumnSyntax::RenameColumn => format!(
                        "ALTER TABLE {} RENAME COLUMN {} TO {}",
                        d.quote_object(table),
                        d.quote(old_name),
                        d.quote(new_name)
                    ),
                    RenameColumnSyntax::ChangeColumn => format!(
                        "ALTER TABLE {} CHANGE COLUMN {} {}",
                        d.quote_object(table),
                        d.quote(old_name),
                        self.column_definition(&column.renamed(new_name.clone()), false)?
                    ),
                    RenameColumnSyntax::Unsupported => {
                        return Err("column renames are not supported".to_string())
                    }
                };
                Ok(vec![(Phase::RenameColumn, Body::Statement(sql))])
            }
            Change::AddColumn {
                table,
                column,
                position,
            } => {
                let mut clause = format!("ADD COLUMN {}", self.column_definition(column, false)?);
                if d.column_position {
                    match position {
                        ColumnPosition::End => {}
                        ColumnPosition::First => clause.push_str(" FIRST"),
                        ColumnPosition::After(prev) => {
                            clause.push_str(&format!(" AFTER {}", d.quote(prev)));
                        }
                    }
                }
                let mut out = vec![(Phase::AddColumn, Body::Clause(clause))];
                if let Some(sql) = self.comment_statement(table, column) {
                    out.push((Phase::AddColumn, Body::Statement(sql)));
                }
                Ok(out)
            }
            Change::DropColumn { column, .. } => {
                if !d.drop_column {
                    return Err("dropping columns is not supported".to_string());
                }
                Ok(vec![(
                    Phase::DropColumn,
                    Body::Clause(format!("DROP COLUMN {}", d.quote(&column.name))),
                )])
            }
            Change::ModifyColumn { table, old, new, .. } => self.modify_column(table, old, new),
            Change::AddConstraint { constraint, .. } => {
                if !d.add_constraint {
                    return Err("adding constraints to an existing table is not supported"
                        .to_string());
                }
                let phase = match &constraint.kind {
                    ConstraintKind::ForeignKey { references, .. }
                        if !self.in_diff.contains(&Schema::key(&references.table)) =>
                    {
                        Phase::DeferredForeignKey
                    }
                    _ => Phase::AddConstraint,
                };
                Ok(vec![(
                    phase,
                    Body::Clause(format!("ADD {}", self.constraint_definition(constraint))),
                )])
            }
            Change::DropConstraint { constraint, .. } => {
                let phase = if constraint.is_foreign_key() {
                    Phase::DropForeignKey
                } else {
                    Phase::DropConstraint
                };
                Ok(vec![(phase, Body::Clause(self.drop_constraint(constraint)?))])
            }
            Change::AddIndex { table, index } => Ok(vec![(Phase::AddIndex, self.add_index(table, index)?)]),
            Change::DropIndex { table, index } => {
                let body = match d.drop_index {
                    DropIndexSyntax::DropIndex => {
                        let name = ObjectName {
                            schema: table.schema.clone(),
                            name: index.name.clone(),
                        };
                        Body::Statement(format!("DROP INDEX {}", d.quote_object(&name)))
                    }
                    DropIndexSyntax::DropIndexOnTable => Body::Statement(format!(
                        "DROP INDEX {} ON {}",
                        d.quote(&index.name),
                        d.quote_object(table)
                    )),
                    DropIndexSyntax::AlterTable => {
                        Body::Clause(format!("DROP INDEX {}", d.quote(&index.name)))
                    }
                };
                Ok(vec![(Phase::DropIndex, body)])
            }
            Change::SetTableOption { name, new, .. } => {
                if !d.table_options {
                    return Err("table options are not supported".to_string());
                }
                match new.as_deref() {
                    None => Err(format!("table option {name} cannot be removed")),
                    Some("") => Err(format!("table option {name} cannot be altered")),
                    Some(value) => Ok(vec![(
                        Phase::TableOption,
                        Body::Clause(table_option(name, value)),
                    )]),
                }
            }
            Change::CreateTable { table, definition } => {
                let mut out = vec![(
                    Phase::CreateTable,
                    Body::Statement(self.create_table(definition)?),
                )];
                for column in &definition.columns {
                    if let Some(sql) = self.comment_statement(table, column) {
                        out.push((Phase::CreateTable, Body::Statement(sql)));
                    }
                }
                Ok(out)
            }
            Change::DropTable { table, .. } => Ok(vec![(
                Phase::DropTable,
                Body::Statement(format!("DROP TABLE {}", d.quote_object(table))),
            )]),
            Change::ReplaceConstraint { .. } | Change::ReplaceIndex { .. } => {
                Err("replacements must be lowered before rendering".to_string())
            }
        }
    }

    // ------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------

    /// `name TYPE [UNSIGNED] [CHARACTER SET] [COLLATE] [NOT NULL] [DEFAULT]
    /// [ON UPDATE] [auto-increment] [COMMENT]`. `inline_key` renders SQLite's
    /// `PRIMARY KEY AUTOINCREMENT`.
    fn column_definition(&self, column: &Column, inline_key: bool) -> Result<String, String> {
        let d = self.dialect;
        let ty = &column.column_type;
        let mut sql = format!("{} {}", d.quote(&column.name), ty.render());
        if ty.unsigned {
            if !d.unsigned {
                return Err("UNSIGNED columns are not supported".to_string());
            }
            sql.push_str(" UNSIGNED");
        }
        if let Some(charset) = &ty.charset {
            if !d.column_charset {
                return Err("column character sets are not supported".to_string());
            }
            sql.push_str(&format!(" CHARACTER SET {charset}"));
        }
        if let Some(collation) = &ty.collation {
            sql.push_str(&format!(" COLLATE {collation}"));
        }
        if inline_key {
            sql.push_str(" PRIMARY KEY");
        } else if !column.nullable {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            sql.push_str(&format!(" DEFAULT {default}"));
        }
        if let Some(expr) = &column.on_update {
            if !d.on_update_clause {
                return Err("ON UPDATE column clauses are not supported".to_string());
            }
            sql.push_str(&format!(" ON UPDATE {expr}"));
        }
        if column.auto_increment {
            match d.auto_increment {
                AutoIncrementSyntax::AutoIncrement => sql.push_str(" AUTO_INCREMENT"),
                AutoIncrementSyntax::Identity => sql.push_str(" GENERATED BY DEFAULT AS IDENTITY"),
                AutoIncrementSyntax::Autoincrement if inline_key => sql.push_str(" AUTOINCREMENT"),
                AutoIncrementSyntax::Autoincrement => {
                    return Err(
                        "AUTOINCREMENT is only supported on an INTEGER PRIMARY KEY column"
                            .to_string(),
                    )
                }
                AutoIncrementSyntax::None => {
                    return Err("auto-increment columns are not supported".to_string())
                }
            }
        }
        if let Some(comment) = &column.comment {
            match d.column_comment {
                ColumnCommentSyntax::Inline => {
                    sql.push_str(&format!(" COMMENT {}", string_literal(comment)));
                }
                ColumnCommentSyntax::CommentOn => {}
                ColumnCommentSyntax::Unsupported => {
                    return Err("column comments are not supported".to_string())
                }
            }
        }
        Ok(sql)
    }

    /// `COMMENT ON COLUMN` for dialects that cannot comment inline.
    fn comment_statement(&self, table: &ObjectName, column: &Column) -> Option<String> {
        match (&column.comment, self.dialect.column_comment) {
            (Some(comment), ColumnCommentSyntax::CommentOn) => {
                Some(self.comment_on(table, &column.name, Some(comment)))
            }
            _ => None,
        }
    }

    fn comment_on(&self, table: &ObjectName, column: &str, comment: Option<&String>) -> String {
        format!(
            "COMMENT ON COLUMN {}.{} IS {}",
            self.dialect.quote_object(table),
            self.dialect.quote(column),
            comment.map_or_else(|| "NULL".to_string(), |c| string_literal(c))
        )
    }

    fn modify_column(&self, table: &ObjectName, old: &Column, new: &Column) -> Rendered {
        let d = self.dialect;
        match d.modify_column {
            ModifyColumnSyntax::Unsupported => {
                Err("modifying columns is not supported".to_string())
            }
            ModifyColumnSyntax::ModifyColumn => Ok(vec![(
                Phase::ModifyColumn,
                Body::Clause(format!("MODIFY COLUMN {}", self.column_definition(new, false)?)),
            )]),
            ModifyColumnSyntax::AlterColumn => {
                let column = d.quote(&new.name);
                let mut out = Vec::new();
                let mut clause = |text: String| {
                    out.push((
                        Phase::ModifyColumn,
                        Body::Clause(format!("ALTER COLUMN {column} {text}")),
                    ));
                };

                let (a, b) = (&old.column_type, &new.column_type);
                if a != b {
                    if b.unsigned && !d.unsigned {
                        return Err("UNSIGNED columns are not supported".to_string());
                    }
                    if b.charset.is_some() && !d.column_charset {
                        return Err("column character sets are not supported".to_string());
                    }
                    let mut text = format!("TYPE {}", b.render());
                    if let Some(collation) = &b.collation {
                        text.push_str(&format!(" COLLATE {collation}"));
                    }
                    clause(text);
                }
                if old.nullable != new.nullable {
                    clause(if new.nullable {
                        "DROP NOT NULL".to_string()
                    } else {
                        "SET NOT NULL".to_string()
                    });
                }
                if old.default != new.default {
                    clause(match &new.default {
                        Some(default) => format!("SET DEFAULT {default}"),
                        None => "DROP DEFAULT".to_string(),
                    });
                }
                if old.auto_increment != new.auto_increment {
                    if d.auto_increment != AutoIncrementSyntax::Identity {
                        return Err("changing auto-increment is not supported".to_string());
                    }
                    clause(if new.auto_increment {
                        "ADD GENERATED BY DEFAULT AS IDENTITY".to_string()
                    } else {
                        "DROP IDENTITY".to_string()
                    });
                }
                if old.on_update != new.on_update {
                    return Err("ON UPDATE column clauses are not supported".to_string());
                }
                if old.comment != new.comment {
                    if d.column_comment != ColumnCommentSyntax::CommentOn {
                        return Err("column comments are not supported".to_string());
                    }
                    out.push((
                        Phase::ModifyColumn,
                        Body::Statement(self.comment_on(table, &new.name, new.comment.as_ref())),
                    ));
                }
                Ok(out)
            }
        }
    }

    // ------------------------------------------------------------
    // Constraints and indexes
    // ------------------------------------------------------------

    fn constraint_definition(&self, constraint: &Constraint) -> String {
        let d = self.dialect;
        let mut sql = String::new();
        if let Some(name) = &constraint.name {
            sql.push_str(&format!("CONSTRAINT {} ", d.quote(name)));
        }
        match &constraint.kind {
            ConstraintKind::PrimaryKey { columns } => {
                sql.push_str(&format!("PRIMARY KEY ({})", self.index_columns(columns)));
            }
            ConstraintKind::Unique { columns } => {
                sql.push_str(&format!("UNIQUE ({})", self.index_columns(columns)));
            }
            ConstraintKind::ForeignKey {
                columns,
                references,
            } => {
                sql.push_str(&format!(
                    "FOREIGN KEY ({}) REFERENCES {} ({})",
                    d.quote_list(columns),
                    d.quote_object(&references.table),
                    d.quote_list(&references.columns)
                ));
                if let Some(action) = references.on_delete {
                    sql.push_str(" ON DELETE ");
                    sql.push_str(action.as_sql());
                }
                if let Some(action) = references.on_update {
                    sql.push_str(" ON UPDATE ");
                    sql.push_str(action.as_sql());
                }
            }
            ConstraintKind::Check { expression } => {
                sql.push_str(&format!("CHECK ({expression})"));
            }
        }
        sql
    }

    fn index_columns(&self, columns: &[IndexColumn]) -> String {
        columns
            .iter()
            .map(|c| {
                let mut s = self.dialect.quote(&c.name);
                if let Some(length) = c.length {
                    s.push_str(&format!("({length})"));
                }
                if c.descending {
                    s.push_str(" DESC");
                }
                s
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Name the database gave a constraint the DDL left unnamed.
    fn implicit_name(&self, constraint: &Constraint) -> Option<String> {
        let table = &self.source_table.name;
        let columns = constraint.columns().join("_");
        match self.dialect.implicit_names {
            ImplicitNaming::Postgres => Some(match &constraint.kind {
                ConstraintKind::PrimaryKey { .. } => format!("{table}_pkey"),
                ConstraintKind::Unique { .. } => format!("{table}_{columns}_key"),
                ConstraintKind::ForeignKey { .. } => format!("{table}_{columns}_fkey"),
                ConstraintKind::Check { .. } => format!("{table}_check"),
            }),
            ImplicitNaming::Mysql => match &constraint.kind {
                ConstraintKind::PrimaryKey { .. } => Some("PRIMARY".to_string()),
                ConstraintKind::Unique { .. } => {
                    constraint.columns().first().map(ToString::to_string)
                }
                ConstraintKind::ForeignKey { .. } => Some(format!("{table}_ibfk_1")),
                ConstraintKind::Check { .. } => Some(format!("{table}_chk_1")),
            },
            ImplicitNaming::None => None,
        }
    }

    fn drop_constraint(&self, constraint: &Constraint) -> Result<String, String> {
        let d = self.dialect;
        let name = constraint
            .name
            .clone()
            .or_else(|| self.implicit_name(constraint));
        let named = |name: Option<String>| {
            name.ok_or_else(|| {
                format!(
                    "unnamed {} constraint cannot be dropped without knowing its name",
                    constraint.label()
                )
            })
        };
        match d.drop_constraint {
            DropConstraintSyntax::Unsupported => {
                Err("dropping constraints is not supported".to_string())
            }
            DropConstraintSyntax::Standard => {
                Ok(format!("DROP CONSTRAINT {}", d.quote(&named(name)?)))
            }
            DropConstraintSyntax::Mysql => Ok(match &constraint.kind {
                ConstraintKind::PrimaryKey { .. } => "DROP PRIMARY KEY".to_string(),
                ConstraintKind::Unique { .. } => format!("DROP INDEX {}", d.quote(&named(name)?)),
                ConstraintKind::ForeignKey { .. } => {
                    format!("DROP FOREIGN KEY {}", d.quote(&named(name)?))
                }
                ConstraintKind::Check { .. } => format!("DROP CHECK {}", d.quote(&named(name)?)),
            }),
        }
    }

    fn add_index(&self, table: &ObjectName, index: &Index) -> Result<Body, String> {
        let d = self.dialect;
        let method = index.method.as_deref().map(str::to_ascii_uppercase);
        let special = matches!(method.as_deref(), Some("FULLTEXT" | "SPATIAL"));
        if special && !d.fulltext_indexes {
            return Err(format!(
                "{} indexes are not supported",
                method.as_deref().unwrap_or_default()
            ));
        }
        let prefix = match (&method, index.unique) {
            (Some(m), _) if special => format!("{m} INDEX"),
            (_, true) => "UNIQUE INDEX".to_string(),
            (_, false) => "INDEX".to_string(),
        };
        let using = match &method {
            Some(m) if !special => format!(" USING {m}"),
            _ => String::new(),
        };
        let columns = self.index_columns(&index.columns);
        Ok(match d.create_index {
            CreateIndexSyntax::CreateIndex => Body::Statement(format!(
                "CREATE {prefix} {} ON {}{using} ({columns})",
                d.quote(&index.name),
                d.quote_object(table)
            )),
            CreateIndexSyntax::AlterTable => Body::Clause(format!(
                "ADD {prefix} {} ({columns}){using}",
                d.quote(&index.name)
            )),
        })
    }

    // ------------------------------------------------------------
    // Tables
    // ------------------------------------------------------------

    fn create_table(&self, table: &Table) -> Result<String, String> {
        let d = self.dialect;
        // SQLite only accepts AUTOINCREMENT on an inline INTEGER PRIMARY KEY.
        let inline_key = match (d.auto_increment, table.primary_key()) {
            (AutoIncrementSyntax::Autoincrement, Some(pk)) => match pk.columns().as_slice() {
                [only] => table
                    .column(only, false)
                    .filter(|c| c.auto_increment)
                    .map(|c| c.name.clone()),
                _ => None,
            },
            _ => None,
        };

        let mut elements = Vec::new();
        for column in &table.columns {
            let inline = inline_key.as_deref() == Some(column.name.as_str());
            elements.push(self.column_definition(column, inline)?);
        }
        for constraint in &table.constraints {
            if inline_key.is_some() && constraint.is_primary_key() {
                continue;
            }
            elements.push(self.constraint_definition(constraint));
        }

        let mut sql = format!("CREATE TABLE {} (\n", d.quote_object(&table.name));
        sql.push_str(
            &elements
                .iter()
                .map(|e| format!("    {e}"))
                .collect::<Vec<_>>()
                .join(",\n"),
        );
        sql.push_str("\n)");

        if !table.options.is_empty() {
            if !d.table_options {
                return Err("table options are not supported".to_string());
            }
            let (flags, values): (Vec<_>, Vec<_>) =
                table.options.iter().partition(|(_, v)| v.is_empty());
            let mut options: Vec<String> = values
                .into_iter()
                .map(|(name, value)| table_option(name, value))
                .collect();
            if !flags.is_empty() {
                options.push(
                    flags
                        .into_iter()
                        .map(|(name, _)| name.clone())
                        .collect::<Vec<_>>()
                        .join(", "),
                );
            }
            sql.push(' ');
            sql.push_str(&options.join(" "));
        }
        Ok(sql)
    }
}

/// `NAME=value`; values that are not plain words are quoted.
fn table_option(name: &str, value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain && name != "COMMENT" {
        format!("{name}={value}")
    } else {
        format!("{name}={}", string_literal(value))
    }
}

fn string_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

fn opt_eq_ignore_case(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}
