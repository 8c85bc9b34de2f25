//! Dialect capability descriptors.
//!
//! A [`Dialect`] is plain data: which statement forms a database accepts
//! and how identifiers are quoted. New dialects are added by building or
//! deserializing a descriptor, not by implementing a trait.

use serde::{Deserialize, Serialize};

use crate::ast::ObjectName;
use crate::lexer::Keyword;

/// When identifiers are quoted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotePolicy {
    /// Every identifier.
    Always,
    /// Identifiers that are not plain words, or that are reserved.
    WhenNeeded,
    /// Never; identifiers are emitted as written.
    Never,
}

/// Column rename syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenameColumnSyntax {
    /// `RENAME COLUMN a TO b`.
    RenameColumn,
    /// MySQL 5.7 `CHANGE COLUMN a b <definition>`.
    ChangeColumn,
    /// Not supported.
    Unsupported,
}

/// Column modification syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyColumnSyntax {
    /// MySQL `MODIFY COLUMN <definition>`.
    ModifyColumn,
    /// Standard `ALTER COLUMN c TYPE t`, `SET/DROP NOT NULL`, `SET/DROP DEFAULT`.
    AlterColumn,
    /// Not supported.
    Unsupported,
}

/// Constraint drop syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropConstraintSyntax {
    /// `DROP CONSTRAINT name`.
    Standard,
    /// `DROP PRIMARY KEY`, `DROP FOREIGN KEY n`, `DROP INDEX n`, `DROP CHECK n`.
    Mysql,
    /// Not supported.
    Unsupported,
}

/// How the database names constraints the DDL left unnamed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImplicitNaming {
    /// `{table}_pkey`, `{table}_{columns}_key`, `{table}_{columns}_fkey`,
    /// `{table}_check`.
    Postgres,
    /// `{table}_ibfk_1`, unique keys named after their first column,
    /// `{table}_chk_1`.
    Mysql,
    /// Unknown; unnamed constraints cannot be dropped.
    None,
}

/// Index creation syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreateIndexSyntax {
    /// `CREATE [UNIQUE] INDEX n ON t (...)`.
    CreateIndex,
    /// `ALTER TABLE t ADD [UNIQUE] INDEX n (...)`.
    AlterTable,
}

/// Index drop syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropIndexSyntax {
    /// `DROP INDEX n`.
    DropIndex,
    /// `DROP INDEX n ON t`.
    DropIndexOnTable,
    /// `ALTER TABLE t DROP INDEX n`.
    AlterTable,
}

/// Column comment syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnCommentSyntax {
    /// `COMMENT 'text'` in the column definition.
    Inline,
    /// `COMMENT ON COLUMN t.c IS 'text'`.
    CommentOn,
    /// Not supported.
    Unsupported,
}

/// Auto-increment syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoIncrementSyntax {
    /// MySQL `AUTO_INCREMENT`.
    AutoIncrement,
    /// SQLite `AUTOINCREMENT`.
    Autoincrement,
    /// `GENERATED BY DEFAULT AS IDENTITY`.
    Identity,
    /// Not supported.
    None,
}

/// What a database accepts, consumed by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dialect {
    /// Name used in messages.
    pub name: String,
    /// Identifier quote character.
    pub identifier_quote: char,
    /// When identifiers are quoted.
    pub quote_policy: QuotePolicy,
    /// Several clauses in one `ALTER TABLE`.
    pub multi_clause_alter: bool,
    /// Column rename syntax.
    pub rename_column: RenameColumnSyntax,
    /// Column modification syntax.
    pub modify_column: ModifyColumnSyntax,
    /// `RENAME TO`.
    pub rename_table: bool,
    /// `DROP COLUMN`.
    pub drop_column: bool,
    /// `ADD CONSTRAINT` / `ADD PRIMARY KEY` / `ADD FOREIGN KEY`.
    pub add_constraint: bool,
    /// Constraint drop syntax.
    pub drop_constraint: DropConstraintSyntax,
    /// Names of constraints the DDL left unnamed.
    pub implicit_names: ImplicitNaming,
    /// Index creation syntax.
    pub create_index: CreateIndexSyntax,
    /// Index drop syntax.
    pub drop_index: DropIndexSyntax,
    /// `FIRST` / `AFTER c` when adding columns.
    pub column_position: bool,
    /// Column comment syntax.
    pub column_comment: ColumnCommentSyntax,
    /// Auto-increment syntax.
    pub auto_increment: AutoIncrementSyntax,
    /// `UNSIGNED` integers.
    pub unsigned: bool,
    /// `CHARACTER SET` / `COLLATE` on columns.
    pub column_charset: bool,
    /// MySQL `ON UPDATE` column clause.
    pub on_update_clause: bool,
    /// Table options (`ENGINE=...`) in `CREATE` and `ALTER TABLE`.
    pub table_options: bool,
    /// `FULLTEXT` and `SPATIAL` indexes.
    pub fulltext_indexes: bool,
}

impl Default for Dialect {
    fn default() -> Self {
        Self::generic()
    }
}

impl Dialect {
    /// Names accepted by [`Dialect::from_name`].
    pub const BUILTIN: &'static [&'static str] = &["mysql", "mysql57", "postgres", "sqlite", "generic"];

    /// ANSI-leaning dialect: one clause per `ALTER TABLE`, standard syntax.
    #[must_use]
    pub fn generic() -> Self {
        Self {
            name: "generic".to_string(),
            identifier_quote: '"',
            quote_policy: QuotePolicy::WhenNeeded,
            multi_clause_alter: false,
            rename_column: RenameColumnSyntax::RenameColumn,
            modify_column: ModifyColumnSyntax::AlterColumn,
            rename_table: true,
            drop_column: true,
            add_constraint: true,
            drop_constraint: DropConstraintSyntax::Standard,
            implicit_names: ImplicitNaming::None,
            create_index: CreateIndexSyntax::CreateIndex,
            drop_index: DropIndexSyntax::DropIndex,
            column_position: false,
            column_comment: ColumnCommentSyntax::CommentOn,
            auto_increment: AutoIncrementSyntax::Identity,
            unsigned: false,
            column_charset: false,
            on_update_clause: false,
            table_options: false,
            fulltext_indexes: false,
        }
    }

    /// MySQL 8 / MariaDB.
    #[must_use]
    pub fn mysql() -> Self {
        Self {
            name: "mysql".to_string(),
            identifier_quote: '`',
            multi_clause_alter: true,
            modify_column: ModifyColumnSyntax::ModifyColumn,
            drop_constraint: DropConstraintSyntax::Mysql,
            implicit_names: ImplicitNaming::Mysql,
            create_index: CreateIndexSyntax::AlterTable,
            drop_index: DropIndexSyntax::AlterTable,
            column_position: true,
            column_comment: ColumnCommentSyntax::Inline,
            auto_increment: AutoIncrementSyntax::AutoIncrement,
            unsigned: true,
            column_charset: true,
            on_update_clause: true,
            table_options: true,
            fulltext_indexes: true,
            ..Self::generic()
        }
    }

    /// MySQL 5.7, which has no `RENAME COLUMN`.
    #[must_use]
    pub fn mysql57() -> Self {
        Self {
            name: "mysql57".to_string(),
            rename_column: RenameColumnSyntax::ChangeColumn,
            ..Self::mysql()
        }
    }

    /// PostgreSQL.
    #[must_use]
    pub fn postgres() -> Self {
        Self {
            name: "postgres".to_string(),
            multi_clause_alter: true,
            implicit_names: ImplicitNaming::Postgres,
            ..Self::generic()
        }
    }

    /// SQLite: `ALTER TABLE` is limited to renames and adding or dropping
    /// columns.
    #[must_use]
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            modify_column: ModifyColumnSyntax::Unsupported,
            add_constraint: false,
            drop_constraint: DropConstraintSyntax::Unsupported,
            column_comment: ColumnCommentSyntax::Unsupported,
            auto_increment: AutoIncrementSyntax::Autoincrement,
            table_options: true,
            ..Self::generic()
        }
    }

    /// Looks up a built-in dialect by name or common alias.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "mysql" | "mysql8" | "mariadb" => Some(Self::mysql()),
            "mysql57" | "mysql5" => Some(Self::mysql57()),
            "postgres" | "postgresql" | "pg" => Some(Self::postgres()),
            "sqlite" | "sqlite3" => Some(Self::sqlite()),
            "generic" | "ansi" | "standard" => Some(Self::generic()),
            _ => None,
        }
    }

    /// Quotes an identifier according to the quote policy. Embedded quote
    /// characters are doubled.
    #[must_use]
    pub fn quote(&self, ident: &str) -> String {
        let quoted = match self.quote_policy {
            QuotePolicy::Always => true,
            QuotePolicy::WhenNeeded => needs_quoting(ident),
            QuotePolicy::Never => false,
        };
        if quoted {
            let q = self.identifier_quote;
            let escaped = ident.replace(q, &format!("{q}{q}"));
            format!("{q}{escaped}{q}")
        } else {
            ident.to_string()
        }
    }

    /// Quotes a possibly schema-qualified name.
    #[must_use]
    pub fn quote_object(&self, name: &ObjectName) -> String {
        match &name.schema {
            Some(schema) => format!("{}.{}", self.quote(schema), self.quote(&name.name)),
            None => self.quote(&name.name),
        }
    }

    /// Quotes and joins a list of identifiers.
    #[must_use]
    pub fn quote_list<S: AsRef<str>>(&self, idents: &[S]) -> String {
        idents
            .iter()
            .map(|i| self.quote(i.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Words that are reserved in at least one supported database but unknown to
/// the lexer.
const EXTRA_RESERVED: &[&str] = &[
    "ADD", "ALL", "ALTER", "AND", "ASC", "BY", "COLUMN", "DESC", "DROP", "FROM", "GROUP", "IN",
    "INSERT", "IS", "LIMIT", "OR", "ORDER", "RENAME", "TO", "UPDATE", "USER", "WHERE",
];

/// Returns true when `ident` is not a plain word or is reserved.
fn needs_quoting(ident: &str) -> bool {
    let mut chars = ident.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !plain {
        return true;
    }
    Keyword::from_str(ident).is_some_and(|k| k.is_reserved())
        || EXTRA_RESERVED
            .iter()
            .any(|w| w.eq_ignore_ascii_case(ident))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        for name in Dialect::BUILTIN {
            assert_eq!(Dialect::from_name(name).map(|d| d.name), Some((*name).to_string()));
        }
        assert_eq!(Dialect::from_name("PostgreSQL"), Some(Dialect::postgres()));
        assert!(Dialect::from_name("oracle").is_none());
    }

    #[test]
    fn test_quote_when_needed() {
        let mysql = Dialect::mysql();
        assert_eq!(mysql.quote("users"), "users");
        assert_eq!(mysql.quote("order"), "`order`");
        assert_eq!(mysql.quote("first name"), "`first name`");
        assert_eq!(mysql.quote("we`ird"), "`we``ird`");
        assert_eq!(Dialect::postgres().quote("key"), "\"key\"");
    }

    #[test]
    fn test_quote_always_and_qualified() {
        let dialect = Dialect {
            quote_policy: QuotePolicy::Always,
            ..Dialect::postgres()
        };
        let name = ObjectName {
            schema: Some("app".into()),
            name: "users".into(),
        };
        assert_eq!(dialect.quote_object(&name), "\"app\".\"users\"");
    }

    #[test]
    fn test_custom_descriptor_from_yaml() {
        let dialect: Dialect = serde_yaml::from_str(
            "name: cockroach\nmulti_clause_alter: true\nquote_policy: always\n",
        )
        .unwrap();
        assert_eq!(dialect.name, "cockroach");
        assert!(dialect.multi_clause_alter);
        assert_eq!(dialect.quote_policy, QuotePolicy::Always);
        assert_eq!(dialect.modify_column, ModifyColumnSyntax::AlterColumn);
    }
}
