//! Tables and schemas.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::column::Column;
use super::constraint::{Constraint, Index};
use super::names_eq;
use crate::ast::ObjectName;
use crate::diff::DiffOptions;

/// A normalized, dialect-independent table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Possibly schema-qualified name.
    pub name: ObjectName,
    /// Columns in ordinal order; positions are contiguous from 1.
    pub columns: Vec<Column>,
    /// Table constraints, inline column constraints included.
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Indexes declared inline or with `CREATE INDEX`.
    #[serde(default)]
    pub indexes: Vec<Index>,
    /// Table options keyed by upper-cased name. Flags such as
    /// `WITHOUT ROWID` have an empty value.
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

/// How a column takes part in the table's keys and indexes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyParticipation {
    /// Part of the primary key.
    pub primary: bool,
    /// Part of a unique constraint or unique index.
    pub unique: bool,
    /// Part of a foreign key.
    pub foreign: bool,
    /// Part of a non-unique index.
    pub indexed: bool,
}

impl Table {
    /// Creates an empty table.
    #[must_use]
    pub fn new(name: ObjectName) -> Self {
        Self {
            name,
            columns: Vec::new(),
            constraints: Vec::new(),
            indexes: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Looks up a column by name.
    #[must_use]
    pub fn column(&self, name: &str, case_sensitive: bool) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| names_eq(&c.name, name, case_sensitive))
    }

    /// Looks up a column by name for modification.
    pub fn column_mut(&mut self, name: &str, case_sensitive: bool) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| names_eq(&c.name, name, case_sensitive))
    }

    /// Index of a column in [`Table::columns`].
    #[must_use]
    pub fn column_index(&self, name: &str, case_sensitive: bool) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| names_eq(&c.name, name, case_sensitive))
    }

    /// The primary key constraint, if any.
    #[must_use]
    pub fn primary_key(&self) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.is_primary_key())
    }

    /// Looks up an index by name.
    #[must_use]
    pub fn index(&self, name: &str, case_sensitive: bool) -> Option<&Index> {
        self.indexes
            .iter()
            .find(|i| names_eq(&i.name, name, case_sensitive))
    }

    /// Reassigns contiguous 1-based positions in declaration order.
    pub fn renumber(&mut self) {
        for (i, column) in self.columns.iter_mut().enumerate() {
            column.position = i + 1;
        }
    }

    /// Returns how `column` participates in keys and indexes.
    #[must_use]
    pub fn key_participation(&self, column: &str, case_sensitive: bool) -> KeyParticipation {
        let mut participation = KeyParticipation::default();
        for constraint in &self.constraints {
            if !constraint.references_column(column, case_sensitive) {
                continue;
            }
            match constraint.kind {
                super::ConstraintKind::PrimaryKey { .. } => participation.primary = true,
                super::ConstraintKind::Unique { .. } => participation.unique = true,
                super::ConstraintKind::ForeignKey { .. } => participation.foreign = true,
                super::ConstraintKind::Check { .. } => {}
            }
        }
        for index in &self.indexes {
            if index.references_column(column, case_sensitive) {
                if index.unique {
                    participation.unique = true;
                } else {
                    participation.indexed = true;
                }
            }
        }
        participation
    }

    /// Returns true if any constraint or index covers `column`.
    #[must_use]
    pub fn is_column_referenced(&self, column: &str, case_sensitive: bool) -> bool {
        self.constraints
            .iter()
            .any(|c| c.references_column(column, case_sensitive))
            || self
                .indexes
                .iter()
                .any(|i| i.references_column(column, case_sensitive))
    }

    /// Structural equality: same name, same columns with equal attributes
    /// (positions and raw type text ignored), same constraint and index
    /// multisets by signature, and same options when
    /// `include_table_options` is set.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self, options: &DiffOptions) -> bool {
        let cs = options.case_sensitive;
        if !object_names_eq(&self.name, &other.name, cs) {
            return false;
        }
        if self.columns.len() != other.columns.len() {
            return false;
        }
        let columns_match = self.columns.iter().all(|column| {
            other
                .column(&column.name, cs)
                .is_some_and(|o| column.attributes_eq(o))
        });
        if !columns_match {
            return false;
        }

        let constraint_sigs = |table: &Self| {
            let mut sigs: Vec<String> = table
                .constraints
                .iter()
                .map(|c| with_name(c.signature(cs), c.name.as_deref(), options))
                .collect();
            sigs.sort();
            sigs
        };
        let index_sigs = |table: &Self| {
            let mut sigs: Vec<String> = table
                .indexes
                .iter()
                .map(|i| with_name(i.signature(cs), Some(&i.name), options))
                .collect();
            sigs.sort();
            sigs
        };
        if constraint_sigs(self) != constraint_sigs(other) || index_sigs(self) != index_sigs(other)
        {
            return false;
        }

        !options.include_table_options || self.options == other.options
    }
}

/// Appends the object name to a signature when names are compared.
pub(crate) fn with_name(signature: String, name: Option<&str>, options: &DiffOptions) -> String {
    match name {
        Some(name) if options.compare_names => {
            let name = if options.case_sensitive {
                name.to_string()
            } else {
                name.to_ascii_lowercase()
            };
            format!("{signature} NAMED {name}")
        }
        _ => signature,
    }
}

/// Compares two object names, schema qualifier included.
#[must_use]
pub fn object_names_eq(a: &ObjectName, b: &ObjectName, case_sensitive: bool) -> bool {
    let schema_eq = match (&a.schema, &b.schema) {
        (Some(x), Some(y)) => names_eq(x, y, case_sensitive),
        (None, None) => true,
        _ => false,
    };
    schema_eq && names_eq(&a.name, &b.name, case_sensitive)
}

/// A set of tables keyed by lower-cased qualified name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    tables: BTreeMap<String, Table>,
}

impl Schema {
    /// Creates an empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lookup key of a table name.
    #[must_use]
    pub fn key(name: &ObjectName) -> String {
        name.to_string().to_ascii_lowercase()
    }

    /// Adds a table, returning the previous table with the same key.
    pub fn insert(&mut self, table: Table) -> Option<Table> {
        self.tables.insert(Self::key(&table.name), table)
    }

    /// Removes a table by name.
    pub fn remove(&mut self, name: &ObjectName) -> Option<Table> {
        self.tables.remove(&Self::key(name))
    }

    /// Case-insensitive table lookup.
    #[must_use]
    pub fn get(&self, name: &ObjectName) -> Option<&Table> {
        self.tables.get(&Self::key(name))
    }

    /// Case-insensitive table lookup for modification.
    pub fn get_mut(&mut self, name: &ObjectName) -> Option<&mut Table> {
        self.tables.get_mut(&Self::key(name))
    }

    /// Looks up a table by key (see [`Schema::key`]).
    #[must_use]
    pub fn get_by_key(&self, key: &str) -> Option<&Table> {
        self.tables.get(key)
    }

    /// Looks up a table by key for modification.
    pub fn get_mut_by_key(&mut self, key: &str) -> Option<&mut Table> {
        self.tables.get_mut(key)
    }

    /// Returns true if the schema holds a table with this name.
    #[must_use]
    pub fn contains(&self, name: &ObjectName) -> bool {
        self.tables.contains_key(&Self::key(name))
    }

    /// Tables in key order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Tables in key order, for modification.
    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.tables.values_mut()
    }

    /// `(key, table)` pairs in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.tables.iter().map(|(k, t)| (k.as_str(), t))
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the schema holds no tables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// The only table, if the schema holds exactly one.
    #[must_use]
    pub fn single_table(&self) -> Option<&Table> {
        if self.tables.len() == 1 {
            self.tables.values().next()
        } else {
            None
        }
    }

    /// Consumes the schema, returning its tables in key order.
    #[must_use]
    pub fn into_tables(self) -> Vec<Table> {
        self.tables.into_values().collect()
    }

    /// Structural equality of every table.
    #[must_use]
    pub fn structurally_eq(&self, other: &Self, options: &DiffOptions) -> bool {
        self.tables.len() == other.tables.len()
            && self.tables.iter().all(|(key, table)| {
                other
                    .tables
                    .get(key)
                    .is_some_and(|o| table.structurally_eq(o, options))
            })
    }
}

impl FromIterator<Table> for Schema {
    fn from_iter<I: IntoIterator<Item = Table>>(iter: I) -> Self {
        let mut schema = Self::new();
        for table in iter {
            schema.insert(table);
        }
        schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{DataType, IndexColumn};
    use crate::schema::{ColumnType, ConstraintKind};

    fn table() -> Table {
        let mut table = Table::new(ObjectName::bare("users"));
        table.columns.push(Column::new(
            "id",
            ColumnType::new(DataType::Integer(None)),
        ));
        table.columns.push(Column::new(
            "email",
            ColumnType::new(DataType::Varchar(Some(255))),
        ));
        table.renumber();
        table.constraints.push(Constraint::new(ConstraintKind::PrimaryKey {
            columns: vec![IndexColumn::named("id")],
        }));
        table.indexes.push(Index {
            name: "email".into(),
            columns: vec![IndexColumn::named("email")],
            unique: true,
            method: None,
        });
        table
    }

    #[test]
    fn test_key_participation() {
        let t = table();
        let id = t.key_participation("ID", false);
        assert!(id.primary);
        assert!(!id.unique);
        let email = t.key_participation("email", false);
        assert!(email.unique);
        assert!(!email.primary);
    }

    #[test]
    fn test_structural_equality_ignores_order_and_raw_text() {
        let a = table();
        let mut b = table();
        b.columns.reverse();
        b.renumber();
        b.columns[0].column_type.raw = "varchar(255)".into();
        assert!(a.structurally_eq(&b, &DiffOptions::default()));

        b.columns[0].nullable = false;
        assert!(!a.structurally_eq(&b, &DiffOptions::default()));
    }

    #[test]
    fn test_structural_equality_and_names() {
        let a = table();
        let mut b = table();
        b.indexes[0].name = "uk_email".into();
        assert!(a.structurally_eq(&b, &DiffOptions::default()));
        assert!(!a.structurally_eq(&b, &DiffOptions::default().with_compare_names(true)));
    }

    #[test]
    fn test_table_options_only_compared_on_request() {
        let a = table();
        let mut b = table();
        b.options.insert("ENGINE".into(), "InnoDB".into());
        assert!(a.structurally_eq(&b, &DiffOptions::default()));
        assert!(!a.structurally_eq(
            &b,
            &DiffOptions::default().with_include_table_options(true)
        ));
    }

    #[test]
    fn test_schema_lookup_is_case_insensitive() {
        let schema: Schema = std::iter::once(table()).collect();
        assert!(schema.contains(&ObjectName::bare("USERS")));
        assert_eq!(schema.single_table().map(|t| t.name.name.as_str()), Some("users"));
    }
}
