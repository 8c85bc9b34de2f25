//! Diff properties over randomly generated tables and mutations.

mod common;

use std::collections::BTreeSet;

use common::table;
use proptest::prelude::*;
use sql_diff_core::{diff_tables, plan, replay, Change, ChangeKind, Dialect, DiffOptions};

// =============================================================================
// Generators
// =============================================================================

const TYPES: &[&str] = &[
    "INT",
    "BIGINT",
    "VARCHAR(20)",
    "VARCHAR(50)",
    "TEXT",
    "DECIMAL(10,2)",
    "DATE",
];

const MAX_COLUMNS: usize = 6;

#[derive(Debug, Clone)]
struct ColumnSpec {
    name: String,
    ty: usize,
    not_null: bool,
    default: Option<usize>,
}

impl ColumnSpec {
    fn to_sql(&self) -> String {
        let ty = TYPES[self.ty];
        let mut sql = format!("{} {ty}", self.name);
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(choice) = self.default {
            let values: [&str; 2] = match ty {
                "INT" | "BIGINT" | "DECIMAL(10,2)" => ["0", "1"],
                "DATE" => ["'2020-01-01'", "'2021-06-30'"],
                _ => ["'a'", "'b'"],
            };
            sql.push_str(" DEFAULT ");
            sql.push_str(values[choice]);
        }
        sql
    }
}

#[derive(Debug, Clone)]
struct TableSpec {
    columns: Vec<ColumnSpec>,
    primary_key: Option<String>,
    keys: BTreeSet<String>,
    uniques: BTreeSet<String>,
}

impl TableSpec {
    fn to_sql(&self) -> String {
        let mut parts: Vec<String> = self.columns.iter().map(ColumnSpec::to_sql).collect();
        if let Some(pk) = &self.primary_key {
            parts.push(format!("PRIMARY KEY ({pk})"));
        }
        for key in &self.keys {
            parts.push(format!("KEY idx_{key} ({key})"));
        }
        for unique in &self.uniques {
            parts.push(format!("UNIQUE KEY uq_{unique} ({unique})"));
        }
        format!("CREATE TABLE t ({})", parts.join(", "))
    }

    fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }
}

type Attributes = (usize, bool, Option<usize>);

fn attributes() -> impl Strategy<Value = Attributes> {
    (0..TYPES.len(), any::<bool>(), prop::option::of(0..2usize))
}

fn column(name: String, (ty, not_null, default): Attributes) -> ColumnSpec {
    ColumnSpec {
        name,
        ty,
        not_null,
        default,
    }
}

fn index_set() -> impl Strategy<Value = BTreeSet<usize>> {
    prop::collection::btree_set(0..MAX_COLUMNS, 0..=2)
}

fn pick(names: &[String], indexes: &BTreeSet<usize>) -> BTreeSet<String> {
    indexes
        .iter()
        .map(|i| names[i % names.len()].clone())
        .collect()
}

fn table_spec() -> impl Strategy<Value = TableSpec> {
    (
        prop::collection::vec(attributes(), 1..=MAX_COLUMNS),
        prop::option::of(0..MAX_COLUMNS),
        index_set(),
        index_set(),
    )
        .prop_map(|(attrs, primary_key, keys, uniques)| {
            let columns: Vec<ColumnSpec> = attrs
                .into_iter()
                .enumerate()
                .map(|(i, a)| column(format!("c{i}"), a))
                .collect();
            let names: Vec<String> = columns.iter().map(|c| c.name.clone()).collect();
            TableSpec {
                primary_key: primary_key.map(|i| names[i % names.len()].clone()),
                keys: pick(&names, &keys),
                uniques: pick(&names, &uniques),
                columns,
            }
        })
}

/// Edits turning a source table into a target table. `None` keeps the
/// source's key definitions for the columns that survive.
#[derive(Debug, Clone)]
struct Mutation {
    dropped: Vec<bool>,
    retyped: Vec<Option<usize>>,
    toggled_null: Vec<bool>,
    redefaulted: Vec<Option<Option<usize>>>,
    added: Vec<Attributes>,
    primary_key: Option<Option<usize>>,
    keys: Option<BTreeSet<usize>>,
    uniques: Option<BTreeSet<usize>>,
}

fn mutation() -> impl Strategy<Value = Mutation> {
    (
        prop::collection::vec(prop::bool::weighted(0.2), MAX_COLUMNS),
        prop::collection::vec(prop::option::weighted(0.2, 0..TYPES.len()), MAX_COLUMNS),
        prop::collection::vec(prop::bool::weighted(0.2), MAX_COLUMNS),
        prop::collection::vec(
            prop::option::weighted(0.2, prop::option::of(0..2usize)),
            MAX_COLUMNS,
        ),
        prop::collection::vec(attributes(), 0..3),
        prop::option::weighted(0.3, prop::option::of(0..MAX_COLUMNS)),
        prop::option::weighted(0.3, index_set()),
        prop::option::weighted(0.3, index_set()),
    )
        .prop_map(
            |(dropped, retyped, toggled_null, redefaulted, added, primary_key, keys, uniques)| {
                Mutation {
                    dropped,
                    retyped,
                    toggled_null,
                    redefaulted,
                    added,
                    primary_key,
                    keys,
                    uniques,
                }
            },
        )
}

fn apply(source: &TableSpec, mutation: &Mutation) -> TableSpec {
    let mut columns: Vec<ColumnSpec> = Vec::new();
    for (i, original) in source.columns.iter().enumerate() {
        if mutation.dropped[i] {
            continue;
        }
        let mut col = original.clone();
        if let Some(ty) = mutation.retyped[i] {
            col.ty = ty;
        }
        if mutation.toggled_null[i] {
            col.not_null = !col.not_null;
        }
        if let Some(default) = mutation.redefaulted[i] {
            col.default = default;
        }
        columns.push(col);
    }
    for (j, attrs) in mutation.added.iter().enumerate() {
        columns.push(column(format!("n{j}"), *attrs));
    }
    if columns.is_empty() {
        columns.push(source.columns[0].clone());
    }

    let mut target = TableSpec {
        columns,
        primary_key: None,
        keys: BTreeSet::new(),
        uniques: BTreeSet::new(),
    };
    let names: Vec<String> = target.columns.iter().map(|c| c.name.clone()).collect();

    target.primary_key = match mutation.primary_key {
        None => source
            .primary_key
            .clone()
            .filter(|pk| target.has_column(pk)),
        Some(choice) => choice.map(|i| names[i % names.len()].clone()),
    };
    target.keys = match &mutation.keys {
        None => source
            .keys
            .iter()
            .filter(|k| target.has_column(k))
            .cloned()
            .collect(),
        Some(set) => pick(&names, set),
    };
    target.uniques = match &mutation.uniques {
        None => source
            .uniques
            .iter()
            .filter(|k| target.has_column(k))
            .cloned()
            .collect(),
        Some(set) => pick(&names, set),
    };
    target
}

fn column_changes(changes: &[Change]) -> Vec<(ChangeKind, String)> {
    let mut out: Vec<(ChangeKind, String)> = changes
        .iter()
        .filter(|c| {
            matches!(
                c.kind(),
                ChangeKind::AddColumn | ChangeKind::DropColumn | ChangeKind::ModifyColumn
            )
        })
        .map(|c| (c.kind(), c.object_name().to_ascii_lowercase()))
        .collect();
    out.sort();
    out
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_plan_replays_to_target(source in table_spec(), mutation in mutation()) {
        let target_spec = apply(&source, &mutation);
        let source = table(&source.to_sql());
        let target = table(&target_spec.to_sql());
        let options = DiffOptions::default();
        let changes = diff_tables(&source, &target, &options);

        for dialect in [Dialect::mysql(), Dialect::postgres()] {
            let plan = plan(&changes, &dialect)
                .unwrap_or_else(|e| panic!("{}: {e}", dialect.name));
            let replayed = replay(&source, &plan)
                .unwrap_or_else(|e| panic!("{}: {e}\n{plan}", dialect.name));
            prop_assert!(
                replayed.structurally_eq(&target, &options),
                "{}: {}\n{plan}",
                dialect.name,
                target_spec.to_sql()
            );
        }
    }

    #[test]
    fn prop_diff_with_itself_is_empty(spec in table_spec()) {
        let t = table(&spec.to_sql());
        let changes = diff_tables(&t, &t, &DiffOptions::default());
        prop_assert!(changes.is_empty(), "{}: {changes:?}", spec.to_sql());
    }

    #[test]
    fn prop_inverse_matches_reverse_diff(source in table_spec(), mutation in mutation()) {
        let target = table(&apply(&source, &mutation).to_sql());
        let source = table(&source.to_sql());
        let options = DiffOptions::default().with_detect_renames(false);

        let forward = diff_tables(&source, &target, &options);
        let backward = diff_tables(&target, &source, &options);
        prop_assert_eq!(
            column_changes(&forward.inverse().changes),
            column_changes(&backward.changes)
        );
    }

    #[test]
    fn prop_planning_is_deterministic(source in table_spec(), mutation in mutation()) {
        let target = table(&apply(&source, &mutation).to_sql());
        let source = table(&source.to_sql());
        let changes = diff_tables(&source, &target, &DiffOptions::default());
        let mut reversed = changes.clone();
        reversed.changes.reverse();

        for dialect in [Dialect::mysql(), Dialect::postgres()] {
            let first = plan(&changes, &dialect).unwrap().to_sql();
            prop_assert_eq!(&first, &plan(&changes, &dialect).unwrap().to_sql());
            prop_assert_eq!(&first, &plan(&reversed, &dialect).unwrap().to_sql());
        }
    }
}
