//! Rename detection between unmatched source and target columns.
//!
//! Explicit hints are applied first. The remaining columns are paired by a
//! score mixing name similarity and structural similarity; a candidate is
//! accepted only when nothing else competes with it for either column.
//! Competing candidates are reported as [`AmbiguousRename`] and their columns
//! fall back to drop + add.

use tracing::{debug, trace};

use super::change::{AmbiguousRename, DiffWarning, RenameCandidate};
use super::options::{DiffOptions, RenameHint};
use super::similarity::name_similarity;
use crate::ast::ObjectName;
use crate::schema::{names_eq, Column, Table};

/// Scores closer than this are equal.
const SCORE_EPSILON: f64 = 1e-9;

/// Cost of a different data type of the same kind.
const TYPE_COST: f64 = 0.25;

/// Cost of each differing column attribute.
const ATTRIBUTE_COST: f64 = 0.1;

/// Cost of each unique/foreign/indexed participation mismatch.
const KEY_COST: f64 = 0.2;

/// An accepted column rename.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRename {
    /// Source column name.
    pub from: String,
    /// Target column name.
    pub to: String,
    /// Combined score; 1.0 for hints.
    pub score: f64,
    /// Declared by a rename hint.
    pub hinted: bool,
}

/// Outcome of rename resolution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Accepted renames.
    pub renames: Vec<ColumnRename>,
    /// Contested candidates.
    pub ambiguities: Vec<AmbiguousRename>,
    /// Target columns to add.
    pub added: Vec<String>,
    /// Source columns to drop.
    pub dropped: Vec<String>,
    /// Ignored hints.
    pub warnings: Vec<DiffWarning>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    source: usize,
    target: usize,
    score: f64,
}

/// Resolves unmatched columns into renames, ambiguities, adds and drops.
///
/// `source` and `target` are the full tables, used for key participation and
/// to explain ignored hints.
#[must_use]
pub fn resolve(
    table: &ObjectName,
    unmatched_source: &[&Column],
    unmatched_target: &[&Column],
    source: &Table,
    target: &Table,
    options: &DiffOptions,
) -> Resolution {
    let cs = options.case_sensitive;
    let mut resolution = Resolution::default();
    let mut source_used = vec![false; unmatched_source.len()];
    let mut target_used = vec![false; unmatched_target.len()];

    for hint in &options.rename_hints {
        if !hint_applies_to(hint, source, target, cs) {
            continue;
        }
        let s = unmatched_source
            .iter()
            .enumerate()
            .position(|(i, c)| !source_used[i] && names_eq(&c.name, &hint.from, cs));
        let t = unmatched_target
            .iter()
            .enumerate()
            .position(|(i, c)| !target_used[i] && names_eq(&c.name, &hint.to, cs));
        match (s, t) {
            (Some(s), Some(t)) => {
                debug!(table = %table, from = %hint.from, to = %hint.to, "Applying rename hint");
                source_used[s] = true;
                target_used[t] = true;
                resolution.renames.push(ColumnRename {
                    from: unmatched_source[s].name.clone(),
                    to: unmatched_target[t].name.clone(),
                    score: 1.0,
                    hinted: true,
                });
            }
            (s, t) => {
                let reason = if s.is_none() {
                    if source.column(&hint.from, cs).is_some() {
                        format!("column '{}' is already matched by name", hint.from)
                    } else {
                        format!("source has no column '{}'", hint.from)
                    }
                } else if t.is_none() && target.column(&hint.to, cs).is_some() {
                    format!("column '{}' is already matched by name", hint.to)
                } else {
                    format!("target has no column '{}'", hint.to)
                };
                debug!(table = %table, hint = %hint, reason = %reason, "Ignoring rename hint");
                resolution.warnings.push(DiffWarning::RenameHintIgnored {
                    table: table.clone(),
                    hint: hint.to_string(),
                    reason,
                });
            }
        }
    }

    if options.detect_renames {
        let mut candidates = Vec::new();
        for (si, s) in unmatched_source.iter().enumerate() {
            if source_used[si] {
                continue;
            }
            for (ti, t) in unmatched_target.iter().enumerate() {
                if target_used[ti] {
                    continue;
                }
                let Some(structural) = structural_score(s, t, source, target, cs) else {
                    continue;
                };
                let score = options.name_weight * name_similarity(&s.name, &t.name)
                    + (1.0 - options.name_weight) * structural;
                trace!(from = %s.name, to = %t.name, score, "Scored rename candidate");
                if score + SCORE_EPSILON >= options.rename_threshold {
                    candidates.push(Candidate {
                        source: si,
                        target: ti,
                        score,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.source.cmp(&b.source))
                .then(a.target.cmp(&b.target))
        });

        loop {
            candidates.retain(|c| !source_used[c.source] && !target_used[c.target]);
            let Some(best) = candidates.first().map(|c| c.score) else {
                break;
            };
            let level: Vec<Candidate> = candidates
                .iter()
                .copied()
                .filter(|c| c.score >= best - options.ambiguity_margin - SCORE_EPSILON)
                .collect();

            let contested = |c: &Candidate| {
                level.iter().any(|d| {
                    (d.source, d.target) != (c.source, c.target)
                        && (d.source == c.source || d.target == c.target)
                })
            };
            let (contested_level, accepted): (Vec<Candidate>, Vec<Candidate>) =
                level.iter().copied().partition(|c| contested(c));

            for c in accepted {
                let (s, t) = (unmatched_source[c.source], unmatched_target[c.target]);
                debug!(table = %table, from = %s.name, to = %t.name, score = c.score, "Detected column rename");
                source_used[c.source] = true;
                target_used[c.target] = true;
                resolution.renames.push(ColumnRename {
                    from: s.name.clone(),
                    to: t.name.clone(),
                    score: c.score,
                    hinted: false,
                });
            }

            for group in components(&contested_level) {
                let mut report = AmbiguousRename {
                    table: table.clone(),
                    sources: Vec::new(),
                    targets: Vec::new(),
                    candidates: Vec::new(),
                };
                for c in group {
                    let (s, t) = (unmatched_source[c.source], unmatched_target[c.target]);
                    if !source_used[c.source] {
                        source_used[c.source] = true;
                        report.sources.push(s.name.clone());
                    }
                    if !target_used[c.target] {
                        target_used[c.target] = true;
                        report.targets.push(t.name.clone());
                    }
                    report.candidates.push(RenameCandidate {
                        from: s.name.clone(),
                        to: t.name.clone(),
                        score: c.score,
                    });
                }
                debug!(table = %table, candidates = report.candidates.len(), "Ambiguous rename");
                resolution.ambiguities.push(report);
            }
        }
    }

    let renamed_from = |name: &str| resolution.renames.iter().any(|r| r.from == name);
    let renamed_to = |name: &str| resolution.renames.iter().any(|r| r.to == name);
    let dropped: Vec<String> = unmatched_source
        .iter()
        .filter(|c| !renamed_from(&c.name))
        .map(|c| c.name.clone())
        .collect();
    let added: Vec<String> = unmatched_target
        .iter()
        .filter(|c| !renamed_to(&c.name))
        .map(|c| c.name.clone())
        .collect();
    resolution.dropped = dropped;
    resolution.added = added;
    resolution
}

/// A hint applies when its table names either side, or, unqualified, when
/// either of its columns exists in the tables.
fn hint_applies_to(hint: &RenameHint, source: &Table, target: &Table, cs: bool) -> bool {
    match &hint.table {
        Some(name) => [&source.name, &target.name]
            .iter()
            .any(|t| names_eq(name, &t.to_string(), cs) || names_eq(name, &t.name, cs)),
        None => source.column(&hint.from, cs).is_some() || target.column(&hint.to, cs).is_some(),
    }
}

/// Structural similarity in `[0, 1]`; `None` when the pair cannot be a
/// rename (different kind or primary-key participation).
fn structural_score(
    source_column: &Column,
    target_column: &Column,
    source: &Table,
    target: &Table,
    cs: bool,
) -> Option<f64> {
    let (a, b) = (&source_column.column_type, &target_column.column_type);
    if a.kind() != b.kind() {
        return None;
    }
    let ka = source.key_participation(&source_column.name, cs);
    let kb = target.key_participation(&target_column.name, cs);
    if ka.primary != kb.primary {
        return None;
    }

    let mut score = 1.0;
    if a.data_type != b.data_type {
        score -= TYPE_COST;
    }
    let attributes = [
        source_column.nullable != target_column.nullable,
        source_column.default != target_column.default,
        source_column.auto_increment != target_column.auto_increment,
        a.unsigned != b.unsigned,
        !charset_eq(a.charset.as_deref(), b.charset.as_deref())
            || !charset_eq(a.collation.as_deref(), b.collation.as_deref()),
        source_column.comment != target_column.comment,
    ];
    for differs in attributes {
        if differs {
            score -= ATTRIBUTE_COST;
        }
    }
    for differs in [
        ka.unique != kb.unique,
        ka.foreign != kb.foreign,
        ka.indexed != kb.indexed,
    ] {
        if differs {
            score -= KEY_COST;
        }
    }
    Some(f64::max(score, 0.0))
}

fn charset_eq(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

/// Groups candidates sharing a source or target column.
fn components(candidates: &[Candidate]) -> Vec<Vec<Candidate>> {
    let mut groups: Vec<Vec<Candidate>> = Vec::new();
    for &c in candidates {
        let linked: Vec<usize> = groups
            .iter()
            .enumerate()
            .filter(|(_, g)| g.iter().any(|d| d.source == c.source || d.target == c.target))
            .map(|(i, _)| i)
            .collect();
        let mut merged = vec![c];
        for i in linked.into_iter().rev() {
            merged.extend(groups.remove(i));
        }
        merged.sort_by(|a, b| a.source.cmp(&b.source).then(a.target.cmp(&b.target)));
        groups.push(merged);
    }
    groups.sort_by_key(|g| g.first().map(|c| (c.source, c.target)));
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::DataType;
    use crate::schema::ColumnType;

    fn varchar(name: &str, n: u32) -> Column {
        Column::new(name, ColumnType::new(DataType::Varchar(Some(n))))
    }

    fn table(columns: Vec<Column>) -> Table {
        let mut table = Table::new(ObjectName::bare("users"));
        table.columns = columns;
        table.renumber();
        table
    }

    fn run(source: &Table, target: &Table, options: &DiffOptions) -> Resolution {
        let s: Vec<&Column> = source.columns.iter().collect();
        let t: Vec<&Column> = target.columns.iter().collect();
        resolve(&target.name, &s, &t, source, target, options)
    }

    #[test]
    fn test_affix_rename_is_detected() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![varchar("full_name", 50)]);
        let resolution = run(&source, &target, &DiffOptions::default());
        assert_eq!(resolution.renames.len(), 1);
        assert_eq!(resolution.renames[0].from, "name");
        assert_eq!(resolution.renames[0].to, "full_name");
        assert!((resolution.renames[0].score - 0.9).abs() < 1e-9);
        assert!(resolution.added.is_empty());
        assert!(resolution.dropped.is_empty());
    }

    #[test]
    fn test_tie_is_reported_not_guessed() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![varchar("first_name", 50), varchar("last_name", 50)]);
        let resolution = run(&source, &target, &DiffOptions::default());
        assert!(resolution.renames.is_empty());
        assert_eq!(resolution.ambiguities.len(), 1);
        assert_eq!(resolution.ambiguities[0].targets.len(), 2);
        assert_eq!(resolution.dropped, vec!["name"]);
        assert_eq!(resolution.added, vec!["first_name", "last_name"]);
    }

    #[test]
    fn test_different_kinds_are_never_renamed() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![Column::new(
            "full_name",
            ColumnType::new(DataType::Integer(None)),
        )]);
        let resolution = run(&source, &target, &DiffOptions::default());
        assert!(resolution.renames.is_empty());
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_unrelated_names_stay_drop_add() {
        let source = table(vec![varchar("zip", 10)]);
        let target = table(vec![varchar("country", 10)]);
        let resolution = run(&source, &target, &DiffOptions::default());
        assert!(resolution.renames.is_empty());
        assert_eq!(resolution.dropped, vec!["zip"]);
        assert_eq!(resolution.added, vec!["country"]);
    }

    #[test]
    fn test_hint_breaks_tie() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![varchar("first_name", 50), varchar("last_name", 50)]);
        let options = DiffOptions::default().with_rename_hint(RenameHint::new("name", "last_name"));
        let resolution = run(&source, &target, &options);
        assert_eq!(resolution.renames.len(), 1);
        assert!(resolution.renames[0].hinted);
        assert_eq!(resolution.added, vec!["first_name"]);
        assert!(resolution.ambiguities.is_empty());
    }

    #[test]
    fn test_unusable_hint_warns() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![varchar("full_name", 50)]);
        let options =
            DiffOptions::default().with_rename_hint(RenameHint::new("name", "nickname"));
        let resolution = run(&source, &target, &options);
        assert!(matches!(
            &resolution.warnings[..],
            [DiffWarning::RenameHintIgnored { reason, .. }] if reason.contains("nickname")
        ));
        assert_eq!(resolution.renames.len(), 1);
    }

    #[test]
    fn test_detection_can_be_disabled() {
        let source = table(vec![varchar("name", 50)]);
        let target = table(vec![varchar("full_name", 50)]);
        let resolution = run(
            &source,
            &target,
            &DiffOptions::default().with_detect_renames(false),
        );
        assert!(resolution.renames.is_empty());
        assert_eq!(resolution.added, vec!["full_name"]);
    }

    #[test]
    fn test_margin_widens_contest() {
        // "emails" scores above the affix pair "email_address" (0.9).
        let source = table(vec![varchar("email", 50)]);
        let target = table(vec![varchar("emails", 50), varchar("email_address", 50)]);
        let strict = run(&source, &target, &DiffOptions::default());
        assert_eq!(strict.renames.len(), 1);
        assert_eq!(strict.renames[0].to, "emails");

        let lenient = run(
            &source,
            &target,
            &DiffOptions::default().with_ambiguity_margin(0.1),
        );
        assert!(lenient.renames.is_empty());
        assert_eq!(lenient.ambiguities.len(), 1);
    }
}
