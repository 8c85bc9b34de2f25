//! Parse, diff, summarize and plan two DDL inputs.

use rayon::prelude::*;
use sql_diff_core::{
    diff_pair, diff_tables, pair_tables, plan_batch, summarize_all, AmbiguousRename,
    AmbiguousRenameError, BatchReport, ChangeSet, Dialect, DiffOptions, Plan, PlanError, Schema,
};
use tracing::{debug, info};

use crate::error::Result;

/// One diff invocation.
#[derive(Debug, Clone, Copy)]
pub struct DiffRequest<'a> {
    /// DDL of the current schema.
    pub source: &'a str,
    /// DDL of the desired schema.
    pub target: &'a str,
    /// Diff options.
    pub options: &'a DiffOptions,
    /// Dialect to plan for.
    pub dialect: &'a Dialect,
}

/// Everything a diff produced.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// One change set per changed table pair.
    pub change_sets: Vec<ChangeSet>,
    /// Human and machine readable summary.
    pub report: BatchReport,
    /// Statements for every renderable change.
    pub plan: Plan,
    /// Set when some changes have no form in the dialect.
    pub plan_error: Option<PlanError>,
}

impl Outcome {
    /// Returns true when the schemas are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.change_sets.iter().all(ChangeSet::is_empty)
    }

    /// Ambiguity reports of every change set.
    #[must_use]
    pub fn ambiguities(&self) -> Vec<AmbiguousRename> {
        self.change_sets
            .iter()
            .flat_map(|set| set.ambiguities.iter().cloned())
            .collect()
    }

    /// The plan, unless undecided renames must first be settled by the
    /// user.
    #[must_use]
    pub fn publishable_plan(&self, accept_drop_add: bool) -> Option<&Plan> {
        if accept_drop_add || self.ambiguities().is_empty() {
            Some(&self.plan)
        } else {
            None
        }
    }

    /// Turns undecided renames and unrenderable changes into errors.
    ///
    /// # Errors
    ///
    /// Returns an ambiguous rename error unless `accept_drop_add` is set,
    /// then the plan error if any.
    pub fn check(&self, accept_drop_add: bool) -> Result<()> {
        let ambiguities = self.ambiguities();
        if !accept_drop_add && !ambiguities.is_empty() {
            return Err(sql_diff_core::Error::from(AmbiguousRenameError { ambiguities }).into());
        }
        if let Some(err) = &self.plan_error {
            return Err(sql_diff_core::Error::from(err.clone()).into());
        }
        Ok(())
    }
}

/// Diffs two parsed schemas. When both hold exactly one table the tables
/// are diffed as a pair, so a name difference is a table rename; otherwise
/// tables are matched by name and the pairs are diffed in parallel.
#[must_use]
pub fn diff_schemas(source: &Schema, target: &Schema, options: &DiffOptions) -> Vec<ChangeSet> {
    if let (Some(s), Some(t)) = (source.single_table(), target.single_table()) {
        debug!(source = %s.name, target = %t.name, "Diffing single table pair");
        let set = diff_tables(s, t, options);
        return if set.is_empty() { Vec::new() } else { vec![set] };
    }

    let pairs = pair_tables(source, target);
    debug!(pairs = pairs.len(), "Diffing tables matched by name");
    pairs
        .into_par_iter()
        .filter_map(|(s, t)| diff_pair(s, t, options))
        .collect()
}

/// Runs the whole pipeline.
///
/// # Errors
///
/// Returns an error for invalid options or DDL that does not parse or
/// violates a table invariant. Unrenderable changes are not an error here;
/// they are kept in [`Outcome::plan_error`].
pub fn run(request: &DiffRequest<'_>) -> Result<Outcome> {
    request
        .options
        .validate()
        .map_err(sql_diff_core::Error::from)?;

    let source = Schema::parse(request.source)?;
    let target = Schema::parse(request.target)?;
    debug!(
        source_tables = source.len(),
        target_tables = target.len(),
        "Parsed schemas"
    );

    let change_sets = diff_schemas(&source, &target, request.options);
    let report = summarize_all(&change_sets);

    let (plan, plan_error) = match plan_batch(&change_sets, request.dialect) {
        Ok(plan) => (plan, None),
        Err(err) => (err.partial().clone(), Some(err)),
    };
    info!(
        changes = report.counts.total(),
        statements = plan.len(),
        dialect = %plan.dialect,
        "Diff complete"
    );

    Ok(Outcome {
        change_sets,
        report,
        plan,
        plan_error,
    })
}
