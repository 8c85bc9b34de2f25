//! Output formats: a colored human report, JSON, and a bare DDL script.

use std::fs;
use std::path::Path;

use colored::Colorize;
use serde::Serialize;
use sql_diff_core::{BatchReport, Plan};

use crate::ai::Analysis;
use crate::error::{CliError, Result};
use crate::pipeline::Outcome;

/// Output format of the diff command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    /// Report, DDL and analysis for a terminal.
    #[default]
    Human,
    /// One JSON document.
    Json,
    /// Only the DDL statements.
    Ddl,
}

/// DDL script: one statement per line, each terminated by `;`.
#[must_use]
pub fn ddl_script(plan: &Plan) -> String {
    if plan.is_empty() {
        return String::new();
    }
    let mut script = plan.to_sql();
    script.push('\n');
    script
}

// ================================================================
// Human
// ================================================================

fn colorize(line: &str) -> String {
    let Some(rest) = line.strip_prefix("  ") else {
        return line.bold().to_string();
    };
    let (body, risk) = match rest.find(" [risk: ") {
        Some(at) => rest.split_at(at),
        None => (rest, ""),
    };
    let body = match body.chars().next() {
        Some('+') => body.green(),
        Some('-') => body.red(),
        Some('~') => body.yellow(),
        Some('>') => body.cyan(),
        Some('?') => body.magenta().bold(),
        Some('!') => body.yellow().dimmed(),
        _ => body.normal(),
    };
    format!("  {body}{}", risk.red().bold())
}

fn render_analysis(analysis: &Analysis, color: bool, out: &mut String) {
    let heading = |text: &str| {
        if color {
            text.bold().blue().to_string()
        } else {
            text.to_string()
        }
    };
    out.push('\n');
    out.push_str(&heading("AI analysis"));
    out.push('\n');
    if !analysis.summary.is_empty() {
        out.push_str(&analysis.summary);
        out.push('\n');
    }
    let sections = [
        ("Suggestions", &analysis.suggestions),
        ("Risks", &analysis.risks),
        ("Best practices", &analysis.best_practices),
    ];
    for (title, items) in sections {
        if items.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&heading(title));
        out.push('\n');
        for item in items {
            out.push_str("  - ");
            out.push_str(item);
            out.push('\n');
        }
    }
}

/// Renders the report, then the DDL unless `plan` is withheld, then
/// unsupported changes and the AI analysis.
#[must_use]
pub fn render_human(
    outcome: &Outcome,
    plan: Option<&Plan>,
    analysis: Option<&Analysis>,
    color: bool,
) -> String {
    let mut out = String::new();
    for line in outcome.report.to_string().lines() {
        if color {
            out.push_str(&colorize(line));
        } else {
            out.push_str(line);
        }
        out.push('\n');
    }

    match plan {
        Some(plan) if !plan.is_empty() => {
            let title = format!("-- DDL ({})", plan.dialect);
            out.push('\n');
            out.push_str(&if color { title.dimmed().to_string() } else { title });
            out.push('\n');
            out.push_str(&ddl_script(plan));
        }
        Some(_) => {}
        None => {
            out.push_str(
                "\nDDL withheld: settle the ambiguous renames with --rename [table.]old=new \
                 or pass --accept-drop-add.\n",
            );
        }
    }

    if let Some(err) = &outcome.plan_error {
        out.push_str("\nUnsupported changes:\n");
        for failure in err.failures() {
            let line = format!("  x {failure}");
            out.push_str(&if color { line.red().to_string() } else { line });
            out.push('\n');
        }
    }

    if let Some(analysis) = analysis.filter(|a| !a.is_empty()) {
        render_analysis(analysis, color, &mut out);
    }
    out
}

// ================================================================
// JSON
// ================================================================

#[derive(Serialize)]
struct JsonDocument<'a> {
    identical: bool,
    report: &'a BatchReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<&'a Plan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sql: Option<String>,
    unsupported: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis: Option<&'a Analysis>,
}

/// Renders one pretty-printed JSON document.
///
/// # Errors
///
/// Returns [`CliError::Json`] if serialization fails.
pub fn render_json(
    outcome: &Outcome,
    plan: Option<&Plan>,
    analysis: Option<&Analysis>,
) -> Result<String> {
    let document = JsonDocument {
        identical: outcome.is_empty(),
        report: &outcome.report,
        plan,
        sql: plan.map(Plan::to_sql),
        unsupported: outcome
            .plan_error
            .iter()
            .flat_map(|e| e.failures().iter().map(ToString::to_string))
            .collect(),
        analysis,
    };
    let mut text = serde_json::to_string_pretty(&document)?;
    text.push('\n');
    Ok(text)
}

/// Writes `content` to `path`.
///
/// # Errors
///
/// Returns [`CliError::Io`] if the file cannot be written.
pub fn write_file(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}
