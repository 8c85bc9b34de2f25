//! sql-diff CLI
//!
//! Compares two sets of `CREATE TABLE` statements and prints the DDL that
//! turns the first into the second.

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use sql_diff_cli::ai::AiClient;
use sql_diff_cli::config::{Config, CONFIG_FILE_NAME};
use sql_diff_cli::error::{CliError, Result, EXIT_OK};
use sql_diff_cli::input::read_multiline;
use sql_diff_cli::output::{self, Format};
use sql_diff_cli::pipeline::{self, DiffRequest};
use sql_diff_cli::spinner::with_spinner;
use sql_diff_core::{Dialect, RenameHint, Schema};

/// AST-based SQL schema diff and DDL generator.
#[derive(Parser)]
#[command(name = "sql-diff")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (default: ./.sql-diff-config.yaml, then ~/.sql-diff-config.yaml).
    #[arg(long, global = true, env = "SQL_DIFF_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    diff: DiffArgs,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct DiffArgs {
    /// Source (current) schema DDL.
    #[arg(short, long, conflicts_with = "source_file")]
    source: Option<String>,

    /// File holding the source schema DDL.
    #[arg(long)]
    source_file: Option<PathBuf>,

    /// Target (desired) schema DDL.
    #[arg(short, long, conflicts_with = "target_file")]
    target: Option<String>,

    /// File holding the target schema DDL.
    #[arg(long)]
    target_file: Option<PathBuf>,

    /// Read missing schemas from standard input.
    #[arg(short, long)]
    interactive: bool,

    /// Dialect to generate DDL for (mysql, mysql57, postgres, sqlite, generic).
    #[arg(short, long, conflicts_with = "dialect_file")]
    dialect: Option<String>,

    /// YAML or JSON dialect descriptor.
    #[arg(long)]
    dialect_file: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = Format::Human)]
    format: Format,

    /// Write the DDL (or the JSON document) to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Treat constraint and index name changes as changes.
    #[arg(long)]
    compare_names: bool,

    /// Compare identifiers case-sensitively.
    #[arg(long)]
    case_sensitive: bool,

    /// Never match dropped and added columns as renames.
    #[arg(long)]
    no_renames: bool,

    /// Minimum similarity score for a rename, between 0 and 1.
    #[arg(long, value_name = "SCORE")]
    rename_threshold: Option<f64>,

    /// Declare a rename, e.g. `users.name=full_name`. Repeatable.
    #[arg(long = "rename", value_name = "[TABLE.]OLD=NEW")]
    renames: Vec<RenameHint>,

    /// Render table option changes as DDL.
    #[arg(long)]
    include_table_options: bool,

    /// Emit drop and add statements for ambiguous renames instead of failing.
    #[arg(long)]
    accept_drop_add: bool,

    /// Ask the AI provider to analyze the differences.
    #[arg(long)]
    ai: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Draft a CREATE TABLE statement from a description (uses AI).
    Generate {
        /// What the table should hold.
        #[arg(short, long)]
        description: String,

        /// Write the statement to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draft ALTER TABLE statements for an existing table (uses AI).
    Alter {
        /// Current CREATE TABLE statement.
        #[arg(short, long, required_unless_present = "interactive")]
        table: Option<String>,

        /// Read the current table from standard input.
        #[arg(short, long)]
        interactive: bool,

        /// The change to make.
        #[arg(short, long)]
        description: String,

        /// Write the statements to this file.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Inspect or create the configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Clone, Copy, Subcommand)]
enum ConfigAction {
    /// Print the effective configuration with the API key masked.
    Show,

    /// Print `export` lines for the environment variables.
    Env,

    /// Write a default configuration file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("failed to install logger: {err}");
    }

    let code = match run(cli).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            error!("{err}");
            err.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        None => diff(cli.diff, cli.config.as_deref()).await,
        Some(Commands::Generate {
            description,
            output,
        }) => generate(&description, output.as_deref(), cli.config.as_deref()).await,
        Some(Commands::Alter {
            table,
            interactive,
            description,
            output,
        }) => {
            let current = match table {
                Some(sql) if !interactive => sql,
                _ => prompt_sql("current table")?,
            };
            alter(&current, &description, output.as_deref(), cli.config.as_deref()).await
        }
        Some(Commands::Config { action }) => config(action, cli.config.as_deref()),
    }
}

// ================================================================
// Diff
// ================================================================

async fn diff(args: DiffArgs, config_path: Option<&Path>) -> Result<()> {
    let mut config = Config::load(config_path)?;
    if args.ai {
        config.ai.enabled = true;
    }

    let options = &mut config.diff;
    options.compare_names |= args.compare_names;
    options.case_sensitive |= args.case_sensitive;
    options.include_table_options |= args.include_table_options;
    if args.no_renames {
        options.detect_renames = false;
    }
    if let Some(threshold) = args.rename_threshold {
        options.rename_threshold = threshold;
    }
    options.rename_hints.extend(args.renames);
    config.apply_dialect_flags(args.dialect.as_deref(), args.dialect_file.is_some());
    config.validate()?;

    let dialect = resolve_dialect(
        args.dialect.as_deref(),
        args.dialect_file.as_deref(),
        config.dialect.as_deref(),
    )?;

    let source = read_side("source", args.source, args.source_file.as_deref(), args.interactive)?;
    let target = read_side("target", args.target, args.target_file.as_deref(), args.interactive)?;

    let outcome = pipeline::run(&DiffRequest {
        source: &source,
        target: &target,
        options: &config.diff,
        dialect: &dialect,
    })?;

    if outcome.is_empty() {
        info!("The schemas are identical");
    }

    let analysis = if config.ai.enabled && !outcome.is_empty() {
        let result = match AiClient::new(&config.ai) {
            Ok(client) => {
                with_spinner(
                    "Analyzing differences...",
                    client.analyze(&source, &target, &outcome.report, &outcome.plan),
                )
                .await
            }
            Err(err) => Err(err),
        };
        match result {
            Ok(analysis) => Some(analysis),
            Err(err) => {
                warn!("AI analysis failed: {err:#}");
                None
            }
        }
    } else {
        None
    };

    let plan = outcome.publishable_plan(args.accept_drop_add);
    match args.format {
        Format::Human => {
            let color = io::stdout().is_terminal();
            print!(
                "{}",
                output::render_human(&outcome, plan, analysis.as_ref(), color)
            );
            if let (Some(path), Some(plan)) = (&args.output, plan) {
                output::write_file(path, &output::ddl_script(plan))?;
                info!("DDL written to {}", path.display());
            }
        }
        Format::Json => {
            let text = output::render_json(&outcome, plan, analysis.as_ref())?;
            emit(&text, args.output.as_deref())?;
        }
        Format::Ddl => {
            let text = plan.map(output::ddl_script).unwrap_or_default();
            emit(&text, args.output.as_deref())?;
        }
    }

    outcome.check(args.accept_drop_add)
}

fn resolve_dialect(
    name: Option<&str>,
    file: Option<&Path>,
    configured: Option<&str>,
) -> Result<Dialect> {
    if let Some(path) = file {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        // YAML parsing also accepts JSON descriptors
        return serde_yaml::from_str(&text).map_err(|err| CliError::DialectFile {
            path: path.to_path_buf(),
            message: err.to_string(),
        });
    }
    let name = name.or(configured).unwrap_or("mysql");
    Dialect::from_name(name).ok_or_else(|| {
        CliError::Usage(format!(
            "unknown dialect '{name}', expected one of: {}",
            Dialect::BUILTIN.join(", ")
        ))
    })
}

fn read_side(
    label: &str,
    inline: Option<String>,
    file: Option<&Path>,
    interactive: bool,
) -> Result<String> {
    if let Some(sql) = inline {
        return Ok(sql);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        });
    }
    if interactive {
        return prompt_sql(label);
    }
    Err(CliError::Usage(format!(
        "no {label} schema given; use --{label}, --{label}-file or --interactive"
    )))
}

fn prompt_sql(label: &str) -> Result<String> {
    eprintln!("Enter the {label} DDL (finish with END or two blank lines):");
    let sql = read_multiline(io::stdin().lock())?;
    if sql.is_empty() {
        return Err(CliError::Usage(format!("empty {label} DDL")));
    }
    Ok(sql)
}

fn emit(text: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            output::write_file(path, text)?;
            info!("Output written to {}", path.display());
        }
        None => print!("{text}"),
    }
    Ok(())
}

// ================================================================
// AI drafting
// ================================================================

fn ai_config(config_path: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(config_path)?;
    config.ai.enabled = true;
    config.validate()?;
    Ok(config)
}

async fn generate(
    description: &str,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = ai_config(config_path)?;
    let client = AiClient::new(&config.ai).map_err(CliError::Ai)?;

    let sql = with_spinner(
        "Generating CREATE TABLE statement...",
        client.generate_create_table(description),
    )
    .await
    .map_err(CliError::Ai)?;
    let script = format!("{sql};\n");
    emit(&script, output)?;

    let schema = Schema::parse(&sql)?;
    info!(tables = schema.len(), "Generated DDL parses");
    Ok(())
}

async fn alter(
    current: &str,
    description: &str,
    output: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<()> {
    Schema::parse(current)?;
    let config = ai_config(config_path)?;
    let client = AiClient::new(&config.ai).map_err(CliError::Ai)?;

    let sql = with_spinner(
        "Generating ALTER TABLE statements...",
        client.generate_alter_table(current, description),
    )
    .await
    .map_err(CliError::Ai)?;
    let mut script = String::new();
    for line in sql.lines().map(str::trim).filter(|line| !line.is_empty()) {
        script.push_str(line.trim_end_matches(';'));
        script.push_str(";\n");
    }
    emit(&script, output)
}

// ================================================================
// Configuration
// ================================================================

fn config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(config_path)?;
            print!("{}", config.masked().to_yaml()?);
        }
        ConfigAction::Env => {
            let config = Config::load(config_path)?;
            print!("{}", config.env_exports());
        }
        ConfigAction::Init { force } => {
            let path =
                config_path.map_or_else(|| PathBuf::from(CONFIG_FILE_NAME), Path::to_path_buf);
            Config::write_default(&path, force)?;
            info!("Created {}", path.display());
        }
    }
    Ok(())
}
