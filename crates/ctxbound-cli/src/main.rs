//! ctxbound CLI: bounded exports, summaries and output validation from the shell.
//!
//! Every command prints compact JSON that has already passed
//! `safe_serialize` under the configured byte budget.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use ctxbound_core::config::BudgetConfig;
use ctxbound_io::ExportFormat;
use ctxbound_reader::DataReader;
use ctxbound_safety::{safe_serialize, Validator};
use ctxbound_store::{DateRange, Store};

#[derive(Parser)]
#[command(name = "ctxbound")]
#[command(about = "Context-bounded access to fitness telemetry", long_about = None)]
struct Cli {
    /// YAML budget configuration (applied before CTXBOUND_* variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// DuckDB database file; in-memory when omitted
    #[arg(long, global = true, env = "CTXBOUND_DB")]
    db: Option<PathBuf>,

    /// Scratch directory for export files (overrides config)
    #[arg(long, global = true)]
    scratch_dir: Option<PathBuf>,

    /// Maximum JSON payload in bytes (overrides config)
    #[arg(long, global = true)]
    max_json_bytes: Option<usize>,

    /// Maximum rendered table rows (overrides config)
    #[arg(long, global = true)]
    max_table_rows: Option<usize>,

    /// Maximum rows loadable from an export (overrides config)
    #[arg(long, global = true)]
    max_load_rows: Option<usize>,

    /// Maximum live materialized views (overrides config)
    #[arg(long, global = true)]
    max_views: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a query result to a scratch file and print its handle
    Export {
        /// SQL query or table name
        query: String,

        /// parquet or csv
        #[arg(long, default_value = "parquet")]
        format: ExportFormat,

        /// Fail when the result has more rows than this
        #[arg(long)]
        max_rows: Option<u64>,
    },

    /// Per-column statistics of a table or query
    Profile {
        /// SQL query or table name
        source: String,

        /// First day (YYYY-MM-DD), inclusive
        #[arg(long, requires = "end")]
        start: Option<String>,

        /// Last day (YYYY-MM-DD), inclusive
        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Equal-width histogram of one numeric column
    Histogram {
        /// SQL query or table name
        source: String,

        /// Numeric column to bin
        column: String,

        /// Number of bins (capped at the configured maximum)
        #[arg(long)]
        bins: Option<usize>,

        #[arg(long, requires = "end")]
        start: Option<String>,

        #[arg(long, requires = "start")]
        end: Option<String>,
    },

    /// Materialize a query and report its row count (the view is dropped on exit)
    Materialize {
        name: String,

        query: String,

        /// Lifetime in seconds (defaults to the configured view TTL)
        #[arg(long)]
        ttl_secs: Option<u64>,
    },

    /// Check output (a file, or stdin) against the size budgets
    Validate {
        /// File to check; reads stdin when omitted
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// Returns false when `validate` rejected its input.
fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    let config = load_config(&cli)?;

    let reader = || -> Result<DataReader, Box<dyn std::error::Error>> {
        let store = match &cli.db {
            Some(path) => Store::open(path)?,
            None => Store::open_in_memory()?,
        };
        Ok(DataReader::new(Arc::new(store), config.clone())?)
    };

    match &cli.command {
        Commands::Export {
            query,
            format,
            max_rows,
        } => {
            let handle = reader()?.export(query, *format, *max_rows)?;
            println!("{}", handle.to_bounded_json()?);
        }
        Commands::Profile { source, start, end } => {
            let range = date_range(start, end)?;
            let profile = reader()?.profile(source, range.as_ref())?;
            emit(&profile, &config)?;
        }
        Commands::Histogram {
            source,
            column,
            bins,
            start,
            end,
        } => {
            let range = date_range(start, end)?;
            let hist = reader()?.histogram(source, column, *bins, range.as_ref())?;
            emit(&hist, &config)?;
        }
        Commands::Materialize {
            name,
            query,
            ttl_secs,
        } => {
            let reader = reader()?;
            let view = reader.materialize(name, query, ttl_secs.map(Duration::from_secs))?;
            emit(&view, &config)?;
            // The registry dies with this process; leave no unowned table in the database.
            reader.drop_view(name)?;
        }
        Commands::Validate { file } => {
            let output = match file {
                Some(path) => std::fs::read_to_string(path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let verdict = Validator::from_config(&config).validate(&output);
            emit(&verdict, &config)?;
            return Ok(verdict.ok);
        }
        Commands::ShowConfig => {
            print!("{}", serde_yaml::to_string(&config)?);
        }
    }
    Ok(true)
}

/// Defaults, then the YAML file, then `CTXBOUND_*`, then flags.
fn load_config(cli: &Cli) -> Result<BudgetConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => BudgetConfig::from_yaml_file(path)?,
        None => BudgetConfig::default(),
    };
    config.apply_env();
    apply_cli_overrides(&mut config, cli);
    config.validate()?;
    tracing::debug!(
        scratch_dir = %config.scratch_dir.display(),
        max_json_bytes = config.max_json_bytes,
        max_table_rows = config.max_table_rows,
        "configuration loaded"
    );
    Ok(config)
}

fn apply_cli_overrides(config: &mut BudgetConfig, cli: &Cli) {
    if let Some(dir) = &cli.scratch_dir {
        config.scratch_dir = dir.clone();
    }
    if let Some(n) = cli.max_json_bytes {
        config.max_json_bytes = n;
    }
    if let Some(n) = cli.max_table_rows {
        config.max_table_rows = n;
    }
    if let Some(n) = cli.max_load_rows {
        config.max_load_rows = n;
    }
    if let Some(n) = cli.max_views {
        config.max_views = n;
    }
}

fn date_range(
    start: &Option<String>,
    end: &Option<String>,
) -> Result<Option<DateRange>, Box<dyn std::error::Error>> {
    match (start, end) {
        (Some(s), Some(e)) => Ok(Some(DateRange::parse(s, e)?)),
        _ => Ok(None),
    }
}

fn emit<T: Serialize>(value: &T, config: &BudgetConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", safe_serialize(value, config.max_json_bytes)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("ctxbound").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn flags_override_defaults() {
        let cli = parse(&["--max-table-rows", "7", "--scratch-dir", "/tmp/cli", "show-config"]);
        let mut config = BudgetConfig::default();
        apply_cli_overrides(&mut config, &cli);
        assert_eq!(config.max_table_rows, 7);
        assert_eq!(config.scratch_dir, PathBuf::from("/tmp/cli"));
        assert_eq!(config.max_json_bytes, BudgetConfig::default().max_json_bytes);
    }

    #[test]
    fn export_format_parses_from_flags() {
        let cli = parse(&["export", "SELECT 1", "--format", "csv", "--max-rows", "10"]);
        match cli.command {
            Commands::Export { format, max_rows, .. } => {
                assert_eq!(format, ExportFormat::Csv);
                assert_eq!(max_rows, Some(10));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn date_bounds_come_in_pairs() {
        assert!(Cli::try_parse_from(["ctxbound", "profile", "splits", "--start", "2024-03-01"]).is_err());
        let cli = parse(&["profile", "splits", "--start", "2024-03-01", "--end", "2024-03-31"]);
        match cli.command {
            Commands::Profile { start, end, .. } => {
                assert!(date_range(&start, &end).unwrap().is_some());
            }
            _ => panic!("expected profile"),
        }
    }
}
