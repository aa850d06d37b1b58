//! Command-line interface for instrument-csv-import
//!
//! # Usage Examples
//!
//! ```bash
//! # Import one file into a table named after it
//! csv-import exports/run_01.csv -d lab.db
//!
//! # Import every run_*.csv in a directory into one table, 500 rows per insert group
//! csv-import exports/ --pattern 'run_*.csv' -t runs -b 500
//!
//! # Settings from a JSON file, machine-readable summary
//! csv-import exports/ --config import.json --json
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use instrument_csv_import::config::{ImportConfig, DEFAULT_DATABASE, DEFAULT_LOG_FILE};
use instrument_csv_import::ingestion::{ImportOptions, Importer, LogSink};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Import instrument CSV data into a SQLite database.
#[derive(Debug, Parser)]
#[command(name = "csv-import", version, about)]
struct Cli {
    /// CSV file or directory to import.
    input: PathBuf,

    /// Path to the SQLite database [default: instrument_data.db]
    #[arg(short = 'd', long)]
    database: Option<PathBuf>,

    /// Table name (default: each file's name without extension).
    #[arg(short = 't', long)]
    table: Option<String>,

    /// Rows per insert group [default: 1000]
    #[arg(short = 'b', long, value_parser = clap::value_parser!(u64).range(1..))]
    batch_size: Option<u64>,

    /// Data rows sampled per file for type inference [default: 100]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    sample_rows: Option<u64>,

    /// File pattern for directory imports [default: *.csv]
    #[arg(long)]
    pattern: Option<String>,

    /// Descend into subdirectories in directory imports.
    #[arg(long)]
    recursive: bool,

    /// JSON configuration file; command-line flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file [default: csv_import.log]
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Do not write a log file.
    #[arg(long)]
    no_log_file: bool,

    /// Print the summary as JSON.
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("import process failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ImportConfig::from_path(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ImportConfig::default(),
    };

    let mut options = ImportOptions::default();
    config.apply_to(&mut options);
    if let Some(n) = cli.batch_size {
        options.batch_size = usize::try_from(n).context("batch size out of range")?;
    }
    if let Some(n) = cli.sample_rows {
        options.sample_rows = usize::try_from(n).context("sample rows out of range")?;
    }
    if let Some(p) = &cli.pattern {
        options.pattern = p.clone();
    }
    if cli.recursive {
        options.recursive = true;
    }

    options.log_sinks.retain(|s| matches!(s, LogSink::Console));
    if !cli.no_log_file {
        let log_file = cli
            .log_file
            .clone()
            .or_else(|| config.log_file.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));
        options.log_sinks.push(LogSink::File(log_file));
    }

    let database = cli
        .database
        .clone()
        .or_else(|| config.database.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE));

    let mut importer = Importer::new(&database, options).context("invalid import options")?;
    importer
        .connect()
        .with_context(|| format!("failed to open database {}", database.display()))?;

    let result = importer.import_path(&cli.input, None, cli.table.as_deref());
    importer.disconnect().context("failed to close database")?;
    let stats = result?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        println!("\n{stats}");
    }
    Ok(())
}
