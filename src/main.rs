use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use chat_history_search::config::AppConfig;
use chat_history_search::db::Database;
use chat_history_search::importer::{build_index, ImportOptions};
use chat_history_search::logging::init_logging;
use chat_history_search::models::ImportMode;
use chat_history_search::reporter::{day_counts, query_day, QueryOptions};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file layered over the defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a chat export JSON file into a store
    BuildIndex {
        /// Chat export document (JSON)
        input: PathBuf,

        /// Store file (defaults to the input path with a .db extension)
        #[arg(short, long)]
        store: Option<PathBuf>,

        /// Replace the store if it already exists
        #[arg(short, long, conflicts_with = "append")]
        force: bool,

        /// Add to an existing store instead of building a new one
        #[arg(short, long)]
        append: bool,
    },
    /// Render every message from one day as an HTML report
    Query {
        /// Store file, or the export document it was built from
        target: PathBuf,

        /// Day to report on (YYYY-MM-DD)
        date: String,

        /// Directory for the report (defaults to the working directory)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Do not open the report in a viewer
        #[arg(long)]
        no_open: bool,
    },
    /// List the days that have messages
    Days {
        /// Store file, or the export document it was built from
        target: PathBuf,
    },
}

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load_with(cli.config.as_deref()).context("Failed to load configuration")?;

    // Initialize logging
    let level = if cli.verbose { "debug".to_string() } else { config.get_log_level() };
    let _log_guard = init_logging(Some(&level), config.log_file_path(), config.logging.format == "json")?;

    // Process command
    match cli.command {
        Commands::BuildIndex { input, store, force, append } => {
            let mode = if append {
                ImportMode::Append
            } else if force {
                ImportMode::Overwrite
            } else {
                ImportMode::Create
            };
            let store = config.resolve_store_path(&input, store.as_deref());
            let summary = build_index(&config, &ImportOptions { input, store, mode })?;
            info!(
                "Import complete: {} imported, {} skipped ({} duplicates)",
                summary.imported,
                summary.skipped(),
                summary.skipped_duplicate
            );
        },
        Commands::Query { target, date, output_dir, no_open } => {
            let options = QueryOptions {
                store: config.resolve_store_path(&target, None),
                date,
                output_dir: output_dir.unwrap_or_else(|| PathBuf::from(&config.report.output_directory)),
                open_viewer: !no_open && config.report.open_in_viewer,
            };
            let outcome = query_day(&config, &options)?;
            info!(
                "Report for {} written to {} ({} messages)",
                outcome.date,
                outcome.path.display(),
                outcome.message_count
            );
        },
        Commands::Days { target } => list_days(&config, &target)?,
    }

    Ok(())
}

/// Print each day with messages and its count
#[allow(clippy::print_stdout)]
fn list_days(config: &AppConfig, target: &std::path::Path) -> Result<()> {
    let db = Database::open(&config.resolve_store_path(target, None))?;
    let counts = day_counts(&db, config.day_zone()?)?;

    if counts.is_empty() {
        info!("Store {} holds no messages", db.path().display());
    }
    for (date, count) in counts {
        println!("{date}  {count}");
    }

    Ok(())
}
