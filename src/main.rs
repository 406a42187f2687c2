//! Paper-Ingest main entry point
//!
//! This is the command-line interface for the Paper-Ingest work driver.

use anyhow::Context;
use clap::Parser;
use paper_ingest::admission::{AdmissionController, ResourceLimitTable};
use paper_ingest::config::{load_config_with_hash, Config};
use paper_ingest::driver::{load_work_list, ProgressStore, WorkDriver};
use paper_ingest::output::{
    load_statistics, print_limit_table, print_run_summary, print_statistics,
};
use paper_ingest::pipeline::HttpPipeline;
use paper_ingest::storage::open_record_store;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Paper-Ingest: quota-aware, resumable paper ingestion
///
/// Paper-Ingest walks a work list of papers through a fetch and extraction
/// pipeline, throttling every call into quota-limited services and resuming
/// from the last completed item after a restart.
#[derive(Parser, Debug)]
#[command(name = "paper-ingest")]
#[command(version)]
#[command(about = "Quota-aware, resumable paper ingestion", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Discard saved progress and start from the first item
    #[arg(long)]
    fresh: bool,

    /// Validate config and show what would be processed without processing
    #[arg(long, conflicts_with_all = ["stats", "fresh"])]
    dry_run: bool,

    /// Show progress and record statistics and exit
    #[arg(long, conflicts_with_all = ["dry_run", "fresh"])]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(config, cli.fresh).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("paper_ingest=info,warn"),
            1 => EnvFilter::new("paper_ingest=debug,info"),
            2 => EnvFilter::new("paper_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be processed
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Paper-Ingest Dry Run ===\n");

    println!("Driver:");
    println!("  Work list: {}", config.driver.work_list);
    println!("  Progress document: {}", config.driver.progress_path);
    println!("  Database: {}", config.driver.database_path);
    println!("  Item delay: {}ms", config.driver.item_delay_ms);
    println!("  Stage timeout: {}s", config.driver.stage_timeout_secs);

    println!("\nFetcher:");
    println!("  Max attempts: {}", config.fetcher.max_attempts);
    println!("  Timeout: {}s", config.fetcher.timeout_secs);
    println!("  User agent: {}", config.fetcher.user_agent);
    match &config.fetcher.resource_class {
        Some(class) => println!("  Resource class: {}", class),
        None => println!("  Resource class: (ungated)"),
    }

    println!();
    print_limit_table(&ResourceLimitTable::from_entries(&config.limits));

    let items = load_work_list(Path::new(&config.driver.work_list))?;
    let progress = ProgressStore::new(&config.driver.progress_path).load()?;
    let start = progress.start_position().min(items.len());

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would process {} of {} items, starting at position {}",
        items.len() - start,
        items.len(),
        start
    );

    Ok(())
}

/// Handles the --stats mode: shows progress and database statistics
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}", config.driver.database_path);
    println!("Progress: {}\n", config.driver.progress_path);

    let store = open_record_store(Path::new(&config.driver.database_path))?;
    let progress = ProgressStore::new(&config.driver.progress_path);

    let stats = load_statistics(&store, &progress)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main ingestion run
async fn handle_run(config: Config, fresh: bool) -> anyhow::Result<()> {
    let progress = ProgressStore::new(&config.driver.progress_path);
    if fresh {
        tracing::info!("Starting fresh run (discarding saved progress)");
        progress.reset()?;
    } else {
        tracing::info!("Starting run (will resume from saved progress)");
    }

    let items = load_work_list(Path::new(&config.driver.work_list))
        .with_context(|| format!("failed to load work list {}", config.driver.work_list))?;
    tracing::info!("Loaded {} work items", items.len());

    let limits = ResourceLimitTable::from_entries(&config.limits);
    let admission = Arc::new(AdmissionController::new(limits));
    let pipeline = HttpPipeline::from_config(&config.fetcher)?;
    let store = open_record_store(Path::new(&config.driver.database_path))?;

    let mut driver = WorkDriver::new(admission, progress, pipeline, store)
        .with_item_delay(Duration::from_millis(config.driver.item_delay_ms))
        .with_stage_timeout(Duration::from_secs(config.driver.stage_timeout_secs));

    let summary = driver.run_until(&items, shutdown_signal()).await?;
    print_run_summary(&summary);

    Ok(())
}

/// Resolves on Ctrl-C; never resolves if the handler cannot be installed
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
