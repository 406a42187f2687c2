//! Statistics generation from the record store and progress document
//!
//! This module provides functionality for extracting and displaying
//! ingestion statistics.

use crate::driver::{ProgressDocument, ProgressStore, RunSummary};
use crate::storage::{RecordStatus, RecordStore};
use crate::IngestError;
use std::collections::HashMap;

/// Ingestion statistics summary
#[derive(Debug, Clone)]
pub struct IngestStatistics {
    /// Total number of stored records
    pub total_records: u64,

    /// Count of records by status
    pub records_by_status: HashMap<RecordStatus, u64>,

    /// Total number of stored section embeddings
    pub total_embeddings: u64,

    /// The persisted progress document
    pub progress: ProgressDocument,
}

/// Loads statistics from storage and the progress document
///
/// # Returns
///
/// * `Ok(IngestStatistics)` - Successfully loaded statistics
/// * `Err(IngestError)` - Failed to query statistics
pub fn load_statistics(
    store: &dyn RecordStore,
    progress: &ProgressStore,
) -> Result<IngestStatistics, IngestError> {
    let total_records = store.count_records()?;
    let total_embeddings = store.count_embeddings()?;

    let mut records_by_status = HashMap::new();
    for status in RecordStatus::all() {
        let count = store.count_by_status(status)?;
        if count > 0 {
            records_by_status.insert(status, count);
        }
    }

    Ok(IngestStatistics {
        total_records,
        records_by_status,
        total_embeddings,
        progress: progress.load()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &IngestStatistics) {
    println!("=== Ingest Statistics ===\n");

    println!("Progress:");
    if stats.progress.last_processed_row < 0 {
        println!("  No items completed yet");
    } else {
        println!(
            "  Last completed: #{} {}",
            stats.progress.last_processed_row, stats.progress.last_processed_title
        );
    }
    println!("  Total items: {}", stats.progress.total_rows);
    if !stats.progress.timestamp.is_empty() {
        println!("  Updated at: {}", stats.progress.timestamp);
    }
    println!();

    println!("Records:");
    println!("  Total records: {}", stats.total_records);
    println!("  Total embeddings: {}", stats.total_embeddings);
    for status in RecordStatus::all() {
        let count = stats.records_by_status.get(&status).copied().unwrap_or(0);
        println!("  {}: {}", status.to_db_string(), count);
    }
    println!();

    if !stats.progress.failed_papers.is_empty() {
        println!("Failed Items ({}):", stats.progress.failed_papers.len());
        for failure in &stats.progress.failed_papers {
            println!("  - #{} {}: {}", failure.row, failure.title, failure.error);
        }
        println!();
    }
}

/// Prints the end-of-run summary
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run Summary ===");
    println!("  Items in work list: {}", summary.total_items);
    println!("  Started at position: {}", summary.start_position);
    println!("  Processed: {}", summary.processed);
    println!("  Failed: {}", summary.failed);
    if summary.interrupted {
        println!("  Run was interrupted; rerun to resume");
    }
}
