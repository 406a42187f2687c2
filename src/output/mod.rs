//! Output module for run summaries and reports
//!
//! This module handles:
//! - Printing the end-of-run summary
//! - Loading and printing statistics for `--stats`
//! - Printing the resource limit table for `--dry-run`

pub mod stats;

pub use stats::{load_statistics, print_run_summary, print_statistics, IngestStatistics};

use crate::admission::ResourceLimitTable;

/// Prints the resource limit table
pub fn print_limit_table(limits: &ResourceLimitTable) {
    println!("Resource limits ({} classes):", limits.len());
    for (class, limit) in limits.iter() {
        println!(
            "  - {}: {} req/min, {} cost/min, {} req/day, floor {:?}",
            class,
            limit.requests_per_minute,
            limit.cost_per_minute,
            limit.requests_per_day,
            limit.floor_delay
        );
    }
}
