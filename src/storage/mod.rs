//! Storage module for persisting ingested papers
//!
//! This module handles all database operations for the ingester, including:
//! - SQLite database initialization and schema management
//! - Idempotent upserts of paper records keyed by work-list position
//! - Section embeddings keyed by record and section
//! - Status tracking and counts for statistics

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteRecordStore;
pub use traits::{RecordStore, StorageError, StorageResult};

use crate::pipeline::PaperRecord;
use std::path::Path;

/// Identifier of a stored paper record
pub type RecordId = i64;

/// Opens or creates the record store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteRecordStore)` - Successfully initialized storage
/// * `Err(StorageError)` - Failed to initialize storage
pub fn open_record_store(path: &Path) -> StorageResult<SqliteRecordStore> {
    SqliteRecordStore::new(path)
}

/// A paper record as stored, with its bookkeeping columns
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub id: RecordId,
    pub position: usize,
    pub status: RecordStatus,
    pub record: PaperRecord,
    pub created_at: String,
    pub updated_at: String,
}

/// Processing status of a stored record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    Processing,
    Completed,
    Failed,
}

impl RecordStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    pub fn all() -> [Self; 3] {
        [Self::Processing, Self::Completed, Self::Failed]
    }
}
