//! Storage traits and error types
//!
//! This module defines the trait interface for the record sink and
//! associated error types.

use crate::pipeline::PaperRecord;
use crate::storage::{RecordId, RecordStatus, StoredRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for record sink implementations
///
/// Writes are keyed so that replaying an item after a crash overwrites
/// what the earlier attempt stored instead of duplicating it.
pub trait RecordStore: Send {
    /// Inserts or replaces the record for a work-list position
    ///
    /// A replay overwrites every field and resets the status to
    /// `Processing`.
    ///
    /// # Returns
    ///
    /// The record ID, stable across replays of the same position
    fn upsert_record(&mut self, position: usize, record: &PaperRecord)
        -> StorageResult<RecordId>;

    /// Inserts or replaces the embedding of one section of a record
    fn upsert_embedding(
        &mut self,
        record_id: RecordId,
        section: &str,
        vector: &[f32],
    ) -> StorageResult<()>;

    /// Updates the processing status of a record
    fn update_status(&mut self, record_id: RecordId, status: RecordStatus) -> StorageResult<()>;

    /// Gets a record by ID
    fn get_record(&self, record_id: RecordId) -> StorageResult<StoredRecord>;

    /// Gets the record stored for a work-list position, if any
    fn find_by_position(&self, position: usize) -> StorageResult<Option<StoredRecord>>;

    /// Gets the stored vector for one section of a record, if any
    fn get_embedding(&self, record_id: RecordId, section: &str)
        -> StorageResult<Option<Vec<f32>>>;

    // ===== Statistics =====

    /// Counts records by status
    fn count_by_status(&self, status: RecordStatus) -> StorageResult<u64>;

    /// Gets total record count
    fn count_records(&self) -> StorageResult<u64>;

    /// Gets total embedding count
    fn count_embeddings(&self) -> StorageResult<u64>;
}
