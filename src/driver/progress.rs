//! Durable record of how far the driver has got
//!
//! The progress document is a small human-readable JSON file. Every write
//! is a whole-document read-modify-write; at most one driver may own a
//! given file.

use crate::driver::WorkItem;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading or writing the progress document
#[derive(Debug, Error)]
pub enum ProgressError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed progress document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A permanently failed item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub row: usize,
    pub title: String,
    pub error: String,
    pub timestamp: String,
}

/// Persisted progress of a work-list run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressDocument {
    /// Position of the last completed item, -1 when none
    pub last_processed_row: i64,
    pub last_processed_title: String,
    pub total_rows: usize,
    pub timestamp: String,
    pub failed_papers: Vec<FailureRecord>,
}

impl Default for ProgressDocument {
    fn default() -> Self {
        Self {
            last_processed_row: -1,
            last_processed_title: String::new(),
            total_rows: 0,
            timestamp: String::new(),
            failed_papers: Vec::new(),
        }
    }
}

impl ProgressDocument {
    /// First position a resumed run should process
    pub fn start_position(&self) -> usize {
        usize::try_from(self.last_processed_row + 1).unwrap_or(0)
    }
}

/// File-backed store for the progress document
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
}

impl ProgressStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the document, or the empty document if the file does not exist
    pub fn load(&self) -> Result<ProgressDocument, ProgressError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ProgressDocument::default())
            }
            Err(source) => {
                return Err(ProgressError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ProgressError::Json {
            path: self.path.clone(),
            source,
        })
    }

    /// Writes the whole document, replacing the file atomically
    pub fn save(&self, document: &ProgressDocument) -> Result<(), ProgressError> {
        let json = serde_json::to_string_pretty(document).map_err(|source| {
            ProgressError::Json {
                path: self.path.clone(),
                source,
            }
        })?;

        let io_error = |source| ProgressError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(io_error)?;
            }
        }

        let tmp_path = self.tmp_path();
        std::fs::write(&tmp_path, json).map_err(io_error)?;
        std::fs::rename(&tmp_path, &self.path).map_err(io_error)?;
        Ok(())
    }

    /// Marks `item` as the last completed position
    pub fn record_success(
        &self,
        item: &WorkItem,
        total_rows: usize,
    ) -> Result<ProgressDocument, ProgressError> {
        let mut document = self.load()?;
        document.last_processed_row = item.position as i64;
        document.last_processed_title = item.label.clone();
        document.total_rows = total_rows;
        document.timestamp = now();
        self.save(&document)?;
        Ok(document)
    }

    /// Appends a failure for `item`; the completed position is unchanged
    pub fn record_failure(
        &self,
        item: &WorkItem,
        total_rows: usize,
        error: &str,
    ) -> Result<ProgressDocument, ProgressError> {
        let mut document = self.load()?;
        let timestamp = now();
        document.failed_papers.push(FailureRecord {
            row: item.position,
            title: item.label.clone(),
            error: error.to_string(),
            timestamp: timestamp.clone(),
        });
        document.total_rows = total_rows;
        document.timestamp = timestamp;
        self.save(&document)?;
        Ok(document)
    }

    /// Removes the document so the next run starts from the beginning
    pub fn reset(&self) -> Result<(), ProgressError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ProgressError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}
