//! Paper-Ingest: quota-aware, resumable ingestion of research papers
//!
//! This crate throttles every call into quota-limited external services and
//! drives a list of papers through a fetch/extract/store pipeline, resuming
//! from the last completed item after a restart.

pub mod admission;
pub mod config;
pub mod driver;
pub mod output;
pub mod pipeline;
pub mod storage;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Paper-Ingest operations
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Progress error: {0}")]
    Progress(#[from] driver::ProgressError),

    #[error("Work list error: {0}")]
    WorkList(String),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// The failure of a single fetch attempt
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

/// Errors surfaced by the retrying fetcher
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid reference '{reference}': {source}")]
    InvalidReference {
        reference: String,
        source: ::url::ParseError,
    },

    #[error("Failed to fetch {reference} after {attempts} attempts: {last}")]
    Exhausted {
        reference: String,
        attempts: u32,
        #[source]
        last: AttemptError,
    },
}

impl FetchError {
    /// Returns true if the last attempt ended in a timeout
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Exhausted {
                last: AttemptError::Timeout(_),
                ..
            }
        )
    }
}

/// Errors produced by a single pipeline stage for one work item
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("{stage} timed out after {after:?}")]
    Timeout { stage: &'static str, after: Duration },

    #[error("{stage} transport error: {message}")]
    Transport { stage: &'static str, message: String },

    #[error("{stage} returned a malformed response: {message}")]
    Malformed { stage: &'static str, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

impl StageError {
    /// Malformed responses degrade to a default result instead of failing the item
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed { .. })
    }

    /// Returns true for hard per-call timeouts, which are terminal for the item
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Fetch(e) => e.is_timeout(),
            _ => false,
        }
    }
}

/// Result type alias for Paper-Ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for pipeline stages
pub type StageResult<T> = std::result::Result<T, StageError>;

// Re-export commonly used types
pub use admission::{AdmissionController, ResourceClass, ResourceLimit, ResourceLimitTable};
pub use config::Config;
pub use driver::{ProgressStore, RunSummary, WorkDriver, WorkItem};
pub use pipeline::{Pipeline, RetryingFetcher};
