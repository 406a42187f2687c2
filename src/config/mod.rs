//! Configuration module for Paper-Ingest
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! including the resource limit table that drives admission control.
//!
//! # Example
//!
//! ```no_run
//! use paper_ingest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Limits configured for {} resource classes", config.limits.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, DriverConfig, FetcherConfig, LimitEntry};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
