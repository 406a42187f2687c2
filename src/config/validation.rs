use crate::config::types::{Config, DriverConfig, FetcherConfig, LimitEntry};
use crate::ConfigError;
use std::collections::HashSet;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_driver_config(&config.driver)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_limits(&config.limits)?;
    Ok(())
}

/// Validates driver configuration
fn validate_driver_config(config: &DriverConfig) -> Result<(), ConfigError> {
    if config.work_list.is_empty() {
        return Err(ConfigError::Validation(
            "work_list cannot be empty".to_string(),
        ));
    }

    if config.progress_path.is_empty() {
        return Err(ConfigError::Validation(
            "progress_path cannot be empty".to_string(),
        ));
    }

    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.stage_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "stage_timeout_secs must be >= 1, got {}",
            config.stage_timeout_secs
        )));
    }

    Ok(())
}

/// Validates fetcher configuration
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(class) = &config.resource_class {
        if class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "resource_class cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the resource limit table
fn validate_limits(limits: &[LimitEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in limits {
        if entry.class.trim().is_empty() {
            return Err(ConfigError::Validation(
                "limit class cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.class.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate limit entry for class '{}'",
                entry.class
            )));
        }

        if entry.requests_per_minute < 1 {
            return Err(ConfigError::Validation(format!(
                "requests_per_minute for '{}' must be >= 1",
                entry.class
            )));
        }

        if entry.cost_per_minute < 1 {
            return Err(ConfigError::Validation(format!(
                "cost_per_minute for '{}' must be >= 1",
                entry.class
            )));
        }

        if entry.requests_per_day < 1 {
            return Err(ConfigError::Validation(format!(
                "requests_per_day for '{}' must be >= 1",
                entry.class
            )));
        }
    }

    Ok(())
}
