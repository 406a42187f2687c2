use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so a run can be matched with the limits it used.
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const VALID_CONFIG: &str = r#"
[driver]
work-list = "papers.json"
progress-path = "progress.json"
database-path = "papers.db"

[fetcher]
max-attempts = 3
timeout-secs = 30
resource-class = "content-fetch"

[[limits]]
class = "text-embedding-004"
requests-per-minute = 100
cost-per-minute = 30000
requests-per-day = 1000
floor-delay-ms = 600

[[limits]]
class = "gemini-2.0-flash"
requests-per-minute = 15
cost-per-minute = 1000000
requests-per-day = 200
floor-delay-ms = 4000
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = create_temp_config(VALID_CONFIG);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.driver.work_list, "papers.json");
        assert_eq!(config.driver.item_delay_ms, 100);
        assert_eq!(config.driver.stage_timeout_secs, 60);
        assert_eq!(config.fetcher.resource_class.as_deref(), Some("content-fetch"));
        assert_eq!(config.limits.len(), 2);
        assert_eq!(config.limits[1].floor_delay_ms, 4000);
    }

    #[test]
    fn test_fetcher_section_is_optional() {
        let config = parse_config(
            r#"
[driver]
work-list = "papers.json"
database-path = "papers.db"
"#,
        )
        .unwrap();

        assert_eq!(config.fetcher.max_attempts, 3);
        assert_eq!(config.fetcher.timeout_secs, 30);
        assert!(config.fetcher.resource_class.is_none());
        assert_eq!(config.driver.progress_path, "progress.json");
        assert!(config.limits.is_empty());
    }

    #[test]
    fn test_load_config_with_invalid_path() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_with_invalid_toml() {
        let file = create_temp_config("this is not valid TOML {{{");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_with_validation_error() {
        let file = create_temp_config(
            r#"
[driver]
work-list = "papers.json"
database-path = "papers.db"

[[limits]]
class = "gemini-2.0-flash"
requests-per-minute = 0
cost-per-minute = 1000000
requests-per-day = 200
"#,
        );
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_compute_config_hash() {
        let file = create_temp_config(VALID_CONFIG);
        let hash1 = compute_config_hash(file.path()).unwrap();
        let hash2 = compute_config_hash(file.path()).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64);

        let other = create_temp_config("something else");
        assert_ne!(hash1, compute_config_hash(other.path()).unwrap());
    }

    #[test]
    fn test_load_config_with_hash() {
        let file = create_temp_config(VALID_CONFIG);
        let (config, hash) = load_config_with_hash(file.path()).unwrap();
        assert_eq!(config.limits.len(), 2);
        assert_eq!(hash.len(), 64);
    }
}
