use serde::Deserialize;

/// Main configuration structure for Paper-Ingest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub driver: DriverConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub limits: Vec<LimitEntry>,
}

/// Work driver configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// Path to the JSON work list
    #[serde(rename = "work-list")]
    pub work_list: String,

    /// Path to the JSON progress document
    #[serde(rename = "progress-path", default = "default_progress_path")]
    pub progress_path: String,

    /// Path to the SQLite database holding extracted records
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Pause between consecutive items (milliseconds)
    #[serde(rename = "item-delay-ms", default = "default_item_delay_ms")]
    pub item_delay_ms: u64,

    /// Hard cutoff for a single extraction, entity or vector call (seconds)
    #[serde(rename = "stage-timeout-secs", default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

/// Content fetcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Attempts per reference before giving up
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Timeout for each individual attempt (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User agent sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Resource class that gates content fetches, if any
    #[serde(rename = "resource-class", default)]
    pub resource_class: Option<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            resource_class: None,
        }
    }
}

/// One row of the resource limit table
#[derive(Debug, Clone, Deserialize)]
pub struct LimitEntry {
    /// Resource class name (e.g. "gemini-2.0-flash")
    pub class: String,

    #[serde(rename = "requests-per-minute")]
    pub requests_per_minute: u32,

    #[serde(rename = "cost-per-minute")]
    pub cost_per_minute: u64,

    #[serde(rename = "requests-per-day")]
    pub requests_per_day: u32,

    /// Minimum pacing delay before every request (milliseconds)
    #[serde(rename = "floor-delay-ms", default)]
    pub floor_delay_ms: u64,
}

fn default_progress_path() -> String {
    "progress.json".to_string()
}

fn default_item_delay_ms() -> u64 {
    100
}

fn default_stage_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("paper-ingest/{}", env!("CARGO_PKG_VERSION"))
}
