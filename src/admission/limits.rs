use crate::config::LimitEntry;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Name of a quota pool for one external service (e.g. a model name)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceClass(String);

impl ResourceClass {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for ResourceClass {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ResourceClass {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ResourceClass {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Static limits for one resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimit {
    /// Maximum requests in any 60-second window
    pub requests_per_minute: u32,

    /// Maximum summed cost (tokens, bytes, ...) in any 60-second window
    pub cost_per_minute: u64,

    /// Maximum requests per calendar day
    pub requests_per_day: u32,

    /// Pacing delay applied before every request regardless of usage
    pub floor_delay: Duration,
}

impl From<&LimitEntry> for ResourceLimit {
    fn from(entry: &LimitEntry) -> Self {
        Self {
            requests_per_minute: entry.requests_per_minute,
            cost_per_minute: entry.cost_per_minute,
            requests_per_day: entry.requests_per_day,
            floor_delay: Duration::from_millis(entry.floor_delay_ms),
        }
    }
}

/// Mapping of resource class to its limits, loaded once at startup
#[derive(Debug, Clone, Default)]
pub struct ResourceLimitTable {
    limits: BTreeMap<ResourceClass, ResourceLimit>,
}

impl ResourceLimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from the `[[limits]]` entries of the configuration
    pub fn from_entries(entries: &[LimitEntry]) -> Self {
        let limits = entries
            .iter()
            .map(|entry| (ResourceClass::new(entry.class.clone()), entry.into()))
            .collect();
        Self { limits }
    }

    /// Adds or replaces the limits for a class
    pub fn with_limit(mut self, class: impl Into<ResourceClass>, limit: ResourceLimit) -> Self {
        self.limits.insert(class.into(), limit);
        self
    }

    pub fn get(&self, class: &str) -> Option<&ResourceLimit> {
        self.limits.get(class)
    }

    pub fn contains(&self, class: &str) -> bool {
        self.limits.contains_key(class)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ResourceClass, &ResourceLimit)> {
        self.limits.iter()
    }

    pub fn len(&self) -> usize {
        self.limits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limits.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(class: &str) -> LimitEntry {
        LimitEntry {
            class: class.to_string(),
            requests_per_minute: 15,
            cost_per_minute: 1_000_000,
            requests_per_day: 200,
            floor_delay_ms: 4000,
        }
    }

    #[test]
    fn test_from_entries() {
        let table = ResourceLimitTable::from_entries(&[entry("gemini-2.0-flash")]);
        assert_eq!(table.len(), 1);

        let limit = table.get("gemini-2.0-flash").unwrap();
        assert_eq!(limit.requests_per_minute, 15);
        assert_eq!(limit.cost_per_minute, 1_000_000);
        assert_eq!(limit.requests_per_day, 200);
        assert_eq!(limit.floor_delay, Duration::from_secs(4));
    }

    #[test]
    fn test_lookup_by_str() {
        let table = ResourceLimitTable::new().with_limit(
            "text-embedding-004",
            ResourceLimit {
                requests_per_minute: 100,
                cost_per_minute: 30_000,
                requests_per_day: 1000,
                floor_delay: Duration::from_millis(600),
            },
        );

        assert!(table.contains("text-embedding-004"));
        assert!(!table.contains("unknown-model"));
        assert!(table.get("unknown-model").is_none());
    }

    #[test]
    fn test_resource_class_display() {
        let class = ResourceClass::from("gemini-2.5-flash");
        assert_eq!(class.to_string(), "gemini-2.5-flash");
        assert_eq!(class.as_str(), "gemini-2.5-flash");
    }
}
