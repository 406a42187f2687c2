//! HTTP fetcher implementation
//!
//! This module handles content downloads for the pipeline, including:
//! - Building HTTP clients with the configured user agent
//! - Following redirects
//! - A hard timeout on every attempt
//! - Bounded retries with exponential backoff via `tokio-retry2`

use crate::config::FetcherConfig;
use crate::{AttemptError, FetchError};
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tokio_retry2::{Retry, RetryError};
use url::Url;

/// Retry behavior for the fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per reference, including the first
    pub max_attempts: u32,

    /// Hard timeout for each attempt
    pub attempt_timeout: Duration,

    /// Unit the backoff formula is expressed in (one second in production)
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(30),
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetcherConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            attempt_timeout: Duration::from_secs(config.timeout_secs),
            ..Self::default()
        }
    }

    /// Delay after the failed 0-indexed `attempt`: (2^attempt + 1) units
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt).saturating_add(1);
        self.backoff_unit.saturating_mul(factor)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The fetcher configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches content by reference, retrying transient failures
///
/// Holds no per-reference state, so one fetcher can serve concurrent
/// fetches of distinct references.
#[derive(Debug, Clone)]
pub struct RetryingFetcher {
    client: Client,
    policy: RetryPolicy,
}

impl RetryingFetcher {
    pub fn new(client: Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Builds a fetcher and its client from configuration
    pub fn from_config(config: &FetcherConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::new(client, RetryPolicy::from_config(config)))
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Fetches `reference` using the configured number of attempts
    pub async fn fetch(&self, reference: &str) -> Result<String, FetchError> {
        let attempts = self.policy.max_attempts;
        self.fetch_with_attempts(reference, attempts).await
    }

    /// Fetches `reference`, making at most `max_attempts` attempts
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Unparseable reference | Immediate → InvalidReference |
    /// | Timeout | Retry after (2^attempt + 1)s |
    /// | Transport error | Retry after (2^attempt + 1)s |
    /// | Non-2xx status | Retry after (2^attempt + 1)s |
    /// | Attempts exhausted | Exhausted, wrapping the last error |
    pub async fn fetch_with_attempts(
        &self,
        reference: &str,
        max_attempts: u32,
    ) -> Result<String, FetchError> {
        let url = Url::parse(reference).map_err(|source| FetchError::InvalidReference {
            reference: reference.to_string(),
            source,
        })?;
        let max_attempts = max_attempts.max(1);

        let policy = self.policy;
        let strategy = (0..max_attempts - 1).map(move |n| policy.backoff_delay(n));

        let made = AtomicU32::new(0);
        let url = &url;
        let made_ref = &made;

        let result = Retry::spawn(strategy, move || async move {
            let attempt = made_ref.fetch_add(1, Ordering::SeqCst) + 1;
            self.attempt(url).await.map_err(|err| {
                tracing::warn!("Attempt {} failed to fetch {}: {}", attempt, reference, err);
                RetryError::Transient {
                    err,
                    retry_after: None,
                }
            })
        })
        .await;

        result.map_err(|last| FetchError::Exhausted {
            reference: reference.to_string(),
            attempts: made.load(Ordering::SeqCst),
            last,
        })
    }

    /// Performs one GET with the per-attempt timeout
    async fn attempt(&self, url: &Url) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.policy.attempt_timeout)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| self.classify(e))
    }

    fn classify(&self, error: reqwest::Error) -> AttemptError {
        if error.is_timeout() {
            AttemptError::Timeout(self.policy.attempt_timeout)
        } else {
            AttemptError::Transport(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client(&FetcherConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_backoff_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(3));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(5));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(9));
    }

    #[test]
    fn test_policy_from_config() {
        let config = FetcherConfig {
            max_attempts: 5,
            timeout_secs: 12,
            ..FetcherConfig::default()
        };
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.attempt_timeout, Duration::from_secs(12));
        assert_eq!(policy.backoff_unit, Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_invalid_reference_fails_without_retry() {
        let fetcher = RetryingFetcher::from_config(&FetcherConfig::default()).unwrap();
        let result = fetcher.fetch("not a url").await;
        assert!(matches!(result, Err(FetchError::InvalidReference { .. })));
    }

    // Retry and timeout behavior against live responses is covered with
    // wiremock in the integration tests
}
