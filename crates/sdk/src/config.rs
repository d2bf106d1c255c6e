//! Configuration types for the DeepSource SDK.

use crate::error::{ConfigError, ErrorCategory};
use std::collections::BTreeSet;
use std::time::Duration;
use url::Url;

/// Public DeepSource GraphQL endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://api.deepsource.io/graphql/";

/// Configuration for the DeepSource client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// GraphQL endpoint URL.
    pub endpoint: Url,
    /// API key sent as a bearer token.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    /// Create a new configuration with the given endpoint and API key.
    pub fn new(endpoint: Url, api_key: impl Into<String>) -> Self {
        Self {
            endpoint,
            api_key: api_key.into(),
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }
}

/// Configuration for retry behavior.
///
/// Attempts are counted from 1, so `max_attempts = 3` means one request
/// plus at most two retries.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Randomize delays with full jitter.
    pub jitter: bool,
    /// Categories eligible for retry.
    pub retryable: BTreeSet<ErrorCategory>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            jitter: true,
            retryable: default_retryable(),
        }
    }
}

/// Categories retried unless configured otherwise.
pub fn default_retryable() -> BTreeSet<ErrorCategory> {
    ErrorCategory::ALL
        .into_iter()
        .filter(|c| c.is_transient())
        .collect()
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_delays(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_retryable(mut self, categories: impl IntoIterator<Item = ErrorCategory>) -> Self {
        self.retryable = categories.into_iter().collect();
        self
    }

    pub fn is_retryable(&self, category: ErrorCategory) -> bool {
        self.retryable.contains(&category)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidRetry(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.base_delay > self.max_delay {
            return Err(ConfigError::InvalidRetry(format!(
                "base_delay ({:?}) exceeds max_delay ({:?})",
                self.base_delay, self.max_delay
            )));
        }
        Ok(())
    }
}
