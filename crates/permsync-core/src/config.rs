//! Sync configuration
//!
//! Quotas differ per call kind: permission reads and permission writes hit
//! separate buckets on the control plane, so each gets its own limit.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sliding window budget for one call kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Admissions allowed per window
    pub max_requests: usize,
    /// Window length in milliseconds
    pub period_ms: u64,
}

impl RateLimitConfig {
    #[inline]
    #[must_use]
    pub fn new(max_requests: usize, period: Duration) -> Self {
        Self {
            max_requests,
            period_ms: u64::try_from(period.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Budget of `max_requests` per second
    #[inline]
    #[must_use]
    pub fn per_second(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(1))
    }

    #[inline]
    #[must_use]
    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Retry policy for retryable control plane failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 10_000,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    #[inline]
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Configuration for crawl and apply runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Budget for permission reads
    pub fetch_limit: RateLimitConfig,
    /// Budget for permission writes
    pub set_limit: RateLimitConfig,
    /// Retry policy for both call kinds
    pub retry: RetryConfig,
    /// Upper bound on concurrently running object tasks
    pub max_in_flight: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            fetch_limit: RateLimitConfig::per_second(100),
            set_limit: RateLimitConfig::per_second(30),
            retry: RetryConfig::default(),
            max_in_flight: 16,
        }
    }
}

impl SyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    #[must_use]
    pub fn with_fetch_limit(mut self, limit: RateLimitConfig) -> Self {
        self.fetch_limit = limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_set_limit(mut self, limit: RateLimitConfig) -> Self {
        self.set_limit = limit;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.max_in_flight = max;
        self
    }

    /// Parse from TOML, filling unset fields with defaults
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] on malformed TOML or invalid values.
    pub fn from_toml_str(input: &str) -> Result<Self, SyncError> {
        let config: Self = toml::from_str(input).map_err(|e| SyncError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject budgets that would stall every call
    ///
    /// # Errors
    /// Returns [`SyncError::Config`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), SyncError> {
        for (name, limit) in [("fetch_limit", &self.fetch_limit), ("set_limit", &self.set_limit)] {
            if limit.max_requests == 0 {
                return Err(SyncError::Config(format!("{name}.max_requests must be positive")));
            }
            if limit.period_ms == 0 {
                return Err(SyncError::Config(format!("{name}.period_ms must be positive")));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(SyncError::Config("retry.max_attempts must be positive".into()));
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err(SyncError::Config(
                "retry.initial_backoff_ms exceeds retry.max_backoff_ms".into(),
            ));
        }
        if self.max_in_flight == 0 {
            return Err(SyncError::Config("max_in_flight must be positive".into()));
        }
        Ok(())
    }
}
