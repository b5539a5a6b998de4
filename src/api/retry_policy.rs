//! Retry policy for upstream API requests.
//!
//! Implements exponential backoff with configurable parameters. A
//! server-provided `Retry-After` takes precedence over the computed backoff.

use std::time::Duration;

use crate::api::ApiError;
use crate::config::RetrySettings;

/// Retry policy implementing exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Backoff before the first retry, in milliseconds.
    pub initial_backoff_ms: u64,
    /// Cap for exponential growth and for server-requested waits, in milliseconds.
    pub max_backoff_ms: u64,
    /// Multiplier applied to backoff after each retry.
    pub backoff_multiplier: f64,
}

impl RetryPolicy {
    pub fn new(settings: &RetrySettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            initial_backoff_ms: settings.initial_backoff_ms,
            max_backoff_ms: settings.max_backoff_ms,
            backoff_multiplier: settings.backoff_multiplier,
        }
    }

    /// Check if an error should be retried given the number of retries so far.
    pub fn should_retry(&self, error: &ApiError, retry_count: u32) -> bool {
        error.is_retryable() && retry_count < self.max_retries
    }

    /// Exponential backoff: `initial_backoff * multiplier^retry_count`, capped
    /// at `max_backoff_ms`.
    pub fn backoff(&self, retry_count: u32) -> Duration {
        let exponent = i32::try_from(retry_count).unwrap_or(i32::MAX);
        let backoff = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(backoff.min(self.max_backoff_ms as f64) as u64)
    }

    /// How long to wait before retrying after `error`.
    pub fn delay_for(&self, error: &ApiError, retry_count: u32) -> Duration {
        match error.retry_after() {
            Some(wait) => wait.min(Duration::from_millis(self.max_backoff_ms)),
            None => self.backoff(retry_count),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetrySettings::default())
    }
}
