use std::time::Duration;

use thiserror::Error;

/// Errors talking to the upstream API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Request to {url} failed with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Rate limited on {url} (retry after {retry_after:?})")]
    RateLimited {
        url: String,
        retry_after: Option<Duration>,
    },

    #[error("Failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Authentication failed: {0}")]
    Auth(String),
}

impl ApiError {
    /// Transient failures worth another attempt: rate limiting, server-side
    /// errors, timeouts and connection failures.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            ApiError::Status { status, .. } => *status >= 500,
            ApiError::RateLimited { .. } => true,
            ApiError::Decode { .. } | ApiError::Auth(_) => false,
        }
    }

    /// Server-requested wait before the next attempt, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ApiError::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::RateLimited { .. } => Some(429),
            _ => None,
        }
    }
}
