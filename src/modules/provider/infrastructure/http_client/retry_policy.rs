//! Backoff policy applied when a source answers with HTTP 429.

use crate::shared::errors::AppError;
use std::str::FromStr;
use std::time::Duration;

/// What a worker does after a rate-limit response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackoffMode {
    /// Schedule the next attempt as a future job and return immediately
    #[default]
    Requeue,
    /// Sleep out the backoff on the current worker, also scheduling a reschedule job
    Sleep,
}

impl FromStr for BackoffMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "requeue" => Ok(BackoffMode::Requeue),
            "sleep" => Ok(BackoffMode::Sleep),
            other => Err(AppError::ConfigError(format!(
                "BACKOFF_MODE must be 'requeue' or 'sleep', got '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for BackoffMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackoffMode::Requeue => write!(f, "requeue"),
            BackoffMode::Sleep => write!(f, "sleep"),
        }
    }
}

/// Bounded attempt budget for one kind of fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retry_count: u32,
    pub mode: BackoffMode,
}

impl RetryPolicy {
    pub fn new(retry_count: u32, mode: BackoffMode) -> Self {
        Self { retry_count, mode }
    }

    /// Listing fetches get ten attempts
    pub fn listing() -> Self {
        Self::new(10, BackoffMode::default())
    }

    /// Reply fetches get five attempts
    pub fn replies() -> Self {
        Self::new(5, BackoffMode::default())
    }

    /// Wait before attempt `attempt + 1`: 2^attempt seconds
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_secs(2u64.saturating_pow(attempt))
    }

    /// Scheduled wait after a 429 at `attempt` in requeue mode. A server hint
    /// can lengthen the wait but never past the largest backoff of the budget.
    pub fn delay(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let backoff = self.backoff(attempt);
        match hint {
            Some(hint) => hint.min(self.longest_backoff()).max(backoff),
            None => backoff,
        }
    }

    fn longest_backoff(&self) -> Duration {
        self.backoff(self.retry_count.saturating_sub(1))
    }

    /// Longest a single call can hold a worker in sleep mode:
    /// every backoff of the budget plus one request timeout per attempt.
    pub fn worst_case_hold(&self, request_timeout: Duration) -> Duration {
        let sleeps = (0..self.retry_count.saturating_sub(1))
            .map(|attempt| self.backoff(attempt))
            .sum::<Duration>();
        sleeps + request_timeout * self.retry_count
    }

    pub fn has_attempts_left(&self, attempt: u32) -> bool {
        attempt < self.retry_count
    }
}

/// Information extracted from HTTP 429 responses
#[derive(Debug, Clone, Default)]
pub struct RateLimitInfo {
    /// Retry-After header, in seconds
    pub retry_after: Option<Duration>,
    /// x-ratelimit-remaining header
    pub remaining: Option<f64>,
    /// x-ratelimit-reset header, seconds until the window resets
    pub reset: Option<Duration>,
}

impl RateLimitInfo {
    pub fn from_headers(headers: &reqwest::header::HeaderMap) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|h| h.to_str().ok())
                .map(str::trim)
                .map(str::to_string)
        };

        Self {
            retry_after: header("retry-after")
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
            remaining: header("x-ratelimit-remaining").and_then(|s| s.parse::<f64>().ok()),
            reset: header("x-ratelimit-reset")
                .and_then(|s| s.parse::<f64>().ok())
                .filter(|secs| secs.is_finite() && *secs >= 0.0)
                .map(Duration::from_secs_f64),
        }
    }

    /// How long the server asks us to wait: Retry-After, or the window reset
    /// once the remaining budget is spent
    pub fn wait_hint(&self) -> Option<Duration> {
        self.retry_after.or_else(|| match self.remaining {
            Some(remaining) if remaining < 1.0 => self.reset,
            _ => None,
        })
    }
}
