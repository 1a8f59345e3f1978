use crate::modules::provider::{BackoffMode, RetryPolicy};
use crate::shared::errors::{AppError, AppResult};
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_JOB_LEASE: Duration = Duration::from_secs(15 * 60);
/// Headroom for store writes and enqueues around the fetches of one handler
const LEASE_MARGIN: Duration = Duration::from_secs(60);

/// Process configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub user_agent: String,
    pub chan_api_base: String,
    pub reddit_api_base: String,
    pub chan_boards: Vec<String>,
    pub general_subreddits: Vec<String>,
    pub politics_subreddits: Vec<String>,
    pub worker_concurrency: usize,
    pub catalog_interval: Duration,
    pub listing_interval: Duration,
    pub listing_limit: u32,
    pub listing_retry_count: u32,
    pub reply_retry_count: u32,
    pub backoff_mode: BackoffMode,
    pub http_timeout: Duration,
    pub requests_per_second: u32,
    /// How long a claimed job stays invisible to other workers
    pub job_lease: Duration,
}

impl Config {
    /// Load configuration from the process environment, reading `.env` first if present
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| -> AppResult<String> {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::ConfigError(format!("{} must be set", key)))
        };
        let or_default = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let backoff_mode = BackoffMode::from_str(&or_default("BACKOFF_MODE", "requeue"))?;
        let job_lease = lookup("JOB_LEASE_SECS")
            .filter(|v| !v.trim().is_empty())
            .map(|v| parse_positive::<u64>("JOB_LEASE_SECS", &v).map(Duration::from_secs))
            .transpose()?;

        let mut config = Self {
            database_url: required("DATABASE_URL")?,
            user_agent: required("USER_AGENT")?,
            chan_api_base: trim_base(&or_default("CHAN_API_BASE", "https://a.4cdn.org")),
            reddit_api_base: trim_base(&or_default("REDDIT_API_BASE", "https://www.reddit.com")),
            chan_boards: split_list(&or_default("CHAN_BOARDS", "fit,pol")),
            general_subreddits: split_list(&or_default("GENERAL_SUBREDDITS", "")),
            politics_subreddits: split_list(&or_default("POLITICS_SUBREDDITS", "")),
            worker_concurrency: parse_positive("WORKER_CONCURRENCY", &or_default("WORKER_CONCURRENCY", "5"))?,
            catalog_interval: Duration::from_secs(parse_positive(
                "CATALOG_INTERVAL_SECS",
                &or_default("CATALOG_INTERVAL_SECS", "300"),
            )?),
            listing_interval: Duration::from_secs(parse_positive(
                "LISTING_INTERVAL_SECS",
                &or_default("LISTING_INTERVAL_SECS", "60"),
            )?),
            listing_limit: parse_positive("LISTING_LIMIT", &or_default("LISTING_LIMIT", "10"))?,
            listing_retry_count: parse_positive(
                "LISTING_RETRY_COUNT",
                &or_default("LISTING_RETRY_COUNT", "10"),
            )?,
            reply_retry_count: parse_positive(
                "REPLY_RETRY_COUNT",
                &or_default("REPLY_RETRY_COUNT", "5"),
            )?,
            backoff_mode,
            http_timeout: Duration::from_secs(parse_positive(
                "HTTP_TIMEOUT_SECS",
                &or_default("HTTP_TIMEOUT_SECS", "30"),
            )?),
            requests_per_second: parse_positive(
                "REQUESTS_PER_SECOND",
                &or_default("REQUESTS_PER_SECOND", "1"),
            )?,
            job_lease: job_lease.unwrap_or(DEFAULT_JOB_LEASE),
        };

        // A lease shorter than a handler can run would hand the job to a
        // second worker while the first is still sleeping out a backoff
        let needed = config.longest_fetch_hold() + LEASE_MARGIN;
        match job_lease {
            Some(lease) if lease < needed => {
                return Err(AppError::ConfigError(format!(
                    "JOB_LEASE_SECS ({}s) must be at least {}s for BACKOFF_MODE={} with \
                     LISTING_RETRY_COUNT={} and REPLY_RETRY_COUNT={}",
                    lease.as_secs(),
                    needed.as_secs(),
                    config.backoff_mode,
                    config.listing_retry_count,
                    config.reply_retry_count
                )));
            }
            None if config.job_lease < needed => config.job_lease = needed,
            _ => {}
        }

        Ok(config)
    }

    /// Longest one rate-limited fetch can keep a worker busy
    pub fn longest_fetch_hold(&self) -> Duration {
        match self.backoff_mode {
            BackoffMode::Requeue => self.http_timeout,
            BackoffMode::Sleep => [self.listing_retry_count, self.reply_retry_count]
                .into_iter()
                .map(|count| {
                    RetryPolicy::new(count, BackoffMode::Sleep).worst_case_hold(self.http_timeout)
                })
                .max()
                .unwrap_or(self.http_timeout),
        }
    }
}

fn trim_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive<T>(key: &str, value: &str) -> AppResult<T>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed: T = value
        .trim()
        .parse()
        .map_err(|_| AppError::ConfigError(format!("{} must be a valid number", key)))?;
    if parsed <= T::default() {
        return Err(AppError::ConfigError(format!("{} must be greater than zero", key)));
    }
    Ok(parsed)
}
