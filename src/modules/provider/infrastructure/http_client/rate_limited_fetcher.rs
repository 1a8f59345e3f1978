//! Bounded retry around listing-source calls.
//!
//! A 429 at attempt `i` waits `2^i` seconds. In requeue mode the wait is
//! expressed as a future job carrying attempt `i + 1` and the call returns at
//! once. In sleep mode the worker sleeps and keeps one reschedule job with the
//! original arguments pending as a stand-in in case the worker dies. The
//! stand-in is withdrawn once the call settles on this worker, so a call never
//! leaves behind more than one continuation. Any other failure ends the call
//! with no retry.

use super::retry_policy::{BackoffMode, RetryPolicy};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::domain::repository::JobRepository;
use crate::modules::provider::domain::FetchError;
use crate::modules::provider::infrastructure::external::reddit::{Listing, Thing};
use crate::modules::provider::traits::ListingSource;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::time::format_schedule;
use crate::{log_debug, log_error, log_info, log_warn};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a fetch that may have been deferred to a future job
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<T> {
    Fetched(T),
    /// A reschedule job now owns the work; the caller must not continue it
    Rescheduled { at: DateTime<Utc> },
    /// Non-rate-limit failure or exhausted budget; already logged
    Failed,
}

pub struct RateLimitedFetcher {
    source: Arc<dyn ListingSource>,
    job_repository: Arc<dyn JobRepository>,
    listing_policy: RetryPolicy,
    reply_policy: RetryPolicy,
}

impl RateLimitedFetcher {
    pub fn new(
        source: Arc<dyn ListingSource>,
        job_repository: Arc<dyn JobRepository>,
        listing_policy: RetryPolicy,
        reply_policy: RetryPolicy,
    ) -> Self {
        Self {
            source,
            job_repository,
            listing_policy,
            reply_policy,
        }
    }

    /// Fetch the newest posts of `channel`.
    ///
    /// `reschedule(attempt)` builds the job that repeats this fetch.
    pub async fn get_listing<R>(
        &self,
        channel: &str,
        limit: u32,
        attempt: u32,
        reschedule: R,
    ) -> AppResult<FetchOutcome<Listing>>
    where
        R: Fn(u32) -> AppResult<Job> + Send + Sync,
    {
        self.run(
            &format!("posts from r/{}", channel),
            self.listing_policy,
            attempt,
            || self.source.fetch_listing(channel, limit),
            reschedule,
        )
        .await
    }

    /// Fetch the comment children of `post_id`
    pub async fn get_replies<R>(
        &self,
        post_id: &str,
        channel: &str,
        attempt: u32,
        reschedule: R,
    ) -> AppResult<FetchOutcome<Vec<Thing>>>
    where
        R: Fn(u32) -> AppResult<Job> + Send + Sync,
    {
        self.run(
            &format!("comments for post {} in r/{}", post_id, channel),
            self.reply_policy,
            attempt,
            || self.source.fetch_replies(post_id, channel),
            reschedule,
        )
        .await
    }

    async fn run<T, F, Fut, R>(
        &self,
        label: &str,
        policy: RetryPolicy,
        start_attempt: u32,
        fetch: F,
        reschedule: R,
    ) -> AppResult<FetchOutcome<T>>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
        R: Fn(u32) -> AppResult<Job> + Send + Sync,
    {
        if !policy.has_attempts_left(start_attempt) {
            log_error!(
                "Max retries reached for fetching {} ({} attempts). Skipping...",
                label,
                policy.retry_count
            );
            return Ok(FetchOutcome::Failed);
        }

        let mut attempt = start_attempt;
        // Sleep mode stand-in: (job id, scheduled time)
        let mut stand_in: Option<(Uuid, DateTime<Utc>)> = None;

        loop {
            let retry_after = match fetch().await {
                Ok(value) => return Ok(self.settle(label, stand_in, FetchOutcome::Fetched(value)).await),
                Err(FetchError::RateLimited { retry_after }) => retry_after,
                Err(e) => {
                    log_error!("Error fetching {}: {}", label, e);
                    return Ok(self.settle(label, stand_in, FetchOutcome::Failed).await);
                }
            };

            if !policy.has_attempts_left(attempt + 1) {
                log_error!(
                    "Max retries reached for fetching {} ({} attempts). Skipping...",
                    label,
                    policy.retry_count
                );
                return Ok(self.settle(label, stand_in, FetchOutcome::Failed).await);
            }

            match policy.mode {
                BackoffMode::Requeue => {
                    let delay = policy.delay(attempt, retry_after);
                    let job = reschedule(attempt + 1)?.at(Utc::now() + to_chrono(delay)?);
                    let record = self.job_repository.enqueue(job).await?;
                    let scheduled = record.scheduled_at.unwrap_or_else(Utc::now);
                    log_warn!(
                        "Rate limited for {}. Attempt {} rescheduled for {} (backoff {}s)",
                        label,
                        attempt + 1,
                        format_schedule(scheduled),
                        delay.as_secs()
                    );
                    return Ok(FetchOutcome::Rescheduled { at: scheduled });
                }
                BackoffMode::Sleep => {
                    let backoff = policy.backoff(attempt);
                    log_warn!(
                        "Rate limited for {}. Retrying in {} seconds...",
                        label,
                        backoff.as_secs()
                    );

                    // Only the newest stand-in is kept
                    if let Some(handed_over) = self.withdraw(label, stand_in.take()).await {
                        return Ok(handed_over);
                    }
                    let at = Utc::now() + to_chrono(backoff)?;
                    match reschedule(start_attempt) {
                        Ok(job) => match self.job_repository.enqueue(job.at(at)).await {
                            Ok(record) => {
                                log_info!(
                                    "Job for {} rescheduled with a delay of {} seconds ({})",
                                    label,
                                    backoff.as_secs(),
                                    record.id
                                );
                                stand_in = Some((record.id, record.scheduled_at.unwrap_or(at)));
                            }
                            Err(e) => log_error!("Failed to reschedule job for {}: {}", label, e),
                        },
                        Err(e) => log_error!("Failed to build reschedule job for {}: {}", label, e),
                    }

                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Withdraw the stand-in before reporting `outcome`
    async fn settle<T>(
        &self,
        label: &str,
        stand_in: Option<(Uuid, DateTime<Utc>)>,
        outcome: FetchOutcome<T>,
    ) -> FetchOutcome<T> {
        match self.withdraw(label, stand_in).await {
            Some(handed_over) => handed_over,
            None => outcome,
        }
    }

    /// Returns `Rescheduled` when the stand-in could not be withdrawn and
    /// therefore owns the work from now on.
    async fn withdraw<T>(
        &self,
        label: &str,
        stand_in: Option<(Uuid, DateTime<Utc>)>,
    ) -> Option<FetchOutcome<T>> {
        let (id, at) = stand_in?;
        match self.job_repository.withdraw(id).await {
            Ok(true) => {
                log_debug!("Withdrew reschedule job {} for {}", id, label);
                None
            }
            Ok(false) => {
                log_info!(
                    "Reschedule job {} for {} was already claimed; handing over",
                    id,
                    label
                );
                Some(FetchOutcome::Rescheduled { at })
            }
            Err(e) => {
                log_error!("Failed to withdraw reschedule job {} for {}: {}", id, label, e);
                Some(FetchOutcome::Rescheduled { at })
            }
        }
    }
}

fn to_chrono(duration: std::time::Duration) -> AppResult<chrono::Duration> {
    chrono::Duration::from_std(duration)
        .map_err(|e| AppError::InternalError(format!("Backoff out of range: {}", e)))
}
