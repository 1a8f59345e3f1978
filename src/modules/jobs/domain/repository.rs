/// Repository trait for job persistence
///
/// Producers enqueue through this trait; consumers claim, complete and fail
/// jobs through it. Delivery is at-least-once.
use crate::modules::jobs::domain::entities::{Job, JobRecord};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Enqueue a new job
    async fn enqueue(&self, job: Job) -> AppResult<JobRecord>;

    /// Enqueue several jobs in one transaction; either all are queued or none
    async fn enqueue_batch(&self, jobs: Vec<Job>) -> AppResult<Vec<Uuid>>;

    /// Claim the next ready job on any of the given queues
    /// (atomic operation using SELECT FOR UPDATE SKIP LOCKED)
    async fn dequeue(&self, queues: Vec<String>) -> AppResult<Option<JobRecord>>;

    async fn mark_completed(&self, job_id: Uuid) -> AppResult<()>;

    /// Record a failure; the job returns to pending while attempts remain
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()>;

    /// Delete a job nobody has claimed yet.
    /// Returns false when the job is already running or finished.
    async fn withdraw(&self, job_id: Uuid) -> AppResult<bool>;

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>>;

    /// Delete completed and failed jobs older than `days`
    async fn purge_finished(&self, days: i32) -> AppResult<usize>;

    async fn get_statistics(&self) -> AppResult<JobStatistics>;
}

/// Job queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatistics {
    pub pending_count: i64,
    pub scheduled_count: i64,
    pub running_count: i64,
    pub completed_count: i64,
    pub failed_count: i64,
    pub total_count: i64,
}
