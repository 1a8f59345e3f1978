/// Diesel-based implementation of JobRepository
///
/// Uses PostgreSQL with SELECT FOR UPDATE SKIP LOCKED for atomic job claiming.
/// A claimed job holds a lease; when the lease expires without an ack the job
/// becomes claimable again.
use crate::modules::jobs::domain::entities::{Job, JobRecord};
use crate::modules::jobs::domain::repository::{JobRepository, JobStatistics};
use crate::modules::jobs::infrastructure::models::{BackgroundJobModel, NewJob};
use crate::schema::background_jobs;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::{DbConnection, DbPool};
use crate::shared::utils::logger::LogContext;
use crate::{log_debug, log_warn};
use async_trait::async_trait;
use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Array, BigInt, Double, Integer, Text};
use std::time::Duration;
use tokio::task;
use uuid::Uuid;

const DEFAULT_LEASE: Duration = Duration::from_secs(15 * 60);

#[derive(QueryableByName)]
struct QueueCounts {
    #[diesel(sql_type = BigInt)]
    pending: i64,
    #[diesel(sql_type = BigInt)]
    scheduled: i64,
    #[diesel(sql_type = BigInt)]
    running: i64,
    #[diesel(sql_type = BigInt)]
    completed: i64,
    #[diesel(sql_type = BigInt)]
    failed: i64,
    #[diesel(sql_type = BigInt)]
    total: i64,
}

#[derive(Clone)]
pub struct JobRepositoryImpl {
    pool: DbPool,
    lease: Duration,
}

impl JobRepositoryImpl {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            lease: DEFAULT_LEASE,
        }
    }

    /// Override how long a claimed job stays invisible to other workers
    pub fn with_lease(mut self, lease: Duration) -> Self {
        self.lease = lease;
        self
    }

    fn get_conn(pool: &DbPool) -> AppResult<DbConnection> {
        pool.get()
            .map_err(|e| AppError::DatabaseError(format!("Failed to get connection: {}", e)))
    }

    async fn with_conn<T, F>(&self, f: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut DbConnection) -> AppResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        task::spawn_blocking(move || -> AppResult<T> {
            let mut conn = Self::get_conn(&pool)?;
            f(&mut conn)
        })
        .await?
    }
}

/// Insert `job` on an open connection so it commits or rolls back with the
/// caller's transaction
pub fn insert_job(conn: &mut PgConnection, job: Job) -> AppResult<Uuid> {
    job.validate_schedule(Utc::now())?;
    diesel::insert_into(background_jobs::table)
        .values(&NewJob::from(job))
        .returning(background_jobs::id)
        .get_result(conn)
        .map_err(|e| AppError::DatabaseError(format!("Failed to enqueue job: {}", e)))
}

#[async_trait]
impl JobRepository for JobRepositoryImpl {
    async fn enqueue(&self, job: Job) -> AppResult<JobRecord> {
        job.validate_schedule(Utc::now())?;
        let new_job = NewJob::from(job);

        self.with_conn(move |conn| {
            let inserted: BackgroundJobModel = diesel::insert_into(background_jobs::table)
                .values(&new_job)
                .returning(BackgroundJobModel::as_returning())
                .get_result(conn)
                .map_err(|e| AppError::DatabaseError(format!("Failed to enqueue job: {}", e)))?;

            log_debug!(
                "Enqueued {} job {} on '{}'",
                inserted.job_type,
                inserted.id,
                inserted.queue
            );
            Ok(inserted.to_job_record())
        })
        .await
    }

    async fn enqueue_batch(&self, jobs: Vec<Job>) -> AppResult<Vec<Uuid>> {
        if jobs.is_empty() {
            return Ok(Vec::new());
        }

        let now = Utc::now();
        for job in &jobs {
            job.validate_schedule(now)?;
        }
        let new_jobs: Vec<NewJob> = jobs.into_iter().map(NewJob::from).collect();

        self.with_conn(move |conn| {
            let started = std::time::Instant::now();
            let ids: Vec<Uuid> = conn
                .transaction(|conn| {
                    diesel::insert_into(background_jobs::table)
                        .values(&new_jobs)
                        .returning(background_jobs::id)
                        .get_results(conn)
                })
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to enqueue job batch: {}", e))
                })?;

            LogContext::db_operation(
                &format!("enqueue_batch({})", ids.len()),
                "background_jobs",
                Some(started.elapsed().as_millis() as u64),
            );
            Ok(ids)
        })
        .await
    }

    async fn dequeue(&self, queues: Vec<String>) -> AppResult<Option<JobRecord>> {
        let lease_secs = self.lease.as_secs_f64();

        self.with_conn(move |conn| {
            // Leases that ran out on their final attempt are terminal
            let expired = diesel::sql_query(
                "UPDATE background_jobs
                 SET status = 'failed',
                     completed_at = NOW(),
                     lease_expires_at = NULL,
                     error = COALESCE(error, 'lease expired before completion')
                 WHERE status = 'running'
                   AND lease_expires_at < NOW()
                   AND attempts >= max_attempts
                   AND queue = ANY($1)",
            )
            .bind::<Array<Text>, _>(&queues)
            .execute(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to expire leases: {}", e)))?;

            if expired > 0 {
                log_warn!("{} job(s) exhausted their attempts with an expired lease", expired);
            }

            let result: Option<BackgroundJobModel> = diesel::sql_query(
                r#"
                UPDATE background_jobs
                SET status = 'running',
                    started_at = NOW(),
                    lease_expires_at = NOW() + make_interval(secs => $2),
                    attempts = attempts + 1
                WHERE id = (
                    SELECT id
                    FROM background_jobs
                    WHERE queue = ANY($1)
                      AND attempts < max_attempts
                      AND (
                          (status = 'pending' AND (scheduled_at IS NULL OR scheduled_at <= NOW()))
                          OR (status = 'running' AND lease_expires_at < NOW())
                      )
                    ORDER BY COALESCE(scheduled_at, created_at) ASC, created_at ASC
                    LIMIT 1
                    FOR UPDATE SKIP LOCKED
                )
                RETURNING id, job_type, queue, args, status,
                          attempts, max_attempts, scheduled_at, lease_expires_at,
                          created_at, started_at, completed_at, error
                "#,
            )
            .bind::<Array<Text>, _>(&queues)
            .bind::<Double, _>(lease_secs)
            .get_result(conn)
            .optional()
            .map_err(|e| AppError::DatabaseError(format!("Failed to dequeue job: {}", e)))?;

            Ok(result.map(|job| job.to_job_record()))
        })
        .await
    }

    async fn mark_completed(&self, job_id: Uuid) -> AppResult<()> {
        self.with_conn(move |conn| {
            diesel::sql_query(
                "UPDATE background_jobs
                 SET status = 'completed', completed_at = NOW(), lease_expires_at = NULL
                 WHERE id = $1",
            )
            .bind::<diesel::sql_types::Uuid, _>(job_id)
            .execute(conn)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to mark job as completed: {}", e))
            })?;
            Ok(())
        })
        .await
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> AppResult<()> {
        let error = error.to_string();

        self.with_conn(move |conn| {
            // Retry after 2^attempts seconds while attempts remain,
            // otherwise the job is permanently failed
            diesel::sql_query(
                "UPDATE background_jobs
                 SET status = CASE
                     WHEN attempts < max_attempts THEN 'pending'::job_status
                     ELSE 'failed'::job_status
                 END,
                 scheduled_at = CASE
                     WHEN attempts < max_attempts
                         THEN date_trunc('second', NOW()) + make_interval(secs => power(2.0::float8, attempts))
                     ELSE scheduled_at
                 END,
                 completed_at = CASE
                     WHEN attempts >= max_attempts THEN NOW()
                     ELSE NULL
                 END,
                 started_at = NULL,
                 lease_expires_at = NULL,
                 error = $2
                 WHERE id = $1",
            )
            .bind::<diesel::sql_types::Uuid, _>(job_id)
            .bind::<Text, _>(error)
            .execute(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to mark job as failed: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn withdraw(&self, job_id: Uuid) -> AppResult<bool> {
        self.with_conn(move |conn| {
            let deleted = diesel::sql_query(
                "DELETE FROM background_jobs WHERE id = $1 AND status = 'pending'",
            )
            .bind::<diesel::sql_types::Uuid, _>(job_id)
            .execute(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to withdraw job: {}", e)))?;
            Ok(deleted == 1)
        })
        .await
    }

    async fn get_by_id(&self, job_id: Uuid) -> AppResult<Option<JobRecord>> {
        self.with_conn(move |conn| {
            let job: Option<BackgroundJobModel> = background_jobs::table
                .find(job_id)
                .select(BackgroundJobModel::as_select())
                .first(conn)
                .optional()
                .map_err(|e| AppError::DatabaseError(format!("Failed to get job by id: {}", e)))?;

            Ok(job.map(|j| j.to_job_record()))
        })
        .await
    }

    async fn purge_finished(&self, days: i32) -> AppResult<usize> {
        if days < 0 {
            return Err(AppError::InvalidInput(
                "Retention days must not be negative".to_string(),
            ));
        }

        self.with_conn(move |conn| {
            let deleted = diesel::sql_query(
                "DELETE FROM background_jobs
                 WHERE status IN ('completed', 'failed')
                 AND completed_at < NOW() - INTERVAL '1 day' * $1",
            )
            .bind::<Integer, _>(days)
            .execute(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to delete old jobs: {}", e)))?;

            Ok(deleted)
        })
        .await
    }

    async fn get_statistics(&self) -> AppResult<JobStatistics> {
        self.with_conn(|conn| {
            let counts: QueueCounts = diesel::sql_query(
                "SELECT
                    COUNT(*) FILTER (WHERE status = 'pending'
                        AND (scheduled_at IS NULL OR scheduled_at <= NOW())) AS pending,
                    COUNT(*) FILTER (WHERE status = 'pending' AND scheduled_at > NOW()) AS scheduled,
                    COUNT(*) FILTER (WHERE status = 'running') AS running,
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                    COUNT(*) FILTER (WHERE status = 'failed') AS failed,
                    COUNT(*) AS total
                 FROM background_jobs",
            )
            .get_result(conn)
            .map_err(|e| AppError::DatabaseError(format!("Failed to count jobs: {}", e)))?;

            Ok(JobStatistics {
                pending_count: counts.pending,
                scheduled_count: counts.scheduled,
                running_count: counts.running,
                completed_count: counts.completed,
                failed_count: counts.failed,
                total_count: counts.total,
            })
        })
        .await
    }
}
