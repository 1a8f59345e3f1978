/// Worker pool that consumes crawl jobs from named queues
///
/// Each slot polls the queue, dispatches the claimed job to the handler
/// registered for its type and acks or fails it. A handler that starts is
/// always run to completion; shutdown is only observed between jobs.
use crate::modules::jobs::domain::entities::{JobRecord, JobType};
use crate::modules::jobs::domain::repository::JobRepository;
use crate::shared::errors::{AppError, AppResult};
use crate::{log_debug, log_error, log_info, log_warn};
use async_trait::async_trait;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Handler invoked for one claimed job
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &JobRecord) -> AppResult<()>;
}

/// Maps job types to their handlers
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn JobHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, job_type: JobType, handler: Arc<dyn JobHandler>) -> Self {
        if self.handlers.insert(job_type, handler).is_some() {
            log_warn!("Handler for {} replaced", job_type);
        }
        self
    }

    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(&job_type).cloned()
    }

    pub fn job_types(&self) -> Vec<JobType> {
        let mut types: Vec<JobType> = self.handlers.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    /// Default queues for every registered type
    pub fn queues(&self) -> Vec<String> {
        self.job_types()
            .into_iter()
            .map(|t| t.default_queue().to_string())
            .collect()
    }
}

/// Pool of `concurrency` consumers sharing one job repository
pub struct WorkerPool {
    job_repository: Arc<dyn JobRepository>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl WorkerPool {
    pub fn new(job_repository: Arc<dyn JobRepository>) -> Self {
        Self {
            job_repository,
            poll_interval: DEFAULT_POLL_INTERVAL,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Token that stops every slot once its current job finishes
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the pool until the shutdown token is cancelled.
    pub async fn consume(
        &self,
        queues: Vec<String>,
        concurrency: usize,
        registry: HandlerRegistry,
    ) -> AppResult<()> {
        if concurrency == 0 {
            return Err(AppError::InvalidInput(
                "Worker concurrency must be at least 1".to_string(),
            ));
        }
        if queues.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one queue must be consumed".to_string(),
            ));
        }

        log_info!(
            "Worker pool started: {} slot(s) on [{}]",
            concurrency,
            queues.join(", ")
        );

        let registry = Arc::new(registry);
        let mut slots = JoinSet::new();
        for slot in 0..concurrency {
            let worker = Worker {
                slot,
                job_repository: Arc::clone(&self.job_repository),
                registry: Arc::clone(&registry),
                queues: queues.clone(),
                poll_interval: self.poll_interval,
                shutdown: self.shutdown.clone(),
            };
            slots.spawn(worker.run());
        }

        while let Some(result) = slots.join_next().await {
            if let Err(e) = result {
                log_error!("Worker slot terminated abnormally: {}", e);
            }
        }

        log_info!("Worker pool stopped");
        Ok(())
    }
}

struct Worker {
    slot: usize,
    job_repository: Arc<dyn JobRepository>,
    registry: Arc<HandlerRegistry>,
    queues: Vec<String>,
    poll_interval: Duration,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(self) {
        log_debug!("Worker slot {} started", self.slot);

        while !self.shutdown.is_cancelled() {
            let idle = match process_next_job(
                self.job_repository.as_ref(),
                &self.registry,
                &self.queues,
            )
            .await
            {
                Ok(processed) => !processed,
                Err(e) => {
                    log_error!("Error in worker slot {}: {}", self.slot, e);
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = self.shutdown.cancelled() => {}
                    _ = tokio::time::sleep(self.poll_interval) => {}
                }
            }
        }

        log_debug!("Worker slot {} stopped", self.slot);
    }
}

/// Claim and run one job.
///
/// Returns true if a job was processed, false if the queues were empty.
pub async fn process_next_job(
    job_repository: &dyn JobRepository,
    registry: &HandlerRegistry,
    queues: &[String],
) -> AppResult<bool> {
    let job = match job_repository.dequeue(queues.to_vec()).await? {
        Some(job) => job,
        None => return Ok(false),
    };

    log_debug!(
        "Processing job {} (type: {}, attempts: {}/{})",
        job.id,
        job.job_type,
        job.attempts,
        job.max_attempts
    );

    let handler = job
        .parse_job_type()
        .map_err(AppError::ValidationError)
        .and_then(|job_type| {
            registry.get(job_type).ok_or_else(|| {
                AppError::ValidationError(format!("No handler registered for {}", job_type))
            })
        });

    let result = match handler {
        Ok(handler) => match AssertUnwindSafe(handler.handle(&job)).catch_unwind().await {
            Ok(result) => result,
            Err(_) => Err(AppError::InternalError(format!(
                "Handler for {} panicked",
                job.job_type
            ))),
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => {
            job_repository.mark_completed(job.id).await?;
            log_debug!("Job {} completed", job.id);
        }
        Err(e) => {
            let error_msg = e.to_string();
            if job.can_retry() {
                log_warn!(
                    "Job {} ({}) failed, will be redelivered (attempt {}/{}): {}",
                    job.id,
                    job.job_type,
                    job.attempts,
                    job.max_attempts,
                    error_msg
                );
            } else {
                log_error!(
                    "Job {} ({}) failed permanently after {} attempts: {}",
                    job.id,
                    job.job_type,
                    job.attempts,
                    error_msg
                );
            }
            job_repository.mark_failed(job.id, &error_msg).await?;
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::jobs::domain::repository::MockJobRepository;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    struct CountingHandler {
        calls: AtomicUsize,
        fail_with: Option<&'static str>,
    }

    #[async_trait]
    impl JobHandler for CountingHandler {
        async fn handle(&self, _job: &JobRecord) -> AppResult<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(msg) => Err(AppError::ExternalServiceError(msg.to_string())),
                None => Ok(()),
            }
        }
    }

    fn claimed(job_type: &str) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            queue: job_type.to_string(),
            args: serde_json::json!(["fit", 1]),
            status: "running".to_string(),
            attempts: 1,
            max_attempts: 3,
            scheduled_at: None,
            lease_expires_at: None,
            created_at: Utc::now(),
            started_at: Some(Utc::now()),
            completed_at: None,
            error: None,
        }
    }

    fn registry_with(handler: Arc<CountingHandler>) -> HandlerRegistry {
        HandlerRegistry::new().register(JobType::CrawlThread, handler)
    }

    #[tokio::test]
    async fn empty_queue_reports_idle() {
        let mut repo = MockJobRepository::new();
        repo.expect_dequeue().times(1).returning(|_| Ok(None));

        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        let processed = process_next_job(
            &repo,
            &registry_with(handler.clone()),
            &["crawl-thread".to_string()],
        )
        .await
        .unwrap();

        assert!(!processed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn successful_handler_acks_job() {
        let job = claimed("crawl-thread");
        let job_id = job.id;

        let mut repo = MockJobRepository::new();
        repo.expect_dequeue()
            .withf(|queues| queues == &vec!["crawl-thread".to_string()])
            .times(1)
            .returning(move |_| Ok(Some(job.clone())));
        repo.expect_mark_completed()
            .withf(move |id| *id == job_id)
            .times(1)
            .returning(|_| Ok(()));
        repo.expect_mark_failed().never();

        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        let processed = process_next_job(
            &repo,
            &registry_with(handler.clone()),
            &["crawl-thread".to_string()],
        )
        .await
        .unwrap();

        assert!(processed);
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failing_handler_marks_job_failed() {
        let job = claimed("crawl-thread");
        let job_id = job.id;

        let mut repo = MockJobRepository::new();
        repo.expect_dequeue()
            .times(1)
            .returning(move |_| Ok(Some(job.clone())));
        repo.expect_mark_completed().never();
        repo.expect_mark_failed()
            .withf(move |id, error| *id == job_id && error.contains("store unreachable"))
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail_with: Some("store unreachable"),
        });
        process_next_job(
            &repo,
            &registry_with(handler),
            &["crawl-thread".to_string()],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn unregistered_job_type_is_failed_without_dispatch() {
        let job = claimed("crawl-catalog");

        let mut repo = MockJobRepository::new();
        repo.expect_dequeue()
            .times(1)
            .returning(move |_| Ok(Some(job.clone())));
        repo.expect_mark_failed()
            .withf(|_, error| error.contains("No handler registered"))
            .times(1)
            .returning(|_, _| Ok(()));

        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        process_next_job(
            &repo,
            &registry_with(handler.clone()),
            &["crawl-catalog".to_string()],
        )
        .await
        .unwrap();

        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn consume_rejects_zero_concurrency() {
        let pool = WorkerPool::new(Arc::new(MockJobRepository::new()));
        let err = pool
            .consume(vec!["crawl-thread".to_string()], 0, HandlerRegistry::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn consume_returns_after_shutdown() {
        let mut repo = MockJobRepository::new();
        repo.expect_dequeue().returning(|_| Ok(None));

        let pool = WorkerPool::new(Arc::new(repo)).with_poll_interval(Duration::from_millis(10));
        let token = pool.shutdown_token();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        });

        pool.consume(vec!["crawl-thread".to_string()], 3, HandlerRegistry::new())
            .await
            .unwrap();
    }

    #[test]
    fn registry_lists_default_queues() {
        let handler = Arc::new(CountingHandler {
            calls: AtomicUsize::new(0),
            fail_with: None,
        });
        let registry = HandlerRegistry::new()
            .register(JobType::CrawlThread, handler.clone())
            .register(JobType::CrawlCatalog, handler);

        assert_eq!(registry.queues(), vec!["crawl-catalog", "crawl-thread"]);
    }
}
