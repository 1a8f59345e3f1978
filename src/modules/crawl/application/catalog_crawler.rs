use crate::modules::archive::domain::{ChanPostRecord, ItemRecord, ItemRepository, StoreOutcome};
use crate::modules::crawl::domain::{catalog_job, thread_job, CatalogSnapshot};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::domain::repository::JobRepository;
use crate::modules::provider::traits::CatalogSource;
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::logger::LogContext;
use crate::shared::utils::time::format_schedule;
use crate::{log_debug, log_error, log_info, log_warn};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

/// What one catalog pass did
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogCrawl {
    /// Catalog unavailable; nothing scheduled
    Dropped,
    Completed {
        live: Vec<i64>,
        dead: BTreeSet<i64>,
        next_run: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadCrawl {
    pub seen: usize,
    pub stored: usize,
    pub duplicates: usize,
    pub failed: usize,
}

/// Polls board catalogs and archives their threads
pub struct CatalogCrawler {
    source: Arc<dyn CatalogSource>,
    job_repository: Arc<dyn JobRepository>,
    item_repository: Arc<dyn ItemRepository>,
    interval: Duration,
}

impl CatalogCrawler {
    pub fn new(
        source: Arc<dyn CatalogSource>,
        job_repository: Arc<dyn JobRepository>,
        item_repository: Arc<dyn ItemRepository>,
        interval: Duration,
    ) -> Self {
        Self {
            source,
            job_repository,
            item_repository,
            interval,
        }
    }

    /// Snapshot the catalog, fan out one thread job per live thread and
    /// re-arm for `now + interval` with the current ids as the new snapshot.
    pub async fn crawl_catalog(
        &self,
        board: &str,
        previous_ids: &[i64],
        now: DateTime<Utc>,
    ) -> AppResult<CatalogCrawl> {
        let Some(pages) = self.source.get_catalog(board).await else {
            log_error!("Catalog for /{}/ unavailable, not rescheduling", board);
            return Ok(CatalogCrawl::Dropped);
        };

        let snapshot = CatalogSnapshot::from_pages(board, &pages, now);
        let dead = snapshot.dead_since(previous_ids);
        if !dead.is_empty() {
            log_info!("Dead threads on /{}/: {:?}", board, dead);
        }

        let thread_jobs = snapshot
            .thread_ids
            .iter()
            .map(|no| thread_job(board, *no))
            .collect::<AppResult<Vec<Job>>>()?;
        let scheduled = thread_jobs.len();
        if !thread_jobs.is_empty() {
            self.job_repository.enqueue_batch(thread_jobs).await?;
        }

        let next_run = now + to_chrono(self.interval)?;
        let rearm = catalog_job(board, &snapshot.thread_ids)?.at(next_run);
        let next_run = rearm.scheduled_at.unwrap_or(next_run);
        self.job_repository.enqueue(rearm).await?;
        log_debug!("Next crawl of /{}/ at {}", board, format_schedule(next_run));

        LogContext::crawl_summary(&format!("/{}/", board), snapshot.thread_ids.len(), 0, scheduled);

        Ok(CatalogCrawl::Completed {
            live: snapshot.thread_ids,
            dead,
            next_run,
        })
    }

    /// Archive every post of one thread. A failed post does not stop its siblings.
    pub async fn crawl_thread(&self, board: &str, thread_no: i64) -> AppResult<ThreadCrawl> {
        let Some(thread) = self.source.get_thread(board, thread_no).await else {
            log_warn!("Thread /{}/{} unavailable, dropping", board, thread_no);
            return Ok(ThreadCrawl::default());
        };

        let mut report = ThreadCrawl::default();
        for (post_number, data) in thread.numbered_posts() {
            report.seen += 1;
            let record = ItemRecord::ChanPost(ChanPostRecord {
                board: board.to_string(),
                thread_number: thread_no,
                post_number,
                data: data.clone(),
            });

            match self.item_repository.store_item(record).await {
                Ok(StoreOutcome::Inserted(_)) => report.stored += 1,
                Ok(StoreOutcome::AlreadyExists) => report.duplicates += 1,
                Err(e) => {
                    report.failed += 1;
                    LogContext::error_with_context(
                        &e,
                        &format!("Failed to store post /{}/{}", board, post_number),
                    );
                }
            }
        }

        LogContext::crawl_summary(
            &format!("/{}/{}", board, thread_no),
            report.seen,
            report.stored,
            0,
        );
        Ok(report)
    }
}

pub(crate) fn to_chrono(interval: Duration) -> AppResult<chrono::Duration> {
    chrono::Duration::from_std(interval)
        .map_err(|e| AppError::ConfigError(format!("Crawl interval out of range: {}", e)))
}
