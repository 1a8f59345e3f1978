/// Job handlers binding crawl job types to the crawlers
use crate::modules::crawl::application::{CatalogCrawler, ListingCrawler};
use crate::modules::crawl::domain::{CatalogArgs, ListingArgs, RepliesArgs, ThreadArgs};
use crate::modules::jobs::domain::entities::{JobRecord, JobType};
use crate::modules::jobs::worker::{HandlerRegistry, JobHandler};
use crate::shared::errors::AppResult;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

pub struct CatalogHandler(pub Arc<CatalogCrawler>);
pub struct ThreadHandler(pub Arc<CatalogCrawler>);
pub struct ListingHandler(pub Arc<ListingCrawler>);
pub struct RepliesHandler(pub Arc<ListingCrawler>);

#[async_trait]
impl JobHandler for CatalogHandler {
    async fn handle(&self, job: &JobRecord) -> AppResult<()> {
        let args = CatalogArgs::from_job(job)?;
        self.0
            .crawl_catalog(&args.board, &args.previous_ids, Utc::now())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for ThreadHandler {
    async fn handle(&self, job: &JobRecord) -> AppResult<()> {
        let args = ThreadArgs::from_job(job)?;
        self.0.crawl_thread(&args.board, args.thread_no).await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for ListingHandler {
    async fn handle(&self, job: &JobRecord) -> AppResult<()> {
        let args = ListingArgs::from_job(job)?;
        self.0
            .crawl_listing(&args.channel, args.category, args.attempt, Utc::now())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobHandler for RepliesHandler {
    async fn handle(&self, job: &JobRecord) -> AppResult<()> {
        let args = RepliesArgs::from_job(job)?;
        self.0
            .crawl_replies(&args.channel, &args.post_id, args.category, args.attempt)
            .await?;
        Ok(())
    }
}

/// Registry with a handler for every crawl job type
pub fn crawl_registry(catalog: Arc<CatalogCrawler>, listing: Arc<ListingCrawler>) -> HandlerRegistry {
    HandlerRegistry::new()
        .register(
            JobType::CrawlCatalog,
            Arc::new(CatalogHandler(Arc::clone(&catalog))),
        )
        .register(JobType::CrawlThread, Arc::new(ThreadHandler(catalog)))
        .register(
            JobType::CrawlListing,
            Arc::new(ListingHandler(Arc::clone(&listing))),
        )
        .register(JobType::CrawlReplies, Arc::new(RepliesHandler(listing)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::archive::domain::repository::MockItemRepository;
    use crate::modules::archive::domain::{ItemRecord, StoreOutcome};
    use crate::modules::jobs::domain::repository::MockJobRepository;
    use crate::modules::jobs::worker::process_next_job;
    use crate::modules::provider::infrastructure::external::chan::Thread;
    use crate::modules::provider::traits::{MockCatalogSource, MockListingSource};
    use crate::modules::provider::{RateLimitedFetcher, RetryPolicy};
    use serde_json::json;
    use std::time::Duration;
    use uuid::Uuid;

    fn thread_job_record(args: serde_json::Value) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            job_type: "crawl-thread".to_string(),
            queue: "crawl-thread".to_string(),
            args,
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

    fn registry(source: MockCatalogSource, items: MockItemRepository) -> HandlerRegistry {
        let jobs: Arc<dyn crate::modules::jobs::JobRepository> = Arc::new(MockJobRepository::new());
        let items: Arc<dyn crate::modules::archive::ItemRepository> = Arc::new(items);
        let catalog = Arc::new(CatalogCrawler::new(
            Arc::new(source),
            Arc::clone(&jobs),
            Arc::clone(&items),
            Duration::from_secs(300),
        ));
        let fetcher = Arc::new(RateLimitedFetcher::new(
            Arc::new(MockListingSource::new()),
            Arc::clone(&jobs),
            RetryPolicy::listing(),
            RetryPolicy::replies(),
        ));
        let listing = Arc::new(ListingCrawler::new(
            fetcher,
            jobs,
            items,
            10,
            Duration::from_secs(60),
        ));
        crawl_registry(catalog, listing)
    }

    #[test]
    fn every_job_type_has_a_handler() {
        let registry = registry(MockCatalogSource::new(), MockItemRepository::new());
        assert_eq!(registry.job_types().len(), JobType::ALL.len());
        assert_eq!(
            registry.queues(),
            vec!["crawl-catalog", "crawl-listing", "crawl-replies", "crawl-thread"]
        );
    }

    #[tokio::test]
    async fn thread_job_is_dispatched_and_acked() {
        let mut source = MockCatalogSource::new();
        source
            .expect_get_thread()
            .withf(|board, no| board == "fit" && *no == 42)
            .returning(|_, _| Some(Thread { posts: vec![json!({"no": 42})] }));
        let mut items = MockItemRepository::new();
        items
            .expect_store_item()
            .withf(|record| matches!(record, ItemRecord::ChanPost(p) if p.thread_number == 42))
            .returning(|_| Ok(StoreOutcome::Inserted(1)));
        let registry = registry(source, items);

        let job = thread_job_record(json!(["fit", 42]));
        let job_id = job.id;
        let mut queue = MockJobRepository::new();
        queue
            .expect_dequeue()
            .times(1)
            .returning(move |_| Ok(Some(job.clone())));
        queue
            .expect_mark_completed()
            .withf(move |id| *id == job_id)
            .times(1)
            .returning(|_| Ok(()));

        let processed = process_next_job(&queue, &registry, &["crawl-thread".to_string()])
            .await
            .unwrap();
        assert!(processed);
    }

    #[tokio::test]
    async fn malformed_arguments_fail_the_job() {
        let registry = registry(MockCatalogSource::new(), MockItemRepository::new());

        let job = thread_job_record(json!({"board": "fit"}));
        let mut queue = MockJobRepository::new();
        queue
            .expect_dequeue()
            .returning(move |_| Ok(Some(job.clone())));
        queue
            .expect_mark_failed()
            .withf(|_, error| error.contains("Invalid arguments"))
            .times(1)
            .returning(|_, _| Ok(()));

        assert!(process_next_job(&queue, &registry, &["crawl-thread".to_string()])
            .await
            .unwrap());
    }
}
