pub mod modules;
mod schema;
pub mod shared;

use modules::{
    archive::{ItemRepository, ItemRepositoryImpl},
    crawl::{crawl_registry, CatalogCrawler, ListingCrawler},
    jobs::{HandlerRegistry, JobRepository, JobRepositoryImpl, JobStatistics, WorkerPool},
    provider::{ChanClient, RateLimitedFetcher, RedditClient, RetryPolicy},
};
use shared::errors::AppResult;
use shared::{Config, Database};
use std::sync::Arc;

/// Fully wired crawler: store, queue, sources and crawlers
pub struct Services {
    pub config: Config,
    pub database: Arc<Database>,
    pub job_repository: Arc<dyn JobRepository>,
    pub item_repository: Arc<dyn ItemRepository>,
    pub catalog_crawler: Arc<CatalogCrawler>,
    pub listing_crawler: Arc<ListingCrawler>,
}

impl Services {
    pub fn build(config: Config) -> AppResult<Self> {
        // One connection per worker slot plus headroom for producers
        let pool_size = u32::try_from(config.worker_concurrency)
            .unwrap_or(u32::MAX)
            .saturating_add(2);
        let database = Arc::new(Database::connect(&config.database_url, pool_size)?);

        let job_repository: Arc<dyn JobRepository> =
            Arc::new(JobRepositoryImpl::new(database.pool().clone()).with_lease(config.job_lease));
        let item_repository: Arc<dyn ItemRepository> =
            Arc::new(ItemRepositoryImpl::new(Arc::clone(&database)));

        let chan = Arc::new(ChanClient::new(
            &config.chan_api_base,
            config.http_timeout,
            &config.user_agent,
            config.requests_per_second,
        )?);
        let reddit = Arc::new(RedditClient::new(
            &config.reddit_api_base,
            config.http_timeout,
            &config.user_agent,
            config.requests_per_second,
        )?);

        let fetcher = Arc::new(RateLimitedFetcher::new(
            reddit,
            Arc::clone(&job_repository),
            RetryPolicy::new(config.listing_retry_count, config.backoff_mode),
            RetryPolicy::new(config.reply_retry_count, config.backoff_mode),
        ));

        let catalog_crawler = Arc::new(CatalogCrawler::new(
            chan,
            Arc::clone(&job_repository),
            Arc::clone(&item_repository),
            config.catalog_interval,
        ));
        let listing_crawler = Arc::new(ListingCrawler::new(
            fetcher,
            Arc::clone(&job_repository),
            Arc::clone(&item_repository),
            config.listing_limit,
            config.listing_interval,
        ));

        log::info!(
            "Services initialized (backoff mode: {}, job lease: {}s, pool size: {})",
            config.backoff_mode,
            config.job_lease.as_secs(),
            pool_size
        );

        Ok(Self {
            config,
            database,
            job_repository,
            item_repository,
            catalog_crawler,
            listing_crawler,
        })
    }

    pub fn registry(&self) -> HandlerRegistry {
        crawl_registry(
            Arc::clone(&self.catalog_crawler),
            Arc::clone(&self.listing_crawler),
        )
    }

    pub fn run_migrations(&self) -> AppResult<usize> {
        self.database.run_migrations()
    }

    /// Consume `queues` (every crawl queue when empty) until Ctrl-C.
    /// Jobs already running are finished before returning.
    pub async fn work(&self, queues: Vec<String>, concurrency: Option<usize>) -> AppResult<()> {
        let registry = self.registry();
        let queues = if queues.is_empty() {
            registry.queues()
        } else {
            queues
        };
        let concurrency = concurrency.unwrap_or(self.config.worker_concurrency);

        let pool = WorkerPool::new(Arc::clone(&self.job_repository));
        let shutdown = pool.shutdown_token();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    log::info!("Shutdown requested, finishing running jobs");
                    shutdown.cancel();
                }
                Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
            }
        });

        pool.consume(queues, concurrency, registry).await
    }

    pub async fn seed(&self) -> AppResult<usize> {
        let ids = modules::crawl::seed(
            self.job_repository.as_ref(),
            &self.config.chan_boards,
            &self.config.general_subreddits,
            &self.config.politics_subreddits,
        )
        .await?;
        Ok(ids.len())
    }

    pub async fn statistics(&self) -> AppResult<JobStatistics> {
        self.job_repository.get_statistics().await
    }

    pub async fn prune(&self, days: i32) -> AppResult<usize> {
        self.job_repository.purge_finished(days).await
    }
}
