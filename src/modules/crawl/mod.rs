/// Crawl orchestration: catalog and listing polling, fan-out and self re-arming
///
/// Every crawl is a job. A pass fetches its source, archives what is new,
/// queues child jobs in one batch and schedules its own next run.
pub mod application;
pub mod domain;
pub mod handlers;

pub use application::{seed, CatalogCrawler, ListingCrawler};
pub use domain::{dead_items, CatalogSnapshot};
pub use handlers::crawl_registry;
