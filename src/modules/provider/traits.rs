use crate::modules::provider::domain::FetchError;
use crate::modules::provider::infrastructure::external::chan::{CatalogPage, Thread};
use crate::modules::provider::infrastructure::external::reddit::{Listing, Thing};
use async_trait::async_trait;

/// Board-style source: catalog snapshots and full threads.
/// Every failure is reduced to `None` after being logged.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn get_catalog(&self, board: &str) -> Option<Vec<CatalogPage>>;

    async fn get_thread(&self, board: &str, thread_no: i64) -> Option<Thread>;
}

/// Listing-style source. Errors are kept so rate limits can be told apart.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_listing(&self, channel: &str, limit: u32) -> Result<Listing, FetchError>;

    async fn fetch_replies(&self, post_id: &str, channel: &str) -> Result<Vec<Thing>, FetchError>;
}
