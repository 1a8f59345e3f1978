use super::entities::{Category, ItemRecord, RedditPostRecord, StoreOutcome};
use crate::modules::jobs::domain::entities::Job;
use crate::shared::errors::AppResult;
use async_trait::async_trait;

/// Idempotent archive writer.
///
/// Every write is a single insert-if-absent keyed on the natural identifier;
/// an existing row is never overwritten.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn store_item(&self, record: ItemRecord) -> AppResult<StoreOutcome>;

    /// Store a listing post. When it is new, the channel cursor advance and
    /// `follow_up` (the post's comment crawl) commit in the same transaction.
    async fn store_listing_post(
        &self,
        channel: &str,
        category: Category,
        record: RedditPostRecord,
        follow_up: Job,
    ) -> AppResult<StoreOutcome>;

    /// Newest post id stored for `channel`
    async fn get_cursor(&self, channel: &str) -> AppResult<Option<String>>;
}
