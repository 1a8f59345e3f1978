/// Idempotent archive of crawled posts and comments
///
/// Every write is an atomic insert-if-absent keyed on the item's natural id.
/// Listing cursors live in the same database and advance with each new post.
pub mod domain;
pub mod infrastructure;

pub use domain::{
    compare_post_ids, is_newer, Category, ChanPostRecord, ItemRecord, ItemRepository,
    RedditCommentRecord, RedditPostRecord, StoreOutcome,
};
pub use infrastructure::ItemRepositoryImpl;
