pub mod cursor;
pub mod entities;
pub mod repository;

pub use cursor::{compare_post_ids, is_newer};
pub use entities::{
    Category, ChanPostRecord, ItemRecord, RedditCommentRecord, RedditPostRecord, StoreOutcome,
};
pub use repository::ItemRepository;
