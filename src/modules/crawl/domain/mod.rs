pub mod jobs;
pub mod snapshot;

pub use jobs::{
    catalog_job, listing_job, replies_job, thread_job, CatalogArgs, ListingArgs, RepliesArgs,
    ThreadArgs,
};
pub use snapshot::{dead_items, CatalogSnapshot};
