/// Source clients for board and listing APIs plus the rate-limit aware fetcher
pub mod domain;
pub mod infrastructure;
pub mod traits;

pub use domain::FetchError;
pub use infrastructure::{
    BackoffMode, ChanClient, FetchOutcome, RateLimitedFetcher, RedditClient, RetryPolicy,
};
pub use traits::{CatalogSource, ListingSource};
