pub mod external;
pub mod http_client;

pub use external::{ChanClient, RedditClient};
pub use http_client::{BackoffMode, FetchOutcome, RateLimitedFetcher, RetryPolicy, SourceHttpClient};
