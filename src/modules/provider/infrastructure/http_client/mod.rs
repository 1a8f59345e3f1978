pub mod rate_limited_fetcher;
pub mod retry_policy;
pub mod source_client;

pub use rate_limited_fetcher::{FetchOutcome, RateLimitedFetcher};
pub use retry_policy::{BackoffMode, RateLimitInfo, RetryPolicy};
pub use source_client::{build_url, SourceHttpClient};
