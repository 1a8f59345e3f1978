use super::dto::{Listing, Thing};
use crate::modules::provider::domain::FetchError;
use crate::modules::provider::infrastructure::http_client::{build_url, SourceHttpClient};
use crate::modules::provider::traits::ListingSource;
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::LogContext;
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub const DEFAULT_REDDIT_API_BASE: &str = "https://www.reddit.com";

/// Read-only client for subreddit listings and comment trees
pub struct RedditClient {
    http: SourceHttpClient,
    base_url: String,
}

impl RedditClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
        requests_per_second: u32,
    ) -> AppResult<Self> {
        Ok(Self {
            http: SourceHttpClient::new("reddit", timeout, user_agent, requests_per_second)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get_listing(&self, channel: &str, limit: u32) -> Option<Listing> {
        self.fetch_listing(channel, limit).await.ok()
    }

    pub async fn get_replies(&self, post_id: &str, channel: &str) -> Option<Vec<Thing>> {
        self.fetch_replies(post_id, channel).await.ok()
    }

    async fn timed<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
    ) -> Result<T, FetchError> {
        let started = Instant::now();
        let result = self.http.get_json(url).await;
        let status = match &result {
            Ok(_) => "ok",
            Err(e) => e.failure_class(),
        };
        LogContext::api_call(
            self.http.source_name(),
            endpoint,
            status,
            Some(started.elapsed().as_millis() as u64),
        );
        result
    }
}

#[async_trait]
impl ListingSource for RedditClient {
    async fn fetch_listing(&self, channel: &str, limit: u32) -> Result<Listing, FetchError> {
        let url = format!(
            "{}?limit={}",
            build_url(&self.base_url, &["r", channel, "new.json"]),
            limit
        );
        self.timed("listing", &url).await
    }

    async fn fetch_replies(&self, post_id: &str, channel: &str) -> Result<Vec<Thing>, FetchError> {
        let file = format!("{}.json", post_id);
        let url = build_url(&self.base_url, &["r", channel, "comments", &file]);

        // [post listing, comment listing]
        let mut listings: Vec<Listing> = self.timed("replies", &url).await?;
        if listings.len() < 2 {
            return Err(FetchError::Decode(format!(
                "expected post and comment listings, got {}",
                listings.len()
            )));
        }
        Ok(listings.swap_remove(1).data.children)
    }
}
