use super::dto::{CatalogPage, Thread};
use crate::modules::provider::domain::FetchError;
use crate::modules::provider::infrastructure::http_client::{build_url, SourceHttpClient};
use crate::modules::provider::traits::CatalogSource;
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::LogContext;
use async_trait::async_trait;
use std::time::{Duration, Instant};

pub const DEFAULT_CHAN_API_BASE: &str = "https://a.4cdn.org";

/// Read-only client for a 4chan-style board API
pub struct ChanClient {
    http: SourceHttpClient,
    base_url: String,
}

impl ChanClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        user_agent: &str,
        requests_per_second: u32,
    ) -> AppResult<Self> {
        Ok(Self {
            http: SourceHttpClient::new("chan", timeout, user_agent, requests_per_second)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch_catalog(&self, board: &str) -> Result<Vec<CatalogPage>, FetchError> {
        let url = build_url(&self.base_url, &[board, "catalog.json"]);
        self.timed("catalog", &url).await
    }

    pub async fn fetch_thread(&self, board: &str, thread_no: i64) -> Result<Thread, FetchError> {
        let file = format!("{}.json", thread_no);
        let url = build_url(&self.base_url, &[board, "thread", &file]);
        self.timed("thread", &url).await
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
impl CatalogSource for ChanClient {
    async fn get_catalog(&self, board: &str) -> Option<Vec<CatalogPage>> {
        self.fetch_catalog(board).await.ok()
    }

    async fn get_thread(&self, board: &str, thread_no: i64) -> Option<Thread> {
        self.fetch_thread(board, thread_no).await.ok()
    }
}
