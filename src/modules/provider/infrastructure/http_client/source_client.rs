//! Single-attempt JSON GET client shared by every source
//!
//! Each call waits for the pacing limiter, issues exactly one request with the
//! configured timeout and classifies the outcome. Retries live one layer up.

use super::retry_policy::RateLimitInfo;
use crate::modules::provider::domain::FetchError;
use crate::shared::errors::{AppError, AppResult};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub struct SourceHttpClient {
    client: Client,
    rate_limiter: DefaultDirectRateLimiter,
    source_name: String,
}

impl SourceHttpClient {
    pub fn new(
        source_name: &str,
        timeout: Duration,
        user_agent: &str,
        requests_per_second: u32,
    ) -> AppResult<Self> {
        Ok(Self {
            client: Self::create_http_client(timeout, user_agent)?,
            rate_limiter: Self::create_rate_limiter(requests_per_second),
            source_name: source_name.to_string(),
        })
    }

    /// Create an HTTP client with consistent configuration
    pub fn create_http_client(timeout: Duration, user_agent: &str) -> AppResult<Client> {
        Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                AppError::ExternalServiceError(format!("Failed to create HTTP client: {}", e))
            })
    }

    fn create_rate_limiter(requests_per_second: u32) -> DefaultDirectRateLimiter {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        RateLimiter::direct(Quota::per_second(per_second))
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// GET `url` and decode the body as JSON
    pub async fn get_json<T>(&self, url: &str) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
    {
        self.rate_limiter.until_ready().await;

        let started = Instant::now();
        debug!(source = %self.source_name, url, "request started");

        let response = match self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let err = FetchError::Transport(e.to_string());
                warn!(
                    source = %self.source_name,
                    url,
                    failure = err.failure_class(),
                    error = %e,
                    "request failed"
                );
                return Err(err);
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let info = RateLimitInfo::from_headers(response.headers());
            warn!(
                source = %self.source_name,
                url,
                status = status.as_u16(),
                failure = "rate_limited",
                retry_after = ?info.wait_hint(),
                "rate limit exceeded"
            );
            return Err(FetchError::RateLimited {
                retry_after: info.wait_hint(),
            });
        }

        if !status.is_success() {
            warn!(
                source = %self.source_name,
                url,
                status = status.as_u16(),
                failure = "status",
                "unexpected response status"
            );
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            warn!(source = %self.source_name, url, failure = "transport", error = %e, "body read failed");
            FetchError::Transport(e.to_string())
        })?;

        match serde_json::from_slice::<T>(&body) {
            Ok(parsed) => {
                info!(
                    source = %self.source_name,
                    url,
                    status = status.as_u16(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "fetched"
                );
                Ok(parsed)
            }
            Err(e) => {
                warn!(
                    source = %self.source_name,
                    url,
                    status = status.as_u16(),
                    failure = "decode",
                    error = %e,
                    "malformed response body"
                );
                Err(FetchError::Decode(e.to_string()))
            }
        }
    }
}

/// Join a base URL and percent-encoded path segments
pub fn build_url(base: &str, segments: &[&str]) -> String {
    let mut url = base.trim_end_matches('/').to_string();
    for segment in segments {
        url.push('/');
        url.push_str(&urlencoding::encode(segment));
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_url_encodes_segments() {
        assert_eq!(
            build_url("https://a.4cdn.org/", &["fit", "catalog.json"]),
            "https://a.4cdn.org/fit/catalog.json"
        );
        assert_eq!(
            build_url("http://localhost", &["r", "a b/c"]),
            "http://localhost/r/a%20b%2Fc"
        );
    }

    #[test]
    fn zero_rate_falls_back_to_one_per_second() {
        let limiter = SourceHttpClient::create_rate_limiter(0);
        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());
    }
}
