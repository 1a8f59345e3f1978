use crate::shared::errors::AppError;
use std::time::Duration;
use thiserror::Error;

/// Why a single source request produced no result
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("malformed response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Short failure class used as a structured log field
    pub fn failure_class(&self) -> &'static str {
        match self {
            FetchError::Transport(_) => "transport",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Status(_) => "status",
            FetchError::Decode(_) => "decode",
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. })
    }
}

impl From<FetchError> for AppError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::RateLimited { .. } => AppError::RateLimitError(err.to_string()),
            FetchError::Decode(msg) => AppError::SerializationError(msg),
            FetchError::Transport(msg) => AppError::ExternalServiceError(msg),
            FetchError::Status(404) => AppError::NotFound("Source resource not found".to_string()),
            FetchError::Status(code) => AppError::ApiError(format!("HTTP {}", code)),
        }
    }
}
