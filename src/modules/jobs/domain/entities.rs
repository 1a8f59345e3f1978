/// Domain entities for the crawl job queue
///
/// A job is a typed unit of work with positional JSON arguments, a destination
/// queue and an optional future execution time.
use crate::shared::errors::{AppError, AppResult};
use crate::shared::utils::time::{format_schedule, truncate_to_seconds};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Job status enum matching database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "pending"),
            JobStatus::Running => write!(f, "running"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            _ => Err(format!("Invalid job status: {}", s)),
        }
    }
}

/// Recognized job types; each maps to one crawl handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobType {
    CrawlCatalog,
    CrawlThread,
    CrawlListing,
    CrawlReplies,
}

impl JobType {
    pub const ALL: [JobType; 4] = [
        JobType::CrawlCatalog,
        JobType::CrawlThread,
        JobType::CrawlListing,
        JobType::CrawlReplies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::CrawlCatalog => "crawl-catalog",
            JobType::CrawlThread => "crawl-thread",
            JobType::CrawlListing => "crawl-listing",
            JobType::CrawlReplies => "crawl-replies",
        }
    }

    /// Queue a job of this type lands on unless overridden
    pub fn default_queue(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("Invalid job type: {}", s))
    }
}

/// New job to be queued (before insertion to database)
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_type: JobType,
    pub args: serde_json::Value,
    pub queue: String,
    pub scheduled_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a job from a positional argument tuple.
    ///
    /// Arguments must serialize to a JSON array.
    pub fn new<A: Serialize>(job_type: JobType, args: &A) -> AppResult<Self> {
        let args = serde_json::to_value(args)?;
        if !args.is_array() {
            return Err(AppError::InvalidInput(format!(
                "Arguments for {} must be positional",
                job_type
            )));
        }

        Ok(Self {
            job_type,
            args,
            queue: job_type.default_queue().to_string(),
            scheduled_at: None,
        })
    }

    /// Schedule the job; sub-second precision is dropped.
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.scheduled_at = Some(truncate_to_seconds(at));
        self
    }

    /// Rejects a schedule time earlier than the enqueue time.
    pub fn validate_schedule(&self, enqueued_at: DateTime<Utc>) -> AppResult<()> {
        match self.scheduled_at {
            Some(at) if at < truncate_to_seconds(enqueued_at) => {
                Err(AppError::ValidationError(format!(
                    "{} job scheduled in the past ({} < {})",
                    self.job_type,
                    format_schedule(at),
                    format_schedule(enqueued_at)
                )))
            }
            _ => Ok(()),
        }
    }

    pub fn scheduled_at_display(&self) -> Option<String> {
        self.scheduled_at.map(format_schedule)
    }
}

/// Job record from database (with metadata)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: Uuid,
    pub job_type: String,
    pub queue: String,
    pub args: serde_json::Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl JobRecord {
    pub fn parse_job_type(&self) -> Result<JobType, String> {
        self.job_type.parse()
    }

    pub fn parse_status(&self) -> Result<JobStatus, String> {
        self.status.parse()
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.max_attempts
    }

    /// Decode the positional argument tuple
    pub fn parse_args<T: DeserializeOwned>(&self) -> AppResult<T> {
        serde_json::from_value(self.args.clone()).map_err(|e| {
            AppError::ValidationError(format!(
                "Invalid arguments for {} job {}: {}",
                self.job_type, self.id, e
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(job_type: &str, args: serde_json::Value) -> JobRecord {
        JobRecord {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            queue: job_type.to_string(),
            args,
            status: "running".to_string(),
            attempts: 1,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            scheduled_at: None,
            lease_expires_at: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error: None,
        }
    }

    #[test]
    fn test_job_status_from_str() {
        assert_eq!("pending".parse::<JobStatus>().unwrap(), JobStatus::Pending);
        assert_eq!("RUNNING".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert!("invalid".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_job_type_names() {
        for job_type in JobType::ALL {
            assert_eq!(job_type.as_str().parse::<JobType>().unwrap(), job_type);
        }
        assert_eq!(JobType::CrawlCatalog.to_string(), "crawl-catalog");
        assert!("crawl-everything".parse::<JobType>().is_err());
    }

    #[test]
    fn test_job_requires_positional_args() {
        let ok = Job::new(JobType::CrawlThread, &("fit", 123_i64)).unwrap();
        assert_eq!(ok.args, serde_json::json!(["fit", 123]));
        assert_eq!(ok.queue, "crawl-thread");

        #[derive(Serialize)]
        struct Named {
            board: String,
        }
        let err = Job::new(
            JobType::CrawlThread,
            &Named {
                board: "fit".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_schedule_is_truncated_and_rendered_with_z() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap()
            + chrono::Duration::milliseconds(250);
        let job = Job::new(JobType::CrawlCatalog, &("fit", Vec::<i64>::new()))
            .unwrap()
            .at(at);

        assert_eq!(
            job.scheduled_at_display().as_deref(),
            Some("2024-01-01T00:05:00Z")
        );
    }

    #[test]
    fn test_schedule_in_the_past_is_rejected() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let job = Job::new(JobType::CrawlCatalog, &("fit", Vec::<i64>::new())).unwrap();

        assert!(job.clone().at(now).validate_schedule(now).is_ok());
        assert!(job
            .clone()
            .at(now + chrono::Duration::seconds(300))
            .validate_schedule(now)
            .is_ok());
        assert!(job
            .at(now - chrono::Duration::seconds(1))
            .validate_schedule(now)
            .is_err());
    }

    #[test]
    fn test_job_record_can_retry() {
        let job = record("crawl-thread", serde_json::json!(["fit", 1]));
        assert!(job.can_retry());

        let exhausted = JobRecord {
            attempts: DEFAULT_MAX_ATTEMPTS,
            ..job
        };
        assert!(!exhausted.can_retry());
    }

    #[test]
    fn test_job_record_parse_args() {
        let job = record("crawl-thread", serde_json::json!(["pol", 4455]));
        let (board, no): (String, i64) = job.parse_args().unwrap();
        assert_eq!(board, "pol");
        assert_eq!(no, 4455);

        let bad = record("crawl-thread", serde_json::json!(["pol"]));
        assert!(bad.parse_args::<(String, i64)>().is_err());
    }
}
