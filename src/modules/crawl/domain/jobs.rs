/// Positional arguments of the crawl jobs and builders for them
///
/// Jobs pushed by older producers may omit trailing arguments; a missing
/// `previous_ids` is an empty snapshot and a missing attempt index is 0.
use crate::modules::archive::domain::Category;
use crate::modules::jobs::domain::entities::{Job, JobRecord, JobType};
use crate::shared::errors::AppResult;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogArgs {
    pub board: String,
    pub previous_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThreadArgs {
    pub board: String,
    pub thread_no: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingArgs {
    pub channel: String,
    pub category: Category,
    pub attempt: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RepliesArgs {
    pub channel: String,
    pub post_id: String,
    pub category: Category,
    pub attempt: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCatalogArgs {
    Full(String, Vec<i64>),
    BoardOnly((String,)),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawListingArgs {
    Full(String, Category, u32),
    FirstAttempt(String, Category),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRepliesArgs {
    Full(String, String, Category, u32),
    FirstAttempt(String, String, Category),
}

impl CatalogArgs {
    pub fn from_job(job: &JobRecord) -> AppResult<Self> {
        Ok(match job.parse_args::<RawCatalogArgs>()? {
            RawCatalogArgs::Full(board, previous_ids) => Self { board, previous_ids },
            RawCatalogArgs::BoardOnly((board,)) => Self {
                board,
                previous_ids: Vec::new(),
            },
        })
    }
}

impl ThreadArgs {
    pub fn from_job(job: &JobRecord) -> AppResult<Self> {
        let (board, thread_no) = job.parse_args::<(String, i64)>()?;
        Ok(Self { board, thread_no })
    }
}

impl ListingArgs {
    pub fn from_job(job: &JobRecord) -> AppResult<Self> {
        let (channel, category, attempt) = match job.parse_args::<RawListingArgs>()? {
            RawListingArgs::Full(channel, category, attempt) => (channel, category, attempt),
            RawListingArgs::FirstAttempt(channel, category) => (channel, category, 0),
        };
        Ok(Self {
            channel,
            category,
            attempt,
        })
    }
}

impl RepliesArgs {
    pub fn from_job(job: &JobRecord) -> AppResult<Self> {
        let (channel, post_id, category, attempt) = match job.parse_args::<RawRepliesArgs>()? {
            RawRepliesArgs::Full(channel, post_id, category, attempt) => {
                (channel, post_id, category, attempt)
            }
            RawRepliesArgs::FirstAttempt(channel, post_id, category) => {
                (channel, post_id, category, 0)
            }
        };
        Ok(Self {
            channel,
            post_id,
            category,
            attempt,
        })
    }
}

pub fn catalog_job(board: &str, previous_ids: &[i64]) -> AppResult<Job> {
    Job::new(JobType::CrawlCatalog, &(board, previous_ids))
}

pub fn thread_job(board: &str, thread_no: i64) -> AppResult<Job> {
    Job::new(JobType::CrawlThread, &(board, thread_no))
}

pub fn listing_job(channel: &str, category: Category, attempt: u32) -> AppResult<Job> {
    Job::new(JobType::CrawlListing, &(channel, category, attempt))
}

pub fn replies_job(channel: &str, post_id: &str, category: Category, attempt: u32) -> AppResult<Job> {
    Job::new(JobType::CrawlReplies, &(channel, post_id, category, attempt))
}
