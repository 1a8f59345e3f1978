/// Durable job queue backed by PostgreSQL
///
/// Producers enqueue typed jobs with positional arguments onto named queues,
/// optionally scheduled for a future time. A worker pool claims ready jobs
/// and dispatches them to the handler registered for their type.
pub mod domain;
pub mod infrastructure;
pub mod worker;

pub use domain::{
    entities::{Job, JobRecord, JobStatus, JobType},
    repository::{JobRepository, JobStatistics},
};
pub use infrastructure::JobRepositoryImpl;
pub use worker::{HandlerRegistry, JobHandler, WorkerPool};
