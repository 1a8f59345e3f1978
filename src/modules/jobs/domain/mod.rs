pub mod entities;
pub mod repository;
pub mod value_objects;

pub use entities::{Job, JobRecord, JobStatus, JobType};
pub use repository::JobRepository;
pub use value_objects::JobStatusDb;
