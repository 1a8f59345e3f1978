pub mod models;
pub mod repository;

pub use repository::{insert_job, JobRepositoryImpl};
