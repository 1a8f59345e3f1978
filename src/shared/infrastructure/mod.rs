/// Shared infrastructure concerns
pub mod database;

pub use database::{Database, DbConnection, DbPool};
