pub mod config;
pub mod errors;
pub mod infrastructure;
pub mod utils;

pub use config::Config;
pub use infrastructure::database::Database;
