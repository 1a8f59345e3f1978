pub mod archive;
pub mod crawl;
pub mod jobs;
pub mod provider;
