pub mod catalog_crawler;
pub mod listing_crawler;
pub mod seeder;

pub use catalog_crawler::{CatalogCrawl, CatalogCrawler, ThreadCrawl};
pub use listing_crawler::{ListingCrawl, ListingCrawler, RepliesCrawl};
pub use seeder::seed;
