pub mod client;
pub mod dto;

pub use client::RedditClient;
pub use dto::{comments, Listing, RedditComment, RedditPost, Thing};
