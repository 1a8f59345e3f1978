pub mod client;
pub mod dto;

pub use client::ChanClient;
pub use dto::{thread_numbers, CatalogPage, Thread, ThreadSummary};
