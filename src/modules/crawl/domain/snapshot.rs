//! Catalog snapshots and dead-thread detection.

use crate::modules::provider::infrastructure::external::chan::{thread_numbers, CatalogPage};
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Thread numbers observed by one catalog fetch
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSnapshot {
    pub board: String,
    pub thread_ids: Vec<i64>,
    pub captured_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn from_pages(board: &str, pages: &[CatalogPage], captured_at: DateTime<Utc>) -> Self {
        let mut seen = BTreeSet::new();
        let thread_ids = thread_numbers(pages)
            .into_iter()
            .filter(|no| seen.insert(*no))
            .collect();

        Self {
            board: board.to_string(),
            thread_ids,
            captured_at,
        }
    }

    /// Threads from `previous` that are no longer in this snapshot
    pub fn dead_since(&self, previous: &[i64]) -> BTreeSet<i64> {
        dead_items(previous, &self.thread_ids)
    }
}

/// `previous \ current`
pub fn dead_items(previous: &[i64], current: &[i64]) -> BTreeSet<i64> {
    let current: BTreeSet<i64> = current.iter().copied().collect();
    previous
        .iter()
        .copied()
        .filter(|id| !current.contains(id))
        .collect()
}
