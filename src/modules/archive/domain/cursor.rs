//! Ordering of listing post identifiers.
//!
//! Post ids are base-36 counters without leading zeros, so a longer id is
//! always newer and ids of equal length compare lexicographically.

use std::cmp::Ordering;

pub fn compare_post_ids(a: &str, b: &str) -> Ordering {
    a.len()
        .cmp(&b.len())
        .then_with(|| a.to_ascii_lowercase().cmp(&b.to_ascii_lowercase()))
}

/// True when `id` orders after the stored cursor (or there is none)
pub fn is_newer(id: &str, cursor: Option<&str>) -> bool {
    match cursor {
        Some(last) => compare_post_ids(id, last) == Ordering::Greater,
        None => true,
    }
}
