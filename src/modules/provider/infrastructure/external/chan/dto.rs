use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of `/{board}/catalog.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub threads: Vec<ThreadSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSummary {
    pub no: i64,
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub replies: Option<u32>,
}

/// Body of `/{board}/thread/{no}.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    #[serde(default)]
    pub posts: Vec<Value>,
}

impl Thread {
    /// Posts paired with their post number; entries without a numeric `no` are skipped
    pub fn numbered_posts(&self) -> impl Iterator<Item = (i64, &Value)> {
        self.posts
            .iter()
            .filter_map(|post| post.get("no").and_then(Value::as_i64).map(|no| (no, post)))
    }
}

/// Thread numbers across all catalog pages, in page order
pub fn thread_numbers(pages: &[CatalogPage]) -> Vec<i64> {
    pages
        .iter()
        .flat_map(|page| page.threads.iter().map(|t| t.no))
        .collect()
}
