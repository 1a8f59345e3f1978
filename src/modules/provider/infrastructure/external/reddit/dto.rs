use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const POST_KIND: &str = "t3";
pub const COMMENT_KIND: &str = "t1";

/// A `Listing` envelope: `{"kind": "Listing", "data": {"children": [...]}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    #[serde(default)]
    pub kind: Option<String>,
    pub data: ListingData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingData {
    #[serde(default)]
    pub children: Vec<Thing>,
    #[serde(default)]
    pub after: Option<String>,
}

/// A kinded wrapper; `data` is kept verbatim as the stored payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thing {
    pub kind: String,
    pub data: Value,
}

/// Typed view over a `t3` post
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedditPost {
    pub id: String,
    pub subreddit: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub selftext: Option<String>,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub score: Option<i64>,
}

/// Typed view over a `t1` comment
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RedditComment {
    pub id: String,
    #[serde(default)]
    pub subreddit: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
}

impl Listing {
    /// Posts in listing order, paired with their raw payload.
    /// Children that are not posts or lack `id`/`subreddit` are skipped.
    pub fn posts(&self) -> Vec<(RedditPost, &Value)> {
        self.data
            .children
            .iter()
            .filter(|thing| thing.kind == POST_KIND)
            .filter_map(|thing| {
                serde_json::from_value::<RedditPost>(thing.data.clone())
                    .ok()
                    .map(|post| (post, &thing.data))
            })
            .collect()
    }
}

/// Comments among reply children, paired with their raw payload.
/// "more" stubs and malformed entries are skipped.
pub fn comments(children: &[Thing]) -> Vec<(RedditComment, &Value)> {
    children
        .iter()
        .filter(|thing| thing.kind == COMMENT_KIND)
        .filter_map(|thing| {
            serde_json::from_value::<RedditComment>(thing.data.clone())
                .ok()
                .map(|comment| (comment, &thing.data))
        })
        .collect()
}
