use crate::modules::provider::infrastructure::external::reddit::{RedditComment, RedditPost};
use crate::shared::utils::time::from_epoch_seconds;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which table family a subreddit's items are archived in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[serde(alias = "fitness")]
    General,
    Politics,
}

impl Category {
    pub fn posts_table(&self) -> &'static str {
        match self {
            Category::General => "reddit_posts",
            Category::Politics => "reddit_politics_posts",
        }
    }

    pub fn comments_table(&self) -> &'static str {
        match self {
            Category::General => "reddit_comments",
            Category::Politics => "reddit_politics_comments",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Category::General => write!(f, "general"),
            Category::Politics => write!(f, "politics"),
        }
    }
}

/// One board post; natural key (board, post_number)
#[derive(Debug, Clone, PartialEq)]
pub struct ChanPostRecord {
    pub board: String,
    pub thread_number: i64,
    pub post_number: i64,
    pub data: Value,
}

/// One subreddit post; natural key post_id
#[derive(Debug, Clone, PartialEq)]
pub struct RedditPostRecord {
    pub post_id: String,
    pub subreddit: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub created_utc: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub url: Option<String>,
    pub num_comments: Option<i32>,
    pub score: Option<i32>,
    pub data: Value,
}

impl RedditPostRecord {
    pub fn from_listing(post: &RedditPost, raw: &Value) -> Self {
        Self {
            post_id: post.id.clone(),
            subreddit: post.subreddit.clone(),
            title: post.title.clone(),
            content: post.selftext.clone().filter(|s| !s.is_empty()),
            created_utc: post.created_utc.and_then(from_epoch_seconds),
            author: post.author.clone(),
            url: post.url.clone(),
            num_comments: post.num_comments.and_then(|n| i32::try_from(n).ok()),
            score: post.score.and_then(|n| i32::try_from(n).ok()),
            data: raw.clone(),
        }
    }
}

/// One comment; natural key comment_id
#[derive(Debug, Clone, PartialEq)]
pub struct RedditCommentRecord {
    pub post_id: String,
    pub subreddit: String,
    pub comment_id: String,
    pub data: Value,
}

impl RedditCommentRecord {
    /// `channel` stands in when the payload carries no subreddit
    pub fn from_reply(post_id: &str, channel: &str, comment: &RedditComment, raw: &Value) -> Self {
        Self {
            post_id: post_id.to_string(),
            subreddit: comment
                .subreddit
                .clone()
                .unwrap_or_else(|| channel.to_string()),
            comment_id: comment.id.clone(),
            data: raw.clone(),
        }
    }
}

/// Anything the archive stores
#[derive(Debug, Clone, PartialEq)]
pub enum ItemRecord {
    ChanPost(ChanPostRecord),
    RedditPost(Category, RedditPostRecord),
    RedditComment(Category, RedditCommentRecord),
}

impl ItemRecord {
    pub fn natural_key(&self) -> String {
        match self {
            ItemRecord::ChanPost(p) => format!("/{}/{}", p.board, p.post_number),
            ItemRecord::RedditPost(_, p) => p.post_id.clone(),
            ItemRecord::RedditComment(_, c) => c.comment_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    /// Newly written; carries the surrogate row id
    Inserted(i64),
    AlreadyExists,
}

impl StoreOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, StoreOutcome::Inserted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn category_accepts_legacy_fitness_name() {
        let c: Category = serde_json::from_value(json!("fitness")).unwrap();
        assert_eq!(c, Category::General);
        let p: Category = serde_json::from_value(json!("politics")).unwrap();
        assert_eq!(p.posts_table(), "reddit_politics_posts");
        assert_eq!(p.comments_table(), "reddit_politics_comments");
        assert_eq!(serde_json::to_value(Category::General).unwrap(), json!("general"));
    }

    #[test]
    fn post_record_converts_created_utc_and_blanks() {
        let raw = json!({
            "id": "1a2b", "subreddit": "fitness", "title": "Deadlift form",
            "selftext": "", "created_utc": 1700000000.0, "num_comments": 4, "score": 9
        });
        let post: RedditPost = serde_json::from_value(raw.clone()).unwrap();
        let record = RedditPostRecord::from_listing(&post, &raw);

        assert_eq!(record.content, None);
        assert_eq!(record.created_utc.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(record.num_comments, Some(4));
        assert_eq!(record.data, raw);
    }

    #[test]
    fn comment_record_falls_back_to_channel() {
        let raw = json!({"id": "c9", "body": "ok"});
        let comment: RedditComment = serde_json::from_value(raw.clone()).unwrap();
        let record = RedditCommentRecord::from_reply("1a2b", "fitness", &comment, &raw);
        assert_eq!(record.subreddit, "fitness");
        assert_eq!(record.comment_id, "c9");
    }
}
