use super::catalog_crawler::to_chrono;
use crate::modules::archive::domain::{
    compare_post_ids, is_newer, Category, ItemRecord, ItemRepository, RedditCommentRecord,
    RedditPostRecord, StoreOutcome,
};
use crate::modules::crawl::domain::{listing_job, replies_job};
use crate::modules::jobs::domain::repository::JobRepository;
use crate::modules::provider::infrastructure::external::reddit::comments;
use crate::modules::provider::{FetchOutcome, RateLimitedFetcher};
use crate::shared::errors::AppResult;
use crate::shared::utils::logger::{LogContext, TimedOperation};
use crate::shared::utils::time::format_schedule;
use crate::{log_debug, log_error, log_info};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// What one listing pass did
#[derive(Debug, Clone, PartialEq)]
pub enum ListingCrawl {
    /// A future job owns the retry
    Rescheduled { at: DateTime<Utc> },
    /// Fetch failed; the channel is not re-armed
    Dropped,
    Completed {
        new_posts: Vec<String>,
        next_run: DateTime<Utc>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepliesCrawl {
    Rescheduled { at: DateTime<Utc> },
    Dropped,
    Completed { stored: usize, duplicates: usize, failed: usize },
}

/// Polls subreddit listings and archives posts and their comments
pub struct ListingCrawler {
    fetcher: Arc<RateLimitedFetcher>,
    job_repository: Arc<dyn JobRepository>,
    item_repository: Arc<dyn ItemRepository>,
    limit: u32,
    interval: Duration,
}

impl ListingCrawler {
    pub fn new(
        fetcher: Arc<RateLimitedFetcher>,
        job_repository: Arc<dyn JobRepository>,
        item_repository: Arc<dyn ItemRepository>,
        limit: u32,
        interval: Duration,
    ) -> Self {
        Self {
            fetcher,
            job_repository,
            item_repository,
            limit,
            interval,
        }
    }

    /// Store posts newer than the channel cursor, each together with its
    /// comment crawl job, and re-arm the listing for `now + interval`.
    pub async fn crawl_listing(
        &self,
        channel: &str,
        category: Category,
        attempt: u32,
        now: DateTime<Utc>,
    ) -> AppResult<ListingCrawl> {
        let timer = TimedOperation::new(&format!("listing crawl r/{}", channel));
        let cursor = self.item_repository.get_cursor(channel).await?;

        let listing = match self
            .fetcher
            .get_listing(channel, self.limit, attempt, |next| {
                listing_job(channel, category, next)
            })
            .await?
        {
            FetchOutcome::Fetched(listing) => listing,
            FetchOutcome::Rescheduled { at } => return Ok(ListingCrawl::Rescheduled { at }),
            FetchOutcome::Failed => {
                log_error!("Listing for r/{} unavailable, not rescheduling", channel);
                return Ok(ListingCrawl::Dropped);
            }
        };

        // Oldest first so the cursor only ever moves forward
        let mut posts = listing.posts();
        posts.sort_by(|(a, _), (b, _)| compare_post_ids(&a.id, &b.id));
        let seen = posts.len();

        let mut new_posts = Vec::new();
        for (post, raw) in posts {
            if !is_newer(&post.id, cursor.as_deref()) {
                continue;
            }

            let follow_up = replies_job(channel, &post.id, category, 0)?;
            let record = RedditPostRecord::from_listing(&post, raw);
            match self
                .item_repository
                .store_listing_post(channel, category, record, follow_up)
                .await
            {
                Ok(StoreOutcome::Inserted(_)) => {
                    log_info!(
                        "Inserted post {} from r/{} into {}",
                        post.id,
                        post.subreddit,
                        category.posts_table()
                    );
                    new_posts.push(post.id);
                }
                Ok(StoreOutcome::AlreadyExists) => {}
                Err(e) => {
                    // Newer posts would move the cursor past this one
                    LogContext::error_with_context(
                        &e,
                        &format!(
                            "Failed to store post {} from r/{}; retrying on the next pass",
                            post.id, channel
                        ),
                    );
                    break;
                }
            }
        }

        let next_run = now + to_chrono(self.interval)?;
        let rearm = listing_job(channel, category, 0)?.at(next_run);
        let next_run = rearm.scheduled_at.unwrap_or(next_run);
        self.job_repository.enqueue(rearm).await?;
        log_debug!("Next crawl of r/{} at {}", channel, format_schedule(next_run));

        LogContext::crawl_summary(
            &format!("r/{}", channel),
            seen,
            new_posts.len(),
            new_posts.len(),
        );
        timer.finish_with_info(&format!("{} new", new_posts.len()));

        Ok(ListingCrawl::Completed {
            new_posts,
            next_run,
        })
    }

    /// Archive the comments of one post
    pub async fn crawl_replies(
        &self,
        channel: &str,
        post_id: &str,
        category: Category,
        attempt: u32,
    ) -> AppResult<RepliesCrawl> {
        let children = match self
            .fetcher
            .get_replies(post_id, channel, attempt, |next| {
                replies_job(channel, post_id, category, next)
            })
            .await?
        {
            FetchOutcome::Fetched(children) => children,
            FetchOutcome::Rescheduled { at } => return Ok(RepliesCrawl::Rescheduled { at }),
            FetchOutcome::Failed => return Ok(RepliesCrawl::Dropped),
        };

        let (mut stored, mut duplicates, mut failed) = (0, 0, 0);
        let found = comments(&children);
        let seen = found.len();
        for (comment, raw) in found {
            let record = ItemRecord::RedditComment(
                category,
                RedditCommentRecord::from_reply(post_id, channel, &comment, raw),
            );
            match self.item_repository.store_item(record).await {
                Ok(StoreOutcome::Inserted(_)) => stored += 1,
                Ok(StoreOutcome::AlreadyExists) => duplicates += 1,
                Err(e) => {
                    failed += 1;
                    LogContext::error_with_context(
                        &e,
                        &format!("Failed to store comment {} on post {}", comment.id, post_id),
                    );
                }
            }
        }

        LogContext::crawl_summary(&format!("r/{}/{}", channel, post_id), seen, stored, 0);
        Ok(RepliesCrawl::Completed {
            stored,
            duplicates,
            failed,
        })
    }
}
