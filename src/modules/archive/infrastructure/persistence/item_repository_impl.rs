use crate::modules::archive::domain::{
    Category, ChanPostRecord, ItemRecord, ItemRepository, RedditCommentRecord, RedditPostRecord,
    StoreOutcome,
};
use crate::modules::archive::infrastructure::models::{InsertedId, ListingCursorModel, NewChanPost};
use crate::modules::jobs::domain::entities::Job;
use crate::modules::jobs::infrastructure::insert_job;
use crate::schema::{listing_cursors, posts};
use crate::shared::errors::{AppError, AppResult};
use crate::shared::infrastructure::database::Database;
use crate::shared::utils::logger::LogContext;
use crate::log_debug;
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Jsonb, Nullable, Text, Timestamptz};
use std::sync::Arc;
use std::time::Instant;
use tokio::task;

pub struct ItemRepositoryImpl {
    db: Arc<Database>,
}

impl ItemRepositoryImpl {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn outcome(inserted: Option<i64>) -> StoreOutcome {
    match inserted {
        Some(id) => StoreOutcome::Inserted(id),
        None => StoreOutcome::AlreadyExists,
    }
}

fn insert_chan_post(conn: &mut PgConnection, record: &ChanPostRecord) -> QueryResult<StoreOutcome> {
    diesel::insert_into(posts::table)
        .values(NewChanPost::from(record))
        .on_conflict((posts::board, posts::post_number))
        .do_nothing()
        .returning(posts::id)
        .get_result::<i64>(conn)
        .optional()
        .map(outcome)
}

fn insert_reddit_post(
    conn: &mut PgConnection,
    category: Category,
    record: &RedditPostRecord,
) -> QueryResult<StoreOutcome> {
    // Table names come from a closed enum, never from input
    let query = format!(
        "INSERT INTO {} (post_id, subreddit, title, content, created_utc, author, url,
                         num_comments, score, data)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         ON CONFLICT (post_id) DO NOTHING
         RETURNING id",
        category.posts_table()
    );

    diesel::sql_query(query)
        .bind::<Text, _>(&record.post_id)
        .bind::<Text, _>(&record.subreddit)
        .bind::<Nullable<Text>, _>(record.title.as_deref())
        .bind::<Nullable<Text>, _>(record.content.as_deref())
        .bind::<Nullable<Timestamptz>, _>(record.created_utc)
        .bind::<Nullable<Text>, _>(record.author.as_deref())
        .bind::<Nullable<Text>, _>(record.url.as_deref())
        .bind::<Nullable<Integer>, _>(record.num_comments)
        .bind::<Nullable<Integer>, _>(record.score)
        .bind::<Jsonb, _>(&record.data)
        .get_result::<InsertedId>(conn)
        .optional()
        .map(|row| outcome(row.map(|r| r.id)))
}

fn insert_reddit_comment(
    conn: &mut PgConnection,
    category: Category,
    record: &RedditCommentRecord,
) -> QueryResult<StoreOutcome> {
    let query = format!(
        "INSERT INTO {} (post_id, subreddit, comment_id, data)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (comment_id) DO NOTHING
         RETURNING id",
        category.comments_table()
    );

    diesel::sql_query(query)
        .bind::<Text, _>(&record.post_id)
        .bind::<Text, _>(&record.subreddit)
        .bind::<Text, _>(&record.comment_id)
        .bind::<Jsonb, _>(&record.data)
        .get_result::<InsertedId>(conn)
        .optional()
        .map(|row| outcome(row.map(|r| r.id)))
}

/// Move the cursor forward; an older or equal id leaves it untouched
fn advance_cursor(conn: &mut PgConnection, channel: &str, post_id: &str) -> QueryResult<usize> {
    diesel::sql_query(
        r#"INSERT INTO listing_cursors (subreddit, last_post_id, updated_at)
           VALUES (lower($1), lower($2), NOW())
           ON CONFLICT (subreddit) DO UPDATE
           SET last_post_id = EXCLUDED.last_post_id, updated_at = NOW()
           WHERE length(EXCLUDED.last_post_id) > length(listing_cursors.last_post_id)
              OR (length(EXCLUDED.last_post_id) = length(listing_cursors.last_post_id)
                  AND EXCLUDED.last_post_id COLLATE "C" > listing_cursors.last_post_id COLLATE "C")"#,
    )
    .bind::<Text, _>(channel)
    .bind::<Text, _>(post_id)
    .execute(conn)
}

#[async_trait]
impl ItemRepository for ItemRepositoryImpl {
    async fn store_item(&self, record: ItemRecord) -> AppResult<StoreOutcome> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> AppResult<StoreOutcome> {
            let mut conn = db.get_connection()?;
            let started = Instant::now();

            let (table, result) = match &record {
                ItemRecord::ChanPost(post) => ("posts", insert_chan_post(&mut conn, post)),
                ItemRecord::RedditPost(category, post) => (
                    category.posts_table(),
                    insert_reddit_post(&mut conn, *category, post),
                ),
                ItemRecord::RedditComment(category, comment) => (
                    category.comments_table(),
                    insert_reddit_comment(&mut conn, *category, comment),
                ),
            };

            let stored = result.map_err(|e| {
                AppError::DatabaseError(format!(
                    "Failed to store {} into {}: {}",
                    record.natural_key(),
                    table,
                    e
                ))
            })?;

            LogContext::db_operation(
                "insert_if_absent",
                table,
                Some(started.elapsed().as_millis() as u64),
            );
            if stored == StoreOutcome::AlreadyExists {
                log_debug!("{} already exists in {}. Skipping insert.", record.natural_key(), table);
            }
            Ok(stored)
        })
        .await?
    }

    async fn store_listing_post(
        &self,
        channel: &str,
        category: Category,
        record: RedditPostRecord,
        follow_up: Job,
    ) -> AppResult<StoreOutcome> {
        let db = Arc::clone(&self.db);
        let channel = channel.to_string();

        task::spawn_blocking(move || -> AppResult<StoreOutcome> {
            let mut conn = db.get_connection()?;

            // Post, cursor and follow-up job land together or not at all
            conn.transaction::<StoreOutcome, AppError, _>(|conn| {
                let stored = insert_reddit_post(conn, category, &record)?;
                if stored.is_inserted() {
                    advance_cursor(conn, &channel, &record.post_id)?;
                    let job_id = insert_job(conn, follow_up)?;
                    log_debug!("Queued {} for post {}", job_id, record.post_id);
                }
                Ok(stored)
            })
            .map_err(|e| match e {
                AppError::DatabaseError(msg) => AppError::DatabaseError(format!(
                    "Failed to store post {} from r/{}: {}",
                    record.post_id, channel, msg
                )),
                other => other,
            })
        })
        .await?
    }

    async fn get_cursor(&self, channel: &str) -> AppResult<Option<String>> {
        let db = Arc::clone(&self.db);
        let channel = channel.to_lowercase();

        task::spawn_blocking(move || -> AppResult<Option<String>> {
            let mut conn = db.get_connection()?;
            let cursor = listing_cursors::table
                .find(&channel)
                .select(ListingCursorModel::as_select())
                .first(&mut conn)
                .optional()?;
            Ok(cursor.map(|c| c.last_post_id))
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_returning_row_means_already_exists() {
        assert_eq!(outcome(None), StoreOutcome::AlreadyExists);
        assert_eq!(outcome(Some(7)), StoreOutcome::Inserted(7));
    }

}
