/// Diesel models for archive tables
use crate::modules::archive::domain::ChanPostRecord;
use crate::schema::posts;
use diesel::prelude::*;
use serde_json::Value as JsonValue;

#[derive(Insertable, Debug)]
#[diesel(table_name = posts)]
pub struct NewChanPost<'a> {
    pub board: &'a str,
    pub thread_number: i64,
    pub post_number: i64,
    pub data: &'a JsonValue,
}

impl<'a> From<&'a ChanPostRecord> for NewChanPost<'a> {
    fn from(record: &'a ChanPostRecord) -> Self {
        Self {
            board: &record.board,
            thread_number: record.thread_number,
            post_number: record.post_number,
            data: &record.data,
        }
    }
}

/// Row id returned by `INSERT ... RETURNING id`
#[derive(QueryableByName, Debug)]
pub struct InsertedId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub id: i64,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crate::schema::listing_cursors)]
pub struct ListingCursorModel {
    pub subreddit: String,
    pub last_post_id: String,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
