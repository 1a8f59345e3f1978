/// Database test utilities with singleton pattern
///
/// Tests that need Postgres call `test_database()` and return early when
/// `TEST_DATABASE_URL` is not set.
use datadrift_lib::shared::Database;
use diesel::prelude::*;
use std::sync::{Arc, Mutex, OnceLock};

static DATABASE: OnceLock<Option<Arc<Database>>> = OnceLock::new();

/// Get or create the shared test database, with migrations applied
pub fn test_database() -> Option<Arc<Database>> {
    DATABASE
        .get_or_init(|| {
            dotenvy::dotenv().ok();
            let url = match std::env::var("TEST_DATABASE_URL") {
                Ok(url) => url,
                Err(_) => {
                    eprintln!("TEST_DATABASE_URL not set, skipping database test");
                    return None;
                }
            };

            let database = Database::connect(&url, 10).expect("Failed to create test database pool");
            database
                .run_migrations()
                .expect("Failed to run migrations on test database");
            Some(Arc::new(database))
        })
        .clone()
}

/// Clean all crawler tables - use at the start of each test
pub fn clean_test_db(database: &Database) {
    let mut conn = database.get_connection().expect("Failed to get DB connection");

    for table in [
        "background_jobs",
        "listing_cursors",
        "posts",
        "reddit_posts",
        "reddit_politics_posts",
        "reddit_comments",
        "reddit_politics_comments",
    ] {
        diesel::sql_query(format!("TRUNCATE TABLE {} RESTART IDENTITY CASCADE", table))
            .execute(&mut conn)
            .unwrap_or_else(|e| panic!("Failed to clean {}: {}", table, e));
    }
}

pub fn count_rows(database: &Database, table: &str) -> i64 {
    #[derive(QueryableByName)]
    struct Count {
        #[diesel(sql_type = diesel::sql_types::BigInt)]
        count: i64,
    }

    let mut conn = database.get_connection().expect("Failed to get DB connection");
    diesel::sql_query(format!("SELECT COUNT(*) AS count FROM {}", table))
        .get_result::<Count>(&mut conn)
        .expect("Failed to count rows")
        .count
}

/// Global test mutex for serialization
static TEST_LOCK: Mutex<()> = Mutex::new(());

/// Acquire test lock to ensure tests run serially
/// Returns a guard that releases the lock when dropped
pub fn acquire_test_lock() -> std::sync::MutexGuard<'static, ()> {
    // Handle poisoned mutex by recovering from panic
    match TEST_LOCK.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
