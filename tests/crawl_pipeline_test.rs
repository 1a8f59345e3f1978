/// End-to-end crawl tests: queue, workers, board API and archive together
///
/// Tests cover:
/// - Catalog crawl fan-out and self re-arming through real workers
/// - Thread ingestion idempotency under duplicate delivery
mod utils;

use datadrift_lib::modules::jobs::{Job, JobType, WorkerPool};
use datadrift_lib::shared::Config;
use datadrift_lib::Services;
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utils::db;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn services_for(database_url: &str, chan_base: &str) -> Services {
    let vars: HashMap<&str, String> = HashMap::from([
        ("DATABASE_URL", database_url.to_string()),
        ("USER_AGENT", "datadrift-tests/0.1".to_string()),
        ("CHAN_API_BASE", chan_base.to_string()),
        ("REQUESTS_PER_SECOND", "100".to_string()),
        ("WORKER_CONCURRENCY", "3".to_string()),
    ]);
    let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
    Services::build(config).unwrap()
}

async fn mount_board(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/fit/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"page": 1, "threads": [{"no": 10}, {"no": 20}]}
        ])))
        .mount(server)
        .await;
    for (thread, replies) in [(10, vec![11, 12]), (20, vec![21])] {
        let mut posts = vec![json!({"no": thread, "com": "op"})];
        posts.extend(replies.into_iter().map(|no| json!({"no": no, "com": "reply"})));
        Mock::given(method("GET"))
            .and(path(format!("/fit/thread/{}.json", thread)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "posts": posts })))
            .mount(server)
            .await;
    }
}

/// Run the pool until `done` resolves true or the deadline passes
async fn run_until<F, Fut>(services: &Services, mut done: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let pool = Arc::new(
        WorkerPool::new(Arc::clone(&services.job_repository))
            .with_poll_interval(Duration::from_millis(100)),
    );
    let shutdown = pool.shutdown_token();
    let registry = services.registry();
    let queues = registry.queues();
    let consumer = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move { pool.consume(queues, 3, registry).await })
    };

    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    while !done().await && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    shutdown.cancel();
    consumer.await.unwrap().unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn catalog_crawl_archives_threads_and_rearms() {
    let _guard = db::acquire_test_lock();
    let Some(database) = db::test_database() else {
        return;
    };
    db::clean_test_db(&database);

    let server = MockServer::start().await;
    mount_board(&server).await;
    let url = std::env::var("TEST_DATABASE_URL").unwrap();
    let services = services_for(&url, &server.uri());

    services
        .job_repository
        .enqueue(Job::new(JobType::CrawlCatalog, &("fit", [10_i64])).unwrap())
        .await
        .unwrap();

    run_until(&services, || {
        let database = Arc::clone(&database);
        async move { db::count_rows(&database, "posts") >= 5 }
    })
    .await;

    assert_eq!(db::count_rows(&database, "posts"), 5);

    let stats = services.statistics().await.unwrap();
    assert_eq!(stats.completed_count, 3, "catalog job and two thread jobs");
    assert_eq!(stats.scheduled_count, 1, "exactly one follow-up catalog crawl");

    let next = services
        .job_repository
        .dequeue(vec!["crawl-catalog".to_string()])
        .await
        .unwrap();
    // Scheduled five minutes out, so not claimable yet
    assert!(next.is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn duplicate_thread_jobs_store_each_post_once() {
    let _guard = db::acquire_test_lock();
    let Some(database) = db::test_database() else {
        return;
    };
    db::clean_test_db(&database);

    let server = MockServer::start().await;
    mount_board(&server).await;
    let url = std::env::var("TEST_DATABASE_URL").unwrap();
    let services = services_for(&url, &server.uri());

    let jobs: Vec<Job> = (0..4)
        .map(|_| Job::new(JobType::CrawlThread, &("fit", 10_i64)).unwrap())
        .collect();
    services.job_repository.enqueue_batch(jobs).await.unwrap();

    run_until(&services, || {
        let repo = Arc::clone(&services.job_repository);
        async move { matches!(repo.get_statistics().await, Ok(s) if s.completed_count == 4) }
    })
    .await;

    assert_eq!(services.statistics().await.unwrap().completed_count, 4);
    assert_eq!(db::count_rows(&database, "posts"), 3);
}
