//! Source client tests against a local HTTP server
//!
//! Each client makes exactly one request per call and classifies failures.

use datadrift_lib::modules::provider::{
    CatalogSource, ChanClient, FetchError, ListingSource, RedditClient,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const USER_AGENT: &str = "datadrift-tests/0.1";

fn chan(server: &MockServer) -> ChanClient {
    ChanClient::new(&server.uri(), Duration::from_secs(5), USER_AGENT, 100).unwrap()
}

fn reddit(server: &MockServer) -> RedditClient {
    RedditClient::new(&server.uri(), Duration::from_secs(5), USER_AGENT, 100).unwrap()
}

#[tokio::test]
async fn catalog_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fit/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"page": 1, "threads": [{"no": 10, "sub": "Lifting general"}, {"no": 20}]},
            {"page": 2, "threads": [{"no": 30}]}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let pages = chan(&server).get_catalog("fit").await.unwrap();
    let ids: Vec<i64> = pages
        .iter()
        .flat_map(|p| p.threads.iter().map(|t| t.no))
        .collect();
    assert_eq!(ids, vec![10, 20, 30]);
}

#[tokio::test]
async fn thread_posts_are_kept_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fit/thread/10.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "posts": [{"no": 10, "com": "op", "tim": 1700000000123_i64}, {"no": 11, "com": "reply"}]
        })))
        .mount(&server)
        .await;

    let thread = chan(&server).get_thread("fit", 10).await.unwrap();
    assert_eq!(thread.posts.len(), 2);
    assert_eq!(thread.posts[0]["tim"], json!(1700000000123_i64));
}

#[tokio::test]
async fn failures_reduce_to_no_result_without_retrying() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fit/thread/404.json"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fit/catalog.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = chan(&server);
    assert!(client.get_thread("fit", 404).await.is_none());
    assert!(client.get_catalog("fit").await.is_none());
}

#[tokio::test]
async fn failure_classes_are_distinguished() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/fit/thread/1.json"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/fit/thread/2.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let client = chan(&server);
    assert_eq!(
        client.fetch_thread("fit", 1).await.unwrap_err(),
        FetchError::Status(500)
    );
    assert!(matches!(
        client.fetch_thread("fit", 2).await.unwrap_err(),
        FetchError::Decode(_)
    ));

    // Nothing listening on this port
    let closed = ChanClient::new("http://127.0.0.1:9", Duration::from_secs(2), USER_AGENT, 100)
        .unwrap();
    assert!(matches!(
        closed.fetch_thread("fit", 3).await.unwrap_err(),
        FetchError::Transport(_)
    ));
}

#[tokio::test]
async fn listing_sends_identifying_header_and_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/fitness/new.json"))
        .and(query_param("limit", "10"))
        .and(header("user-agent", USER_AGENT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "kind": "Listing",
            "data": {"after": null, "children": [
                {"kind": "t3", "data": {"id": "1a2b", "subreddit": "fitness", "title": "Form check"}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let listing = reddit(&server).fetch_listing("fitness", 10).await.unwrap();
    let posts = listing.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0.id, "1a2b");
}

#[tokio::test]
async fn rate_limit_is_reported_with_retry_after() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/politics/new.json"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "7"))
        .expect(1)
        .mount(&server)
        .await;

    let err = reddit(&server).fetch_listing("politics", 10).await.unwrap_err();
    assert_eq!(
        err,
        FetchError::RateLimited {
            retry_after: Some(Duration::from_secs(7))
        }
    );
    assert!(err.is_rate_limited());
}

#[tokio::test]
async fn replies_come_from_second_listing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/r/fitness/comments/1a2b.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"kind": "Listing", "data": {"children": [
                {"kind": "t3", "data": {"id": "1a2b", "subreddit": "fitness"}}
            ]}},
            {"kind": "Listing", "data": {"children": [
                {"kind": "t1", "data": {"id": "c1", "body": "nice"}},
                {"kind": "more", "data": {"id": "m1", "children": ["c2"]}}
            ]}}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/r/fitness/comments/gone.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"kind": "Listing", "data": {"children": []}}
        ])))
        .mount(&server)
        .await;

    let client = reddit(&server);
    let children = client.fetch_replies("1a2b", "fitness").await.unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[0].kind, "t1");

    assert!(matches!(
        client.fetch_replies("gone", "fitness").await.unwrap_err(),
        FetchError::Decode(_)
    ));
    assert!(client.get_replies("gone", "fitness").await.is_none());
}
