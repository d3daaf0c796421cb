//! Tests for the stateful collector engine

use super::*;
use crate::http::{HttpClient, HttpClientConfig, RetryPolicy};
use crate::input::{SeedQuery, SeedSource};
use crate::pagination::PaginationMode;
use crate::query::QueryBuilder;
use crate::state::{StateManager, SyncPolicy};
use crate::storage::DuckDbStore;
use crate::types::{CollectionParams, SeedInput};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMMITS_PATH: &str = "/rest/api/1.0/projects/PROJ/repos/app/commits";
const COMMITS_URL: &str =
    "rest/api/1.0/projects/{{ .Params.FullName }}/commits?until={{ .Input.Branch }}";

fn params() -> CollectionParams {
    CollectionParams::new(1, "PROJ/repos/app")
}

fn client(server: &MockServer) -> Arc<dyn ApiClient> {
    let config = HttpClientConfig::builder()
        .endpoint(server.uri())
        .retry(RetryPolicy::none())
        .rate_limit(None)
        .build();
    Arc::new(HttpClient::with_config(config).unwrap())
}

fn collector(server: &MockServer, store: &DuckDbStore) -> StatefulCollector {
    StatefulCollector::new(
        params(),
        client(server),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
    )
}

fn commits_args(store: &DuckDbStore) -> CollectorArgs {
    CollectorArgs::new("commits", COMMITS_URL)
        .page_size(2)
        .pagination(PaginationMode::CursorLink)
        .input(Arc::new(SeedSource::new(
            store.clone(),
            SeedQuery::branches(),
        )))
}

fn seed_branches(store: &DuckDbStore, names: &[&str]) {
    for name in names {
        store
            .upsert_seed(&params(), &SeedInput::Branch((*name).to_string()), None)
            .unwrap();
    }
}

/// `main` spans three pages linked by opaque tokens, `dev` is gone.
async fn mount_commits(server: &MockServer) {
    let next = |token: &str| format!("{}{COMMITS_PATH}?until=main&page={token}", server.uri());

    Mock::given(method("GET"))
        .and(path(COMMITS_PATH))
        .and(query_param("until", "main"))
        .and(query_param("page", "1"))
        .and(query_param("pagelen", "2"))
        .and(query_param("state", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "c1"}, {"id": "c2"}],
            "next": next("xq9")
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(COMMITS_PATH))
        .and(query_param("until", "main"))
        .and(query_param("page", "xq9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "c3"}, {"id": "c4"}],
            "next": next("b07")
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(COMMITS_PATH))
        .and(query_param("until", "main"))
        .and(query_param("page", "b07"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "c5"}],
            "next": ""
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(COMMITS_PATH))
        .and(query_param("until", "dev"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such branch"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_cursor_seeds_with_missing_branch() {
    let server = MockServer::start().await;
    mount_commits(&server).await;
    let store = DuckDbStore::in_memory().unwrap();
    seed_branches(&store, &["main", "dev"]);

    let mut collector = collector(&server, &store);
    let summary = collector.collect(&commits_args(&store)).await.unwrap();

    assert_eq!(collector.phase(), RunPhase::Completed);
    assert_eq!(summary.seeds, 2);
    assert_eq!(summary.skipped_seeds, 1);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.records, 5);

    let rows = store.fetch_raw("commits", &params()).unwrap();
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|r| r.input == r#"{"Branch":"main"}"#));
    let pages: Vec<u32> = rows.iter().map(|r| r.page).collect();
    assert_eq!(pages, vec![1, 1, 2, 2, 3]);
    assert_eq!(rows[4].data, r#"{"id":"c5"}"#);
    assert!(rows[4].url.contains("page=b07"));

    let key = StateKey::new("commits", &params());
    assert!(StateStore::load(&store, &key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_commits(&server).await;
    let store = DuckDbStore::in_memory().unwrap();
    seed_branches(&store, &["main", "dev"]);

    let mut collector = collector(&server, &store);
    collector.collect(&commits_args(&store)).await.unwrap();
    let first = store.fetch_raw("commits", &params()).unwrap();

    collector.collect(&commits_args(&store)).await.unwrap();
    let second = store.fetch_raw("commits", &params()).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_unauthorized_aborts_and_keeps_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();
    seed_branches(&store, &["a", "b"]);

    let mut collector = collector(&server, &store);
    let err = collector.collect(&commits_args(&store)).await.unwrap_err();

    assert!(err.is_auth());
    assert!(err.to_string().contains("check your access token"));
    assert_eq!(collector.phase(), RunPhase::Failed);
    assert_eq!(server.received_requests().await.unwrap().len(), 1);

    let key = StateKey::new("commits", &params());
    assert!(StateStore::load(&store, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_server_error_keeps_pages_already_saved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": 1}, {"id": 2}],
            "next": format!("{}/x?page=2", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();

    let args = CollectorArgs::new("pull_requests", "projects/{{ .Params.FullName }}/pull-requests")
        .page_size(2)
        .pagination(PaginationMode::CursorLink);
    let mut collector = collector(&server, &store);
    let err = collector.collect(&args).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { status: 500, .. }));
    assert_eq!(store.count_raw("pull_requests").unwrap(), 2);
    let key = StateKey::new("pull_requests", &params());
    assert!(StateStore::load(&store, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_page_count_empty_makes_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/1.0/projects/PROJ/repos/app/branches"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "size": 0,
            "values": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();

    let args = CollectorArgs::new(
        "branches",
        "rest/api/1.0/projects/{{ .Params.FullName }}/branches",
    );
    let summary = collector(&server, &store).collect(&args).await.unwrap();

    assert_eq!(summary.pages, 1);
    assert_eq!(summary.records, 0);
}

#[tokio::test]
async fn test_page_count_walks_every_page() {
    let server = MockServer::start().await;
    for (page, values) in [
        ("1", json!([{"n": 1}, {"n": 2}])),
        ("2", json!([{"n": 3}, {"n": 4}])),
        ("3", json!([{"n": 5}])),
    ] {
        Mock::given(method("GET"))
            .and(query_param("page", page))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "size": 5,
                "values": values
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    let store = DuckDbStore::in_memory().unwrap();

    let args = CollectorArgs::new("branches", "branches").page_size(2);
    let summary = collector(&server, &store).collect(&args).await.unwrap();

    assert_eq!(summary.pages, 3);
    assert_eq!(summary.records, 5);
    assert_eq!(store.count_raw("branches").unwrap(), 5);
}

#[tokio::test]
async fn test_second_run_is_incremental() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();

    let args = CollectorArgs::new("pull_requests", "pull-requests")
        .query(QueryBuilder::incremental())
        .pagination(PaginationMode::CursorLink);
    let mut collector = collector(&server, &store);

    collector.collect(&args).await.unwrap();
    collector.collect(&args).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    let has_filter = |i: usize| requests[i].url.query_pairs().any(|(k, _)| k == "q");
    assert!(!has_filter(0));
    assert!(has_filter(1));
    assert!(requests[1]
        .url
        .query_pairs()
        .any(|(k, v)| k == "sort" && v == "created_on"));
}

#[tokio::test]
async fn test_incremental_run_keeps_earlier_records() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "A"}, {"id": "B"}, {"id": "C"}]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "D"}]
        })))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();
    let args = CollectorArgs::new("pull_requests", "pull-requests")
        .query(QueryBuilder::incremental())
        .pagination(PaginationMode::CursorLink);
    let mut collector = collector(&server, &store);

    collector.collect(&args).await.unwrap();
    collector.collect(&args).await.unwrap();

    let mut data: Vec<String> = store
        .fetch_raw("pull_requests", &params())
        .unwrap()
        .into_iter()
        .map(|row| row.data)
        .collect();
    data.sort();
    assert_eq!(
        data,
        vec![r#"{"id":"A"}"#, r#"{"id":"B"}"#, r#"{"id":"C"}"#, r#"{"id":"D"}"#]
    );
}

#[tokio::test]
async fn test_full_sync_policy_ignores_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": []})))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();
    let args = CollectorArgs::new("pull_requests", "pull-requests")
        .query(QueryBuilder::incremental())
        .pagination(PaginationMode::Single);

    collector(&server, &store).collect(&args).await.unwrap();
    let mut full = collector(&server, &store).with_policy(SyncPolicy {
        full_sync: true,
        time_after: None,
    });
    full.collect(&args).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| !r.url.query_pairs().any(|(k, _)| k == "q")));
}

#[tokio::test]
async fn test_cancelled_run_leaves_state() {
    let server = MockServer::start().await;
    mount_commits(&server).await;
    let store = DuckDbStore::in_memory().unwrap();
    seed_branches(&store, &["main"]);

    let cancel = CancellationToken::new();
    cancel.cancel();
    let mut collector = collector(&server, &store).with_cancellation(cancel);
    let err = collector.collect(&commits_args(&store)).await.unwrap_err();

    assert!(matches!(err, Error::Cancelled));
    assert_eq!(collector.phase(), RunPhase::Failed);
    assert!(server.received_requests().await.unwrap().is_empty());
    let key = StateKey::new("commits", &params());
    assert!(StateStore::load(&store, &key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_undecodable_body_fails_with_context() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();

    let args = CollectorArgs::new("branches", "branches");
    let err = collector(&server, &store).collect(&args).await.unwrap_err();

    match err {
        Error::Decode { url, body, .. } => {
            assert!(url.contains("/branches"));
            assert_eq!(body, "<html>login</html>");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_file_state_store() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"values": [{"a": 1}]})))
        .mount(&server)
        .await;
    let store = DuckDbStore::in_memory().unwrap();
    let state = StateManager::in_memory();

    let mut collector = StatefulCollector::new(
        params(),
        client(&server),
        Arc::new(store.clone()),
        Arc::new(state.clone()),
    );
    let args = CollectorArgs::new("branches", "branches").pagination(PaginationMode::Single);
    collector.collect(&args).await.unwrap();

    let key = StateKey::new("branches", &params());
    assert!(StateStore::load(&state, &key).await.unwrap().is_some());
    assert!(StateStore::load(&store, &key).await.unwrap().is_none());
}

#[test]
fn test_args_validation() {
    let store = DuckDbStore::in_memory().unwrap();

    let unseeded = CollectorArgs::new("commits", COMMITS_URL);
    assert!(unseeded.validate().is_err());

    let seeded_without_binding = CollectorArgs::new("branches", "branches").input(Arc::new(
        SeedSource::new(store.clone(), SeedQuery::branches()),
    ));
    assert!(seeded_without_binding.validate().is_err());

    assert!(CollectorArgs::new("x", "x").page_size(0).validate().is_err());
    assert!(CollectorArgs::new("", "x").validate().is_err());
    assert!(commits_args(&store).validate().is_ok());
}

#[test]
fn test_run_phase() {
    assert_eq!(RunPhase::default(), RunPhase::Init);
    assert!(!RunPhase::Running.is_terminal());
    assert!(RunPhase::Completed.is_terminal());
    assert!(RunPhase::Failed.is_terminal());
    assert_eq!(RunPhase::Failed.to_string(), "failed");
}
