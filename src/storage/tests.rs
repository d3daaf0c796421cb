//! Tests for the DuckDB store

use super::*;
use crate::state::{StateKey, StateStore, StoredState};
use crate::types::{CollectionParams, RawRecord, SeedInput, SeedKind};
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::value::RawValue;
use tempfile::tempdir;

fn params() -> CollectionParams {
    CollectionParams::new(1, "PROJ/repos/app")
}

fn record(input: Option<SeedInput>, page: u32, body: &str) -> RawRecord {
    RawRecord {
        params: params(),
        input,
        page,
        url: format!("https://host/x?page={page}"),
        data: RawValue::from_string(body.to_string()).unwrap(),
    }
}

#[tokio::test]
async fn test_save_and_fetch_raw() {
    let store = DuckDbStore::in_memory().unwrap();
    let branch = Some(SeedInput::Branch("main".to_string()));

    let saved = RawStore::save(
        &store,
        "commits",
        &[
            record(branch.clone(), 1, r#"{"id":"a"}"#),
            record(branch.clone(), 1, r#"{"id":"b"}"#),
        ],
    )
    .await
    .unwrap();
    assert_eq!(saved, 2);

    let rows = store.fetch_raw("commits", &params()).unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].input, r#"{"Branch":"main"}"#);
    assert_eq!(rows[0].params, params().to_json());
    assert_eq!(rows[0].page, 1);
    assert_eq!(rows[0].position, 0);
    assert_eq!(rows[1].position, 1);
    assert_eq!(rows[1].data, r#"{"id":"b"}"#);
    assert_eq!(rows[0].url, "https://host/x?page=1");
}

#[tokio::test]
async fn test_raw_data_is_verbatim() {
    let store = DuckDbStore::in_memory().unwrap();
    let body = r#"{ "b": 1,  "a": [1, 2.50] }"#;
    RawStore::save(&store, "branches", &[record(None, 1, body)])
        .await
        .unwrap();

    let rows = store.fetch_raw("branches", &params()).unwrap();
    assert_eq!(rows[0].data, body);
    assert_eq!(rows[0].input, "null");
}

#[tokio::test]
async fn test_resaving_same_documents_is_idempotent() {
    let store = DuckDbStore::in_memory().unwrap();
    let page = [record(None, 1, r#"{"v":1}"#), record(None, 1, r#"{"v":2}"#)];

    RawStore::save(&store, "branches", &page).await.unwrap();
    RawStore::save(&store, "branches", &page).await.unwrap();
    assert_eq!(store.count_raw("branches").unwrap(), 2);
}

#[tokio::test]
async fn test_new_documents_on_same_page_are_appended() {
    let store = DuckDbStore::in_memory().unwrap();
    let first = [
        record(None, 1, r#"{"id":"A"}"#),
        record(None, 1, r#"{"id":"B"}"#),
        record(None, 1, r#"{"id":"C"}"#),
    ];
    RawStore::save(&store, "pull_requests", &first).await.unwrap();
    RawStore::save(&store, "pull_requests", &[record(None, 1, r#"{"id":"D"}"#)])
        .await
        .unwrap();

    let mut data: Vec<String> = store
        .fetch_raw("pull_requests", &params())
        .unwrap()
        .into_iter()
        .map(|row| row.data)
        .collect();
    data.sort();
    assert_eq!(
        data,
        vec![
            r#"{"id":"A"}"#,
            r#"{"id":"B"}"#,
            r#"{"id":"C"}"#,
            r#"{"id":"D"}"#
        ]
    );
}

#[tokio::test]
async fn test_same_document_under_other_seed_is_kept() {
    let store = DuckDbStore::in_memory().unwrap();
    let body = r#"{"id":"shared"}"#;
    RawStore::save(
        &store,
        "commits",
        &[
            record(Some(SeedInput::Branch("main".to_string())), 1, body),
            record(Some(SeedInput::Branch("dev".to_string())), 1, body),
        ],
    )
    .await
    .unwrap();
    assert_eq!(store.count_raw("commits").unwrap(), 2);
}

#[tokio::test]
async fn test_empty_page_creates_nothing() {
    let store = DuckDbStore::in_memory().unwrap();
    assert_eq!(RawStore::save(&store, "branches", &[]).await.unwrap(), 0);
    assert_eq!(store.count_raw("branches").unwrap(), 0);
    assert!(store.fetch_raw("branches", &params()).unwrap().is_empty());
}

#[test]
fn test_invalid_table_name_rejected() {
    let store = DuckDbStore::in_memory().unwrap();
    assert!(store.ensure_raw_table("x; DROP TABLE y").is_err());
    assert!(store.ensure_raw_table("Commits").is_err());
    assert_eq!(
        store.ensure_raw_table("bitbucket_server_api_commits").unwrap(),
        "_raw_bitbucket_server_api_commits"
    );
}

#[tokio::test]
async fn test_state_round_trip() {
    let store = DuckDbStore::in_memory().unwrap();
    let key = StateKey::new("commits", &params());
    assert!(StateStore::load(&store, &key).await.unwrap().is_none());

    let state = StoredState {
        latest_success_start: Utc.with_ymd_and_hms(2024, 3, 4, 5, 6, 7).unwrap(),
        time_after: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
    };
    StateStore::save(&store, &key, &state).await.unwrap();
    assert_eq!(StateStore::load(&store, &key).await.unwrap(), Some(state));

    let newer = StoredState {
        latest_success_start: Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap(),
        time_after: None,
    };
    StateStore::save(&store, &key, &newer).await.unwrap();
    assert_eq!(StateStore::load(&store, &key).await.unwrap(), Some(newer));
}

#[test]
fn test_upsert_and_count_seeds() {
    let store = DuckDbStore::in_memory().unwrap();
    let other = CollectionParams::new(2, "PROJ/repos/app");

    store
        .upsert_seed(&params(), &SeedInput::Branch("main".to_string()), None)
        .unwrap();
    store
        .upsert_seed(&params(), &SeedInput::Branch("main".to_string()), None)
        .unwrap();
    store
        .upsert_seed(&other, &SeedInput::Branch("dev".to_string()), None)
        .unwrap();
    store
        .upsert_seed(&params(), &SeedInput::BitbucketId(9), Some(Utc::now()))
        .unwrap();

    assert_eq!(store.count_seeds(&params(), SeedKind::Branch).unwrap(), 1);
    assert_eq!(store.count_seeds(&other, SeedKind::Branch).unwrap(), 1);
    assert_eq!(store.count_seeds(&params(), SeedKind::BitbucketId).unwrap(), 1);
    assert_eq!(store.count_seeds(&params(), SeedKind::CommitSha).unwrap(), 0);
}

#[tokio::test]
async fn test_file_database_persists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scm.duckdb");
    let key = StateKey::new("branches", &params());
    let state = StoredState {
        latest_success_start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        time_after: None,
    };

    {
        let store = DuckDbStore::open(&path).unwrap();
        RawStore::save(&store, "branches", &[record(None, 1, "{}")])
            .await
            .unwrap();
        StateStore::save(&store, &key, &state).await.unwrap();
    }

    let store = DuckDbStore::open(&path).unwrap();
    assert_eq!(store.count_raw("branches").unwrap(), 1);
    assert_eq!(StateStore::load(&store, &key).await.unwrap(), Some(state));
}
