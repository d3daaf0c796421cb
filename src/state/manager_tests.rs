//! Tests for StateManager

use super::*;
use crate::types::CollectionParams;
use chrono::{TimeZone, Utc};
use tempfile::tempdir;

fn key(table: &str) -> StateKey {
    StateKey::new(table, &CollectionParams::new(1, "PROJ/repos/app"))
}

fn stored(hour: u32) -> StoredState {
    StoredState {
        latest_success_start: Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap(),
        time_after: None,
    }
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path(), Some(std::path::Path::new("/tmp/test-state.json")));
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
    assert!(manager.path().is_none());
}

#[test]
fn test_from_missing_file_is_empty() {
    let dir = tempdir().unwrap();
    let manager = StateManager::from_file(dir.path().join("none.json")).unwrap();
    assert!(!manager.is_in_memory());
}

#[test]
fn test_from_corrupt_file_fails() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, "not json").unwrap();

    let err = StateManager::from_file(&path).unwrap_err();
    assert!(err.to_string().contains("Failed to parse state file"));
}

// ============================================================================
// StateStore Tests
// ============================================================================

#[tokio::test]
async fn test_load_save_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.load(&key("commits")).await.unwrap().is_none());

    manager.save(&key("commits"), &stored(1)).await.unwrap();
    assert_eq!(manager.load(&key("commits")).await.unwrap(), Some(stored(1)));
    assert!(manager.load(&key("branches")).await.unwrap().is_none());

    manager.save(&key("commits"), &stored(2)).await.unwrap();
    assert_eq!(manager.load(&key("commits")).await.unwrap(), Some(stored(2)));
}

#[tokio::test]
async fn test_keys_are_scoped_by_params() {
    let manager = StateManager::in_memory();
    let other = StateKey::new("commits", &CollectionParams::new(2, "PROJ/repos/app"));

    manager.save(&key("commits"), &stored(1)).await.unwrap();
    assert!(manager.load(&other).await.unwrap().is_none());
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::from_file(&path).unwrap();
    manager.save(&key("commits"), &stored(5)).await.unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("tmp").exists());

    let reopened = StateManager::from_file(&path).unwrap();
    assert_eq!(reopened.load(&key("commits")).await.unwrap(), Some(stored(5)));
}

#[tokio::test]
async fn test_load_file_refreshes_cache() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let reader = StateManager::new(&path);
    let writer = StateManager::new(&path);
    writer.save(&key("commits"), &stored(7)).await.unwrap();

    assert!(reader.load(&key("commits")).await.unwrap().is_none());
    reader.load_file().await.unwrap();
    assert_eq!(reader.load(&key("commits")).await.unwrap(), Some(stored(7)));
}

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let clone = manager.clone();

    manager.save(&key("commits"), &stored(3)).await.unwrap();
    assert_eq!(clone.load(&key("commits")).await.unwrap(), Some(stored(3)));
    assert_eq!(clone.snapshot().await.collectors.len(), 1);
}

#[tokio::test]
async fn test_pretty_json_shape() {
    let manager = StateManager::in_memory();
    manager.save(&key("commits"), &stored(0)).await.unwrap();
    let json = manager.to_json_pretty().await.unwrap();
    assert!(json.contains("\"collectors\""));
    assert!(json.contains("latest_success_start"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_saves_from_clones() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let manager = StateManager::new(&path);

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let manager = manager.clone();
            tokio::spawn(async move {
                manager
                    .save(&key(&format!("collector_{i}")), &stored(i % 24))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert!(!path.with_extension("tmp").exists());
    let reopened = StateManager::from_file(&path).unwrap();
    assert_eq!(reopened.snapshot().await.collectors.len(), 32);
    assert_eq!(
        reopened.load(&key("collector_31")).await.unwrap(),
        Some(stored(7))
    );
}
