//! Tests for StateManager

use super::*;
use std::path::Path;
use tempfile::tempdir;

fn bundle(id: &str) -> CursorState {
    CursorState::BundleId(id.to_string())
}

// ============================================================================
// Construction Tests
// ============================================================================

#[test]
fn test_state_manager_new() {
    let manager = StateManager::new("/tmp/test-state.json");
    assert!(!manager.is_in_memory());
    assert_eq!(manager.path(), Some(Path::new("/tmp/test-state.json")));
}

#[test]
fn test_state_manager_in_memory() {
    let manager = StateManager::in_memory();
    assert!(manager.is_in_memory());
    assert!(manager.path().is_none());
}

#[tokio::test]
async fn test_state_manager_from_json() {
    let manager =
        StateManager::from_json(r#"{"streams": {"pool_0": {"offset": "41"}}}"#).unwrap();

    assert!(manager.is_in_memory());
    assert_eq!(manager.get_cursor("pool_0").await, Some(bundle("41")));
}

#[test]
fn test_state_manager_from_json_invalid() {
    assert!(StateManager::from_json("{ not json").is_err());
}

#[tokio::test]
async fn test_state_manager_from_empty_json() {
    let manager = StateManager::from_json("  ").unwrap();
    assert!(manager.snapshot().await.streams.is_empty());
}

#[tokio::test]
async fn test_state_manager_from_state() {
    let mut state = State::new();
    state.set_cursor("pool_2", CursorState::Offset(300));

    let manager = StateManager::from_state(state.clone());
    assert!(manager.is_in_memory());
    assert_eq!(manager.snapshot().await, state);
}

// ============================================================================
// Cursor Tests
// ============================================================================

#[tokio::test]
async fn test_get_set_cursor() {
    let manager = StateManager::in_memory();

    assert!(manager.get_cursor("pool_0").await.is_none());

    manager
        .set_cursor("pool_0", CursorState::Offset(100))
        .await
        .unwrap();
    assert_eq!(
        manager.get_cursor("pool_0").await,
        Some(CursorState::Offset(100))
    );

    manager.set_cursor("pool_0", bundle("57")).await.unwrap();
    assert_eq!(manager.get_cursor("pool_0").await, Some(bundle("57")));
}

#[tokio::test]
async fn test_multiple_stream_cursors() {
    let manager = StateManager::in_memory();

    manager.set_cursor("pool_0", bundle("1")).await.unwrap();
    manager.set_cursor("pool_7", bundle("99")).await.unwrap();

    assert_eq!(manager.get_cursor("pool_0").await, Some(bundle("1")));
    assert_eq!(manager.get_cursor("pool_7").await, Some(bundle("99")));
}

// ============================================================================
// Persistence Tests
// ============================================================================

#[tokio::test]
async fn test_auto_save_and_load() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let manager = StateManager::new(&path);
    manager.set_cursor("pool_0", bundle("12")).await.unwrap();

    let manager2 = StateManager::new(&path);
    manager2.load().await.unwrap();

    assert_eq!(manager2.get_cursor("pool_0").await, Some(bundle("12")));
    assert!(!dir.path().join("state.tmp").exists());
}

#[tokio::test]
async fn test_from_file_existing_and_missing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");

    let missing = StateManager::from_file(&path).unwrap();
    assert!(missing.get_cursor("pool_0").await.is_none());

    std::fs::write(&path, r#"{"streams": {"pool_0": {"offset": 200}}}"#).unwrap();
    let existing = StateManager::from_file(&path).unwrap();
    assert_eq!(
        existing.get_cursor("pool_0").await,
        Some(CursorState::Offset(200))
    );
}

#[tokio::test]
async fn test_load_nonexistent_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nonexistent.json");

    let manager = StateManager::new(&path);
    manager.load().await.unwrap();

    assert!(manager.get_cursor("pool_0").await.is_none());
}

#[tokio::test]
async fn test_save_in_memory_noop() {
    let manager = StateManager::in_memory();
    manager.set_cursor("pool_0", bundle("3")).await.unwrap();
    manager.save().await.unwrap();
}

#[tokio::test]
async fn test_save_to_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exported.json");

    let manager = StateManager::in_memory();
    manager.set_cursor("pool_2", bundle("8")).await.unwrap();
    manager.save_to_file(&path).await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["streams"]["pool_2"]["offset"], "8");
}

#[tokio::test]
async fn test_save_and_clear_persist() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cleared_state.json");

    let manager = StateManager::new(&path);
    manager
        .set_cursor("pool_0", CursorState::Offset(10))
        .await
        .unwrap();
    manager.save().await.unwrap();

    let manager2 = StateManager::from_file(&path).unwrap();
    assert_eq!(
        manager2.get_cursor("pool_0").await,
        Some(CursorState::Offset(10))
    );

    manager.clear().await.unwrap();
    let manager3 = StateManager::from_file(&path).unwrap();
    assert!(manager3.snapshot().await.streams.is_empty());
}

#[tokio::test]
async fn test_load_invalid_json() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("invalid.json");

    tokio::fs::write(&path, "{ invalid json }").await.unwrap();

    let manager = StateManager::new(&path);
    assert!(manager.load().await.is_err());
}

// ============================================================================
// Clear Tests
// ============================================================================

#[tokio::test]
async fn test_clear_all() {
    let manager = StateManager::in_memory();

    manager.set_cursor("pool_0", bundle("1")).await.unwrap();
    manager.set_cursor("pool_1", bundle("2")).await.unwrap();

    manager.clear().await.unwrap();

    assert!(manager.get_cursor("pool_0").await.is_none());
    assert!(manager.get_cursor("pool_1").await.is_none());
}

#[tokio::test]
async fn test_clear_stream() {
    let manager = StateManager::in_memory();

    manager.set_cursor("pool_0", bundle("1")).await.unwrap();
    manager.set_cursor("pool_1", bundle("2")).await.unwrap();

    manager.clear_stream("pool_0").await.unwrap();

    assert!(manager.get_cursor("pool_0").await.is_none());
    assert_eq!(manager.get_cursor("pool_1").await, Some(bundle("2")));
}

// ============================================================================
// Sharing Tests
// ============================================================================

#[tokio::test]
async fn test_clone_shares_state() {
    let manager = StateManager::in_memory();
    let cloned = manager.clone();

    manager.set_cursor("pool_0", bundle("5")).await.unwrap();

    assert_eq!(cloned.get_cursor("pool_0").await, Some(bundle("5")));
    assert_eq!(
        cloned.state().await.get_cursor("pool_0"),
        Some(&bundle("5"))
    );
}

#[tokio::test]
async fn test_to_json() {
    let manager = StateManager::in_memory();
    manager
        .set_cursor("pool_0", CursorState::Offset(0))
        .await
        .unwrap();

    let json = manager.to_json().await.unwrap();
    assert_eq!(json, r#"{"streams":{"pool_0":{"offset":0}}}"#);
}
