use std::fs;
use std::sync::Arc;
use std::time::Duration;

use config::loader::write_atomic;
use config::{ConfigEvent, ConfigStore, StoreOptions, StoreState};
use lc_core::ConfigValue;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::broadcast;

fn watched_store(defaults: serde_json::Value) -> Arc<ConfigStore> {
    Arc::new(
        ConfigStore::new(
            "app",
            ConfigValue::from_json(&defaults, true),
            StoreOptions::default(),
        )
        .unwrap(),
    )
}

async fn next_event(rx: &mut broadcast::Receiver<ConfigEvent>) -> ConfigEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("Timeout waiting for config event")
        .expect("Event channel closed")
}

/// Wait until the store reports a reload, skipping failures caused by
/// observing a partially written file.
async fn next_reload(rx: &mut broadcast::Receiver<ConfigEvent>) -> ConfigEvent {
    loop {
        match next_event(rx).await {
            ConfigEvent::ReloadFailed { .. } => continue,
            event => return event,
        }
    }
}

#[tokio::test]
async fn test_external_edit_is_merged_and_notified() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    fs::write(&path, r#"{"port": 9000}"#).unwrap();

    let store = watched_store(json!({"port": 8080, "host": "localhost"}));
    store.load_and_watch(&path).unwrap();
    assert_eq!(store.state(), StoreState::Watching { paused: false });
    let mut rx = store.subscribe();

    write_atomic(&path, r#"{"port": 9100}"#).unwrap();

    let event = next_reload(&mut rx).await;
    assert_eq!(
        event,
        ConfigEvent::Reloaded {
            scope: "app".to_string(),
            path: path.clone()
        }
    );
    let effective = store.effective();
    assert_eq!(effective.get("port").as_int().unwrap(), 9100);
    assert_eq!(effective.get("host").as_str().unwrap(), "localhost");
}

#[tokio::test]
async fn test_invalid_edit_keeps_watching() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_atomic(&path, r#"{"level": "info"}"#).unwrap();

    let store = watched_store(json!({}));
    store.load_and_watch(&path).unwrap();
    let mut rx = store.subscribe();

    write_atomic(&path, r#"{"level": "#).unwrap();
    match next_event(&mut rx).await {
        ConfigEvent::ReloadFailed { path: failed, .. } => assert_eq!(failed, path),
        other => panic!("Expected ReloadFailed event, got {:?}", other),
    }
    assert_eq!(store.effective().get("level").as_str().unwrap(), "info");

    write_atomic(&path, r#"{"level": "debug"}"#).unwrap();
    assert!(matches!(
        next_reload(&mut rx).await,
        ConfigEvent::Reloaded { .. }
    ));
    assert_eq!(store.effective().get("level").as_str().unwrap(), "debug");
}

#[tokio::test]
async fn test_own_save_does_not_trigger_reload() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    fs::write(&path, "{}").unwrap();

    let store = watched_store(json!({"a": 1}));
    store.load_and_watch(&path).unwrap();
    let mut rx = store.subscribe();

    store
        .set_user_config(ConfigValue::from(json!({"b": 2})))
        .unwrap();
    assert_eq!(
        next_event(&mut rx).await,
        ConfigEvent::Updated {
            scope: "app".to_string()
        }
    );

    // Give the platform time to deliver the events of our own write.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(matches!(
        rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));

    // Change detection is armed again for external edits.
    write_atomic(&path, r#"{"b": 3}"#).unwrap();
    assert!(matches!(
        next_reload(&mut rx).await,
        ConfigEvent::Reloaded { .. }
    ));
    assert_eq!(store.effective().get("b").as_int().unwrap(), 3);
}

#[tokio::test]
async fn test_file_created_after_load_is_picked_up() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");

    let store = watched_store(json!({"mode": "default"}));
    store.load_and_watch(&path).unwrap();
    let mut rx = store.subscribe();

    write_atomic(&path, r#"{"mode": "custom"}"#).unwrap();

    assert!(matches!(
        next_reload(&mut rx).await,
        ConfigEvent::Reloaded { .. }
    ));
    assert_eq!(store.effective().get("mode").as_str().unwrap(), "custom");
}

#[tokio::test]
async fn test_removed_file_keeps_last_tree() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_atomic(&path, r#"{"mode": "custom"}"#).unwrap();

    let store = watched_store(json!({"mode": "default"}));
    store.load_and_watch(&path).unwrap();
    let mut rx = store.subscribe();

    fs::remove_file(&path).unwrap();

    assert!(matches!(
        next_reload(&mut rx).await,
        ConfigEvent::Removed { .. }
    ));
    assert_eq!(store.effective().get("mode").as_str().unwrap(), "custom");
}

#[tokio::test]
async fn test_stop_watching_disarms() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    write_atomic(&path, r#"{"a": 1}"#).unwrap();

    let store = watched_store(json!({}));
    store.load_and_watch(&path).unwrap();
    store.stop_watching();
    assert_eq!(store.state(), StoreState::Loaded);
    let mut rx = store.subscribe();

    write_atomic(&path, r#"{"a": 2}"#).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(rx.try_recv().is_err());
    assert_eq!(store.effective().get("a").as_int().unwrap(), 1);
}
