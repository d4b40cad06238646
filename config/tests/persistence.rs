use std::fs;
use std::sync::Arc;
use std::thread;

use config::{ConfigStore, StoreOptions};
use lc_core::ConfigValue;
use serde_json::json;
use tempfile::TempDir;

fn options() -> StoreOptions {
    StoreOptions {
        watch: false,
        ..Default::default()
    }
}

fn store(defaults: serde_json::Value) -> Arc<ConfigStore> {
    Arc::new(ConfigStore::new("app", ConfigValue::from_json(&defaults, true), options()).unwrap())
}

#[test]
fn test_save_then_reload_round_trips_user_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    let defaults = json!({
        "server": {"host": "localhost", "port": 8080},
        "features": ["search"],
        "plugins": {"audit": true}
    });

    let first = store(defaults.clone());
    first.load_and_watch(&path).unwrap();
    first
        .set_user_config(ConfigValue::from(json!({
            "server": {"port": 9090},
            "features": ["export"],
            "plugins": {}
        })))
        .unwrap();
    let user_before = first.user_config();

    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written,
        json!({"server": {"port": 9090}, "features": ["export"], "plugins": {}})
    );

    let second = store(defaults);
    second.load_and_watch(&path).unwrap();

    assert_eq!(second.user_config(), user_before);
    assert_eq!(second.effective(), first.effective());
    assert_eq!(
        second.effective().get("features").to_json(),
        json!(["export", "search"])
    );

    // Saving again does not grow the concatenated list.
    second.save().unwrap();
    let third = store(json!({"features": ["search"]}));
    third.load_and_watch(&path).unwrap();
    assert_eq!(third.effective().get("features").as_list().unwrap().len(), 2);
}

#[test]
fn test_default_entries_never_reach_the_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.json");
    let store = store(json!({"secret_default": "x", "nested": {"keep": 1}}));
    store.load_and_watch(&path).unwrap();

    store.save().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(!text.contains("secret_default"));
    assert!(!text.contains("nested"));
    assert_eq!(serde_json::from_str::<serde_json::Value>(&text).unwrap(), json!({}));
}

#[test]
fn test_comments_in_user_file_are_accepted() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("app.conf");
    fs::write(
        &path,
        "# deployment overrides\n{\n  # bigger pool in prod\n  \"pool\": 32\n}\n",
    )
    .unwrap();

    let store = store(json!({"pool": 4}));
    store.load_and_watch(&path).unwrap();
    assert_eq!(store.effective().get("pool").as_int().unwrap(), 32);
}

#[test]
fn test_concurrent_writers_never_expose_partial_tree() {
    let store = store(json!({"base": true}));
    store
        .set_user_config(ConfigValue::from(json!({"a": 0, "b": 0, "c": {"d": 0}})))
        .unwrap();
    let writers: Vec<_> = (0..8_i64)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for round in 0..50_i64 {
                    let n = i * 1000 + round;
                    store
                        .set_user_config(ConfigValue::from(json!({"a": n, "b": n, "c": {"d": n}})))
                        .unwrap();
                }
            })
        })
        .collect();
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let tree = store.effective();
                    let a = tree.get("a").as_int().unwrap();
                    assert_eq!(tree.get("b").as_int().unwrap(), a);
                    assert_eq!(tree.path("c.d").as_int().unwrap(), a);
                    assert!(tree.get("base").as_bool().unwrap());
                }
            })
        })
        .collect();

    for handle in writers.into_iter().chain(readers) {
        handle.join().unwrap();
    }
}
