use std::fs;
use std::sync::Arc;

use config::{
    ConfigError, EmbeddedDefaults, GLOBAL_SCOPE, Registry, RegistryOptions, StoreOptions,
};
use serial_test::serial;
use tempfile::TempDir;

fn init(dir: &TempDir) -> &'static Registry {
    fs::write(dir.path().join("settings.conf"), "{\"locale\": \"de\"}").unwrap();
    let mut defaults = EmbeddedDefaults::new();
    defaults.register(GLOBAL_SCOPE, "default.json", r#"{"locale": "en", "tz": "UTC"}"#);
    Registry::init_global(
        RegistryOptions {
            search_dir: dir.path().to_path_buf(),
            store: StoreOptions {
                watch: false,
                ..Default::default()
            },
            ..Default::default()
        },
        defaults,
    )
    .unwrap()
}

#[test]
#[serial]
fn test_global_registry_lifecycle() {
    let dir = TempDir::new().unwrap();
    let registry = init(&dir);
    assert!(std::ptr::eq(registry, Registry::global()));

    let second = Registry::init_global(RegistryOptions::default(), EmbeddedDefaults::new());
    assert!(matches!(second, Err(ConfigError::InvalidOptions { .. })));

    let store = Registry::global().open_global().unwrap();
    assert_eq!(store.effective().get("locale").as_str().unwrap(), "de");
    assert_eq!(store.effective().get("tz").as_str().unwrap(), "UTC");
    assert!(Arc::ptr_eq(&store, &Registry::global().global_store().unwrap()));

    Registry::global().reset();
    assert!(Registry::global().scopes().is_empty());

    let fresh = Registry::global().get_store(GLOBAL_SCOPE).unwrap();
    assert!(!Arc::ptr_eq(&store, &fresh));
    assert_eq!(fresh.effective().get("locale").as_str().unwrap(), "en");
}
