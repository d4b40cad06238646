//! # Store Registry
//!
//! Maps scope keys (a component or module name) to their `ConfigStore`.
//! Stores are created on first access and shared by every caller for the
//! lifetime of the registry; `reset` exists for test isolation.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use errors::{ConfigError, ConfigResult};
use tracing::{debug, warn};

use crate::locate::find_backing_file;
use crate::options::RegistryOptions;
use crate::resources::EmbeddedDefaults;
use crate::store::ConfigStore;

/// Scope key of the store shared independently of any component.
pub const GLOBAL_SCOPE: &str = "global";

/// File extension given to a backing file that does not exist yet.
const NEW_FILE_EXTENSION: &str = "json";

static GLOBAL: OnceLock<Registry> = OnceLock::new();

/// Concurrent cache of configuration stores keyed by scope.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Guarantees exactly one `ConfigStore` per scope, even when several threads
/// ask for the same scope at once.
///
/// ## Usage
/// ```rust,no_run
/// use config::{EmbeddedDefaults, Registry, RegistryOptions};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut defaults = EmbeddedDefaults::new();
///     defaults.register("billing", "billing/default.json", r#"{"currency": "EUR"}"#);
///
///     let registry = Registry::new(RegistryOptions::from_env()?, defaults);
///     let billing = registry.open("billing")?;
///     println!("{}", billing.effective().get("currency").as_str()?);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Registry {
    options: RegistryOptions,
    defaults: EmbeddedDefaults,
    stores: DashMap<String, Arc<ConfigStore>>,
}

impl Registry {
    pub fn new(options: RegistryOptions, defaults: EmbeddedDefaults) -> Self {
        Self {
            options,
            defaults,
            stores: DashMap::new(),
        }
    }

    /// Process-wide registry. Unless `init_global` ran first, it is built
    /// from `LAYERCONF_*` environment variables with no bundled defaults.
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(|| {
            let options = RegistryOptions::from_env().unwrap_or_else(|e| {
                warn!("Falling back to default registry options: {}", e);
                RegistryOptions::default()
            });
            Registry::new(options, EmbeddedDefaults::new())
        })
    }

    /// Install the process-wide registry. Fails if it was already built.
    pub fn init_global(
        options: RegistryOptions,
        defaults: EmbeddedDefaults,
    ) -> ConfigResult<&'static Registry> {
        let options = options.validated()?;
        GLOBAL
            .set(Registry::new(options, defaults))
            .map_err(|_| ConfigError::InvalidOptions {
                reason: "global registry already initialized".to_string(),
            })?;
        Ok(Self::global())
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    /// Store for `scope`, created with its bundled defaults on first access.
    ///
    /// Construction happens while the map entry is held, so concurrent first
    /// calls for one scope build a single store.
    ///
    /// ## Error Handling
    /// Returns `Parse` or `TypeMismatch` if the scope's bundled defaults are
    /// malformed; nothing is cached in that case.
    pub fn get_store(&self, scope: &str) -> ConfigResult<Arc<ConfigStore>> {
        if let Some(store) = self.stores.get(scope) {
            return Ok(Arc::clone(store.value()));
        }
        match self.stores.entry(scope.to_string()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let defaults = self.defaults.default_tree(scope)?;
                let store = ConfigStore::new(scope, defaults, self.options.store.clone())?;
                debug!("Created config store for '{}'", scope);
                Ok(Arc::clone(entry.insert(Arc::new(store)).value()))
            }
        }
    }

    pub fn global_store(&self) -> ConfigResult<Arc<ConfigStore>> {
        self.get_store(GLOBAL_SCOPE)
    }

    /// Store for `scope` with its backing file loaded (and watched, if the
    /// options say so). The file is loaded once, by the first call that
    /// finds no backing file bound; later calls return the store as is.
    ///
    /// The first existing `<stem>.conf`, `<stem>.json`, `<stem>.conf.json`
    /// or `<stem>.json.conf` in the search directory is used; when none
    /// exists the store is bound to `<stem>.json`, which `save` creates.
    ///
    /// ## Error Handling
    /// - `DirectoryNotFound` if the search directory is missing
    /// - anything `ConfigStore::load_and_watch` returns
    pub fn open(&self, scope: &str) -> ConfigResult<Arc<ConfigStore>> {
        let store = self.get_store(scope)?;
        let path = self.backing_path(scope)?;
        store.open_backing(&path)?;
        Ok(store)
    }

    pub fn open_global(&self) -> ConfigResult<Arc<ConfigStore>> {
        self.open(GLOBAL_SCOPE)
    }

    /// Backing file a scope resolves to in the search directory.
    pub fn backing_path(&self, scope: &str) -> ConfigResult<PathBuf> {
        let stem = self.file_stem(scope);
        let found = find_backing_file(&self.options.search_dir, stem)?;
        Ok(found.unwrap_or_else(|| {
            self.options
                .search_dir
                .join(format!("{stem}.{NEW_FILE_EXTENSION}"))
        }))
    }

    fn file_stem<'a>(&'a self, scope: &'a str) -> &'a str {
        if scope == GLOBAL_SCOPE {
            &self.options.global_file_stem
        } else {
            scope
        }
    }

    /// Scopes with a live store, sorted.
    pub fn scopes(&self) -> Vec<String> {
        let mut scopes: Vec<String> = self.stores.iter().map(|e| e.key().clone()).collect();
        scopes.sort();
        scopes
    }

    /// Drop every cached store and disarm its watcher. Callers still holding
    /// a store keep a working, unwatched instance.
    pub fn reset(&self) {
        let keys = self.scopes();
        let removed: Vec<Arc<ConfigStore>> = keys
            .iter()
            .filter_map(|k| self.stores.remove(k).map(|(_, store)| store))
            .collect();
        for store in &removed {
            store.stop_watching();
        }
        debug!("Registry reset, dropped {} stores", removed.len());
    }
}
