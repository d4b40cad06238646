//! # Configuration Store
//!
//! Holds the default layer and the effective (merged) tree of one scope,
//! persists user overrides to a backing file, and re-merges when that file is
//! edited externally.
//!
//! # Locking
//! - The effective tree sits behind a reader/writer lock as an `Arc`. Writers
//!   compute the merged tree first and only swap the `Arc` under the lock, so
//!   readers always see a complete old or new tree.
//! - Writers (`set_user_config`, reloads, `save`) are serialized among
//!   themselves so a persisted file always matches a tree that was swapped in.
//! - Change events go out through a broadcast channel after every lock is
//!   released; a slow subscriber never holds up the watcher thread.
//!
//! # Self-Write Suppression
//! `save` pauses the watcher around its own write and records a SHA-256
//! fingerprint of the bytes it wrote. A change event is ignored while the
//! watcher is paused, and a reload whose file content matches the last
//! applied fingerprint is a no-op, which also covers events that the
//! platform delivers after the pause has ended.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use errors::{ConfigError, ConfigResult};
use lc_core::{ConfigValue, ValueKind, merge};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::loader::{parse_text, render, write_atomic};
use crate::options::StoreOptions;
use crate::watch::{FileEvent, FileWatcher};

/// Notification sent to subscribers of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigEvent {
    /// The user layer was replaced programmatically
    Updated { scope: String },

    /// The backing file changed and was merged in
    Reloaded { scope: String, path: PathBuf },

    /// The backing file changed but could not be applied; the previous
    /// effective tree stays in place
    ReloadFailed {
        scope: String,
        path: PathBuf,
        error: String,
    },

    /// The backing file disappeared; the previous effective tree stays in
    /// place
    Removed { scope: String, path: PathBuf },
}

/// Lifecycle of a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    /// Holding only the default layer
    Uninitialized,

    /// Holding a user layer, no file watch armed
    Loaded,

    /// Backing file watched; `paused` while the store writes it
    Watching { paused: bool },
}

/// Layered configuration of one scope.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Keeps the effective configuration of a scope current: the bundled default
/// layer merged under a user layer that comes from a backing file or from
/// `set_user_config`.
///
/// ## Usage
/// ```rust,no_run
/// use std::path::Path;
/// use std::sync::Arc;
///
/// use config::{ConfigStore, StoreOptions};
/// use lc_core::ConfigValue;
/// use serde_json::json;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let defaults = ConfigValue::from_json(&json!({"port": 8080}), true);
///     let store = Arc::new(ConfigStore::new("api", defaults, StoreOptions::default())?);
///
///     store.load_and_watch(Path::new("api.json"))?;
///     let port = store.effective().get("port").as_int()?;
///     println!("listening on {port}");
///     Ok(())
/// }
/// ```
pub struct ConfigStore {
    scope: String,
    options: StoreOptions,
    defaults: Arc<ConfigValue>,
    effective: RwLock<Arc<ConfigValue>>,
    backing: RwLock<Option<PathBuf>>,
    watcher: Mutex<Option<FileWatcher>>,
    lifecycle: Mutex<()>,
    writer: Mutex<()>,
    loaded: AtomicBool,
    suspended: AtomicUsize,
    last_applied: Mutex<Option<String>>,
    events: broadcast::Sender<ConfigEvent>,
}

impl std::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigStore")
            .field("scope", &self.scope)
            .field("state", &self.state())
            .field("backing", &*self.backing.read())
            .finish()
    }
}

impl ConfigStore {
    /// Create a store over a default layer. Every node of `defaults` is
    /// tagged as default; an absent default layer becomes an empty mapping.
    ///
    /// ## Error Handling
    /// Returns `ConfigError::TypeMismatch` when `defaults` is not a mapping.
    pub fn new(
        scope: impl Into<String>,
        defaults: ConfigValue,
        options: StoreOptions,
    ) -> ConfigResult<Self> {
        let scope = scope.into();
        let defaults = match defaults {
            ConfigValue::Empty => ConfigValue::mapping(),
            tree if tree.is_mapping() => tree,
            other => {
                return Err(ConfigError::type_mismatch(
                    format!("{scope} defaults"),
                    ValueKind::Mapping,
                    other.kind(),
                ));
            }
        }
        .with_provenance(true);
        let defaults = Arc::new(defaults);
        let (events, _) = broadcast::channel(options.event_capacity.max(1));

        Ok(Self {
            scope,
            options,
            effective: RwLock::new(Arc::clone(&defaults)),
            defaults,
            backing: RwLock::new(None),
            watcher: Mutex::new(None),
            lifecycle: Mutex::new(()),
            writer: Mutex::new(()),
            loaded: AtomicBool::new(false),
            suspended: AtomicUsize::new(0),
            last_applied: Mutex::new(None),
            events,
        })
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn defaults(&self) -> Arc<ConfigValue> {
        Arc::clone(&self.defaults)
    }

    /// Current effective tree. The snapshot never changes; later writes swap
    /// in a new tree.
    pub fn effective(&self) -> Arc<ConfigValue> {
        Arc::clone(&self.effective.read())
    }

    /// The user layer of the effective tree: everything not sourced from
    /// defaults. This is what `save` writes.
    pub fn user_config(&self) -> ConfigValue {
        user_layer(&self.effective())
    }

    pub fn backing_file(&self) -> Option<PathBuf> {
        self.backing.read().clone()
    }

    pub fn state(&self) -> StoreState {
        if self.watcher.lock().is_some() {
            StoreState::Watching {
                paused: self.is_watch_suspended(),
            }
        } else if self.loaded.load(Ordering::Acquire) {
            StoreState::Loaded
        } else {
            StoreState::Uninitialized
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConfigEvent> {
        self.events.subscribe()
    }

    /// Replace the user layer and recompute the effective tree.
    ///
    /// Entries of `tree` that are tagged as default are ignored, so a caller
    /// may pass back a modified copy of `effective()`. When a backing file is
    /// configured the new user layer is persisted before it takes effect.
    ///
    /// ## Error Handling
    /// - `TypeMismatch` if `tree` is not a mapping or collides with the
    ///   default layer on incompatible kinds
    /// - `Io` if persisting fails
    ///
    /// On error the effective tree is unchanged and no event is sent.
    pub fn set_user_config(&self, tree: ConfigValue) -> ConfigResult<()> {
        let user = tree.without_defaults();
        if user.is_present() && !user.is_mapping() {
            return Err(ConfigError::type_mismatch(
                format!("{} user layer", self.scope),
                ValueKind::Mapping,
                user.kind(),
            ));
        }
        let merged = merge(&user, &self.defaults)?;

        {
            let _writer = self.writer.lock();
            if let Some(path) = self.backing_file() {
                self.persist(&path, &user_layer(&merged))?;
            }
            *self.effective.write() = Arc::new(merged);
            self.loaded.store(true, Ordering::Release);
        }

        debug!("Updated user layer of '{}'", self.scope);
        self.notify(ConfigEvent::Updated {
            scope: self.scope.clone(),
        });
        Ok(())
    }

    /// Load `path` as the user layer and, if enabled, watch it for edits.
    ///
    /// A missing file means no overrides yet: the effective tree is the
    /// default layer and the file is picked up once it is created. Calling
    /// this again switches the store to the new path.
    ///
    /// ## Error Handling
    /// - `Parse` for malformed file content
    /// - `Io` if the file exists but cannot be read
    /// - `TypeMismatch` if the file collides with the default layer
    /// - `Watch` if the watcher cannot be armed; the loaded tree stays
    pub fn load_and_watch(self: &Arc<Self>, path: &Path) -> ConfigResult<()> {
        let _lifecycle = self.lifecycle.lock();
        self.load_and_watch_locked(path)
    }

    /// `load_and_watch`, unless a backing file is already bound.
    ///
    /// A user layer set in memory before any file was bound was never
    /// persisted; the file's content replaces it.
    pub fn open_backing(self: &Arc<Self>, path: &Path) -> ConfigResult<()> {
        let _lifecycle = self.lifecycle.lock();
        if self.backing.read().is_some() {
            return Ok(());
        }
        self.load_and_watch_locked(path)
    }

    fn load_and_watch_locked(self: &Arc<Self>, path: &Path) -> ConfigResult<()> {
        {
            let _writer = self.writer.lock();
            let (merged, fingerprint) = if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, &e))?;
                (self.merge_text(&text, path)?, Some(fingerprint(&text)))
            } else {
                debug!("No backing file at {:?} yet, using defaults", path);
                (ConfigValue::clone(&self.defaults), None)
            };
            *self.effective.write() = Arc::new(merged);
            *self.last_applied.lock() = fingerprint;
            *self.backing.write() = Some(path.to_path_buf());
            self.loaded.store(true, Ordering::Release);
        }
        info!("Loaded '{}' from {:?}", self.scope, path);

        let previous = self.watcher.lock().take();
        drop(previous);

        if self.options.watch {
            let weak: Weak<Self> = Arc::downgrade(self);
            let watcher = FileWatcher::start(path, move |event| {
                if let Some(store) = weak.upgrade() {
                    store.handle_file_event(event);
                }
            })?;
            *self.watcher.lock() = Some(watcher);
        }
        Ok(())
    }

    /// Disarm the file watcher. The backing file stays configured for `save`.
    pub fn stop_watching(&self) {
        let _lifecycle = self.lifecycle.lock();
        let previous = self.watcher.lock().take();
        if previous.is_some() {
            info!("Stopped watching config for '{}'", self.scope);
        }
    }

    /// Re-read the backing file and swap in the merged tree.
    ///
    /// Returns `Ok(false)` when there is no backing file, the file is gone,
    /// or its content is what the store last applied or wrote itself.
    pub fn reload(&self) -> ConfigResult<bool> {
        let Some(path) = self.backing_file() else {
            return Ok(false);
        };
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(ConfigError::io(&path, &e)),
        };
        let fingerprint = fingerprint(&text);

        {
            let _writer = self.writer.lock();
            if self.last_applied.lock().as_deref() == Some(fingerprint.as_str()) {
                debug!("Content of {:?} already applied, skipping reload", path);
                return Ok(false);
            }
            let merged = self.merge_text(&text, &path)?;
            *self.effective.write() = Arc::new(merged);
            *self.last_applied.lock() = Some(fingerprint);
        }

        info!("Reloaded '{}' from {:?}", self.scope, path);
        self.notify(ConfigEvent::Reloaded {
            scope: self.scope.clone(),
            path,
        });
        Ok(true)
    }

    /// Write the user layer to the backing file. Without a backing file this
    /// does nothing.
    pub fn save(&self) -> ConfigResult<()> {
        let Some(path) = self.backing_file() else {
            debug!("No backing file for '{}', nothing to save", self.scope);
            return Ok(());
        };
        let _writer = self.writer.lock();
        self.persist(&path, &self.user_config())
    }

    /// Write `user` to `path` with the watcher paused. Caller must hold
    /// `writer`.
    fn persist(&self, path: &Path, user: &ConfigValue) -> ConfigResult<()> {
        let text = render(user)?;
        let _pause = self.pause_watch();
        write_atomic(path, &text)?;
        *self.last_applied.lock() = Some(fingerprint(&text));
        info!("Saved '{}' to {:?}", self.scope, path);
        Ok(())
    }

    /// Ignore change events until a matching `resume_watch`. Calls nest.
    pub fn suspend_watch(&self) {
        self.suspended.fetch_add(1, Ordering::AcqRel);
    }

    pub fn resume_watch(&self) {
        let _ = self
            .suspended
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    /// Suspend the watcher until the returned guard is dropped.
    pub fn pause_watch(&self) -> WatchPause<'_> {
        self.suspend_watch();
        WatchPause { store: self }
    }

    pub fn is_watch_suspended(&self) -> bool {
        self.suspended.load(Ordering::Acquire) > 0
    }

    fn handle_file_event(&self, event: FileEvent) {
        if self.is_watch_suspended() {
            debug!("Watch suspended for '{}', ignoring {:?}", self.scope, event);
            return;
        }
        match event {
            FileEvent::Changed(path) => match self.reload() {
                Ok(_) => {}
                Err(e) => {
                    if e.is_transient() {
                        warn!("Keeping previous config for '{}': {}", self.scope, e);
                    } else {
                        error!("Failed to reload config for '{}': {}", self.scope, e);
                    }
                    self.notify(ConfigEvent::ReloadFailed {
                        scope: self.scope.clone(),
                        path,
                        error: e.to_string(),
                    });
                }
            },
            FileEvent::Removed(path) => {
                self.notify(ConfigEvent::Removed {
                    scope: self.scope.clone(),
                    path,
                });
            }
        }
    }

    fn merge_text(&self, text: &str, path: &Path) -> ConfigResult<ConfigValue> {
        let user = parse_text(text, &path.display().to_string(), false)?;
        if user.is_present() && !user.is_mapping() {
            return Err(ConfigError::parse(
                path.display().to_string(),
                format!("expected a JSON object, found {}", user.kind()),
            ));
        }
        merge(&user, &self.defaults)
    }

    fn notify(&self, event: ConfigEvent) {
        // No subscribers is not an error.
        let _ = self.events.send(event);
    }
}

/// Guard returned by [`ConfigStore::pause_watch`].
#[must_use = "the watcher resumes as soon as the guard is dropped"]
pub struct WatchPause<'a> {
    store: &'a ConfigStore,
}

impl Drop for WatchPause<'_> {
    fn drop(&mut self) {
        self.store.resume_watch();
    }
}

/// Non-default part of a tree, as an empty mapping when nothing is left.
fn user_layer(tree: &ConfigValue) -> ConfigValue {
    match tree.without_defaults() {
        ConfigValue::Empty => ConfigValue::mapping(),
        user => user,
    }
}

fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
