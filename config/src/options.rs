//! # Runtime Options
//!
//! Options controlling where stores look for backing files, whether they
//! watch them, and how change notifications are buffered.
//!
//! # Environment Variables
//! - `LAYERCONF_DIR`: directory searched for backing files (default: `.`)
//! - `LAYERCONF_WATCH`: arm file watchers (true/false, default: true)
//! - `LAYERCONF_GLOBAL_STEM`: file stem of the global scope (default:
//!   "settings")
//! - `LAYERCONF_EVENT_CAPACITY`: buffered change events per store (default: 64)

use std::env;
use std::path::PathBuf;

use errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

pub const DEFAULT_GLOBAL_STEM: &str = "settings";
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Per-store options.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct StoreOptions {
    /// Arm a file watcher when a backing file is loaded.
    pub watch: bool,

    /// Capacity of the broadcast channel carrying change events. Slow
    /// subscribers past this many events observe a lag, never a blocked
    /// watcher.
    #[validate(range(min = 1, max = 10_000))]
    pub event_capacity: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            watch: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Registry-wide options.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct RegistryOptions {
    /// Directory searched for `<scope>.conf`, `<scope>.json`, ...
    pub search_dir: PathBuf,

    /// File stem used by the global scope.
    #[validate(length(min = 1, max = 255))]
    pub global_file_stem: String,

    #[validate(nested)]
    pub store: StoreOptions,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            search_dir: PathBuf::from("."),
            global_file_stem: DEFAULT_GLOBAL_STEM.to_string(),
            store: StoreOptions::default(),
        }
    }
}

impl RegistryOptions {
    /// Load options from `LAYERCONF_*` environment variables.
    ///
    /// Unset variables keep their defaults; unparsable ones are logged and
    /// ignored. The result is validated before it is returned.
    pub fn from_env() -> ConfigResult<Self> {
        let defaults = Self::default();
        let options = Self {
            search_dir: env::var("LAYERCONF_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.search_dir),
            global_file_stem: env::var("LAYERCONF_GLOBAL_STEM")
                .unwrap_or(defaults.global_file_stem),
            store: StoreOptions {
                watch: parse_env("LAYERCONF_WATCH").unwrap_or(defaults.store.watch),
                event_capacity: parse_env("LAYERCONF_EVENT_CAPACITY")
                    .unwrap_or(defaults.store.event_capacity),
            },
        };
        options.validated()
    }

    pub fn validated(self) -> ConfigResult<Self> {
        self.validate().map_err(|e| ConfigError::InvalidOptions {
            reason: e.to_string(),
        })?;
        Ok(self)
    }
}

fn parse_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}
