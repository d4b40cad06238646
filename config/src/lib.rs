//! # Layered Configuration Store
//!
//! Runtime side of the layered configuration system.
//!
//! This crate provides:
//! - Configuration text loading (JSON with `#` comment lines)
//! - Backing-file lookup and bundled default resources
//! - `ConfigStore`: default layer + user layer, thread-safe effective tree,
//!   persistence of user overrides, hot reload with change notifications
//! - `Registry`: one shared store per scope
//! - Runtime options loaded from the environment

pub mod loader;
pub mod locate;
pub mod options;
pub mod registry;
pub mod resources;
pub mod store;
pub mod watch;

pub use errors::{ConfigError, ConfigResult};
pub use loader::{parse_text, read_tree, render, strip_comments};
pub use locate::{candidate_file_names, find_backing_file, is_default_resource};
pub use options::{RegistryOptions, StoreOptions};
pub use registry::{GLOBAL_SCOPE, Registry};
pub use resources::EmbeddedDefaults;
pub use store::{ConfigEvent, ConfigStore, StoreState, WatchPause};
pub use watch::{FileEvent, FileWatcher};
pub use validator::Validate;
