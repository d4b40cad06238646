//! # Layered Configuration Core
//!
//! Tree model and merge engine shared by the layered configuration system.
//!
//! This crate provides:
//! - `ConfigValue`, a configuration tree with per-node provenance
//! - Safe navigation and typed accessors that never fail on missing paths
//! - The precedence merge (`merge`, `merge_all`)
//! - Conversion to and from `serde_json` values

pub mod json;
pub mod merge;
pub mod value;


pub use errors::{ConfigError, ConfigResult};
pub use merge::{merge, merge_all};
pub use value::{ConfigValue, Mapping, Scalar, ValueKind};
