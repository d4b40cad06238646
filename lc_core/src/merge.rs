//! # Merge Engine
//!
//! Combines configuration trees with precedence.
//!
//! # Rules
//! 1. An absent operand (`Empty`) yields the other; two absent operands yield
//!    an empty mapping.
//! 2. Two empty mappings yield an empty mapping that is default only when
//!    both sides are default.
//! 3. An empty mapping against a populated one yields the populated side
//!    outright when both carry the same provenance; otherwise the two are
//!    merged key by key.
//! 4. An empty list on either side yields the other side.
//! 5. Anything else must agree on its structural kind, or the merge fails
//!    with `TypeMismatch`.
//! 6. Mappings merge key by key, lists concatenate (primary first,
//!    duplicates kept), scalars resolve to the primary value.
//!
//! The merged node carries the primary side's provenance flag.

use errors::{ConfigError, ConfigResult};
use tracing::trace;

use crate::value::{ConfigValue, Mapping};

/// Merge two trees where `primary` takes precedence over `secondary`.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Computes the effective configuration from a higher-priority layer (for
/// example the user file) and a lower-priority layer (the bundled defaults).
///
/// ## Usage
/// ```rust
/// use lc_core::{ConfigValue, merge};
/// use serde_json::json;
///
/// let user = ConfigValue::from_json(&json!({"port": 9090}), false);
/// let defaults = ConfigValue::from_json(&json!({"port": 8080, "host": "localhost"}), true);
///
/// let effective = merge(&user, &defaults).unwrap();
/// assert_eq!(effective.get("port").as_int().unwrap(), 9090);
/// assert!(effective.get("host").is_default());
/// ```
///
/// ## Error Handling
/// Returns `ConfigError::TypeMismatch` naming the dotted path of the first
/// colliding key whose two values have incompatible kinds.
pub fn merge(primary: &ConfigValue, secondary: &ConfigValue) -> ConfigResult<ConfigValue> {
    if !primary.is_present() && !secondary.is_present() {
        return Ok(ConfigValue::mapping());
    }
    merge_at(primary, secondary, "")
}

/// Merge an ordered list of trees, earliest first in precedence.
///
/// Folds from the tail, so `merge_all(&[a, b, c])` is
/// `merge(a, merge(b, c))`. An empty list yields an empty mapping.
pub fn merge_all(trees: &[ConfigValue]) -> ConfigResult<ConfigValue> {
    trees
        .iter()
        .rev()
        .try_fold(ConfigValue::Empty, |lower, higher| merge(higher, &lower))
}

fn merge_at(
    primary: &ConfigValue,
    secondary: &ConfigValue,
    path: &str,
) -> ConfigResult<ConfigValue> {
    if !secondary.is_present() {
        return Ok(primary.clone());
    }
    if !primary.is_present() {
        return Ok(secondary.clone());
    }

    match (primary, secondary) {
        (
            ConfigValue::Mapping {
                entries: p_entries,
                from_default: p_default,
            },
            ConfigValue::Mapping {
                entries: s_entries,
                from_default: s_default,
            },
        ) => {
            if p_entries.is_empty() && s_entries.is_empty() {
                // An explicit empty override wins over an implicit default.
                return Ok(ConfigValue::Mapping {
                    entries: Mapping::new(),
                    from_default: *p_default && *s_default,
                });
            }
            if p_default == s_default {
                if p_entries.is_empty() {
                    return Ok(secondary.clone());
                }
                if s_entries.is_empty() {
                    return Ok(primary.clone());
                }
            }
            Ok(ConfigValue::Mapping {
                entries: merge_entries(p_entries, s_entries, path)?,
                from_default: *p_default,
            })
        }
        _ if secondary.is_list() && secondary.is_empty_collection() => Ok(primary.clone()),
        _ if primary.is_list() && primary.is_empty_collection() => Ok(secondary.clone()),
        _ if primary.kind() != secondary.kind() => {
            trace!(
                path,
                primary = %primary.kind(),
                secondary = %secondary.kind(),
                "Incompatible kinds during merge"
            );
            Err(ConfigError::type_mismatch(
                display_path(path),
                primary.kind(),
                secondary.kind(),
            ))
        }
        (
            ConfigValue::List {
                items: p_items,
                from_default,
            },
            ConfigValue::List { items: s_items, .. },
        ) => Ok(ConfigValue::List {
            items: p_items.iter().chain(s_items).cloned().collect(),
            from_default: *from_default,
        }),
        _ => Ok(primary.clone()),
    }
}

fn merge_entries(primary: &Mapping, secondary: &Mapping, path: &str) -> ConfigResult<Mapping> {
    let mut merged = secondary.clone();
    for (key, p_value) in primary {
        let value = match secondary.get(key) {
            Some(s_value) => merge_at(p_value, s_value, &join(path, key))?,
            None => p_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    Ok(merged)
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "<root>" } else { path }
}
