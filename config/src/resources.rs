//! # Embedded Defaults
//!
//! Applications bundle their default layer in the binary (usually with
//! `include_str!`) and register it here under the scope it belongs to.
//!
//! ```rust
//! use config::EmbeddedDefaults;
//!
//! let mut defaults = EmbeddedDefaults::new();
//! defaults.register("billing", "billing/default.json", r#"{"currency": "EUR"}"#);
//!
//! let tree = defaults.default_tree("billing").unwrap();
//! assert_eq!(tree.get("currency").as_str().unwrap(), "EUR");
//! assert!(tree.get("currency").is_default());
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use errors::ConfigResult;
use lc_core::ConfigValue;
use tracing::debug;

use crate::loader::parse_text;
use crate::locate::is_default_resource;

#[derive(Debug, Clone)]
struct Resource {
    name: String,
    text: Cow<'static, str>,
}

/// Bundled resources grouped by scope.
#[derive(Debug, Clone, Default)]
pub struct EmbeddedDefaults {
    by_scope: HashMap<String, Vec<Resource>>,
}

impl EmbeddedDefaults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a bundled resource for `scope`. Only names ending in
    /// `default.conf`, `default.json`, `default.conf.json` or
    /// `default.json.conf` (any case) are used as the default layer; the
    /// first one registered wins.
    pub fn register(
        &mut self,
        scope: impl Into<String>,
        name: impl Into<String>,
        text: impl Into<Cow<'static, str>>,
    ) -> &mut Self {
        self.by_scope
            .entry(scope.into())
            .or_default()
            .push(Resource {
                name: name.into(),
                text: text.into(),
            });
        self
    }

    /// Name of the resource supplying the default layer of `scope`.
    pub fn resource_name(&self, scope: &str) -> Option<&str> {
        self.find(scope).map(|r| r.name.as_str())
    }

    /// Parsed default layer of `scope`, every node tagged as default.
    /// A scope with no matching resource gets an empty default mapping.
    pub fn default_tree(&self, scope: &str) -> ConfigResult<ConfigValue> {
        match self.find(scope) {
            Some(resource) => {
                debug!("Default layer for '{}' from {}", scope, resource.name);
                parse_text(&resource.text, &resource.name, true)
            }
            None => Ok(ConfigValue::mapping().with_provenance(true)),
        }
    }

    fn find(&self, scope: &str) -> Option<&Resource> {
        self.by_scope
            .get(scope)?
            .iter()
            .find(|r| is_default_resource(&r.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_scope_yields_empty_default_mapping() {
        let defaults = EmbeddedDefaults::new();
        let tree = defaults.default_tree("unknown").unwrap();
        assert!(tree.is_mapping());
        assert!(tree.is_empty_collection());
        assert!(tree.is_default());
    }

    #[test]
    fn test_non_default_names_are_skipped() {
        let mut defaults = EmbeddedDefaults::new();
        defaults
            .register("app", "app/readme.json", r#"{"a": 1}"#)
            .register("app", "app/DEFAULT.CONF", r#"{"a": 2}"#)
            .register("app", "app/other.default.json", r#"{"a": 3}"#);

        assert_eq!(defaults.resource_name("app"), Some("app/DEFAULT.CONF"));
        assert_eq!(defaults.default_tree("app").unwrap().get("a").as_int().unwrap(), 2);
    }

    #[test]
    fn test_comments_in_bundled_defaults() {
        let mut defaults = EmbeddedDefaults::new();
        defaults.register(
            "app",
            "default.json",
            String::from("# bundled\n{\"retries\": 3}"),
        );
        let tree = defaults.default_tree("app").unwrap();
        assert_eq!(tree.get("retries").as_int().unwrap(), 3);
    }

    #[test]
    fn test_malformed_default_is_parse_error() {
        let mut defaults = EmbeddedDefaults::new();
        defaults.register("app", "default.json", "{oops");
        assert!(matches!(
            defaults.default_tree("app"),
            Err(errors::ConfigError::Parse { .. })
        ));
    }
}
