//! # Configuration Tree
//!
//! `ConfigValue` is the node type of every configuration tree: a scalar, an
//! ordered list, a keyed mapping, or the `Empty` sentinel returned by safe
//! navigation over missing fields.
//!
//! Every non-empty node carries a provenance flag (`from_default`) telling
//! whether it came from the default layer. Per-field provenance lives on the
//! entries of a mapping, not on the mapping itself, because a merged mapping
//! mixes default-sourced and user-sourced entries.

use std::collections::BTreeMap;

use errors::{ConfigError, ConfigResult};
use strum::Display;

/// Keyed entries of a mapping node. Key order carries no meaning; a sorted
/// map keeps serialized output stable.
pub type Mapping = BTreeMap<String, ConfigValue>;

static EMPTY: ConfigValue = ConfigValue::Empty;

/// Path label used in accessor errors, where the node has no known location.
const VALUE_PATH: &str = "(value)";

/// Primitive payload of a scalar node.
///
/// JSON integers outside the `i64` range are read as `Float` and are written
/// back in float notation, so they lose precision on a save/load cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Scalar {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Integer(_) => ValueKind::Integer,
            Self::Float(_) => ValueKind::Float,
            Self::Boolean(_) => ValueKind::Boolean,
        }
    }
}

/// Structural kind of a node. Two nodes are compatible for merging only when
/// their kinds are equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
    Mapping,
    Empty,
}

/// A node of a configuration tree.
///
/// # M-CANONICAL-DOCS
///
/// ## Purpose
/// Represents parsed configuration text as a typed tree that the merge engine
/// can combine and that callers can navigate without handling missing keys.
///
/// ## Usage
/// ```rust
/// use lc_core::ConfigValue;
///
/// let mut tree = ConfigValue::mapping();
/// tree.insert("port", ConfigValue::from(8080)).unwrap();
///
/// assert_eq!(tree.get("port").as_int().unwrap(), 8080);
/// // Missing paths never fail; they read as zero values.
/// assert_eq!(tree.path("x.not.exist.at.all").as_int().unwrap(), 0);
/// assert!(!tree.path("x.not.exist").is_truthy());
/// ```
///
/// ## Safe Navigation
/// `get`, `at` and `path` return `&ConfigValue::Empty` for anything missing.
/// `Empty` reads as `""`, `0`, `0.0`, `false` and `[]` through the typed
/// accessors, and navigating further from it yields `Empty` again.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Scalar { value: Scalar, from_default: bool },
    List { items: Vec<ConfigValue>, from_default: bool },
    Mapping { entries: Mapping, from_default: bool },
    Empty,
}

impl Default for ConfigValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl ConfigValue {
    /// An empty, user-sourced mapping.
    pub fn mapping() -> Self {
        Self::Mapping {
            entries: Mapping::new(),
            from_default: false,
        }
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, ConfigValue)>,
    {
        Self::Mapping {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            from_default: false,
        }
    }

    pub fn list(items: Vec<ConfigValue>) -> Self {
        Self::List {
            items,
            from_default: false,
        }
    }

    pub fn scalar(value: Scalar) -> Self {
        Self::Scalar {
            value,
            from_default: false,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar { value, .. } => value.kind(),
            Self::List { .. } => ValueKind::List,
            Self::Mapping { .. } => ValueKind::Mapping,
            Self::Empty => ValueKind::Empty,
        }
    }

    /// Provenance of this node. `Empty` belongs to no layer.
    pub fn is_default(&self) -> bool {
        match self {
            Self::Scalar { from_default, .. }
            | Self::List { from_default, .. }
            | Self::Mapping { from_default, .. } => *from_default,
            Self::Empty => false,
        }
    }

    pub fn is_present(&self) -> bool {
        !matches!(self, Self::Empty)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, Self::Mapping { .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List { .. })
    }

    /// True for a mapping or list with no children.
    pub fn is_empty_collection(&self) -> bool {
        match self {
            Self::Mapping { entries, .. } => entries.is_empty(),
            Self::List { items, .. } => items.is_empty(),
            _ => false,
        }
    }

    /// Presence check: `Empty` and empty collections are false, a populated
    /// mapping or list is true, scalars follow their own zero value.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Empty => false,
            Self::Mapping { entries, .. } => !entries.is_empty(),
            Self::List { items, .. } => !items.is_empty(),
            Self::Scalar { value, .. } => match value {
                Scalar::String(s) => !s.is_empty(),
                Scalar::Integer(i) => *i != 0,
                Scalar::Float(f) => *f != 0.0,
                Scalar::Boolean(b) => *b,
            },
        }
    }

    /// Child of a mapping, or `Empty`.
    pub fn get(&self, key: &str) -> &ConfigValue {
        match self {
            Self::Mapping { entries, .. } => entries.get(key).unwrap_or(&EMPTY),
            _ => &EMPTY,
        }
    }

    /// Element of a list, or `Empty`.
    pub fn at(&self, index: usize) -> &ConfigValue {
        match self {
            Self::List { items, .. } => items.get(index).unwrap_or(&EMPTY),
            _ => &EMPTY,
        }
    }

    /// Dotted path lookup (`"servers.0.host"`); numeric segments index lists.
    pub fn path(&self, dotted: &str) -> &ConfigValue {
        dotted
            .split('.')
            .fold(self, |node, segment| node.child(segment).unwrap_or(&EMPTY))
    }

    /// Strict mapping lookup.
    pub fn try_get(&self, key: &str) -> ConfigResult<&ConfigValue> {
        match self {
            Self::Mapping { entries, .. } => {
                entries.get(key).ok_or_else(|| ConfigError::KeyNotFound {
                    key: key.to_string(),
                })
            }
            _ => Err(ConfigError::KeyNotFound {
                key: key.to_string(),
            }),
        }
    }

    /// Strict dotted path lookup. The error names the path up to and
    /// including the first missing segment.
    pub fn try_path(&self, dotted: &str) -> ConfigResult<&ConfigValue> {
        let mut node = self;
        let mut walked = String::new();
        for segment in dotted.split('.') {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            node = node
                .child(segment)
                .ok_or_else(|| ConfigError::KeyNotFound {
                    key: walked.clone(),
                })?;
        }
        Ok(node)
    }

    fn child(&self, segment: &str) -> Option<&ConfigValue> {
        match self {
            Self::Mapping { entries, .. } => entries.get(segment),
            Self::List { items, .. } => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> ConfigResult<&str> {
        match self {
            Self::Empty => Ok(""),
            Self::Scalar {
                value: Scalar::String(s),
                ..
            } => Ok(s),
            other => Err(other.coercion_error(ValueKind::String)),
        }
    }

    pub fn as_string(&self) -> ConfigResult<String> {
        self.as_str().map(str::to_string)
    }

    /// Booleans read as themselves, collections as their presence and
    /// `Empty` as false. Other scalars do not coerce.
    pub fn as_bool(&self) -> ConfigResult<bool> {
        match self {
            Self::Empty => Ok(false),
            Self::Scalar {
                value: Scalar::Boolean(b),
                ..
            } => Ok(*b),
            Self::Mapping { .. } | Self::List { .. } => Ok(self.is_truthy()),
            other => Err(other.coercion_error(ValueKind::Boolean)),
        }
    }

    pub fn as_int(&self) -> ConfigResult<i64> {
        match self {
            Self::Empty => Ok(0),
            Self::Scalar {
                value: Scalar::Integer(i),
                ..
            } => Ok(*i),
            other => Err(other.coercion_error(ValueKind::Integer)),
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> ConfigResult<f64> {
        match self {
            Self::Empty => Ok(0.0),
            Self::Scalar {
                value: Scalar::Float(f),
                ..
            } => Ok(*f),
            Self::Scalar {
                value: Scalar::Integer(i),
                ..
            } => Ok(*i as f64),
            other => Err(other.coercion_error(ValueKind::Float)),
        }
    }

    pub fn as_list(&self) -> ConfigResult<&[ConfigValue]> {
        match self {
            Self::Empty => Ok(&[]),
            Self::List { items, .. } => Ok(items),
            other => Err(other.coercion_error(ValueKind::List)),
        }
    }

    /// Entries of a mapping. `Empty` reads as `None` rather than borrowing a
    /// shared empty map.
    pub fn as_mapping(&self) -> ConfigResult<Option<&Mapping>> {
        match self {
            Self::Empty => Ok(None),
            Self::Mapping { entries, .. } => Ok(Some(entries)),
            other => Err(other.coercion_error(ValueKind::Mapping)),
        }
    }

    fn coercion_error(&self, expected: ValueKind) -> ConfigError {
        ConfigError::type_mismatch(VALUE_PATH, expected, self.kind())
    }

    /// Assign `key`, replacing both value and provenance of that entry only.
    /// An `Empty` node turns into a user mapping first.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: ConfigValue,
    ) -> ConfigResult<Option<ConfigValue>> {
        let key = key.into();
        if let Self::Empty = self {
            *self = Self::mapping();
        }
        match self {
            Self::Mapping { entries, .. } => Ok(entries.insert(key, value)),
            other => Err(ConfigError::type_mismatch(
                key,
                ValueKind::Mapping,
                other.kind(),
            )),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<ConfigValue> {
        match self {
            Self::Mapping { entries, .. } => entries.remove(key),
            _ => None,
        }
    }

    /// Assign a dotted path, creating missing intermediate mappings.
    pub fn set_path(&mut self, dotted: &str, value: ConfigValue) -> ConfigResult<()> {
        let mut segments: Vec<&str> = dotted.split('.').collect();
        let last = segments.pop().unwrap_or_default();
        let mut node = self;
        let mut walked = String::new();
        for segment in segments {
            if !walked.is_empty() {
                walked.push('.');
            }
            walked.push_str(segment);
            if let Self::Empty = node {
                *node = Self::mapping();
            }
            node = match node {
                Self::Mapping { entries, .. } => {
                    let child = entries
                        .entry(segment.to_string())
                        .or_insert_with(Self::mapping);
                    if let Self::Empty = child {
                        *child = Self::mapping();
                    }
                    child
                }
                other => {
                    return Err(ConfigError::type_mismatch(
                        walked,
                        ValueKind::Mapping,
                        other.kind(),
                    ));
                }
            };
        }
        node.insert(last, value).map(|_| ())
    }

    /// Re-tag this node and every descendant with the given provenance.
    pub fn with_provenance(mut self, from_default: bool) -> Self {
        self.set_provenance(from_default);
        self
    }

    fn set_provenance(&mut self, flag: bool) {
        match self {
            Self::Scalar { from_default, .. } => *from_default = flag,
            Self::List {
                items,
                from_default,
            } => {
                *from_default = flag;
                items.iter_mut().for_each(|item| item.set_provenance(flag));
            }
            Self::Mapping {
                entries,
                from_default,
            } => {
                *from_default = flag;
                entries
                    .values_mut()
                    .for_each(|entry| entry.set_provenance(flag));
            }
            Self::Empty => {}
        }
    }

    /// Copy of this tree holding only what did not come from the default
    /// layer.
    ///
    /// Default-tagged scalars are dropped. Collections are filtered
    /// recursively; a default-tagged collection survives only when something
    /// user-sourced remains inside it, while a user-tagged collection is kept
    /// even when it ends up empty (it is an explicit override). `Empty` items
    /// of a user-tagged list are kept so list indexes stay stable. Returns
    /// `Empty` when nothing survives.
    pub fn without_defaults(&self) -> ConfigValue {
        match self {
            Self::Empty => Self::Empty,
            Self::Scalar { from_default, .. } => {
                if *from_default {
                    Self::Empty
                } else {
                    self.clone()
                }
            }
            Self::List {
                items,
                from_default,
            } => {
                let kept: Vec<ConfigValue> = items
                    .iter()
                    .filter_map(|item| match item {
                        // Explicit nulls hold their position in a user list.
                        Self::Empty if !*from_default => Some(Self::Empty),
                        item => Some(item.without_defaults()).filter(ConfigValue::is_present),
                    })
                    .collect();
                if *from_default && !kept.iter().any(ConfigValue::is_present) {
                    Self::Empty
                } else {
                    Self::List {
                        items: kept,
                        from_default: false,
                    }
                }
            }
            Self::Mapping {
                entries,
                from_default,
            } => {
                let kept: Mapping = entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.without_defaults()))
                    .filter(|(_, v)| v.is_present())
                    .collect();
                if *from_default && kept.is_empty() {
                    Self::Empty
                } else {
                    Self::Mapping {
                        entries: kept,
                        from_default: false,
                    }
                }
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::scalar(Scalar::String(value.to_string()))
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::scalar(Scalar::String(value))
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::scalar(Scalar::Integer(value))
    }
}

impl From<i32> for ConfigValue {
    fn from(value: i32) -> Self {
        Self::scalar(Scalar::Integer(i64::from(value)))
    }
}

impl From<f64> for ConfigValue {
    fn from(value: f64) -> Self {
        Self::scalar(Scalar::Float(value))
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::scalar(Scalar::Boolean(value))
    }
}

impl From<Vec<ConfigValue>> for ConfigValue {
    fn from(items: Vec<ConfigValue>) -> Self {
        Self::list(items)
    }
}
