//! Conversion between configuration trees and `serde_json` values.
//!
//! JSON `null` maps to `ConfigValue::Empty`, so an explicit `null` in a layer
//! behaves like an absent key during merging.

use serde::{Serialize, Serializer};
use serde_json::{Number, Value};

use crate::value::{ConfigValue, Mapping, Scalar};

impl ConfigValue {
    /// Build a tree from JSON, tagging every node with `from_default`.
    pub fn from_json(json: &Value, from_default: bool) -> Self {
        match json {
            Value::Null => Self::Empty,
            Value::Bool(b) => Self::Scalar {
                value: Scalar::Boolean(*b),
                from_default,
            },
            Value::Number(n) => Self::Scalar {
                value: number_to_scalar(n),
                from_default,
            },
            Value::String(s) => Self::Scalar {
                value: Scalar::String(s.clone()),
                from_default,
            },
            Value::Array(items) => Self::List {
                items: items
                    .iter()
                    .map(|item| Self::from_json(item, from_default))
                    .collect(),
                from_default,
            },
            Value::Object(map) => Self::Mapping {
                entries: map
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v, from_default)))
                    .collect::<Mapping>(),
                from_default,
            },
        }
    }

    /// Plain JSON view of the tree; provenance is not represented.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Empty => Value::Null,
            Self::Scalar { value, .. } => match value {
                Scalar::String(s) => Value::String(s.clone()),
                Scalar::Integer(i) => Value::Number(Number::from(*i)),
                Scalar::Float(f) => Number::from_f64(*f).map_or(Value::Null, Value::Number),
                Scalar::Boolean(b) => Value::Bool(*b),
            },
            Self::List { items, .. } => Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Mapping { entries, .. } => Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

fn number_to_scalar(n: &Number) -> Scalar {
    if let Some(i) = n.as_i64() {
        Scalar::Integer(i)
    } else {
        // u64 beyond i64::MAX and every non-integral number
        Scalar::Float(n.as_f64().unwrap_or_default())
    }
}

impl From<Value> for ConfigValue {
    fn from(json: Value) -> Self {
        Self::from_json(&json, false)
    }
}

impl Serialize for ConfigValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_tags_every_node() {
        let tree = ConfigValue::from_json(&json!({"a": {"b": [1, 2]}, "c": "x"}), true);
        assert!(tree.is_default());
        assert!(tree.get("a").is_default());
        assert!(tree.path("a.b.1").is_default());
        assert!(tree.get("c").is_default());
    }

    #[test]
    fn test_numbers_map_to_integer_or_float() {
        let tree = ConfigValue::from(json!({"i": 42, "f": 1.5, "big": 18_446_744_073_709_551_615_u64}));
        assert_eq!(tree.get("i").as_int().unwrap(), 42);
        assert_eq!(tree.get("f").as_float().unwrap(), 1.5);
        assert!(tree.get("big").as_int().is_err());
        assert!(tree.get("big").as_float().unwrap() > 1.0e19);
    }

    #[test]
    fn test_integer_beyond_i64_is_written_as_float() {
        let tree = ConfigValue::from(json!({"big": u64::MAX}));
        assert_eq!(tree.get("big").kind(), crate::ValueKind::Float);
        assert!(tree.to_json()["big"].is_f64());
    }

    #[test]
    fn test_null_reads_as_absent() {
        let tree = ConfigValue::from(json!({"gone": null}));
        assert!(!tree.get("gone").is_present());
        assert_eq!(tree.get("gone").as_str().unwrap(), "");
    }

    #[test]
    fn test_to_json_preserves_structure() {
        let source = json!({
            "name": "svc",
            "ports": [80, 443],
            "tls": {"enabled": true, "ratio": 0.25}
        });
        assert_eq!(ConfigValue::from(source.clone()).to_json(), source);
    }

    #[test]
    fn test_serialize_matches_to_json() {
        let tree = ConfigValue::from(json!({"k": [true, "v"]}));
        let text = serde_json::to_string(&tree).unwrap();
        assert_eq!(text, r#"{"k":[true,"v"]}"#);
    }
}
