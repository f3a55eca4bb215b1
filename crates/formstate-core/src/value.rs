//! Immutable, reference-shared document values.
//!
//! [`Value`] mirrors the JSON data model, but arrays and objects sit behind
//! an [`Arc`]. Cloning a value never copies a container, and two values are
//! *the same instance* when their containers share an allocation
//! ([`Value::ptr_eq`]). Deep structural equality is plain `PartialEq`.
//!
//! A missing value ("undefined") is represented as `Option::<&Value>::None`
//! throughout the crate; [`Value::Null`] is an explicit JSON `null`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;

pub type Map = BTreeMap<String, Value>;

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(Arc<str>),
    Array(Arc<Vec<Value>>),
    Object(Arc<Map>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(items))
    }

    pub fn object(map: Map) -> Self {
        Value::Object(Arc::new(map))
    }

    /// `true` when both values are the same instance: shared containers, or
    /// equal scalars (scalars have no identity beyond their value).
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) => {
                false
            }
            (a, b) => a == b,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// A plain record: an object that is neither an array nor `null`.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// The `_key` of a keyed array item, if it has a string one.
    pub fn key(&self) -> Option<&str> {
        self.get("_key").and_then(Value::as_str)
    }

    /// `true` for objects that carry a `_key` property of any kind.
    pub fn has_key(&self) -> bool {
        self.get("_key").is_some()
    }

    /// JavaScript-style truthiness.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// The runtime JSON type name: `null`, `boolean`, `number`, `string`,
    /// `array` or `object`.
    pub fn js_type(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    /// The declared type of a value: its `_type` when it is an object with a
    /// string `_type`, otherwise its runtime JSON type name.
    pub fn type_name(&self) -> &str {
        match self.get("_type").and_then(Value::as_str) {
            Some(name) => name,
            None => self.js_type(),
        }
    }

    /// Keep only the given keys of an object. Anything else yields an empty object.
    pub fn pick<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> Value {
        let mut picked = Map::new();
        if let Value::Object(map) = self {
            for key in keys {
                if let Some(v) = map.get(key) {
                    picked.insert(key.to_string(), v.clone());
                }
            }
        }
        Value::object(picked)
    }
}

/// Type name of a possibly-missing value.
pub fn resolve_type_name(value: Option<&Value>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| v.type_name().to_string())
}

/// JavaScript-style truthiness of a possibly-missing value.
pub fn is_truthy(value: Option<&Value>) -> bool {
    value.is_some_and(Value::is_truthy)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b) || a == b,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Object(map) => f.debug_map().entries(map.iter()).finish(),
        }
    }
}

// ---------------------------------------------------------------------------
// serde_json interop
// ---------------------------------------------------------------------------

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => serde_json::Value::Number(n.clone()),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            Value::Object(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n.into())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => n.serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clone_shares_containers() {
        let v = Value::from(json!({"a": [1, 2]}));
        let copy = v.clone();
        assert!(v.ptr_eq(&copy));

        let rebuilt = Value::from(json!({"a": [1, 2]}));
        assert!(!v.ptr_eq(&rebuilt));
        assert_eq!(v, rebuilt);
    }

    #[test]
    fn test_type_name_prefers_declared_type() {
        let item = Value::from(json!({"_type": "author", "_key": "a"}));
        assert_eq!(item.type_name(), "author");
        assert_eq!(Value::from(json!({"x": 1})).type_name(), "object");
        assert_eq!(Value::from(json!([1])).type_name(), "array");
        assert_eq!(Value::from(json!(null)).type_name(), "null");
        assert_eq!(resolve_type_name(None), "undefined");
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(None));
        assert!(!Value::from(json!(0)).is_truthy());
        assert!(!Value::from(json!("")).is_truthy());
        assert!(Value::from(json!([])).is_truthy());
        assert!(Value::from(json!(0.5)).is_truthy());
    }

    #[test]
    fn test_pick_restricts_keys() {
        let v = Value::from(json!({"a": 1, "b": 2, "c": 3}));
        assert_eq!(v.pick(["a", "c", "missing"]), Value::from(json!({"a": 1, "c": 3})));
        assert_eq!(Value::Null.pick(["a"]), Value::from(json!({})));
    }

    #[test]
    fn test_serde_round_trip() {
        let raw = json!({"title": "x", "tags": ["a", "b"], "n": 3, "ok": true, "none": null});
        let v: Value = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&v).unwrap(), raw);
    }
}
