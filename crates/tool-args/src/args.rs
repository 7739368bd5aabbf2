//! Typed extraction from a tool-call argument map

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ArgError, Result};

/// A single `{ "key": ..., "value": ... }` pair (query parameters, headers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// Key
    pub key: String,
    /// Value
    pub value: String,
}

/// Decoded `tools/call` arguments
///
/// Absent optional arguments read as the type's zero value (`""`, `0`,
/// `false`, empty vec). JSON `null` counts as absent. Keys the caller sends
/// that no getter asks for are ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    map: Map<String, Value>,
}

impl Arguments {
    /// Wrap an already-decoded argument object
    #[must_use]
    pub fn new(map: Map<String, Value>) -> Self {
        Self { map }
    }

    /// Build from the raw `arguments` value of a tool call.
    ///
    /// Accepts an object, `null`, or an object serialized as a JSON string
    /// (some clients stringify arguments).
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => Ok(Self { map }),
            Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(Value::Object(map)) => Ok(Self { map }),
                _ => Err(ArgError::wrong_type("arguments", "object")),
            },
            _ => Err(ArgError::wrong_type("arguments", "object")),
        }
    }

    /// Underlying map
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.map
    }

    /// Whether the argument is present (and not `null`)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    /// Fail with [`ArgError::Missing`] for the first absent name
    pub fn require_all<'n>(&self, names: impl IntoIterator<Item = &'n str>) -> Result<()> {
        for name in names {
            if !self.contains(name) {
                return Err(ArgError::missing(name));
            }
        }
        Ok(())
    }

    /// String argument
    pub fn string(&self, name: &str, required: bool) -> Result<String> {
        let value = self.optional_string(name)?.unwrap_or_default();
        self.check_required(name, required, value)
    }

    /// String argument, `None` when absent
    pub fn optional_string(&self, name: &str) -> Result<Option<String>> {
        self.lookup(name)
            .map(|value| {
                value
                    .as_str()
                    .map(ToString::to_string)
                    .ok_or_else(|| ArgError::wrong_type(name, "string"))
            })
            .transpose()
    }

    /// Integer argument
    pub fn integer(&self, name: &str, required: bool) -> Result<i64> {
        let value = self.optional_integer(name)?.unwrap_or_default();
        self.check_required(name, required, value)
    }

    /// Integer argument, `None` when absent
    pub fn optional_integer(&self, name: &str) -> Result<Option<i64>> {
        self.lookup(name)
            .map(|value| as_integer(value).ok_or_else(|| ArgError::wrong_type(name, "integer")))
            .transpose()
    }

    /// Boolean argument
    pub fn boolean(&self, name: &str, required: bool) -> Result<bool> {
        let value = self.optional_boolean(name)?.unwrap_or_default();
        self.check_required(name, required, value)
    }

    /// Boolean argument, `None` when absent
    pub fn optional_boolean(&self, name: &str) -> Result<Option<bool>> {
        self.lookup(name)
            .map(|value| value.as_bool().ok_or_else(|| ArgError::wrong_type(name, "boolean")))
            .transpose()
    }

    /// Array-of-integers argument
    pub fn integer_array(&self, name: &str, required: bool) -> Result<Vec<i64>> {
        let value = self.optional_integer_array(name)?.unwrap_or_default();
        self.check_required(name, required, value)
    }

    /// Array-of-integers argument, `None` when absent
    pub fn optional_integer_array(&self, name: &str) -> Result<Option<Vec<i64>>> {
        let Some(value) = self.lookup(name) else {
            return Ok(None);
        };
        let items = value
            .as_array()
            .ok_or_else(|| ArgError::wrong_type(name, "array of integers"))?;
        items
            .iter()
            .map(|item| as_integer(item).ok_or_else(|| ArgError::wrong_type(name, "array of integers")))
            .collect::<Result<Vec<_>>>()
            .map(Some)
    }

    /// Array-of-objects argument
    pub fn object_array(&self, name: &str, required: bool) -> Result<Vec<Map<String, Value>>> {
        let Some(value) = self.lookup(name) else {
            return self.check_required(name, required, Vec::new());
        };
        let items = value
            .as_array()
            .ok_or_else(|| ArgError::wrong_type(name, "array of objects"))?;
        items
            .iter()
            .map(|item| {
                item.as_object()
                    .cloned()
                    .ok_or_else(|| ArgError::wrong_type(name, "array of objects"))
            })
            .collect()
    }

    /// Array of `{key, value}` string pairs (query parameters, headers)
    pub fn key_values(&self, name: &str, required: bool) -> Result<Vec<KeyValue>> {
        self.object_array(name, required)?
            .into_iter()
            .map(|entry| {
                let key = entry.get("key").and_then(Value::as_str);
                let value = entry.get("value").and_then(Value::as_str);
                match (key, value) {
                    (Some(key), Some(value)) => Ok(KeyValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    }),
                    _ => Err(ArgError::invalid(
                        name,
                        "each entry must have string 'key' and 'value' fields",
                    )),
                }
            })
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.map.get(name).filter(|value| !value.is_null())
    }

    fn check_required<T>(&self, name: &str, required: bool, value: T) -> Result<T> {
        if required && !self.contains(name) {
            return Err(ArgError::missing(name));
        }
        Ok(value)
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self::new(map)
    }
}

/// Integer from a JSON number, accepting integral floats (`3.0`)
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        Arguments::from_value(value).unwrap()
    }

    #[test]
    fn from_value_accepts_object_null_and_stringified_object() {
        assert!(args(json!({"a": 1})).contains("a"));
        assert!(args(Value::Null).as_map().is_empty());
        assert!(args(json!(r#"{"id": 3}"#)).contains("id"));
    }

    #[test]
    fn from_value_rejects_non_objects() {
        let err = Arguments::from_value(json!([1, 2])).unwrap_err();
        assert_eq!(err.to_string(), "invalid arguments parameter: expected object");
        assert!(Arguments::from_value(json!("not json")).is_err());
    }

    #[test]
    fn required_string_missing_names_parameter() {
        let err = args(json!({})).string("name", true).unwrap_err();
        assert_eq!(err.to_string(), "invalid name parameter: name is required");
        assert!(!err.is_validation());
    }

    #[test]
    fn optional_absent_values_are_zero() {
        let a = args(json!({}));
        assert_eq!(a.string("name", false).unwrap(), "");
        assert_eq!(a.integer("id", false).unwrap(), 0);
        assert!(!a.boolean("flag", false).unwrap());
        assert!(a.integer_array("ids", false).unwrap().is_empty());
        assert!(a.object_array("items", false).unwrap().is_empty());
    }

    #[test]
    fn null_counts_as_absent() {
        let a = args(json!({"id": null}));
        assert!(!a.contains("id"));
        assert!(a.integer("id", true).is_err());
        assert_eq!(a.optional_integer("id").unwrap(), None);
    }

    #[test]
    fn wrong_type_names_expected_kind() {
        let a = args(json!({"id": "one", "flag": 1, "ids": [1, "x"], "items": [1]}));
        assert_eq!(
            a.integer("id", true).unwrap_err().to_string(),
            "invalid id parameter: expected integer"
        );
        assert_eq!(
            a.boolean("flag", true).unwrap_err().to_string(),
            "invalid flag parameter: expected boolean"
        );
        assert_eq!(
            a.integer_array("ids", true).unwrap_err().to_string(),
            "invalid ids parameter: expected array of integers"
        );
        assert_eq!(
            a.object_array("items", true).unwrap_err().to_string(),
            "invalid items parameter: expected array of objects"
        );
    }

    #[test]
    fn integers_accept_integral_floats_only() {
        let a = args(json!({"a": 4.0, "b": 4.5, "c": [1.0, 2]}));
        assert_eq!(a.integer("a", true).unwrap(), 4);
        assert!(a.integer("b", true).is_err());
        assert_eq!(a.integer_array("c", true).unwrap(), vec![1, 2]);
    }

    #[test]
    fn key_values_parse_and_reject_malformed_entries() {
        let a = args(json!({
            "headers": [{"key": "Accept", "value": "application/json"}],
            "bad": [{"key": "x"}]
        }));
        assert_eq!(
            a.key_values("headers", true).unwrap(),
            vec![KeyValue {
                key: "Accept".into(),
                value: "application/json".into()
            }]
        );
        let err = a.key_values("bad", true).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("invalid bad parameter:"));
    }

    #[test]
    fn require_all_reports_first_missing() {
        let a = args(json!({"id": 1}));
        assert!(a.require_all(["id"]).is_ok());
        assert_eq!(a.require_all(["id", "name", "tags"]).unwrap_err().name(), "name");
    }

    #[test]
    fn unknown_extra_arguments_are_ignored() {
        let a = args(json!({"id": 7, "surprise": {"nested": true}}));
        assert_eq!(a.integer("id", true).unwrap(), 7);
    }
}
