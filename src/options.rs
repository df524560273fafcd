//! Typed snapshot of the charm configuration.
//!
//! The agent hands over configuration as a JSON object (`config-get
//! --format=json --all`). It is parsed here, once, into an ordered
//! [`OptionSet`] of scalar [`OptionValue`]s so that the rest of the crate
//! never deals with loosely typed JSON.

use anyhow::Context;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Option names the charm logic refers to directly
pub mod keys {
    pub const API_URL: &str = "hpe3par-api-url";
    pub const USERNAME: &str = "hpe3par-username";
    pub const PASSWORD: &str = "hpe3par-password";
    pub const SAN_IP: &str = "san-ip";
    pub const SAN_LOGIN: &str = "san-login";
    pub const SAN_PASSWORD: &str = "san-password";
    pub const DRIVER_TYPE: &str = "driver-type";
    pub const ISCSI_IPS: &str = "hpe3par-iscsi-ips";
    pub const SNAPSHOT_RETENTION: &str = "hpe3par-snapshot-retention";
    pub const SNAPSHOT_EXPIRATION: &str = "hpe3par-snapshot-expiration";
    pub const VOLUME_BACKEND_NAME: &str = "volume-backend-name";
}

/// Errors raised while parsing an option document
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptionsError {
    #[error("invalid options JSON: {0}")]
    Parse(String),

    #[error("options document must be a JSON object")]
    NotAnObject,

    #[error("option `{0}` must be a string, boolean or number")]
    NotScalar(String),
}

/// A single scalar option value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl OptionValue {
    /// Convert a JSON value. `null` means unset and yields `None`.
    pub fn from_json(name: &str, value: Value) -> Result<Option<Self>, OptionsError> {
        match value {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(Self::Bool(b))),
            Value::String(s) => Ok(Some(Self::Str(s))),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Ok(Some(Self::Int(i))),
                None => n
                    .as_f64()
                    .map(|f| Some(Self::Float(f)))
                    .ok_or_else(|| OptionsError::NotScalar(name.to_string())),
            },
            Value::Array(_) | Value::Object(_) => Err(OptionsError::NotScalar(name.to_string())),
        }
    }

    /// False for `false`, zero and the empty string.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Float(f) => *f != 0.0,
            Self::Str(s) => !s.is_empty(),
        }
    }

    /// Numeric view of integer and float values
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            Self::Bool(_) | Self::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{:?}", x),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Ordered mapping of option name to value.
///
/// Iteration order is insertion order, which for parsed documents is the
/// order of the keys in the JSON text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionSet {
    entries: Vec<(String, OptionValue)>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object such as the output of `config-get --format=json --all`
    pub fn from_json_str(json: &str) -> Result<Self, OptionsError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| OptionsError::Parse(e.to_string()))?;
        Self::from_json_value(value)
    }

    pub fn from_json_value(value: Value) -> Result<Self, OptionsError> {
        let Value::Object(map) = value else {
            return Err(OptionsError::NotAnObject);
        };
        let mut options = Self::new();
        for (name, value) in map {
            if let Some(value) = OptionValue::from_json(&name, value)? {
                options.insert(name, value);
            }
        }
        Ok(options)
    }

    /// Load an option document from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read options from {:?}", path.as_ref()))?;

        let options = Self::from_json_str(&content)
            .with_context(|| format!("Failed to parse options from {:?}", path.as_ref()))?;

        Ok(options)
    }

    /// Insert or replace. A replaced entry keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<OptionValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| *key == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(key, _)| key == name)?;
        Some(self.entries.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = Self::new();
        for (name, value) in iter {
            options.insert(name, value);
        }
        options
    }
}

impl Serialize for OptionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OptionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_json_value(value).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_keeps_document_order() {
        let options =
            OptionSet::from_json_str(r#"{"san-ip": "1.2.3.4", "driver-type": "fc", "a": 1}"#)
                .unwrap();
        let keys: Vec<&str> = options.keys().collect();
        assert_eq!(keys, vec!["san-ip", "driver-type", "a"]);
    }

    #[test]
    fn test_parse_scalar_types() {
        let options = OptionSet::from_json_str(
            r#"{"s": "x", "b": true, "i": 72, "f": 20.0, "n": -1}"#,
        )
        .unwrap();
        assert_eq!(options.get("s"), Some(&OptionValue::Str("x".to_string())));
        assert_eq!(options.get("b"), Some(&OptionValue::Bool(true)));
        assert_eq!(options.get("i"), Some(&OptionValue::Int(72)));
        assert_eq!(options.get("f"), Some(&OptionValue::Float(20.0)));
        assert_eq!(options.get("n"), Some(&OptionValue::Int(-1)));
    }

    #[test]
    fn test_null_is_unset() {
        let options = OptionSet::from_json_str(r#"{"san-ip": null, "san-login": "x"}"#).unwrap();
        assert!(!options.contains("san-ip"));
        assert_eq!(options.len(), 1);
    }

    #[test]
    fn test_rejects_non_scalar() {
        let err = OptionSet::from_json_str(r#"{"san-ip": ["a"]}"#).unwrap_err();
        assert_eq!(err, OptionsError::NotScalar("san-ip".to_string()));

        let err = OptionSet::from_json_str("[1, 2]").unwrap_err();
        assert_eq!(err, OptionsError::NotAnObject);

        assert!(matches!(
            OptionSet::from_json_str("{not json"),
            Err(OptionsError::Parse(_))
        ));
    }

    #[test]
    fn test_truthiness() {
        assert!(!OptionValue::from("").is_truthy());
        assert!(!OptionValue::from(false).is_truthy());
        assert!(!OptionValue::Int(0).is_truthy());
        assert!(!OptionValue::Float(0.0).is_truthy());
        assert!(OptionValue::from("cinder").is_truthy());
        assert!(OptionValue::Int(-1).is_truthy());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut options: OptionSet = [("a", 1i64), ("b", 2i64)].into_iter().collect();
        options.insert("a", 3i64);
        let entries: Vec<(&str, &OptionValue)> = options.iter().collect();
        assert_eq!(entries[0], ("a", &OptionValue::Int(3)));
        assert_eq!(options.len(), 2);
    }

    #[test]
    fn test_remove() {
        let mut options: OptionSet = [("a", "x"), ("b", "y")].into_iter().collect();
        assert_eq!(options.remove("a"), Some(OptionValue::from("x")));
        assert_eq!(options.remove("a"), None);
        assert_eq!(options.keys().collect::<Vec<_>>(), vec!["b"]);
    }

    #[test]
    fn test_serialize_as_object() {
        let options: OptionSet = [("b", OptionValue::Int(1)), ("a", OptionValue::from("x"))]
            .into_iter()
            .collect();
        assert_eq!(serde_json::to_string(&options).unwrap(), r#"{"b":1,"a":"x"}"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(OptionValue::Float(20.0).to_string(), "20.0");
        assert_eq!(OptionValue::Int(15).to_string(), "15");
        assert_eq!(OptionValue::from("fc").to_string(), "fc");
    }

    #[test]
    fn test_load_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(br#"{"driver-type": "iscsi", "hpe3par-debug": false}"#)
            .unwrap();
        temp_file.flush().unwrap();

        let options = OptionSet::load_from_file(temp_file.path()).unwrap();
        assert_eq!(
            options.get(keys::DRIVER_TYPE).and_then(OptionValue::as_str),
            Some("iscsi")
        );
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = OptionSet::load_from_file("/nonexistent/options.json");
        assert!(result.is_err());
    }
}
