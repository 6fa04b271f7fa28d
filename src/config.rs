//! Hierarchical configuration elements.
//!
//! A [`ConfigElement`] wraps a JSON object and answers typed lookups with
//! defaults. Keys may be dotted (`platforms.cluster.files_url`) to reach into
//! nested elements. Platforms receive their own sub-element and never see the
//! rest of the engine configuration.
//!
//! # Example
//!
//! ```
//! use wok_platform::config::ConfigElement;
//!
//! let conf = ConfigElement::from_json(r#"{ "work_path": "/work", "rsync_path": "/opt/bin/rsync" }"#).unwrap();
//! assert_eq!(conf.get_or("rsync_path", "rsync"), "/opt/bin/rsync");
//! assert_eq!(conf.get_or("ssh_path", "ssh"), "ssh");
//! assert_eq!(conf.missing_fields(&["work_path", "files_url"]), vec!["files_url"]);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ConfigError;

/// A configuration element: a JSON object with dotted-key access
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigElement {
    value: Value,
}

impl Default for ConfigElement {
    fn default() -> Self {
        Self::empty()
    }
}

impl ConfigElement {
    /// Create an element with no keys
    pub fn empty() -> Self {
        Self {
            value: Value::Object(Map::new()),
        }
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if !value.is_object() {
            return Err(ConfigError::invalid("<root>", "expected an object"));
        }
        Ok(Self { value })
    }

    /// Parse an element from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Load an element from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Raw value behind a dotted key. `null` counts as absent.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        let mut current = &self.value;
        for part in key.split('.') {
            current = current.as_object()?.get(part)?;
        }
        if current.is_null() { None } else { Some(current) }
    }

    /// Whether the key is present and not null
    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    /// String value of a key, if present and a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get_value(key).and_then(Value::as_str)
    }

    /// String value of a key, or `default` when absent
    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get_str(key).unwrap_or(default).to_string()
    }

    /// Path value of a key, or `default` when absent
    pub fn get_path_or(&self, key: &str, default: impl Into<PathBuf>) -> PathBuf {
        self.get_str(key)
            .map(PathBuf::from)
            .unwrap_or_else(|| default.into())
    }

    /// Boolean value of a key, or `default` when absent or not a boolean
    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_value(key)
            .and_then(Value::as_bool)
            .unwrap_or(default)
    }

    /// String value of a required key.
    ///
    /// Absence is a [`ConfigError::MissingFields`]; a present value that is not
    /// a string is a [`ConfigError::InvalidValue`].
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        match self.get_value(key) {
            None => Err(ConfigError::missing(key)),
            Some(Value::String(s)) => Ok(s),
            Some(other) => Err(ConfigError::invalid(
                key,
                format!("expected a string, found {}", other),
            )),
        }
    }

    /// Nested element under a key, if the key holds an object
    pub fn element(&self, key: &str) -> Option<ConfigElement> {
        self.get_value(key)
            .filter(|v| v.is_object())
            .map(|v| ConfigElement { value: v.clone() })
    }

    /// Top-level keys in insertion-independent (sorted) order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .value
            .as_object()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Keys from `required` that are absent, in the order given
    pub fn missing_fields(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|key| !self.contains(key))
            .map(|key| key.to_string())
            .collect()
    }

    /// Set a dotted key, creating intermediate objects as needed.
    ///
    /// Intermediate values that are not objects are replaced.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = match parts.split_last() {
            Some(split) => split,
            None => return,
        };

        let mut current = &mut self.value;
        for part in parents {
            if !current.is_object() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return;
            };
            current = map
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        if let Value::Object(map) = current {
            map.insert(last.to_string(), value.into());
        }
    }

    /// Borrow the underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.value
    }
}
