//! Dotted-path configuration tree
//!
//! A [`Config`] wraps a JSON object loaded from a config file. Values are
//! addressed by dot-separated paths (`"json_fixer.model"`), and a list of
//! alternative paths can be resolved in priority order so that tool-specific
//! keys override global defaults.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors raised while loading or querying a configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// None of the candidate paths resolved to a value
    #[error("None of the configuration keys {keys:?} is set")]
    NoFallback {
        /// Paths that were tried, in order
        keys: Vec<String>,
    },

    /// The configuration document is not a JSON object
    #[error("Configuration root must be a JSON object, got {0}")]
    NotAnObject(String),

    /// Reading the configuration file failed
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be (de)serialized
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration tree addressable by dotted paths
///
/// JSON `null` is treated the same as an absent key.
///
/// # Example
///
/// ```
/// use steward_utils::Config;
/// use serde_json::json;
///
/// let config = Config::from_value(json!({
///     "model": "gpt-4",
///     "json_fixer": { "retry_times": 5 }
/// })).unwrap();
///
/// assert_eq!(config.get_str("model"), Some("gpt-4"));
/// assert_eq!(config.get("json_fixer.retry_times"), Some(&json!(5)));
/// assert_eq!(
///     config.get_with_fallback(&["json_fixer.model", "model"]).unwrap(),
///     &json!("gpt-4")
/// );
/// ```
#[derive(Clone, Default)]
pub struct Config {
    root: Map<String, Value>,
    attachments: HashMap<String, Arc<dyn Any + Send + Sync>>,
}

impl Config {
    /// Create an empty configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a JSON value whose root is an object
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self {
                root,
                attachments: HashMap::new(),
            }),
            other => Err(ConfigError::NotAnObject(json_type_name(&other).to_string())),
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Look up a value by dotted path
    ///
    /// Returns `None` as soon as a segment is absent, null, or not an object.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let mut current = self.root.get(segments.next()?)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        if current.is_null() {
            None
        } else {
            Some(current)
        }
    }

    /// Look up a value by dotted path, falling back to `default`
    pub fn get_or<'a>(&'a self, path: &str, default: &'a Value) -> &'a Value {
        self.get(path).unwrap_or(default)
    }

    /// Look up a string value by dotted path
    pub fn get_str(&self, path: &str) -> Option<&str> {
        self.get(path).and_then(Value::as_str)
    }

    /// Deserialize the value at `path` into `T`
    pub fn get_as<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        self.get(path)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Return the first value found among `keys`, in order
    ///
    /// Used to let a component-specific key (`"json_fixer.model"`) take
    /// priority over a global one (`"model"`).
    pub fn get_with_fallback(&self, keys: &[&str]) -> Result<&Value> {
        keys.iter()
            .find_map(|key| self.get(key))
            .ok_or_else(|| no_fallback(keys))
    }

    /// Return the first string value found among `keys`, in order
    ///
    /// Keys holding non-string values are skipped.
    pub fn get_str_with_fallback(&self, keys: &[&str]) -> Result<&str> {
        keys.iter()
            .find_map(|key| self.get_str(key))
            .ok_or_else(|| no_fallback(keys))
    }

    /// Return the nested object at `path` as its own configuration
    pub fn section(&self, path: &str) -> Option<Config> {
        self.get(path)
            .and_then(Value::as_object)
            .map(|root| Config {
                root: root.clone(),
                attachments: HashMap::new(),
            })
    }

    /// Set a value at a dotted path, creating intermediate objects
    ///
    /// Intermediate values that are not objects are replaced.
    pub fn set(&mut self, path: &str, value: Value) {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else {
            return;
        };

        let mut node = &mut self.root;
        for segment in segments {
            let entry = node
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(map) = entry else {
                return;
            };
            node = map;
        }
        node.insert(last.to_string(), value);
    }

    /// Check whether a path resolves to a value
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Attach a runtime object under `key`
    ///
    /// Attachments travel with the configuration but are never serialized.
    pub fn attach<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.attachments.insert(key.into(), Arc::new(value));
    }

    /// Retrieve an attachment of type `T`
    pub fn attachment<T: Any + Send + Sync>(&self, key: &str) -> Option<Arc<T>> {
        self.attachments
            .get(key)
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Borrow the plain-data tree
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.root
    }

    /// Snapshot of the plain-data tree as a JSON value
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    /// Serialize the plain-data tree as pretty JSON with 4-space indentation
    ///
    /// Attachments are left out.
    pub fn dump_json(&self) -> Result<String> {
        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        self.root.serialize(&mut serializer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut attachments: Vec<&String> = self.attachments.keys().collect();
        attachments.sort();
        f.debug_struct("Config")
            .field("root", &self.root)
            .field("attachments", &attachments)
            .finish()
    }
}

impl Serialize for Config {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Config {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let root = Map::deserialize(deserializer)?;
        Ok(Self {
            root,
            attachments: HashMap::new(),
        })
    }
}

impl TryFrom<Value> for Config {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

fn no_fallback(keys: &[&str]) -> ConfigError {
    ConfigError::NoFallback {
        keys: keys.iter().map(ToString::to_string).collect(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
