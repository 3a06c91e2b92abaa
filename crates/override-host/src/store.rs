//! Layered settings store.
//!
//! Values live in two layers: the default layer declared alongside each key,
//! and the user layer holding explicit end-user choices. Reads return both
//! layers for one key; writes target exactly one layer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HostError;

/// Settings layer targeted by a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigTarget {
    User,
    Default,
}

/// Snapshot of one key's values at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inspection {
    /// Value set by the user, `None` when never configured.
    pub user_value: Option<Value>,
    /// Declared default, `None` when the key has no default.
    pub default_value: Option<Value>,
}

impl Inspection {
    /// Value that wins when both layers are considered.
    pub fn effective(&self) -> Option<&Value> {
        self.user_value.as_ref().or(self.default_value.as_ref())
    }
}

/// Key/value settings store with layered reads.
///
/// Each call is atomic at single-key granularity; callers perform
/// read-modify-write one key at a time.
pub trait ConfigStore {
    /// Read both layers for `key`.
    fn inspect(&self, key: &str) -> Inspection;

    /// Write `value` for `key` into `target`.
    fn update(&mut self, key: &str, value: Value, target: ConfigTarget) -> Result<(), HostError>;
}

/// In-memory store backed by two JSON maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    user: Map<String, Value>,
    defaults: Map<String, Value>,
    read_only: bool,
    writes: usize,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the given user layer.
    pub fn with_user(user: Map<String, Value>) -> Self {
        Self {
            user,
            ..Self::default()
        }
    }

    /// Load the user layer from a JSON settings file.
    ///
    /// A missing file yields an empty user layer.
    pub fn load_user_file(path: &Path) -> Result<Self, HostError> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path)?;
        if contents.trim().is_empty() {
            return Ok(Self::new());
        }
        match serde_json::from_str::<Value>(&contents)? {
            Value::Object(user) => Ok(Self::with_user(user)),
            other => Err(HostError::InvalidDocument(format!(
                "expected a JSON object at the top level of {}, found {}",
                path.display(),
                json_kind(&other)
            ))),
        }
    }

    /// Write the user layer to a JSON settings file.
    pub fn save_user_file(&self, path: &Path) -> Result<(), HostError> {
        let json = serde_json::to_string_pretty(&self.user)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Declare a default for `key`.
    pub fn set_default(&mut self, key: impl Into<String>, value: Value) {
        self.defaults.insert(key.into(), value);
    }

    /// Reject every subsequent write.
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// User layer contents.
    pub fn user(&self) -> &Map<String, Value> {
        &self.user
    }

    /// User value for `key`.
    pub fn user_value(&self, key: &str) -> Option<&Value> {
        self.user.get(key)
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }
}

impl ConfigStore for MemoryStore {
    fn inspect(&self, key: &str) -> Inspection {
        Inspection {
            user_value: self.user.get(key).cloned(),
            default_value: self.defaults.get(key).cloned(),
        }
    }

    fn update(&mut self, key: &str, value: Value, target: ConfigTarget) -> Result<(), HostError> {
        if self.read_only {
            return Err(HostError::ReadOnly(key.to_string()));
        }
        match target {
            ConfigTarget::User => {
                self.user.insert(key.to_string(), value);
            }
            // Defaults belong to whoever declared the key.
            ConfigTarget::Default => return Err(HostError::ReadOnly(key.to_string())),
        }
        self.writes += 1;
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
