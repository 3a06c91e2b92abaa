//! Registry of known settings keys.
//!
//! The registry knows every declared key with its metadata, and notifies
//! subscribers whenever a batch of keys is added after startup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HostError;
use crate::store::MemoryStore;

/// Declared metadata for one settings key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeyMetadata {
    /// Declared default value
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,

    /// Optional grouping tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl KeyMetadata {
    /// Metadata with only a default value.
    pub fn with_default(value: Value) -> Self {
        Self {
            default_value: Some(value),
            category: None,
        }
    }

    /// Attach a category tag.
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// One "keys added" event: the batch of names in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeysAdded {
    pub keys: Vec<String>,
}

/// Source of settings keys and their metadata.
pub trait ConfigRegistry {
    /// Every currently known key, in registration order.
    fn current_keys(&self) -> Vec<String>;

    /// Metadata for `key`, `None` when the key is unknown.
    fn metadata(&self, key: &str) -> Option<KeyMetadata>;

    /// Receive every batch registered after this call.
    fn subscribe(&mut self) -> Receiver<KeysAdded>;
}

/// In-memory registry that fans batches out over channels.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    order: Vec<String>,
    entries: HashMap<String, KeyMetadata>,
    subscribers: Vec<Sender<KeysAdded>>,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry from a JSON schema file.
    ///
    /// The file maps each key to `{ "default": ..., "category": ... }`;
    /// both fields are optional.
    pub fn from_schema_file(path: &Path) -> Result<Self, HostError> {
        let contents = fs::read_to_string(path)?;
        let schema: serde_json::Map<String, Value> = serde_json::from_str(&contents)?;

        let mut entries = Vec::with_capacity(schema.len());
        for (key, raw) in schema {
            let metadata: KeyMetadata = serde_json::from_value(raw).map_err(|e| {
                HostError::InvalidDocument(format!("key '{}': {}", key, e))
            })?;
            entries.push((key, metadata));
        }

        let mut registry = Self::new();
        registry.register(entries);
        Ok(registry)
    }

    /// Register a batch of keys and notify every live subscriber.
    ///
    /// Re-registering a known key replaces its metadata and still emits it.
    pub fn register(&mut self, batch: Vec<(String, KeyMetadata)>) {
        if batch.is_empty() {
            return;
        }

        let mut keys = Vec::with_capacity(batch.len());
        for (key, metadata) in batch {
            if self.entries.insert(key.clone(), metadata).is_none() {
                self.order.push(key.clone());
            }
            keys.push(key);
        }

        let event = KeysAdded { keys };
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
        tracing::debug!(
            keys = event.keys.len(),
            subscribers = self.subscribers.len(),
            "registered settings keys"
        );
    }

    /// Drop every subscriber channel, ending blocking consumers.
    pub fn close(&mut self) {
        self.subscribers.clear();
    }

    /// Copy every declared default into `store`.
    pub fn seed_defaults(&self, store: &mut MemoryStore) {
        for key in &self.order {
            if let Some(value) = self
                .entries
                .get(key)
                .and_then(|metadata| metadata.default_value.clone())
            {
                store.set_default(key.clone(), value);
            }
        }
    }
}

impl ConfigRegistry for MemoryRegistry {
    fn current_keys(&self) -> Vec<String> {
        self.order.clone()
    }

    fn metadata(&self, key: &str) -> Option<KeyMetadata> {
        self.entries.get(key).cloned()
    }

    fn subscribe(&mut self) -> Receiver<KeysAdded> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }
}
