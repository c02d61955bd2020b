use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;

use super::Storage;
use crate::errors::ServiceError;

/// Common interface of a database, in memory or on disk.
pub trait KeyValue {
    /// Insert or overwrite the value stored under `key`.
    fn append(&mut self, key: String, value: Value);
    /// Value stored under `key`, if any.
    fn select(&self, key: &str) -> Option<&Value>;
    /// Drop `key`; absent keys are ignored.
    fn remove(&mut self, key: &str);
    /// Drop every entry.
    fn reset(&mut self);
    /// Every key currently present, in no particular order.
    fn keys(&self) -> Vec<String>;
}

/// In-memory key-value store. Serializes as the bare JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyValueStore {
    storage: Storage,
}

impl KeyValueStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_map(storage: Storage) -> Self { Self { storage } }

    pub fn as_map(&self) -> &Storage { &self.storage }

    pub fn into_map(self) -> Storage { self.storage }

    pub fn len(&self) -> usize { self.storage.len() }

    pub fn is_empty(&self) -> bool { self.storage.is_empty() }

    /// Write this store to `path` as JSON without turning it into a `PersistentStore`.
    pub async fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ServiceError> {
        let data = serde_json::to_vec(&self.storage)?;
        fs::write(path, data).await?;
        Ok(())
    }
}

impl KeyValue for KeyValueStore {
    fn append(&mut self, key: String, value: Value) {
        self.storage.insert(key, value);
    }

    fn select(&self, key: &str) -> Option<&Value> {
        self.storage.get(key)
    }

    fn remove(&mut self, key: &str) {
        self.storage.remove(key);
    }

    fn reset(&mut self) {
        self.storage.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.storage.keys().cloned().collect()
    }
}

impl From<Storage> for KeyValueStore {
    fn from(storage: Storage) -> Self { Self::from_map(storage) }
}
