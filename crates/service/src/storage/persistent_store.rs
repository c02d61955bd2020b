use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tokio::fs;
use tracing::{debug, warn};

use super::{KeyValue, KeyValueStore, Storage};
use crate::errors::ServiceError;

/// JSON file-backed key-value store.
///
/// Wraps a `KeyValueStore` with the path of the file it is persisted to.
/// Mutations through `KeyValue` only touch memory; call `save` to persist.
/// The path embeds the store's credential, so it is never logged.
#[derive(Debug, Clone)]
pub struct PersistentStore {
    path: PathBuf,
    data: KeyValueStore,
}

impl PersistentStore {
    /// Empty store bound to `path`. Nothing is read or written yet.
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_data(path, KeyValueStore::new())
    }

    pub fn with_data<P: Into<PathBuf>>(path: P, data: KeyValueStore) -> Self {
        Self { path: path.into(), data }
    }

    /// Replace the in-memory content with the file's content.
    ///
    /// A missing file, or one that does not hold a JSON object, keeps the
    /// current content and persists it right away.
    pub async fn load(&mut self) -> Result<&mut Self, ServiceError> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice::<Storage>(&bytes) {
                Ok(map) => self.data = KeyValueStore::from_map(map),
                Err(e) => {
                    warn!(error = %e, "stored data is malformed; reinitializing");
                    self.save().await?;
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no backing file; initializing");
                self.save().await?;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(self)
    }

    /// Overwrite the backing file with the in-memory content.
    pub async fn save(&self) -> Result<&Self, ServiceError> {
        let data = serde_json::to_vec(&self.data)?;
        fs::write(&self.path, data).await?;
        Ok(self)
    }

    /// Remove the backing file (or directory tree). Memory is left untouched.
    pub async fn delete(&self) -> Result<(), ServiceError> {
        let meta = fs::metadata(&self.path).await?;
        if meta.is_dir() {
            fs::remove_dir_all(&self.path).await?;
        } else {
            fs::remove_file(&self.path).await?;
        }
        debug!("backing file removed");
        Ok(())
    }

    pub fn set_path<P: Into<PathBuf>>(&mut self, path: P) {
        self.path = path.into();
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &KeyValueStore {
        &self.data
    }

    /// JSON text of the current content, exactly what `save` writes.
    pub fn to_json(&self) -> Result<String, ServiceError> {
        Ok(serde_json::to_string(&self.data)?)
    }

    /// Detach the content from its file.
    pub fn into_memory(self) -> KeyValueStore {
        self.data
    }
}

impl KeyValue for PersistentStore {
    fn append(&mut self, key: String, value: Value) {
        self.data.append(key, value);
    }

    fn select(&self, key: &str) -> Option<&Value> {
        self.data.select(key)
    }

    fn remove(&mut self, key: &str) {
        self.data.remove(key);
    }

    fn reset(&mut self) {
        self.data.reset();
    }

    fn keys(&self) -> Vec<String> {
        self.data.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{cleanup, temp_dir};
    use serde_json::json;

    async fn read_json(path: &Path) -> anyhow::Result<Value> {
        Ok(serde_json::from_slice(&fs::read(path).await?)?)
    }

    #[tokio::test]
    async fn load_missing_file_persists_empty_object() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_missing");
        fs::create_dir_all(&dir).await?;
        let path = dir.join("fresh.json");

        let mut store = PersistentStore::new(&path);
        store.load().await?;

        assert!(store.keys().is_empty());
        assert_eq!(fs::read_to_string(&path).await?, "{}");

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn save_then_load_round_trips() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_round_trip");
        fs::create_dir_all(&dir).await?;
        let path = dir.join("db.json");

        let mut store = PersistentStore::new(&path);
        store.append("name".into(), json!("alice"));
        store.append("tags".into(), json!(["a", "b"]));
        store.append("nested".into(), json!({"n": null, "f": 2.5}));
        store.save().await?;
        assert_eq!(read_json(&path).await?, json!({"name": "alice", "tags": ["a", "b"], "nested": {"n": null, "f": 2.5}}));

        let mut fresh = PersistentStore::new(&path);
        fresh.load().await?;
        assert_eq!(fresh.data(), store.data());

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn malformed_file_is_reinitialized() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_malformed");
        fs::create_dir_all(&dir).await?;

        for (file, content) in [("garbage.json", "{not json"), ("array.json", "[1,2]"), ("string.json", "\"\"")] {
            let path = dir.join(file);
            fs::write(&path, content).await?;
            let mut store = PersistentStore::new(&path);
            store.load().await?;
            assert!(store.keys().is_empty(), "{file} should load empty");
            assert_eq!(read_json(&path).await?, json!({}));
        }

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn load_keeps_seeded_content_when_file_missing() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_seeded");
        fs::create_dir_all(&dir).await?;
        let path = dir.join("seeded.json");

        let mut seed = KeyValueStore::new();
        seed.append("k".into(), json!(1));
        let mut store = PersistentStore::with_data(&path, seed);
        store.load().await?;

        assert_eq!(store.select("k"), Some(&json!(1)));
        assert_eq!(read_json(&path).await?, json!({"k": 1}));

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn save_into_missing_parent_fails() {
        let dir = temp_dir("persistent_no_parent");
        let store = PersistentStore::new(dir.join("nested").join("db.json"));
        assert!(matches!(store.save().await, Err(ServiceError::Io(_))));
    }

    #[tokio::test]
    async fn delete_removes_file_and_fails_when_absent() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_delete");
        fs::create_dir_all(&dir).await?;
        let path = dir.join("gone.json");

        let mut store = PersistentStore::new(&path);
        store.load().await?;
        store.delete().await?;
        assert!(fs::metadata(&path).await.is_err());

        match store.delete().await {
            Err(ServiceError::Io(e)) => assert_eq!(e.kind(), ErrorKind::NotFound),
            other => panic!("expected io error, got {other:?}"),
        }

        cleanup(&dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn set_path_does_not_touch_disk_or_memory() -> anyhow::Result<()> {
        let dir = temp_dir("persistent_set_path");
        fs::create_dir_all(&dir).await?;
        let first = dir.join("first.json");
        let second = dir.join("second.json");

        let mut store = PersistentStore::new(&first);
        store.append("a".into(), json!(1));
        store.save().await?;
        store.set_path(&second);

        assert_eq!(store.path(), second.as_path());
        assert_eq!(store.select("a"), Some(&json!(1)));
        assert!(fs::metadata(&second).await.is_err());

        store.save().await?;
        assert_eq!(read_json(&second).await?, json!({"a": 1}));

        cleanup(&dir).await;
        Ok(())
    }

    #[test]
    fn to_json_and_into_memory() {
        let mut store = PersistentStore::new("never-written.json");
        store.append("x".into(), json!(1));
        assert_eq!(store.to_json().unwrap(), r#"{"x":1}"#);

        let memory = store.into_memory();
        assert_eq!(memory.select("x"), Some(&json!(1)));
    }
}
