use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::fs;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::naming;
use super::repository::StoreRepository;
use crate::errors::ServiceError;
use crate::storage::{KeyValue, KeyValueStore, PersistentStore, Storage};

/// Identity of one registered database.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    pub name: String,
    pub credential: String,
}

impl StoreKey {
    pub fn new(credential: &str, name: &str) -> Self {
        Self { name: name.to_string(), credential: credential.to_string() }
    }
}

#[derive(Debug)]
struct RegistryEntry {
    store: PersistentStore,
    // false once the entry has been deleted or failed to initialize
    live: bool,
}

type Slot = Arc<Mutex<RegistryEntry>>;

/// Set of live databases, one `PersistentStore` per `(name, credential)`.
///
/// Each entry sits behind its own async mutex, held for the whole
/// read-mutate-save cycle, so operations on one database are serialized
/// while different databases never wait on each other.
#[derive(Debug)]
pub struct StoreRegistry {
    data_dir: PathBuf,
    entries: DashMap<StoreKey, Slot>,
}

impl StoreRegistry {
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self { data_dir: data_dir.into(), entries: DashMap::new() }
    }

    /// Create the registry and populate it from the files already in `data_dir`.
    pub async fn open<P: Into<PathBuf>>(data_dir: P) -> Result<Arc<Self>, ServiceError> {
        let registry = Self::new(data_dir);
        registry.bootstrap().await?;
        Ok(Arc::new(registry))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, credential: &str, name: &str) -> bool {
        self.entries.contains_key(&StoreKey::new(credential, name))
    }

    /// Backing file of `(credential, name)`; fails on unusable characters.
    pub fn path_for(&self, credential: &str, name: &str) -> Result<PathBuf, ServiceError> {
        Ok(self.data_dir.join(naming::file_name(credential, name)?))
    }

    /// Ensure the data directory exists and register every store file in it.
    /// Returns the number of stores loaded.
    pub async fn bootstrap(&self) -> Result<usize, ServiceError> {
        fs::create_dir_all(&self.data_dir).await?;

        let mut dir = fs::read_dir(&self.data_dir).await?;
        let mut loaded = 0;
        let mut skipped = 0;
        while let Some(item) = dir.next_entry().await? {
            // file names carry credentials; skipped entries are only counted
            let file_name = item.file_name();
            let Some(file_name) = file_name.to_str() else {
                skipped += 1;
                continue;
            };
            if !item.file_type().await?.is_file() {
                skipped += 1;
                continue;
            }
            let Some((credential, name)) = naming::parse_file_name(file_name) else {
                skipped += 1;
                continue;
            };

            let key = StoreKey::new(&credential, &name);
            if self.entries.contains_key(&key) {
                continue;
            }
            let mut store = PersistentStore::new(item.path());
            store.load().await?;
            // create may have registered the same key while the file was loading
            if !self.register_loaded(key, store) {
                debug!(name = %name, "store already registered");
                continue;
            }
            info!(name = %name, "loading database");
            loaded += 1;
        }

        if skipped > 0 {
            warn!(data_dir = %self.data_dir.display(), skipped, "ignored entries that are not store files");
        }
        info!(data_dir = %self.data_dir.display(), count = loaded, "registry bootstrapped");
        Ok(loaded)
    }

    /// Register a new database and initialize its file. An existing
    /// `(name, credential)` pair is rejected rather than duplicated.
    pub async fn create(&self, credential: &str, name: &str) -> Result<(), ServiceError> {
        let path = self.path_for(credential, name)?;
        let key = StoreKey::new(credential, name);
        let slot: Slot = Arc::new(Mutex::new(RegistryEntry { store: PersistentStore::new(path), live: true }));
        // Locked before publication so nobody observes the entry before its load finishes.
        let mut guard = Arc::clone(&slot).lock_owned().await;

        match self.entries.entry(key.clone()) {
            Entry::Occupied(_) => return Err(ServiceError::AlreadyExists(name.to_string())),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&slot));
            }
        }

        let loaded = guard.store.load().await.map(|_| ());
        if let Err(e) = loaded {
            guard.live = false;
            drop(guard);
            self.entries.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot));
            warn!(name, error = %e, "store creation failed");
            return Err(e);
        }

        info!(name, "store created");
        Ok(())
    }

    /// Remove the backing file, then the entry. A failed removal keeps the entry.
    pub async fn delete(&self, credential: &str, name: &str) -> Result<(), ServiceError> {
        let key = StoreKey::new(credential, name);
        let (slot, mut guard) = self.acquire(&key).await?;

        guard.store.delete().await?;
        guard.live = false;
        drop(guard);
        self.entries.remove_if(&key, |_, v| Arc::ptr_eq(v, &slot));

        info!(name, "store deleted");
        Ok(())
    }

    /// Replace the whole content with `payload` (no merge).
    pub async fn update(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError> {
        let (_, mut guard) = self.acquire(&StoreKey::new(credential, name)).await?;

        let next = PersistentStore::with_data(guard.store.path(), KeyValueStore::from_map(payload));
        next.save().await?;
        guard.store = next;

        info!(name, "store updated");
        Ok(())
    }

    /// Snapshot of the full content.
    pub async fn select(&self, credential: &str, name: &str) -> Result<Storage, ServiceError> {
        let (_, guard) = self.acquire(&StoreKey::new(credential, name)).await?;
        Ok(guard.store.data().as_map().clone())
    }

    /// Merge every key of `payload` into the content, persisted with a single write.
    pub async fn append(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError> {
        let (_, mut guard) = self.acquire(&StoreKey::new(credential, name)).await?;

        let count = payload.len();
        let mut next = guard.store.clone();
        for (key, value) in payload {
            next.append(key, value);
        }
        next.save().await?;
        guard.store = next;

        info!(name, keys = count, "store content appended");
        Ok(())
    }

    /// Publish an already loaded store unless `key` is taken. Never replaces a slot.
    fn register_loaded(&self, key: StoreKey, store: PersistentStore) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::new(Mutex::new(RegistryEntry { store, live: true })));
                true
            }
        }
    }

    /// Lock the live entry for `key`, or report it missing.
    async fn acquire(&self, key: &StoreKey) -> Result<(Slot, OwnedMutexGuard<RegistryEntry>), ServiceError> {
        let slot = self
            .entries
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| ServiceError::not_found(&key.name))?;
        let guard = Arc::clone(&slot).lock_owned().await;
        if !guard.live {
            return Err(ServiceError::not_found(&key.name));
        }
        Ok((slot, guard))
    }
}

#[async_trait]
impl StoreRepository for StoreRegistry {
    async fn create(&self, credential: &str, name: &str) -> Result<(), ServiceError> { self.create(credential, name).await }
    async fn delete(&self, credential: &str, name: &str) -> Result<(), ServiceError> { self.delete(credential, name).await }
    async fn update(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError> { self.update(credential, name, payload).await }
    async fn select(&self, credential: &str, name: &str) -> Result<Storage, ServiceError> { self.select(credential, name).await }
    async fn append(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError> { self.append(credential, name, payload).await }
}
