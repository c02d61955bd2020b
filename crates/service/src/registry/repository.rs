use async_trait::async_trait;

use crate::errors::ServiceError;
use crate::storage::Storage;

/// Operations the HTTP layer dispatches, keyed by `(credential, name)`.
/// Implementations can be file-backed, in-memory, or remote.
#[async_trait]
pub trait StoreRepository: Send + Sync {
    async fn create(&self, credential: &str, name: &str) -> Result<(), ServiceError>;
    async fn delete(&self, credential: &str, name: &str) -> Result<(), ServiceError>;
    async fn update(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError>;
    async fn select(&self, credential: &str, name: &str) -> Result<Storage, ServiceError>;
    async fn append(&self, credential: &str, name: &str, payload: Storage) -> Result<(), ServiceError>;
}
