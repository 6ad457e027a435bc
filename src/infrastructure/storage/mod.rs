pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::MemoryStore;
pub use s3::StorageService;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("object store failure: {0}")]
    Backend(String),
}

/// An object read back from the store, with the HTTP metadata it was written with.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: Option<String>,
    pub etag: Option<String>,
}

/// Key → bytes store shared by uploaded sources and published artifacts.
///
/// `put` overwrites; writing identical bytes to the same key twice is harmless.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), StoreError>;

    /// `Ok(None)` when the key is absent.
    async fn get(&self, key: &str) -> Result<Option<StoredObject>, StoreError>;

    async fn exists(&self, key: &str) -> Result<bool, StoreError>;
}
