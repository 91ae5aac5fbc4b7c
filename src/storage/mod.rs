//! Durable key-value storage
//!
//! Everything the application persists (cache entries, the cache version marker,
//! bookmarks, user settings, the stored auth session) goes through a single
//! string-keyed, string-valued store. The `KvStore` trait is the seam; the
//! crate ships an in-memory backend and a file-per-key backend.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem read/write failed
    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backend cannot serve requests (e.g. no usable directory)
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// A durable string store keyed by string
///
/// All operations are asynchronous and may fail. Concurrent writes to the same
/// key are last-writer-wins.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value at `key`, `None` if absent
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes `value` at `key`, replacing any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Lists every key currently present
    async fn list_keys(&self) -> Result<Vec<String>, StorageError>;

    /// Removes every key in `keys`
    async fn remove_many(&self, keys: &[String]) -> Result<(), StorageError> {
        for key in keys {
            self.remove(key).await?;
        }
        Ok(())
    }
}
