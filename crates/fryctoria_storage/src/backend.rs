//! Key-value store trait definition.

use crate::error::StorageResult;
use async_trait::async_trait;
use serde_json::Value;

/// An async key-value store holding JSON documents.
///
/// Stores are **opaque document maps**. The sync layer owns the meaning of
/// every key and document; stores only persist them.
///
/// # Invariants
///
/// - `get` returns exactly the document last passed to `set` for that key
/// - `remove` on an absent key succeeds
/// - Writes to different keys are independent (no multi-key atomicity)
/// - Stores must be `Send + Sync` for sharing across tasks
///
/// # Implementors
///
/// - [`super::InMemoryStore`] - For testing
/// - [`super::FileStore`] - For persistent storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Reads the document stored under `key`.
    ///
    /// Returns `None` if nothing has been stored under that key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the read fails.
    async fn get(&self, key: &str) -> StorageResult<Option<Value>>;

    /// Stores `value` under `key`, replacing any previous document.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    async fn set(&self, key: &str, value: &Value) -> StorageResult<()>;

    /// Removes the document stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the removal fails.
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Rejects keys no store can address.
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(crate::StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}
