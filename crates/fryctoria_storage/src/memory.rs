//! In-memory key-value store for testing.

use crate::backend::{validate_key, KeyValueStore};
use crate::error::StorageResult;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;

/// An in-memory key-value store.
///
/// This store keeps all documents in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral sync state that doesn't need to survive restarts
///
/// # Thread Safety
///
/// This store is thread-safe and can be shared across tasks.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<HashMap<String, Value>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store with pre-existing documents.
    ///
    /// Useful for testing startup recovery.
    #[must_use]
    pub fn with_data(data: HashMap<String, Value>) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }

    /// Returns a copy of every stored document.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.data.read().clone()
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns true if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        validate_key(key)?;
        Ok(self.data.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        validate_key(key)?;
        self.data.write().insert(key.to_string(), value.clone());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.data.write().remove(key);
        Ok(())
    }
}
