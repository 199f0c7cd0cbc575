//! Key-value store with failure injection.

use async_trait::async_trait;
use fryctoria_storage::{InMemoryStore, KeyValueStore, StorageError, StorageResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// An in-memory store whose writes can be made to fail.
///
/// Reads always succeed so that tests can inspect what was persisted
/// before the failure.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: InMemoryStore,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl FlakyStore {
    /// Creates a healthy, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following `set` and `remove` fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Returns a copy of every stored document.
    pub fn snapshot(&self) -> HashMap<String, Value> {
        self.inner.snapshot()
    }

    fn check(&self, key: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable(format!("write to {key} rejected")));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FlakyStore {
    async fn get(&self, key: &str) -> StorageResult<Option<Value>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &Value) -> StorageResult<()> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.check(key)?;
        self.inner.remove(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn rejects_writes_while_failing() {
        let store = FlakyStore::new();
        store.set("a", &json!(1)).await.unwrap();

        store.fail_writes(true);
        assert!(matches!(
            store.set("a", &json!(2)).await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(store.remove("a").await.is_err());
        assert_eq!(store.get("a").await.unwrap(), Some(json!(1)));

        store.fail_writes(false);
        store.set("a", &json!(3)).await.unwrap();
        assert_eq!(store.writes(), 2);
    }
}
