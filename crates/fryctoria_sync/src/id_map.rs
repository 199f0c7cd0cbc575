//! Reconciliation of locally minted ids with server-assigned ids.

use crate::error::SyncResult;
use crate::ids::LocalIds;
use fryctoria_storage::KeyValueStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// A confirmed mapping from a local id to the id the remote assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteIdRecord {
    /// Record type.
    pub type_name: String,
    /// Locally minted id.
    pub local_id: String,
    /// Server-assigned id.
    pub remote_id: String,
}

/// In-memory and persisted map of (type, local id) to remote id.
///
/// Lookups are pure reads of the cache. Every change rewrites the whole
/// persisted collection; the cache only changes once the write succeeds.
///
/// # Invariants
///
/// - At most one entry per (type, local id)
pub struct IdMap {
    store: Arc<dyn KeyValueStore>,
    key: String,
    ids: LocalIds,
    entries: RwLock<Vec<RemoteIdRecord>>,
    write_lock: tokio::sync::Mutex<()>,
}

impl IdMap {
    /// Creates an empty map persisted under `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>, ids: LocalIds) -> Self {
        Self {
            store,
            key: key.into(),
            ids,
            entries: RwLock::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Reads persisted mappings into the cache.
    pub async fn load_from_storage(&self) -> SyncResult<Vec<RemoteIdRecord>> {
        let _guard = self.write_lock.lock().await;
        let entries: Vec<RemoteIdRecord> = match self.store.get(&self.key).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        debug!(count = entries.len(), "loaded remote id records");
        *self.entries.write() = entries.clone();
        Ok(entries)
    }

    /// Resolves `id` of `type_name` to its remote id.
    ///
    /// Remote ids are returned unchanged. Local ids without a mapping are
    /// also returned unchanged: they cannot be resolved yet.
    pub fn resolve(&self, type_name: &str, id: &str) -> String {
        if self.ids.is_remote_id(id) {
            return id.to_string();
        }

        self.entries
            .read()
            .iter()
            .find(|e| e.type_name == type_name && e.local_id == id)
            .map(|e| e.remote_id.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Records that `local_id` of `type_name` is `remote_id` remotely.
    pub async fn record(
        &self,
        type_name: &str,
        local_id: &str,
        remote_id: &str,
    ) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries.read().clone();
        entries.retain(|e| !(e.type_name == type_name && e.local_id == local_id));
        entries.push(RemoteIdRecord {
            type_name: type_name.to_string(),
            local_id: local_id.to_string(),
            remote_id: remote_id.to_string(),
        });
        debug!(type_name, local_id, remote_id, "recorded remote id");
        self.persist(entries).await
    }

    /// Removes every mapping.
    pub async fn clear_all(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(Vec::new()).await
    }

    /// Returns a copy of every mapping.
    pub fn entries(&self) -> Vec<RemoteIdRecord> {
        self.entries.read().clone()
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    async fn persist(&self, entries: Vec<RemoteIdRecord>) -> SyncResult<()> {
        let value = serde_json::to_value(&entries)?;
        self.store.set(&self.key, &value).await?;
        *self.entries.write() = entries;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fryctoria_storage::InMemoryStore;
    use serde_json::json;

    fn id_map() -> (Arc<InMemoryStore>, IdMap) {
        let store = Arc::new(InMemoryStore::new());
        let map = IdMap::new(store.clone(), "remote-ids", LocalIds::new("fryctoria-"));
        (store, map)
    }

    #[tokio::test]
    async fn resolve_is_identity_for_remote_and_unknown_ids() {
        let (_store, map) = id_map();
        assert_eq!(map.resolve("user", "42"), "42");
        assert_eq!(map.resolve("user", "fryctoria-1"), "fryctoria-1");
    }

    #[tokio::test]
    async fn resolve_uses_recorded_mapping() {
        let (_store, map) = id_map();
        map.record("user", "fryctoria-1", "42").await.unwrap();

        assert_eq!(map.resolve("user", "fryctoria-1"), "42");
        assert_eq!(map.resolve("post", "fryctoria-1"), "fryctoria-1");
        assert_eq!(map.resolve("user", "42"), "42");
    }

    #[tokio::test]
    async fn record_replaces_existing_entry() {
        let (_store, map) = id_map();
        map.record("user", "fryctoria-1", "42").await.unwrap();
        map.record("user", "fryctoria-1", "43").await.unwrap();

        assert_eq!(map.len(), 1);
        assert_eq!(map.resolve("user", "fryctoria-1"), "43");
    }

    #[tokio::test]
    async fn persisted_layout() {
        let (store, map) = id_map();
        map.record("user", "fryctoria-1", "42").await.unwrap();

        assert_eq!(
            store.get("remote-ids").await.unwrap(),
            Some(json!([{"typeName": "user", "localId": "fryctoria-1", "remoteId": "42"}]))
        );

        let reopened = IdMap::new(store, "remote-ids", LocalIds::new("fryctoria-"));
        reopened.load_from_storage().await.unwrap();
        assert_eq!(reopened.resolve("user", "fryctoria-1"), "42");
    }

    #[tokio::test]
    async fn clear_all_empties_map() {
        let (store, map) = id_map();
        map.record("user", "fryctoria-1", "42").await.unwrap();
        map.clear_all().await.unwrap();

        assert!(map.is_empty());
        assert_eq!(store.get("remote-ids").await.unwrap(), Some(json!([])));
    }
}
