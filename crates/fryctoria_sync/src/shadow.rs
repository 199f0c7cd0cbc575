//! Local shadow copies of records for offline reads.

use crate::config::SyncConfig;
use crate::error::SyncResult;
use crate::record::Record;
use fryctoria_storage::KeyValueStore;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

type Collection = BTreeMap<String, Map<String, Value>>;

/// Records materialized directly into local storage.
///
/// Each type is stored as one document mapping id to fields. A separate
/// index lists every type that has ever been shadowed so the whole store
/// can be cleared. Writes skip validation entirely.
pub struct ShadowStore {
    store: Arc<dyn KeyValueStore>,
    config: SyncConfig,
    write_lock: tokio::sync::Mutex<()>,
}

impl ShadowStore {
    /// Creates a shadow store over `store`.
    pub fn new(store: Arc<dyn KeyValueStore>, config: SyncConfig) -> Self {
        Self {
            store,
            config,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Returns every shadowed record of `type_name`.
    pub async fn find_all(&self, type_name: &str) -> SyncResult<Vec<Record>> {
        let collection = self.load(type_name).await?;
        Ok(collection
            .into_values()
            .map(|fields| Record::new(type_name, fields))
            .collect())
    }

    /// Returns the shadowed record of `type_name` with `id`.
    pub async fn find(&self, type_name: &str, id: &str) -> SyncResult<Option<Record>> {
        let mut collection = self.load(type_name).await?;
        Ok(collection
            .remove(id)
            .map(|fields| Record::new(type_name, fields)))
    }

    /// Writes `record` under its id, replacing any previous copy.
    ///
    /// Returns false without writing if the record has no id.
    pub async fn upsert(&self, record: &Record) -> SyncResult<bool> {
        let Some(id) = record.id() else {
            warn!(type_name = %record.type_name, "record without id cannot be shadowed");
            return Ok(false);
        };

        let _guard = self.write_lock.lock().await;
        self.register_type(&record.type_name).await?;
        let mut collection = self.load(&record.type_name).await?;
        collection.insert(id.clone(), record.fields.clone());
        self.save(&record.type_name, &collection).await?;

        debug!(type_name = %record.type_name, %id, "shadowed record");
        Ok(true)
    }

    /// Removes the shadowed record of `type_name` with `id`.
    pub async fn delete(&self, type_name: &str, id: &str) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut collection = self.load(type_name).await?;
        if collection.remove(id).is_some() {
            self.save(type_name, &collection).await?;
            debug!(type_name, id, "removed shadow record");
        }
        Ok(())
    }

    /// Returns every type that has shadow records.
    pub async fn types(&self) -> SyncResult<Vec<String>> {
        Ok(match self.store.get(&self.config.shadow_types_key()).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        })
    }

    /// Removes every shadowed record of every type.
    pub async fn clear_all(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        for type_name in self.types().await? {
            self.store.remove(&self.config.shadow_key(&type_name)).await?;
        }
        self.store.remove(&self.config.shadow_types_key()).await?;
        Ok(())
    }

    async fn register_type(&self, type_name: &str) -> SyncResult<()> {
        let mut types = self.types().await?;
        if !types.iter().any(|t| t == type_name) {
            types.push(type_name.to_string());
            self.store
                .set(&self.config.shadow_types_key(), &serde_json::to_value(&types)?)
                .await?;
        }
        Ok(())
    }

    async fn load(&self, type_name: &str) -> SyncResult<Collection> {
        Ok(match self.store.get(&self.config.shadow_key(type_name)).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Collection::new(),
        })
    }

    async fn save(&self, type_name: &str, collection: &Collection) -> SyncResult<()> {
        self.store
            .set(
                &self.config.shadow_key(type_name),
                &serde_json::to_value(collection)?,
            )
            .await?;
        Ok(())
    }
}
