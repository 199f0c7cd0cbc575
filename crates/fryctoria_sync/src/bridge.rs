//! Mirroring of live records into the shadow store.

use crate::error::{SyncError, SyncResult};
use crate::live::LiveStore;
use crate::record::Record;
use crate::shadow::ShadowStore;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a `sync_down` call should mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncDownTarget {
    /// Reload the whole shadow collection of a type.
    Type(String),
    /// Mirror one record.
    Record(Record),
    /// Mirror each record.
    Records(Vec<Record>),
}

impl From<&str> for SyncDownTarget {
    fn from(type_name: &str) -> Self {
        Self::Type(type_name.to_string())
    }
}

impl From<String> for SyncDownTarget {
    fn from(type_name: String) -> Self {
        Self::Type(type_name)
    }
}

impl From<Record> for SyncDownTarget {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<Record>> for SyncDownTarget {
    fn from(records: Vec<Record>) -> Self {
        Self::Records(records)
    }
}

impl TryFrom<Value> for SyncDownTarget {
    type Error = SyncError;

    /// Accepts a type name, a serialized [`Record`] or an array of them.
    fn try_from(value: Value) -> SyncResult<Self> {
        match value {
            Value::String(type_name) => Ok(Self::Type(type_name)),
            Value::Object(_) => serde_json::from_value(value)
                .map(Self::Record)
                .map_err(|e| SyncError::InvalidInput(format!("not a record: {e}"))),
            Value::Array(_) => serde_json::from_value(value)
                .map(Self::Records)
                .map_err(|e| SyncError::InvalidInput(format!("not a record list: {e}"))),
            other => Err(SyncError::InvalidInput(format!(
                "sync_down expects a type name, record or record list, got {other}"
            ))),
        }
    }
}

/// Keeps the shadow store in step with the live store.
pub struct ShadowBridge {
    shadow: Arc<ShadowStore>,
    live: Arc<dyn LiveStore>,
}

impl ShadowBridge {
    /// Creates a bridge between `live` and `shadow`.
    pub fn new(shadow: Arc<ShadowStore>, live: Arc<dyn LiveStore>) -> Self {
        Self { shadow, live }
    }

    /// Returns the shadow store.
    pub fn shadow(&self) -> &Arc<ShadowStore> {
        &self.shadow
    }

    /// Mirrors `target` into the shadow store.
    pub async fn sync_down(&self, target: SyncDownTarget) -> SyncResult<()> {
        match target {
            SyncDownTarget::Type(type_name) => {
                self.reload(&type_name).await?;
            }
            SyncDownTarget::Record(record) => self.apply(&record).await?,
            SyncDownTarget::Records(records) => {
                for record in &records {
                    self.apply(record).await?;
                }
            }
        }
        Ok(())
    }

    /// Replaces the shadow collection of `type_name` with the live records.
    ///
    /// Returns the number of records written.
    pub async fn reload(&self, type_name: &str) -> SyncResult<usize> {
        let records = self.live.all(type_name);
        self.trash_and_recreate(type_name, &records).await
    }

    /// Deletes every shadow record of `type_name`, then writes `records`.
    ///
    /// All deletions finish before the first write. Records without an id
    /// are skipped. Returns the number of records written.
    pub async fn trash_and_recreate(&self, type_name: &str, records: &[Record]) -> SyncResult<usize> {
        let existing = self.shadow.find_all(type_name).await?;
        for record in &existing {
            if let Some(id) = record.id() {
                self.shadow.delete(type_name, &id).await?;
            }
        }

        let mut written = 0;
        for record in records {
            if record.id().is_none() {
                warn!(type_name, "skipping record without id during reload");
                continue;
            }
            if self.shadow.upsert(record).await? {
                written += 1;
            }
        }

        debug!(
            type_name,
            removed = existing.len(),
            written,
            "reloaded shadow collection"
        );
        Ok(written)
    }

    async fn apply(&self, record: &Record) -> SyncResult<()> {
        if record.deleted {
            if let Some(id) = record.id() {
                self.shadow.delete(&record.type_name, &id).await?;
            }
            return Ok(());
        }
        self.shadow.upsert(record).await?;
        Ok(())
    }
}
