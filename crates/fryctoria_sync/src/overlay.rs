//! Store overlay routing reads and writes to the remote or the shadow store.
//!
//! Reads first push pending local writes (read-your-writes), then hit the
//! remote. The first time the remote is unreachable the overlay switches to
//! the local shadow store and stays there until the host calls
//! [`OfflineStore::set_online`].

use crate::error::{SyncError, SyncResult};
use crate::queue::JobOperation;
use crate::record::{id_of, Record};
use crate::state::SyncEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Which adapter serves a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterKind {
    /// The remote adapter from the data layer.
    Remote,
    /// The local shadow store.
    Local,
}

/// Host-facing store that keeps working while the remote is unreachable.
pub struct OfflineStore {
    engine: Arc<SyncEngine>,
    offline: AtomicBool,
}

impl OfflineStore {
    /// Creates an overlay over `engine`.
    pub fn new(engine: Arc<SyncEngine>) -> Self {
        Self {
            engine,
            offline: AtomicBool::new(false),
        }
    }

    /// Gets the sync engine.
    pub fn engine(&self) -> &Arc<SyncEngine> {
        &self.engine
    }

    /// Returns true once a remote call has found the remote unreachable.
    pub fn is_offline(&self) -> bool {
        self.offline.load(Ordering::SeqCst)
    }

    /// Routes calls back to the remote adapter.
    pub fn set_online(&self) {
        if self.offline.swap(false, Ordering::SeqCst) {
            info!("switching back to remote adapter");
        }
    }

    /// Returns the adapter that serves `type_name`.
    pub fn adapter_kind(&self, _type_name: &str) -> AdapterKind {
        if self.is_offline() {
            AdapterKind::Local
        } else {
            AdapterKind::Remote
        }
    }

    fn go_offline(&self) {
        if !self.offline.swap(true, Ordering::SeqCst) {
            info!("remote unreachable, switching to local adapter");
        }
    }

    /// Fetches every record of `type_name`.
    pub async fn find_all(&self, type_name: &str) -> SyncResult<Vec<Record>> {
        self.engine.sync_up().await;

        if self.adapter_kind(type_name) == AdapterKind::Remote {
            match self.find_all_remote(type_name).await {
                Err(err) if err.is_offline() => self.go_offline(),
                other => return other,
            }
        }

        let records = self.engine.shadow().find_all(type_name).await?;
        self.engine.live().replace_all(type_name, records.clone());
        Ok(records)
    }

    /// Fetches the record of `type_name` with `id`.
    pub async fn find_record(&self, type_name: &str, id: &str) -> SyncResult<Record> {
        self.engine.sync_up().await;

        let local_only = !self.engine.local_ids().is_remote_id(id);
        if !local_only && self.adapter_kind(type_name) == AdapterKind::Remote {
            match self.find_record_remote(type_name, id).await {
                Err(err) if err.is_offline() => self.go_offline(),
                other => return other,
            }
        }

        let record = self
            .engine
            .shadow()
            .find(type_name, id)
            .await?
            .ok_or_else(|| SyncError::RecordNotFound {
                type_name: type_name.to_string(),
                id: id.to_string(),
            })?;
        self.engine.live().upsert(record.clone());
        Ok(record)
    }

    /// Creates a record, remotely when possible, otherwise as a queued job.
    ///
    /// Records created locally get a fresh local id if they have none.
    pub async fn create_record(&self, record: Record) -> SyncResult<Record> {
        if self.use_remote(&record.type_name).await {
            match self.create_remote(&record).await {
                Err(err) if err.is_offline() => self.go_offline(),
                other => return other,
            }
        }

        let mut record = record;
        if record.id().is_none() {
            record.set_id(Some(self.engine.local_ids().generate()));
        }
        self.save_local(JobOperation::Create, &record).await?;
        Ok(record)
    }

    /// Updates a record, remotely when possible, otherwise as a queued job.
    pub async fn update_record(&self, record: Record) -> SyncResult<Record> {
        require_id(&record)?;
        if self.use_remote(&record.type_name).await {
            let adapter = self.engine.data().adapter_for(&record.type_name);
            let snapshot = self
                .engine
                .data()
                .serializer_for(&record.type_name)
                .serialize(&record);
            match adapter.update_record(&record.type_name, &snapshot).await {
                Ok(_) => {
                    self.engine.live().upsert(record.clone());
                    self.engine.sync_down(record.clone()).await?;
                    return Ok(record);
                }
                Err(err) if err.is_offline() => self.go_offline(),
                Err(err) => return Err(err),
            }
        }

        self.save_local(JobOperation::Update, &record).await?;
        Ok(record)
    }

    /// Deletes a record, remotely when possible, otherwise as a queued job.
    pub async fn delete_record(&self, record: Record) -> SyncResult<()> {
        let id = require_id(&record)?;
        if self.use_remote(&record.type_name).await {
            let adapter = self.engine.data().adapter_for(&record.type_name);
            let snapshot = self
                .engine
                .data()
                .serializer_for(&record.type_name)
                .serialize(&record);
            match adapter.delete_record(&record.type_name, &snapshot).await {
                Ok(_) => {
                    self.engine.live().remove(&record.type_name, &id);
                    self.engine.sync_down(record.mark_deleted()).await?;
                    return Ok(());
                }
                Err(err) if err.is_offline() => self.go_offline(),
                Err(err) => return Err(err),
            }
        }

        self.engine.shadow().delete(&record.type_name, &id).await?;
        self.engine.live().remove(&record.type_name, &id);
        self.engine.create_job(JobOperation::Delete, &record).await?;
        Ok(())
    }

    /// Writes go remote only when online and nothing is queued ahead of them.
    async fn use_remote(&self, type_name: &str) -> bool {
        if self.adapter_kind(type_name) == AdapterKind::Local {
            return false;
        }
        if !self.engine.queue().is_empty() {
            self.engine.sync_up().await;
        }
        let clear = self.engine.queue().is_empty();
        if !clear {
            debug!(type_name, "jobs still queued, writing locally to keep order");
        }
        clear
    }

    async fn find_all_remote(&self, type_name: &str) -> SyncResult<Vec<Record>> {
        let payload = self.engine.data().adapter_for(type_name).find_all(type_name).await?;
        let fetched: Vec<Record> = self
            .engine
            .data()
            .serializer_for(type_name)
            .extract_many(type_name, payload)?
            .into_iter()
            .map(|fields| Record::new(type_name, fields))
            .collect();

        let ids = self.engine.local_ids();
        let mut live: Vec<Record> = self
            .engine
            .live()
            .all(type_name)
            .into_iter()
            .filter(|r| r.id().is_some_and(|id| !ids.is_remote_id(&id)))
            .collect();
        live.extend(fetched.iter().cloned());
        self.engine.live().replace_all(type_name, live);

        self.engine.sync_down(type_name).await?;
        Ok(fetched)
    }

    async fn find_record_remote(&self, type_name: &str, id: &str) -> SyncResult<Record> {
        let payload = self
            .engine
            .data()
            .adapter_for(type_name)
            .find_record(type_name, id)
            .await?;
        let fields = self
            .engine
            .data()
            .serializer_for(type_name)
            .extract(type_name, payload, Some(id))?;
        let record = Record::new(type_name, fields);

        self.engine.live().upsert(record.clone());
        self.engine.sync_down(type_name).await?;
        Ok(record)
    }

    async fn create_remote(&self, record: &Record) -> SyncResult<Record> {
        let type_name = record.type_name.as_str();
        let serializer = self.engine.data().serializer_for(type_name);

        let mut outgoing = record.clone();
        outgoing.set_id(None);
        let payload = self
            .engine
            .data()
            .adapter_for(type_name)
            .create_record(type_name, &serializer.serialize(&outgoing))
            .await?;

        let server_fields = serializer.extract(type_name, payload, None)?;
        let remote_id = id_of(&server_fields).ok_or_else(|| {
            SyncError::InvalidResponse(format!("create response for {type_name} carries no id"))
        })?;

        let mut created = outgoing;
        created.merge_fields(&server_fields);
        created.set_id(Some(remote_id));

        if let Some(old_id) = record.id() {
            self.engine.live().remove(type_name, &old_id);
            self.engine.shadow().delete(type_name, &old_id).await?;
        }
        self.engine.live().upsert(created.clone());
        self.engine.sync_down(created.clone()).await?;
        Ok(created)
    }

    async fn save_local(&self, operation: JobOperation, record: &Record) -> SyncResult<()> {
        self.engine.shadow().upsert(record).await?;
        self.engine.live().upsert(record.clone());
        self.engine.create_job(operation, record).await?;
        debug!(type_name = %record.type_name, ?operation, "saved locally");
        Ok(())
    }
}

fn require_id(record: &Record) -> SyncResult<String> {
    record.id().ok_or_else(|| {
        SyncError::InvalidInput(format!("{} record has no id", record.type_name))
    })
}
