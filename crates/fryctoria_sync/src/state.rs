//! Sync engine state machine.

use crate::adapter::{DataLayer, RemoteAdapter, Serializer};
use crate::bridge::{ShadowBridge, SyncDownTarget};
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::id_map::IdMap;
use crate::ids::LocalIds;
use crate::live::LiveStore;
use crate::queue::{Job, JobOperation, JobQueue};
use crate::record::{id_of, Record};
use crate::schema::RelationshipKind;
use crate::shadow::ShadowStore;
use async_trait::async_trait;
use fryctoria_storage::KeyValueStore;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Why a drain stopped before emptying the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    /// The remote was unreachable. Nothing was lost; retry later.
    Offline,
    /// The error handler asked for every pending job to be discarded.
    QueueCleared,
    /// A job failed for any other reason. The remaining jobs stay queued.
    Failed,
}

/// The current state of the sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Engine is idle, not draining.
    Idle,
    /// Engine is replaying queued jobs.
    Draining,
    /// A drain stopped early and the halt is being handled.
    Halted(HaltReason),
}

impl SyncState {
    /// Returns true if the engine is replaying jobs.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Draining)
    }
}

/// What to do with the queue after a failed drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDirective {
    /// Keep every unprocessed job for the next drain.
    Retain,
    /// Discard every job pending when the drain failed.
    ClearQueue,
}

/// Host hook invoked when a drain fails for a reason other than being offline.
#[async_trait]
pub trait SyncErrorHandler: Send + Sync {
    /// Handles `error` and decides the fate of the queue.
    async fn handle_sync_error(&self, error: &SyncError) -> ErrorDirective;
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Drains that emptied the queue.
    pub drains_completed: u64,
    /// Jobs replayed successfully.
    pub jobs_replayed: u64,
    /// Drains stopped because the remote was unreachable.
    pub offline_halts: u64,
    /// Drains stopped by any other error.
    pub failed_drains: u64,
    /// Last successful drain time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Outcome of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrainReport {
    /// Jobs replayed in this pass.
    pub replayed: usize,
    /// Jobs still queued afterwards.
    pub remaining: usize,
    /// Why the pass stopped early, if it did.
    pub halted: Option<HaltReason>,
    /// Whether this call joined a pass that was already running.
    pub joined: bool,
    /// Duration of the pass.
    pub duration: Duration,
}

impl DrainReport {
    fn idle(remaining: usize, joined: bool) -> Self {
        Self {
            replayed: 0,
            remaining,
            halted: None,
            joined,
            duration: Duration::ZERO,
        }
    }
}

/// Replays queued local mutations against the remote.
///
/// The engine owns the job queue and the id reconciliation map. Jobs are
/// replayed strictly one after another in creation order, because later
/// jobs may reference ids produced by earlier ones.
///
/// # Key Invariants
///
/// - Job N+1 never starts before job N settles
/// - A job leaves the queue only after its remote call succeeded
/// - An offline failure leaves the queue and the id map untouched
/// - Id mappings are cleared only once the whole queue has drained
pub struct SyncEngine {
    config: SyncConfig,
    ids: LocalIds,
    data: Arc<DataLayer>,
    live: Arc<dyn LiveStore>,
    queue: JobQueue,
    id_map: IdMap,
    bridge: ShadowBridge,
    state: RwLock<SyncState>,
    last_halt: RwLock<Option<HaltReason>>,
    stats: RwLock<SyncStats>,
    error_handler: RwLock<Option<Arc<dyn SyncErrorHandler>>>,
    drain_lock: tokio::sync::Mutex<()>,
}

impl SyncEngine {
    /// Creates a new sync engine.
    ///
    /// Call [`SyncEngine::init`] before use to load persisted state.
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn KeyValueStore>,
        data: Arc<DataLayer>,
        live: Arc<dyn LiveStore>,
    ) -> Self {
        let ids = LocalIds::new(config.local_id_prefix.clone());
        let queue = JobQueue::new(Arc::clone(&store), config.jobs_key());
        let id_map = IdMap::new(Arc::clone(&store), config.remote_ids_key(), ids.clone());
        let shadow = Arc::new(ShadowStore::new(store, config.clone()));
        let bridge = ShadowBridge::new(shadow, Arc::clone(&live));

        Self {
            config,
            ids,
            data,
            live,
            queue,
            id_map,
            bridge,
            state: RwLock::new(SyncState::Idle),
            last_halt: RwLock::new(None),
            stats: RwLock::new(SyncStats::default()),
            error_handler: RwLock::new(None),
            drain_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Loads the persisted job queue and id mappings.
    pub async fn init(&self) -> SyncResult<()> {
        let jobs = self.queue.load_from_storage().await?;
        let mappings = self.id_map.load_from_storage().await?;
        info!(
            jobs = jobs.len(),
            mappings = mappings.len(),
            "sync engine initialized"
        );
        Ok(())
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the reason the last drain stopped early, if it did.
    pub fn last_halt(&self) -> Option<HaltReason> {
        *self.last_halt.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Gets the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Gets the local id generator.
    pub fn local_ids(&self) -> &LocalIds {
        &self.ids
    }

    /// Gets the data layer.
    pub fn data(&self) -> &Arc<DataLayer> {
        &self.data
    }

    /// Gets the live store.
    pub fn live(&self) -> &Arc<dyn LiveStore> {
        &self.live
    }

    /// Gets the job queue.
    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Gets the id reconciliation map.
    pub fn id_map(&self) -> &IdMap {
        &self.id_map
    }

    /// Gets the shadow store.
    pub fn shadow(&self) -> &Arc<ShadowStore> {
        self.bridge.shadow()
    }

    /// Installs the handler invoked when a drain fails.
    pub fn set_error_handler(&self, handler: Arc<dyn SyncErrorHandler>) {
        *self.error_handler.write() = Some(handler);
    }

    /// Removes the error handler; failures are then only logged.
    pub fn clear_error_handler(&self) {
        *self.error_handler.write() = None;
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Queues a job replaying `operation` on `record`.
    pub async fn create_job(&self, operation: JobOperation, record: &Record) -> SyncResult<Vec<Job>> {
        let snapshot = self.data.serializer_for(&record.type_name).serialize(record);
        self.queue
            .enqueue(operation, record.type_name.clone(), snapshot)
            .await
    }

    /// Replays every queued job, swallowing failures.
    ///
    /// Offline failures stop the drain quietly. Other failures are logged
    /// and passed to the error handler, if one is installed. Routine reads
    /// and writes call this and must never fail because of it.
    ///
    /// The handler runs before the drain guard is released, so a concurrent
    /// call joins this one. [`ErrorDirective::ClearQueue`] discards only the
    /// jobs that were pending when the drain failed.
    pub async fn sync_up(&self) {
        let Some(_guard) = self.acquire_drain().await else {
            return;
        };
        let Err(err) = self.run_pass().await else {
            return;
        };

        error!(error = %err, "sync up failed");
        self.set_state(SyncState::Halted(HaltReason::Failed));

        let handler = self.error_handler.read().clone();
        if let Some(handler) = handler {
            let pending: HashSet<String> = self.queue.jobs().into_iter().map(|j| j.id).collect();
            if handler.handle_sync_error(&err).await == ErrorDirective::ClearQueue {
                self.set_state(SyncState::Halted(HaltReason::QueueCleared));
                *self.last_halt.write() = Some(HaltReason::QueueCleared);
                match self.queue.discard(&pending).await {
                    Ok(kept) => info!(
                        discarded = pending.len(),
                        kept = kept.len(),
                        "discarded pending jobs after sync failure"
                    ),
                    Err(e) => error!(error = %e, "failed to discard pending jobs"),
                }
            }
        }
        self.set_state(SyncState::Idle);
    }

    /// Replays every queued job, reporting failures.
    ///
    /// An unreachable remote is not an error: the report says the drain
    /// halted with [`HaltReason::Offline`]. A call made while another drain
    /// is running waits for that drain and returns without replaying.
    pub async fn try_sync_up(&self) -> SyncResult<DrainReport> {
        match self.acquire_drain().await {
            Some(_guard) => self.run_pass().await,
            None => Ok(DrainReport::idle(self.queue.len(), true)),
        }
    }

    /// Takes the drain guard, or waits out the running drain and returns
    /// `None`.
    async fn acquire_drain(&self) -> Option<tokio::sync::MutexGuard<'_, ()>> {
        match self.drain_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                debug!("drain already running, joining it");
                drop(self.drain_lock.lock().await);
                None
            }
        }
    }

    /// Runs one drain pass. The caller holds the drain guard.
    async fn run_pass(&self) -> SyncResult<DrainReport> {
        if self.queue.is_empty() {
            return Ok(DrainReport::idle(0, false));
        }

        let start = Instant::now();
        self.set_state(SyncState::Draining);
        *self.last_halt.write() = None;

        let result = self.drain(start).await;

        match &result {
            Ok(report) => {
                *self.last_halt.write() = report.halted;
                let mut stats = self.stats.write();
                match report.halted {
                    Some(_) => stats.offline_halts += 1,
                    None => {
                        stats.drains_completed += 1;
                        stats.last_sync_time = Some(Instant::now());
                        stats.last_error = None;
                    }
                }
            }
            Err(err) => {
                *self.last_halt.write() = Some(HaltReason::Failed);
                let mut stats = self.stats.write();
                stats.failed_drains += 1;
                stats.last_error = Some(err.to_string());
            }
        }
        self.set_state(SyncState::Idle);
        result
    }

    async fn drain(&self, start: Instant) -> SyncResult<DrainReport> {
        let jobs = self.queue.sorted();
        info!(count = jobs.len(), "draining job queue");

        let mut replayed = 0;
        for job in &jobs {
            let outcome = match self.run_job(job).await {
                Ok(()) => self.queue.dequeue(&job.id).await.map(|_| ()),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    replayed += 1;
                    self.stats.write().jobs_replayed += 1;
                }
                Err(err) if err.is_offline() => {
                    self.set_state(SyncState::Halted(HaltReason::Offline));
                    info!(
                        replayed,
                        remaining = self.queue.len(),
                        "can not connect to server, stop syncing"
                    );
                    return Ok(DrainReport {
                        replayed,
                        remaining: self.queue.len(),
                        halted: Some(HaltReason::Offline),
                        joined: false,
                        duration: start.elapsed(),
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if self.queue.is_empty() {
            self.id_map.clear_all().await?;
        } else {
            debug!(
                remaining = self.queue.len(),
                "jobs queued during drain, keeping id mappings"
            );
        }

        info!(replayed, "sync up complete");
        Ok(DrainReport {
            replayed,
            remaining: self.queue.len(),
            halted: None,
            joined: false,
            duration: start.elapsed(),
        })
    }

    async fn run_job(&self, job: &Job) -> SyncResult<()> {
        let type_name = job.type_name.as_str();
        let adapter = self.data.adapter_for(type_name);
        let serializer = self.data.serializer_for(type_name);

        let mut record = Record::new(type_name, job.record.clone());
        self.resolve_relationships(&mut record);
        debug!(job_id = %job.id, operation = ?job.operation, type_name, "replaying job");

        match job.operation {
            JobOperation::Create => {
                self.replay_create(record, adapter.as_ref(), serializer.as_ref())
                    .await
            }
            JobOperation::Update => {
                self.resolve_own_id(&mut record);
                adapter
                    .update_record(type_name, &serializer.serialize(&record))
                    .await?;
                Ok(())
            }
            JobOperation::Delete => {
                self.resolve_own_id(&mut record);
                adapter
                    .delete_record(type_name, &serializer.serialize(&record))
                    .await?;
                if let Some(id) = record.id() {
                    self.shadow().delete(type_name, &id).await?;
                }
                Ok(())
            }
        }
    }

    async fn replay_create(
        &self,
        mut record: Record,
        adapter: &dyn RemoteAdapter,
        serializer: &dyn Serializer,
    ) -> SyncResult<()> {
        let type_name = record.type_name.clone();
        let local_id = record.id();

        record.set_id(None);
        let payload = adapter
            .create_record(&type_name, &serializer.serialize(&record))
            .await?;

        let server_fields = serializer.extract(&type_name, payload, None)?;
        let remote_id = id_of(&server_fields).ok_or_else(|| {
            SyncError::InvalidResponse(format!("create response for {type_name} carries no id"))
        })?;

        let mut shadowed = record;
        if let Some(local_id) = &local_id {
            if !self
                .live
                .rekey(&type_name, local_id, &remote_id, &server_fields)
            {
                debug!(%type_name, %local_id, "record gone from live store, nothing to re-key");
            }
            self.id_map.record(&type_name, local_id, &remote_id).await?;

            if let Some(existing) = self.shadow().find(&type_name, local_id).await? {
                shadowed = existing;
            }
            self.shadow().delete(&type_name, local_id).await?;
        }

        shadowed.merge_fields(&server_fields);
        shadowed.set_id(Some(remote_id.clone()));
        self.shadow().upsert(&shadowed).await?;

        debug!(%type_name, local_id = ?local_id, %remote_id, "created remotely");
        Ok(())
    }

    fn resolve_own_id(&self, record: &mut Record) {
        if let Some(id) = record.id() {
            let resolved = self.id_map.resolve(&record.type_name, &id);
            record.set_id(Some(resolved));
        }
    }

    fn resolve_relationships(&self, record: &mut Record) {
        for relationship in self.data.schema().relationships(&record.type_name) {
            let Some(value) = record.fields.get_mut(&relationship.name) else {
                continue;
            };
            match relationship.kind {
                RelationshipKind::BelongsTo => {
                    self.resolve_reference(value, &relationship.target_type)
                }
                RelationshipKind::HasMany => {
                    if let Value::Array(items) = value {
                        for item in items {
                            self.resolve_reference(item, &relationship.target_type);
                        }
                    }
                }
            }
        }
    }

    fn resolve_reference(&self, value: &mut Value, target_type: &str) {
        let slot = match value {
            Value::Object(map) => map.get_mut("id"),
            other => Some(other),
        };
        if let Some(Value::String(id)) = slot {
            *id = self.id_map.resolve(target_type, id);
        }
    }

    /// Mirrors `target` into the shadow store.
    pub async fn sync_down(&self, target: impl Into<SyncDownTarget>) -> SyncResult<()> {
        self.bridge.sync_down(target.into()).await
    }

    /// Mirrors a dynamically shaped target into the shadow store.
    ///
    /// Returns [`SyncError::InvalidInput`] before touching storage if
    /// `target` is not a type name, record or record list.
    pub async fn sync_down_value(&self, target: Value) -> SyncResult<()> {
        let target = SyncDownTarget::try_from(target)?;
        self.bridge.sync_down(target).await
    }

    /// Replaces the shadow collection of `type_name` with `records`.
    pub async fn trash_and_recreate(&self, type_name: &str, records: &[Record]) -> SyncResult<usize> {
        self.bridge.trash_and_recreate(type_name, records).await
    }

    /// Discards every pending job, id mapping and shadow record.
    pub async fn reset(&self) -> SyncResult<()> {
        let _guard = self.drain_lock.lock().await;
        self.queue.clear_all().await?;
        self.id_map.clear_all().await?;
        self.shadow().clear_all().await?;
        *self.last_halt.write() = None;
        info!("sync state reset");
        Ok(())
    }
}
