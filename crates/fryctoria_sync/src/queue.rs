//! Durable queue of pending mutation jobs.

use crate::error::SyncResult;
use fryctoria_storage::KeyValueStore;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use uuid::Uuid;

/// The mutation a job replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobOperation {
    /// Create the record remotely.
    #[serde(rename = "createRecord")]
    Create,
    /// Update the record remotely.
    #[serde(rename = "updateRecord")]
    Update,
    /// Delete the record remotely.
    #[serde(rename = "deleteRecord")]
    Delete,
}

/// A pending local mutation awaiting remote replay.
///
/// # Fields
///
/// - `id`: unique job identifier
/// - `operation`: what to replay
/// - `type_name`: type of the mutated record
/// - `record`: wire-shape snapshot, relationships expressed as ids
/// - `created_at`: millisecond timestamp, strictly increasing per queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job ID.
    pub id: String,
    /// Operation to replay.
    pub operation: JobOperation,
    /// Record type.
    pub type_name: String,
    /// Serialized record snapshot.
    pub record: Map<String, Value>,
    /// Creation timestamp in milliseconds.
    pub created_at: u64,
}

/// Millisecond clock that never repeats or goes backwards.
#[derive(Debug, Default)]
struct MonotonicClock {
    last: AtomicU64,
}

impl MonotonicClock {
    fn now(&self) -> u64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        let mut last = self.last.load(Ordering::SeqCst);
        loop {
            let next = wall.max(last.saturating_add(1));
            match self
                .last
                .compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    fn observe(&self, timestamp: u64) {
        self.last.fetch_max(timestamp, Ordering::SeqCst);
    }
}

/// Ordered, persisted list of pending jobs.
///
/// The queue keeps an in-memory cache and rewrites the whole persisted
/// collection on every change. The cache only changes after the write
/// succeeds, so a storage failure leaves both sides as they were.
///
/// # Invariants
///
/// - Job ids are unique
/// - Replay order is ascending `created_at`, ties in insertion order
/// - The persisted collection is unordered; [`JobQueue::sorted`] orders it
pub struct JobQueue {
    store: Arc<dyn KeyValueStore>,
    key: String,
    jobs: RwLock<Vec<Job>>,
    clock: MonotonicClock,
    write_lock: tokio::sync::Mutex<()>,
}

impl JobQueue {
    /// Creates an empty queue persisted under `key`.
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            jobs: RwLock::new(Vec::new()),
            clock: MonotonicClock::default(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Reads persisted jobs into the cache.
    ///
    /// A missing collection loads as empty.
    pub async fn load_from_storage(&self) -> SyncResult<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let jobs: Vec<Job> = match self.store.get(&self.key).await? {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        if let Some(latest) = jobs.iter().map(|j| j.created_at).max() {
            self.clock.observe(latest);
        }
        debug!(count = jobs.len(), "loaded jobs");

        *self.jobs.write() = jobs.clone();
        Ok(jobs)
    }

    /// Appends a job for `operation` on a record and persists the queue.
    ///
    /// Returns the full job list after the append.
    pub async fn enqueue(
        &self,
        operation: JobOperation,
        type_name: impl Into<String>,
        record: Map<String, Value>,
    ) -> SyncResult<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let job = Job {
            id: Uuid::new_v4().to_string(),
            operation,
            type_name: type_name.into(),
            record,
            created_at: self.clock.now(),
        };
        debug!(job_id = %job.id, ?operation, type_name = %job.type_name, "enqueue job");

        let mut jobs = self.jobs.read().clone();
        jobs.push(job);
        self.persist(jobs).await
    }

    /// Removes the job with `job_id` and persists the remainder.
    ///
    /// Removing an absent id is a no-op removal.
    pub async fn dequeue(&self, job_id: &str) -> SyncResult<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.jobs.read().clone();
        jobs.retain(|j| j.id != job_id);
        self.persist(jobs).await
    }

    /// Removes every job whose id is in `job_ids` and persists the rest.
    ///
    /// Jobs enqueued after `job_ids` was collected are kept.
    pub async fn discard(&self, job_ids: &HashSet<String>) -> SyncResult<Vec<Job>> {
        let _guard = self.write_lock.lock().await;
        let mut jobs = self.jobs.read().clone();
        jobs.retain(|j| !job_ids.contains(&j.id));
        self.persist(jobs).await
    }

    /// Empties the queue and persists the empty collection.
    pub async fn clear_all(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        self.persist(Vec::new()).await?;
        Ok(())
    }

    /// Returns the jobs in replay order.
    pub fn sorted(&self) -> Vec<Job> {
        let mut jobs = self.jobs.read().clone();
        jobs.sort_by_key(|j| j.created_at);
        jobs
    }

    /// Returns the jobs in insertion order.
    pub fn jobs(&self) -> Vec<Job> {
        self.jobs.read().clone()
    }

    /// Returns the number of pending jobs.
    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    /// Returns true if no job is pending.
    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    async fn persist(&self, jobs: Vec<Job>) -> SyncResult<Vec<Job>> {
        let value = serde_json::to_value(&jobs)?;
        self.store.set(&self.key, &value).await?;
        *self.jobs.write() = jobs.clone();
        Ok(jobs)
    }
}
