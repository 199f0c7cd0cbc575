//! # Fryctoria Sync
//!
//! Offline-first synchronization layer in front of a remote data store.
//!
//! This crate provides:
//! - A durable job queue of local mutations
//! - Reconciliation of locally minted ids with server-assigned ids
//! - A serial replay engine with offline detection
//! - Shadow copies of remote records for offline reads
//! - A store overlay that falls back to local storage when offline
//!
//! ## Architecture
//!
//! Every local mutation becomes a [`Job`] persisted through a
//! [`fryctoria_storage::KeyValueStore`]. When connectivity returns the
//! [`SyncEngine`] drains the queue:
//! 1. Sort jobs by creation time
//! 2. For each job, rewrite local ids to remote ids through the [`IdMap`]
//! 3. Call the type's [`RemoteAdapter`]
//! 4. On a create, re-key the live record and its shadow copy
//! 5. Dequeue the job and move to the next one
//!
//! ## Key Invariants
//!
//! - Jobs replay strictly one at a time, in creation order
//! - An unreachable remote halts the drain without touching any state
//! - Id mappings are dropped only after the whole queue drained
//! - Routine reads and writes never fail because a drain failed

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod adapter;
mod bridge;
mod config;
mod error;
mod id_map;
mod ids;
mod live;
mod overlay;
mod queue;
mod record;
mod schema;
mod shadow;
mod state;

pub use adapter::{DataLayer, JsonSerializer, RemoteAdapter, Serializer};
pub use bridge::{ShadowBridge, SyncDownTarget};
pub use config::{SyncConfig, DEFAULT_LOCAL_ID_PREFIX, DEFAULT_NAMESPACE};
pub use error::{SyncError, SyncResult, OFFLINE_STATUS};
pub use id_map::{IdMap, RemoteIdRecord};
pub use ids::LocalIds;
pub use live::{LiveStore, MemoryLiveStore};
pub use overlay::{AdapterKind, OfflineStore};
pub use queue::{Job, JobOperation, JobQueue};
pub use record::{id_of, Record, ID_FIELD};
pub use schema::{Relationship, RelationshipKind, Schema, TypeDescriptor};
pub use shadow::ShadowStore;
pub use state::{
    DrainReport, ErrorDirective, HaltReason, SyncEngine, SyncErrorHandler, SyncState, SyncStats,
};
