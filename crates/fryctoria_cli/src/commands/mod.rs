//! CLI command implementations.

pub mod inspect;
pub mod jobs;
pub mod mappings;
pub mod reset;
pub mod shadow;

use fryctoria_storage::{FileStore, KeyValueStore};
use fryctoria_sync::{IdMap, JobQueue, LocalIds, ShadowStore, SyncConfig, SyncError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the CLI itself.
#[derive(Debug, Error)]
pub enum CliError {
    /// The state directory does not exist.
    #[error("no sync state found at {0}")]
    NoState(PathBuf),

    /// A destructive command ran without confirmation.
    #[error("refusing to {0} without --yes")]
    NotConfirmed(&'static str),

    /// Reading or writing the sync state failed.
    #[error(transparent)]
    Sync(#[from] SyncError),
}

/// Result type for CLI commands.
pub type CliResult<T> = Result<T, CliError>;

/// The persisted collections of one sync layer, loaded from disk.
pub struct StateDir {
    /// Directory holding the documents.
    pub path: PathBuf,
    /// Keys and id prefix in use.
    pub config: SyncConfig,
    /// Pending jobs.
    pub queue: JobQueue,
    /// Local to remote id mappings.
    pub id_map: IdMap,
    /// Shadow copies of remote records.
    pub shadow: ShadowStore,
}

impl StateDir {
    /// Opens the state directory at `path` without creating it.
    pub async fn open(path: &Path, config: SyncConfig) -> CliResult<Self> {
        if !path.is_dir() {
            return Err(CliError::NoState(path.to_path_buf()));
        }

        let store: Arc<dyn KeyValueStore> =
            Arc::new(FileStore::open(path).await.map_err(SyncError::from)?);
        let queue = JobQueue::new(Arc::clone(&store), config.jobs_key());
        let id_map = IdMap::new(
            Arc::clone(&store),
            config.remote_ids_key(),
            LocalIds::new(config.local_id_prefix.clone()),
        );
        let shadow = ShadowStore::new(store, config.clone());

        queue.load_from_storage().await?;
        id_map.load_from_storage().await?;

        Ok(Self {
            path: path.to_path_buf(),
            config,
            queue,
            id_map,
            shadow,
        })
    }
}

/// Prints `value` as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
