//! Test fixtures and engine helpers.
//!
//! Provides a fully wired sync engine and store overlay over either an
//! in-memory or a file-backed key-value store.

use crate::remote::MockRemote;
use fryctoria_storage::{FileStore, InMemoryStore, KeyValueStore};
use fryctoria_sync::{
    DataLayer, MemoryLiveStore, OfflineStore, Record, Relationship, Schema, SyncConfig, SyncEngine,
};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Schema used across the tests: users own posts, posts own comments.
pub fn blog_schema() -> Schema {
    Schema::new()
        .with_type("user", [Relationship::has_many("posts", "post")])
        .with_type(
            "post",
            [
                Relationship::belongs_to("author", "user"),
                Relationship::has_many("comments", "comment"),
            ],
        )
        .with_type("comment", [Relationship::belongs_to("post", "post")])
}

/// Builds a record of `type_name` from a JSON object.
pub fn record(type_name: &str, value: Value) -> Record {
    Record::from_value(type_name, value)
}

/// A sync engine, its overlay and a mock remote with automatic cleanup.
pub struct TestHarness {
    /// The simulated server.
    pub remote: Arc<MockRemote>,
    /// The persistent key-value store.
    pub storage: Arc<dyn KeyValueStore>,
    /// The in-memory live store the host would render from.
    pub live: Arc<MemoryLiveStore>,
    /// The sync engine.
    pub engine: Arc<SyncEngine>,
    /// The host-facing store overlay.
    pub store: OfflineStore,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestHarness {
    /// Creates a harness persisting into memory.
    pub async fn memory() -> Self {
        Self::build(
            Arc::new(MockRemote::new()),
            Arc::new(InMemoryStore::new()),
            None,
        )
        .await
    }

    /// Creates a harness persisting into a temporary directory.
    pub async fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let storage = open_file_store(temp_dir.path()).await;
        Self::build(Arc::new(MockRemote::new()), storage, Some(temp_dir)).await
    }

    /// Creates a harness over an existing store.
    pub async fn with_storage(storage: Arc<dyn KeyValueStore>) -> Self {
        Self::build(Arc::new(MockRemote::new()), storage, None).await
    }

    /// Simulates an application restart.
    ///
    /// The remote and the persisted documents survive. The live store,
    /// the engine and the overlay are rebuilt from scratch, and a file
    /// store is reopened from disk.
    pub async fn restart(self) -> Self {
        let storage = match &self.temp_dir {
            Some(dir) => open_file_store(dir.path()).await,
            None => Arc::clone(&self.storage),
        };
        Self::build(self.remote, storage, self.temp_dir).await
    }

    /// Returns the storage directory if file-based, None if in-memory.
    pub fn path(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    async fn build(
        remote: Arc<MockRemote>,
        storage: Arc<dyn KeyValueStore>,
        temp_dir: Option<TempDir>,
    ) -> Self {
        let data = Arc::new(DataLayer::new(blog_schema(), remote.clone()));
        let live = Arc::new(MemoryLiveStore::new());
        let engine = Arc::new(SyncEngine::new(
            SyncConfig::default(),
            Arc::clone(&storage),
            data,
            live.clone(),
        ));
        engine.init().await.expect("Failed to initialize sync engine");
        let store = OfflineStore::new(Arc::clone(&engine));

        Self {
            remote,
            storage,
            live,
            engine,
            store,
            temp_dir,
        }
    }
}

async fn open_file_store(dir: &Path) -> Arc<dyn KeyValueStore> {
    Arc::new(
        FileStore::open(dir)
            .await
            .expect("Failed to open file store"),
    )
}
