//! Integration tests for durability across restarts and storage failures.

use fryctoria_storage::{KeyValueStore, StorageError};
use fryctoria_sync::{JobOperation, SyncConfig, SyncError};
use fryctoria_testkit::{record, FlakyStore, RemoteOperation, TestHarness};
use serde_json::json;
use std::sync::Arc;

#[tokio::test]
async fn queued_writes_survive_restart() {
    let harness = TestHarness::file().await;
    harness.remote.set_online(false);
    let created = harness
        .store
        .create_record(record("user", json!({"name": "Persisted"})))
        .await
        .unwrap();
    let local_id = created.id().unwrap();
    let jobs = harness.engine.queue().jobs();

    let harness = harness.restart().await;
    assert_eq!(harness.engine.queue().jobs(), jobs);
    assert!(harness
        .engine
        .shadow()
        .find("user", &local_id)
        .await
        .unwrap()
        .is_some());

    harness.remote.set_online(true);
    let report = harness.engine.try_sync_up().await.unwrap();
    assert_eq!(report.replayed, 1);
    assert_eq!(
        harness.remote.record("user", "1").unwrap().get("name"),
        Some(&json!("Persisted"))
    );
    assert!(harness.engine.shadow().find("user", "1").await.unwrap().is_some());
}

#[tokio::test]
async fn id_mappings_survive_restart_mid_drain() {
    let harness = TestHarness::file().await;
    let author = record("user", json!({"id": "fryctoria-u", "name": "Ann"}));
    let post = record("post", json!({"id": "fryctoria-p", "author": "fryctoria-u"}));
    harness.engine.create_job(JobOperation::Create, &author).await.unwrap();
    harness.engine.create_job(JobOperation::Create, &post).await.unwrap();

    harness.remote.pass_next();
    harness.remote.fail_next(0);
    harness.engine.try_sync_up().await.unwrap();
    assert_eq!(harness.engine.id_map().len(), 1);

    let harness = harness.restart().await;
    assert_eq!(harness.engine.id_map().len(), 1);
    assert_eq!(harness.engine.queue().len(), 1);

    harness.engine.try_sync_up().await.unwrap();
    let creates = harness.remote.calls_of(RemoteOperation::Create);
    assert_eq!(creates.last().unwrap().snapshot.get("author"), Some(&json!("1")));
    assert!(harness.engine.id_map().is_empty());
}

#[tokio::test]
async fn persisted_layout_uses_documented_keys() {
    let harness = TestHarness::file().await;
    harness
        .engine
        .create_job(JobOperation::Update, &record("user", json!({"id": "5"})))
        .await
        .unwrap();
    harness
        .engine
        .sync_down(record("user", json!({"id": "5", "name": "Five"})))
        .await
        .unwrap();

    let config = SyncConfig::default();
    let jobs = harness.storage.get(&config.jobs_key()).await.unwrap().unwrap();
    assert_eq!(jobs[0]["operation"], json!("updateRecord"));
    assert_eq!(jobs[0]["typeName"], json!("user"));
    assert!(jobs[0]["createdAt"].is_u64());

    let types = harness
        .storage
        .get(&config.shadow_types_key())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(types, json!(["user"]));
    assert!(harness
        .storage
        .get(&config.shadow_key("user"))
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn storage_failure_keeps_job_queued() {
    let storage = Arc::new(FlakyStore::new());
    let harness = TestHarness::with_storage(storage.clone()).await;
    harness
        .engine
        .create_job(
            JobOperation::Create,
            &record("user", json!({"id": "fryctoria-1", "name": "A"})),
        )
        .await
        .unwrap();

    storage.fail_writes(true);
    let err = harness.engine.try_sync_up().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Storage(StorageError::Unavailable(_))
    ));
    assert_eq!(harness.engine.queue().len(), 1);
    assert!(harness.engine.id_map().is_empty());
}

#[tokio::test]
async fn failed_enqueue_leaves_queue_untouched() {
    let storage = Arc::new(FlakyStore::new());
    let harness = TestHarness::with_storage(storage.clone()).await;
    storage.fail_writes(true);

    let result = harness
        .engine
        .create_job(JobOperation::Update, &record("user", json!({"id": "5"})))
        .await;
    assert!(matches!(result, Err(SyncError::Storage(_))));
    assert!(harness.engine.queue().is_empty());
    assert!(storage.snapshot().is_empty());
}

#[tokio::test]
async fn reset_discards_persisted_state() {
    let harness = TestHarness::file().await;
    harness.remote.set_online(false);
    harness
        .store
        .create_record(record("user", json!({"name": "Gone"})))
        .await
        .unwrap();

    harness.engine.reset().await.unwrap();

    let harness = harness.restart().await;
    assert!(harness.engine.queue().is_empty());
    assert!(harness.engine.shadow().types().await.unwrap().is_empty());
}
