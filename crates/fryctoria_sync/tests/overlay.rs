//! Integration tests for the store overlay.

use fryctoria_sync::{AdapterKind, LiveStore, SyncError};
use fryctoria_testkit::{record, RemoteOperation, TestHarness};
use serde_json::json;

#[tokio::test]
async fn find_all_reloads_shadow_from_remote() {
    let harness = TestHarness::memory().await;
    harness.remote.seed(
        "user",
        [json!({"id": "1", "name": "One"}), json!({"id": "2", "name": "Two"})],
    );
    harness
        .engine
        .sync_down(vec![
            record("user", json!({"id": "1", "name": "stale"})),
            record("user", json!({"id": "9", "name": "deleted remotely"})),
        ])
        .await
        .unwrap();

    let found = harness.store.find_all("user").await.unwrap();
    assert_eq!(found.len(), 2);

    let mut ids: Vec<_> = harness
        .engine
        .shadow()
        .find_all("user")
        .await
        .unwrap()
        .into_iter()
        .filter_map(|r| r.id())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(harness.live.count("user"), 2);
}

#[tokio::test]
async fn find_all_falls_back_to_shadow_and_stays_local() {
    let harness = TestHarness::memory().await;
    harness.remote.seed("user", [json!({"id": "1", "name": "One"})]);
    harness.store.find_all("user").await.unwrap();

    harness.remote.set_online(false);
    let found = harness.store.find_all("user").await.unwrap();
    assert_eq!(found.len(), 1);
    assert!(harness.store.is_offline());
    assert_eq!(harness.store.adapter_kind("user"), AdapterKind::Local);

    // The flag is sticky: the remote is back but not consulted.
    harness.remote.set_online(true);
    harness.store.find_all("user").await.unwrap();
    assert_eq!(harness.remote.calls_of(RemoteOperation::FindAll).len(), 1);

    harness.store.set_online();
    assert_eq!(harness.store.adapter_kind("user"), AdapterKind::Remote);
    harness.store.find_all("user").await.unwrap();
    assert_eq!(harness.remote.calls_of(RemoteOperation::FindAll).len(), 2);
}

#[tokio::test]
async fn find_all_keeps_unsynced_local_records() {
    let harness = TestHarness::memory().await;
    harness.remote.set_online(false);
    let draft = harness
        .store
        .create_record(record("user", json!({"name": "Draft"})))
        .await
        .unwrap();

    // Reconnect but make the pending create fail, so it stays queued.
    harness.remote.set_online(true);
    harness.store.set_online();
    harness.remote.fail_next(500);
    harness.remote.seed("user", [json!({"id": "7", "name": "Remote"})]);

    let fetched = harness.store.find_all("user").await.unwrap();
    assert_eq!(fetched.len(), 1);
    assert_eq!(harness.engine.queue().len(), 1);

    let draft_id = draft.id().unwrap();
    assert!(harness.live.get("user", &draft_id).is_some());
    assert!(harness.live.get("user", "7").is_some());
    assert!(harness
        .engine
        .shadow()
        .find("user", &draft_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn find_record_by_local_id_reads_shadow() {
    let harness = TestHarness::memory().await;
    harness.remote.set_online(false);
    let created = harness
        .store
        .create_record(record("user", json!({"name": "Offline"})))
        .await
        .unwrap();
    let local_id = created.id().unwrap();
    assert!(local_id.starts_with("fryctoria-"));

    harness.store.set_online();
    let found = harness.store.find_record("user", &local_id).await.unwrap();
    assert_eq!(found.get("name"), Some(&json!("Offline")));
    assert!(harness.remote.calls_of(RemoteOperation::FindRecord).is_empty());
}

#[tokio::test]
async fn find_record_fetches_remote_and_mirrors_it() {
    let harness = TestHarness::memory().await;
    harness.remote.seed("user", [json!({"id": "3", "name": "Three"})]);

    let found = harness.store.find_record("user", "3").await.unwrap();
    assert_eq!(found.get("name"), Some(&json!("Three")));
    assert!(harness.live.get("user", "3").is_some());
    assert!(harness.engine.shadow().find("user", "3").await.unwrap().is_some());

    harness.remote.set_online(false);
    let cached = harness.store.find_record("user", "3").await.unwrap();
    assert_eq!(cached.get("name"), Some(&json!("Three")));

    let missing = harness.store.find_record("user", "4").await.unwrap_err();
    assert!(matches!(missing, SyncError::RecordNotFound { .. }));
}

#[tokio::test]
async fn find_record_keeps_field_named_after_plural_type() {
    let harness = TestHarness::memory().await;
    harness
        .remote
        .seed("tag", [json!({"id": "8", "name": "rust", "tags": ["lang"]})]);

    let found = harness.store.find_record("tag", "8").await.unwrap();
    assert_eq!(found.get("name"), Some(&json!("rust")));
    assert_eq!(found.get("tags"), Some(&json!(["lang"])));
    assert!(harness.engine.shadow().find("tag", "8").await.unwrap().is_some());
}

#[tokio::test]
async fn find_record_propagates_rejections() {
    let harness = TestHarness::memory().await;
    let err = harness.store.find_record("user", "404").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
    assert!(!harness.store.is_offline());
}

#[tokio::test]
async fn online_create_goes_straight_to_remote() {
    let harness = TestHarness::memory().await;
    let created = harness
        .store
        .create_record(record("user", json!({"name": "Direct"})))
        .await
        .unwrap();

    assert_eq!(created.id().as_deref(), Some("1"));
    assert!(harness.engine.queue().is_empty());
    assert!(harness.live.get("user", "1").is_some());
    assert!(harness.engine.shadow().find("user", "1").await.unwrap().is_some());
}

#[tokio::test]
async fn offline_writes_queue_and_replay_in_order() {
    let harness = TestHarness::memory().await;
    harness.remote.set_online(false);

    let created = harness
        .store
        .create_record(record("user", json!({"name": "Ann"})))
        .await
        .unwrap();
    let local_id = created.id().unwrap();
    let mut renamed = created.clone();
    renamed.fields.insert("name".into(), json!("Anna"));
    harness.store.update_record(renamed).await.unwrap();

    assert!(harness.store.is_offline());
    assert_eq!(harness.engine.queue().len(), 2);
    let shadowed = harness.engine.shadow().find("user", &local_id).await.unwrap().unwrap();
    assert_eq!(shadowed.get("name"), Some(&json!("Anna")));

    harness.remote.set_online(true);
    harness.store.set_online();
    let all = harness.store.find_all("user").await.unwrap();

    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("name"), Some(&json!("Anna")));
    assert!(harness.engine.queue().is_empty());
    assert!(harness.live.get("user", &local_id).is_none());
    assert_eq!(
        harness.live.get("user", "1").unwrap().get("name"),
        Some(&json!("Anna"))
    );
}

#[tokio::test]
async fn offline_delete_of_unsynced_record_never_resurrects() {
    let harness = TestHarness::memory().await;
    harness.remote.set_online(false);
    let created = harness
        .store
        .create_record(record("user", json!({"name": "Temp"})))
        .await
        .unwrap();
    harness.store.delete_record(created.clone()).await.unwrap();
    assert_eq!(harness.live.count("user"), 0);

    harness.remote.set_online(true);
    harness.engine.sync_up().await;

    assert!(harness.engine.queue().is_empty());
    assert!(harness.remote.records("user").is_empty());
    assert!(harness.engine.shadow().find_all("user").await.unwrap().is_empty());
    assert_eq!(harness.remote.calls_of(RemoteOperation::Delete).len(), 1);
}

#[tokio::test]
async fn writes_queue_behind_pending_jobs() {
    let harness = TestHarness::memory().await;
    harness.remote.set_online(false);
    harness
        .store
        .create_record(record("user", json!({"name": "First"})))
        .await
        .unwrap();

    harness.remote.set_online(true);
    harness.store.set_online();
    harness.remote.fail_next(500);

    let second = harness
        .store
        .create_record(record("user", json!({"name": "Second"})))
        .await
        .unwrap();

    assert!(second.id().unwrap().starts_with("fryctoria-"));
    assert_eq!(harness.engine.queue().len(), 2);
    assert!(harness.remote.calls().is_empty());

    harness.engine.sync_up().await;
    let names: Vec<_> = harness
        .remote
        .calls_of(RemoteOperation::Create)
        .into_iter()
        .filter_map(|call| call.snapshot.get("name").cloned())
        .collect();
    assert_eq!(names, vec![json!("First"), json!("Second")]);
}

#[tokio::test]
async fn update_and_delete_require_an_id() {
    let harness = TestHarness::memory().await;
    let err = harness
        .store
        .update_record(record("user", json!({"name": "nameless"})))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidInput(_)));

    let err = harness
        .store
        .delete_record(record("user", json!({})))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::InvalidInput(_)));
    assert!(harness.engine.queue().is_empty());
}
