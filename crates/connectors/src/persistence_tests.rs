// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rw_core::StreamDescriptor;

#[tokio::test]
async fn persist_then_close_flushes_latest_state_per_stream() {
    let persistence = BufferedSyncPersistence::new(16);
    let users = Some(StreamDescriptor::new("users"));
    persistence.persist("conn", users.clone(), serde_json::json!({"cursor": 1})).await;
    persistence.persist("conn", users.clone(), serde_json::json!({"cursor": 2})).await;

    let outcome = persistence.close(Duration::from_secs(5)).await;
    assert_eq!(outcome, PersistenceCloseOutcome::Flushed);

    let snapshot = persistence.committed_snapshot();
    assert_eq!(snapshot.get(&users), Some(&serde_json::json!({"cursor": 2})));
}

#[tokio::test]
async fn close_is_idempotent_after_the_flusher_already_exited() {
    let persistence = BufferedSyncPersistence::new(4);
    assert_eq!(persistence.close(Duration::from_secs(1)).await, PersistenceCloseOutcome::Flushed);
    assert_eq!(persistence.close(Duration::from_secs(1)).await, PersistenceCloseOutcome::Flushed);
}

#[tokio::test]
async fn global_checkpoint_uses_none_stream_key() {
    let persistence = BufferedSyncPersistence::new(4);
    persistence.persist("conn", None, serde_json::json!({"global": true})).await;
    persistence.close(Duration::from_secs(1)).await;
    assert_eq!(persistence.committed_snapshot().get(&None), Some(&serde_json::json!({"global": true})));
}
