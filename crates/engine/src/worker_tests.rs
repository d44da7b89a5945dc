// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use async_trait::async_trait;
use rw_connectors::{BufferedSyncPersistence, ConnectorError, FakeDestination, FakeSource, IdentityMapper, StaticFlagClient};
use rw_core::{
    ConfiguredStream, DestinationLaunchConfig, DestinationSyncMode, FailureOrigin, FakeClock, RecordMessage,
    ReplicationStatus, SourceLaunchConfig, StateMessage, StreamDescriptor, SyncMode,
};
use std::sync::atomic::AtomicBool as StdAtomicBool;

fn catalog(selected_fields: Option<Vec<String>>) -> ConfiguredCatalog {
    ConfiguredCatalog {
        streams: vec![ConfiguredStream {
            descriptor: StreamDescriptor::new("users"),
            json_schema: serde_json::json!({"type": "object"}),
            sync_mode: SyncMode::FullRefresh,
            destination_sync_mode: DestinationSyncMode::Append,
            selected_fields,
        }],
    }
}

fn config(connection_id: &str) -> ReplicationConfig {
    ReplicationConfig {
        job_id: "job-1".to_string(),
        attempt: 1,
        connection_id: connection_id.to_string(),
        field_selection_enabled: false,
        remove_validation_limit: false,
        commit_state_asap: false,
        commit_stats_asap: false,
        heartbeat_timeout_secs: 21600,
    }
}

fn sync_input(catalog: ConfiguredCatalog, config: ReplicationConfig) -> SyncInput {
    SyncInput {
        config,
        source: SourceLaunchConfig {
            image: "airbyte/source-fake:1.0".to_string(),
            env: Default::default(),
            catalog: catalog.clone(),
            state: None,
            config: serde_json::json!({}),
        },
        destination: DestinationLaunchConfig {
            image: "airbyte/destination-fake:1.0".to_string(),
            env: Default::default(),
            catalog,
            state: None,
            config: serde_json::json!({}),
        },
    }
}

fn record(data: serde_json::Value) -> Message {
    Message::Record { record: RecordMessage { stream: "users".to_string(), namespace: None, data, emitted_at_ms: 0 } }
}

fn state(data: serde_json::Value) -> Message {
    Message::State { state: StateMessage { stream: Some(StreamDescriptor::new("users")), data } }
}

#[tokio::test]
async fn happy_path_commits_state_when_acks_arrive_in_order() {
    let job_root = tempfile::tempdir().unwrap();
    let catalog = catalog(None);
    let source = FakeSource::new(vec![record(serde_json::json!({"id": 1})), state(serde_json::json!({"cursor": 1}))], 0);
    let destination = FakeDestination::new(vec![state(serde_json::json!({"cursor": 1}))], 0);
    let mut worker = ReplicationWorker::new(
        config("conn-1"),
        source,
        destination,
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );

    let output = worker.run(sync_input(catalog, config("conn-1")), job_root.path()).await.unwrap();

    assert_eq!(output.status, ReplicationStatus::Completed);
    assert!(output.failures.is_empty());
    assert_eq!(output.attempt_summary.total_stats.records_emitted, 1);
    assert_eq!(output.attempt_summary.total_stats.records_committed, Some(1));
}

#[tokio::test]
async fn source_nonzero_exit_is_reported_as_source_failure() {
    let job_root = tempfile::tempdir().unwrap();
    let catalog = catalog(None);
    let source = FakeSource::new(vec![record(serde_json::json!({"id": 1}))], 1);
    let destination = FakeDestination::new(vec![], 0);
    let mut worker = ReplicationWorker::new(
        config("conn-2"),
        source,
        destination,
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );

    let output = worker.run(sync_input(catalog, config("conn-2")), job_root.path()).await.unwrap();

    assert_eq!(output.status, ReplicationStatus::Failed);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].failure_origin, FailureOrigin::Source);
}

#[tokio::test]
async fn cancelling_before_any_read_reports_cancelled_with_no_records() {
    let job_root = tempfile::tempdir().unwrap();
    let catalog = catalog(None);
    let source = FakeSource::new(vec![record(serde_json::json!({"id": 1})), record(serde_json::json!({"id": 2}))], 0);
    let destination = FakeDestination::new(vec![], 0);
    let mut worker = ReplicationWorker::new(
        config("conn-3"),
        source,
        destination,
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );
    worker.cancel();

    let output = worker.run(sync_input(catalog, config("conn-3")), job_root.path()).await.unwrap();

    assert_eq!(output.status, ReplicationStatus::Cancelled);
    assert_eq!(output.attempt_summary.total_stats.records_emitted, 0);
}

#[tokio::test]
async fn out_of_order_destination_acks_make_committed_count_unreliable() {
    let job_root = tempfile::tempdir().unwrap();
    let catalog = catalog(None);
    let first_state = state(serde_json::json!({"cursor": 1}));
    let second_state = state(serde_json::json!({"cursor": 2}));
    let source = FakeSource::new(
        vec![record(serde_json::json!({"id": 1})), first_state.clone(), record(serde_json::json!({"id": 2})), second_state.clone()],
        0,
    );
    // Destination acknowledges the second checkpoint before the first: out of order.
    let destination = FakeDestination::new(vec![second_state, first_state], 0);
    let mut worker = ReplicationWorker::new(
        config("conn-4"),
        source,
        destination,
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );

    let output = worker.run(sync_input(catalog, config("conn-4")), job_root.path()).await.unwrap();

    assert_eq!(output.status, ReplicationStatus::Completed);
    assert_eq!(output.attempt_summary.total_stats.records_committed, None);
}

#[tokio::test]
async fn field_selection_trims_unselected_fields_before_the_destination_sees_them() {
    let job_root = tempfile::tempdir().unwrap();
    let wide_record = record(serde_json::json!({"id": 1, "name": "ada", "email": "ada@example.com"}));

    let mut selecting_config = config("conn-5");
    selecting_config.field_selection_enabled = true;
    let selecting_catalog = catalog(Some(vec!["id".to_string()]));
    let selecting_source = FakeSource::new(vec![wide_record.clone()], 0);
    let mut selecting_worker = ReplicationWorker::new(
        selecting_config.clone(),
        selecting_source,
        FakeDestination::new(vec![], 0),
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );
    let selecting_output =
        selecting_worker.run(sync_input(selecting_catalog, selecting_config), job_root.path()).await.unwrap();

    let unselected_config = config("conn-6");
    let unselected_catalog = catalog(None);
    let unselected_source = FakeSource::new(vec![wide_record], 0);
    let mut unselected_worker = ReplicationWorker::new(
        unselected_config.clone(),
        unselected_source,
        FakeDestination::new(vec![], 0),
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(false, Duration::from_secs(3600)),
        FakeClock::new(),
    );
    let unselected_output =
        unselected_worker.run(sync_input(unselected_catalog, unselected_config), job_root.path()).await.unwrap();

    let selected_bytes = selecting_output.attempt_summary.total_stats.bytes_emitted;
    let unselected_bytes = unselected_output.attempt_summary.total_stats.bytes_emitted;
    assert!(selected_bytes < unselected_bytes, "{selected_bytes} should be smaller than {unselected_bytes}");
}

struct StallingSource {
    clock: FakeClock,
    jumped: StdAtomicBool,
}

#[async_trait]
impl SourceConnector for StallingSource {
    async fn start(&mut self, _config: SourceLaunchConfig, _job_root: &Path) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn attempt_read(&mut self) -> Result<Option<Message>, ConnectorError> {
        if !self.jumped.swap(true, Ordering::SeqCst) {
            self.clock.advance(Duration::from_secs(3600));
        }
        std::future::pending().await
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn exit_value(&self) -> Option<i32> {
        None
    }

    async fn cancel(&mut self) {}

    fn last_message_at(&self) -> Instant {
        self.clock.now()
    }
}

#[tokio::test(start_paused = true)]
async fn silent_source_trips_the_heartbeat_timeout() {
    let job_root = tempfile::tempdir().unwrap();
    let clock = FakeClock::new();
    let source = StallingSource { clock: clock.clone(), jumped: StdAtomicBool::new(false) };
    let destination = FakeDestination::new(vec![], 0);
    let mut worker = ReplicationWorker::new(
        config("conn-7"),
        source,
        destination,
        Box::new(IdentityMapper),
        BufferedSyncPersistence::new(16),
        StaticFlagClient::new(true, Duration::from_secs(60)),
        clock,
    );

    let output = worker.run(sync_input(catalog(None), config("conn-7")), job_root.path()).await.unwrap();

    assert_eq!(output.status, ReplicationStatus::Failed);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].failure_origin, FailureOrigin::SourceHeartbeat);
}
