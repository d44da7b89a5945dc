// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The core orchestrator: two concurrent loops moving messages from a
//! source connector to a destination connector, wrapped by a heartbeat
//! watchdog and torn down through a fixed resource-close order.

use crate::error::{classify_failure, LoopFailure, ReplicationError};
use crate::tracker::MessageTracker;
use crate::validator::{RecordSchemaValidator, ValidationMode};
use parking_lot::Mutex as SyncMutex;
use rw_connectors::{
    apply_field_selection, AirbyteMapper, DestinationConnector, FeatureFlagClient, HeartbeatTimeoutChaperone,
    SourceConnector, SyncPersistence,
};
use rw_core::{
    resolve_status, AttemptSummary, Clock, ConfiguredCatalog, ControlMessage, FailureReason, Message, ReplicationConfig,
    ReplicationOutput, SyncInput, SyncStats,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex as AsyncMutex, Notify};

/// Log a progress line every this many records, per loop.
const PROGRESS_LOG_INTERVAL: u64 = 5000;
/// How long teardown waits for the persistence flusher to drain.
const TEARDOWN_GRACE: Duration = Duration::from_secs(10);
const HEARTBEAT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Orchestrates one replication attempt. Owns its source and destination
/// connectors, the mapper applied between them, the checkpoint sink, and the
/// feature-flag client the heartbeat chaperone reads its gate from.
///
/// `run` may be called at most once; the worker is single-use because the
/// mapper and persistence sink it owns are each consumed by the loop they're
/// moved into. The connectors themselves are held behind shared locks for
/// their entire lifetime so `cancel()` can reach them directly.
pub struct ReplicationWorker<Src, Dst, P, F, C> {
    config: ReplicationConfig,
    source: Arc<AsyncMutex<Src>>,
    destination: Arc<AsyncMutex<Dst>>,
    mapper: Option<Box<dyn AirbyteMapper>>,
    persistence: Option<P>,
    flags: F,
    clock: C,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    already_run: AtomicBool,
}

impl<Src, Dst, P, F, C> ReplicationWorker<Src, Dst, P, F, C>
where
    Src: SourceConnector + Send + 'static,
    Dst: DestinationConnector + Send + 'static,
    P: SyncPersistence + Send + Sync + 'static,
    F: FeatureFlagClient + Clone + Send + Sync + 'static,
    C: Clock,
{
    pub fn new(
        config: ReplicationConfig,
        source: Src,
        destination: Dst,
        mapper: Box<dyn AirbyteMapper>,
        persistence: P,
        flags: F,
        clock: C,
    ) -> Self {
        Self {
            config,
            source: Arc::new(AsyncMutex::new(source)),
            destination: Arc::new(AsyncMutex::new(destination)),
            mapper: Some(mapper),
            persistence: Some(persistence),
            flags,
            clock,
            cancelled: Arc::new(AtomicBool::new(false)),
            cancel_notify: Arc::new(Notify::new()),
            already_run: AtomicBool::new(false),
        }
    }

    /// Sets the shared cancellation flag both loops poll between
    /// iterations, wakes either loop if it's currently parked inside a
    /// blocking `attempt_read()`/`accept()` call, and kills the destination
    /// then the source subprocess directly — so a loop stuck inside a
    /// single connector call actually unblocks instead of waiting on a
    /// call that only gets cancelled after it returns. Idempotent, callable
    /// from any thread.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.cancel_notify.notify_waiters();

        let destination = self.destination.clone();
        let source = self.source.clone();
        tokio::spawn(async move {
            destination.lock().await.cancel().await;
            source.lock().await.cancel().await;
        });
    }

    /// Runs the sync to completion, returning the terminal output. Only
    /// unexpected engine-internal faults surface as `Err`; every recognized
    /// failure mode (connector crash, heartbeat timeout, schema trouble)
    /// instead comes back as a `FAILED` [`ReplicationOutput`].
    pub async fn run(&mut self, sync_input: SyncInput, job_root: &Path) -> Result<ReplicationOutput, ReplicationError> {
        if self.already_run.swap(true, Ordering::SeqCst) {
            return Err(ReplicationError::AlreadyRun);
        }

        let start_time_ms = self.clock.epoch_ms();
        let mapper: Arc<dyn AirbyteMapper> =
            Arc::from(self.mapper.take().ok_or_else(|| ReplicationError::Internal("mapper missing".into()))?);
        let mapped_output_catalog = mapper.map_catalog(sync_input.destination.catalog.clone());

        let mut destination_launch = sync_input.destination.clone();
        destination_launch.catalog = mapped_output_catalog.clone();
        let source_launch = sync_input.source.clone();
        let source_catalog = sync_input.source.catalog.clone();

        let persistence = self.persistence.take().ok_or_else(|| ReplicationError::Internal("persistence missing".into()))?;
        let source = self.source.clone();
        let destination = self.destination.clone();

        // Destination starts first so it's ready to accept the first write.
        if let Err(err) = destination.lock().await.start(destination_launch, job_root).await {
            let _ = persistence.close(TEARDOWN_GRACE).await;
            let now = self.clock.epoch_ms();
            return Ok(self.output_for_early_failure(
                mapped_output_catalog,
                start_time_ms,
                now,
                classify_failure(LoopFailure::Destination(err), now),
            ));
        }
        if let Err(err) = source.lock().await.start(source_launch, job_root).await {
            destination.lock().await.cancel().await;
            let _ = persistence.close(TEARDOWN_GRACE).await;
            let now = self.clock.epoch_ms();
            return Ok(self.output_for_early_failure(
                mapped_output_catalog,
                start_time_ms,
                now,
                classify_failure(LoopFailure::Source(err), now),
            ));
        }

        let tracker = Arc::new(MessageTracker::new());
        let validation_mode =
            if self.config.remove_validation_limit { ValidationMode::Uncounted } else { ValidationMode::Counted };
        let validator = Arc::new(RecordSchemaValidator::new(validation_mode, &source_catalog));
        let last_destination_state: Arc<SyncMutex<Option<serde_json::Value>>> = Arc::new(SyncMutex::new(None));
        let last_message_at = Arc::new(SyncMutex::new(self.clock.now()));
        let connection_id = self.config.connection_id.clone();

        let loop_a_task = {
            let destination = destination.clone();
            let source = source.clone();
            let tracker = tracker.clone();
            let validator = validator.clone();
            let cancelled = self.cancelled.clone();
            let cancel_notify = self.cancel_notify.clone();
            let clock = self.clock.clone();
            let last_message_at = last_message_at.clone();
            let source_catalog = source_catalog.clone();
            let mapper = mapper.clone();
            let field_selection_enabled = self.config.field_selection_enabled;
            let connection_id = connection_id.clone();
            tokio::spawn(run_loop_a(
                source,
                destination,
                mapper,
                tracker,
                validator,
                source_catalog,
                field_selection_enabled,
                cancelled,
                cancel_notify,
                clock,
                last_message_at,
                connection_id,
            ))
        };
        // Kept so a heartbeat timeout can abort the still-running task.
        // Aborting it only drops this task's clone of the shared source
        // handle, so the timeout path below also cancels the source
        // explicitly to actually kill the subprocess.
        let loop_a_abort = loop_a_task.abort_handle();

        let chaperone = HeartbeatTimeoutChaperone::new(self.flags.clone(), self.clock.clone(), HEARTBEAT_POLL_INTERVAL);
        let last_message_at_for_chaperone = last_message_at.clone();
        let loop_a_with_heartbeat = chaperone.run_with_heartbeat_thread(
            &connection_id,
            move || *last_message_at_for_chaperone.lock(),
            async move { loop_a_task.await },
        );

        let loop_b_task = {
            let destination = destination.clone();
            let tracker = tracker.clone();
            let cancelled = self.cancelled.clone();
            let cancel_notify = self.cancel_notify.clone();
            let clock = self.clock.clone();
            let last_destination_state = last_destination_state.clone();
            let commit_state_asap = self.config.commit_state_asap;
            let commit_stats_asap = self.config.commit_stats_asap;
            let connection_id = connection_id.clone();
            tokio::spawn(run_loop_b(
                destination,
                persistence,
                tracker.clone(),
                cancelled,
                cancel_notify,
                clock,
                last_destination_state,
                commit_state_asap,
                commit_stats_asap,
                connection_id,
            ))
        };

        // Both loops are already running as spawned tasks; joining them
        // concurrently means a fast failure in one surfaces as soon as it
        // happens rather than waiting behind the other's full backlog.
        let (heartbeat_result, loop_b_join) = tokio::join!(loop_a_with_heartbeat, loop_b_task);

        let loop_a_outcome = match heartbeat_result {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(LoopFailure::Internal(join_err.to_string())),
            Err(timeout) => {
                // The task is still running somewhere past its heartbeat
                // deadline; abort it and kill the subprocess it was
                // blocked inside rather than waiting on it further.
                loop_a_abort.abort();
                let source = source.clone();
                tokio::spawn(async move { source.lock().await.cancel().await });
                Err(LoopFailure::Heartbeat(timeout))
            }
        };

        let (persistence, loop_b_outcome) = match loop_b_join {
            Ok(result) => result,
            Err(join_err) => return Err(ReplicationError::Teardown(join_err.to_string())),
        };

        let close_outcome = persistence.close(TEARDOWN_GRACE).await;
        tracing::info!(?close_outcome, "sync persistence closed");

        destination.lock().await.cancel().await;
        source.lock().await.cancel().await;

        let now = self.clock.epoch_ms();
        let mut failures = Vec::new();
        if let Some(trace_failure) = tracker.trace_message_failure() {
            failures.push(trace_failure);
        }
        if let Err(failure) = loop_a_outcome {
            failures.push(classify_failure(failure, now));
        }
        if let Err(failure) = loop_b_outcome {
            failures.push(classify_failure(failure, now));
        }

        let cancelled = self.cancelled.load(Ordering::SeqCst);
        let status = resolve_status(cancelled, !failures.is_empty());

        let state = if !self.config.commit_state_asap {
            last_destination_state.lock().clone().or_else(|| sync_input.source.state.clone())
        } else {
            None
        };

        log_validation_metrics(&validator);

        Ok(ReplicationOutput {
            status,
            attempt_summary: AttemptSummary {
                total_stats: tracker.totals(),
                stream_stats: tracker.stream_stats(),
                start_time_ms,
                end_time_ms: now,
            },
            output_catalog: mapped_output_catalog,
            state,
            failures,
        })
    }

    /// Assembles a `FAILED` output for a sync that never reached the loop
    /// stage (a connector's `start` call itself failed).
    fn output_for_early_failure(
        &self,
        output_catalog: ConfiguredCatalog,
        start_time_ms: u64,
        end_time_ms: u64,
        failure: FailureReason,
    ) -> ReplicationOutput {
        ReplicationOutput {
            status: resolve_status(self.cancelled.load(Ordering::SeqCst), true),
            attempt_summary: AttemptSummary {
                total_stats: SyncStats::default(),
                stream_stats: Vec::new(),
                start_time_ms,
                end_time_ms,
            },
            output_catalog,
            state: None,
            failures: vec![failure],
        }
    }
}

/// Emits the §4.3 end-of-run schema validation metrics: per-stream schema
/// violation counts, unexpected-field names, and records seen for a stream
/// absent from the catalog. Collected throughout the run but only surfaced
/// here, once, rather than on every record.
fn log_validation_metrics(validator: &RecordSchemaValidator) {
    for (stream, (messages, count)) in validator.schema_errors() {
        tracing::warn!(%stream, error_count = count, errors = ?messages, "stream had schema validation errors");
    }
    for (stream, fields) in validator.unexpected_fields() {
        tracing::info!(%stream, fields = ?fields, "stream emitted fields outside its declared schema");
    }
    let unknown_stream_records = validator.unknown_stream_record_count();
    if unknown_stream_records > 0 {
        tracing::warn!(count = unknown_stream_records, "records emitted for streams not present in the catalog");
    }
}

/// Loop A: source -> (field selection, validation, mapping, tracking) ->
/// destination. Shares both `source` and `destination` with the rest of the
/// worker behind locks, so `cancel()` can reach either connector directly;
/// reads race against the shared cancellation notification so a loop parked
/// inside a blocking `attempt_read()`/`accept()` wakes as soon as `cancel()`
/// is called instead of only after the call returns on its own.
#[allow(clippy::too_many_arguments)]
async fn run_loop_a<Src, Dst, C>(
    source: Arc<AsyncMutex<Src>>,
    destination: Arc<AsyncMutex<Dst>>,
    mapper: Arc<dyn AirbyteMapper>,
    tracker: Arc<MessageTracker>,
    validator: Arc<RecordSchemaValidator>,
    source_catalog: ConfiguredCatalog,
    field_selection_enabled: bool,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    clock: C,
    last_message_at: Arc<SyncMutex<Instant>>,
    connection_id: String,
) -> Result<(), LoopFailure>
where
    Src: SourceConnector,
    Dst: DestinationConnector,
    C: Clock,
{
    let mut records_since_log: u64 = 0;
    let result = loop {
        if cancelled.load(Ordering::SeqCst) {
            break Ok(());
        }

        let read_result = {
            let mut source_guard = source.lock().await;
            tokio::select! {
                biased;
                _ = cancel_notify.notified() => None,
                result = source_guard.attempt_read() => Some(result),
            }
        };
        let message = match read_result {
            None => break Ok(()),
            Some(Ok(Some(message))) => message,
            Some(Ok(None)) => break Ok(()),
            Some(Err(err)) => {
                if cancelled.load(Ordering::SeqCst) {
                    break Ok(());
                }
                break Err(LoopFailure::Source(err));
            }
        };
        *last_message_at.lock() = clock.now();

        let message = if field_selection_enabled { apply_field_selection(&source_catalog, message) } else { message };
        if let Message::Record { record } = &message {
            validator.validate(record, &source_catalog);
        }
        let message = mapper.map_message(message);
        tracker.accept_from_source(&message, clock.epoch_ms());

        if let Message::Control { control: ControlMessage::ConnectorConfig { config } } = &message {
            tracing::info!(connector = "source", connection_id = %connection_id, updated_config = %config, "forwarding updated connector config");
        }

        if matches!(message, Message::Record { .. } | Message::State { .. }) {
            let mut destination_guard = destination.lock().await;
            if let Err(err) = destination_guard.accept(&message).await {
                drop(destination_guard);
                if cancelled.load(Ordering::SeqCst) {
                    break Ok(());
                }
                break Err(LoopFailure::Destination(err));
            }
        }

        if matches!(message, Message::Record { .. }) {
            records_since_log += 1;
            if records_since_log % PROGRESS_LOG_INTERVAL == 0 {
                tracing::info!(records = records_since_log, "replication progress");
            }
        }
    };

    if result.is_ok() {
        let mut destination_guard = destination.lock().await;
        let _ = destination_guard.notify_end_of_input().await;
    }

    match result {
        Ok(()) if !cancelled.load(Ordering::SeqCst) => {
            let source_guard = source.lock().await;
            match source_guard.exit_value() {
                Some(code) if code != 0 => Err(LoopFailure::SourceExit(code)),
                _ => Ok(()),
            }
        }
        other => other,
    }
}

/// Loop B: destination -> tracking, eager-state persistence. Shares
/// `destination` with Loop A behind a lock; owns `persistence` exclusively
/// and hands it back so the caller can close it during teardown.
#[allow(clippy::too_many_arguments)]
async fn run_loop_b<Dst, P, C>(
    destination: Arc<AsyncMutex<Dst>>,
    persistence: P,
    tracker: Arc<MessageTracker>,
    cancelled: Arc<AtomicBool>,
    cancel_notify: Arc<Notify>,
    clock: C,
    last_destination_state: Arc<SyncMutex<Option<serde_json::Value>>>,
    commit_state_asap: bool,
    commit_stats_asap: bool,
    connection_id: String,
) -> (P, Result<(), LoopFailure>)
where
    Dst: DestinationConnector,
    P: SyncPersistence + Send + Sync,
    C: Clock,
{
    let result = loop {
        if cancelled.load(Ordering::SeqCst) {
            break Ok(());
        }
        let read_result = {
            let mut destination_guard = destination.lock().await;
            tokio::select! {
                biased;
                _ = cancel_notify.notified() => None,
                result = destination_guard.attempt_read() => Some(result),
            }
        };
        let message = match read_result {
            None => break Ok(()),
            Some(Ok(Some(message))) => message,
            Some(Ok(None)) => break Ok(()),
            Some(Err(err)) => {
                if cancelled.load(Ordering::SeqCst) {
                    break Ok(());
                }
                break Err(LoopFailure::Destination(err));
            }
        };

        tracker.accept_from_destination(&message, clock.epoch_ms());
        if let Message::Control { control: ControlMessage::ConnectorConfig { config } } = &message {
            tracing::info!(connector = "destination", connection_id = %connection_id, updated_config = %config, "forwarding updated connector config");
        }
        if let Message::State { state } = &message {
            *last_destination_state.lock() = Some(state.data.clone());
            if commit_state_asap {
                persistence.persist(&connection_id, state.stream.clone(), state.data.clone()).await;
                if commit_stats_asap {
                    tracing::info!(
                        connection_id = %connection_id,
                        totals = ?tracker.totals(),
                        "eager stats commit alongside eager state persist"
                    );
                }
            }
        }
    };

    let result = match result {
        Ok(()) if !cancelled.load(Ordering::SeqCst) => {
            let destination_guard = destination.lock().await;
            match destination_guard.exit_value() {
                Some(code) if code != 0 => Err(LoopFailure::DestinationExit(code)),
                _ => Ok(()),
            }
        }
        other => other,
    };

    (persistence, result)
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
