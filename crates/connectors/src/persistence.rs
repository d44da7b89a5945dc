// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable state-checkpoint sink. Grounded on the teacher's `Wal`-style
//! write-behind sink: callers never block on disk/network I/O to persist a
//! checkpoint, a background task drains a bounded channel into the backing
//! store instead.

use async_trait::async_trait;
use parking_lot::Mutex;
use rw_core::StreamDescriptor;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceCloseOutcome {
    /// Every buffered write was drained before the flusher task exited.
    Flushed,
    /// The flusher did not finish within the requested timeout; any writes
    /// still queued when `close` returned are lost.
    TimedOut,
}

#[async_trait]
pub trait SyncPersistence: Send + Sync {
    /// Enqueue a state checkpoint for a stream (or `None` for a global
    /// checkpoint). Never blocks on the backing store.
    async fn persist(&self, connection_id: &str, stream: Option<StreamDescriptor>, state: serde_json::Value);
    /// Stop accepting further writes, wait up to `timeout` for the flusher
    /// to drain its queue, and report whether it finished in time.
    async fn close(&self, timeout: Duration) -> PersistenceCloseOutcome;
}

type StateMap = Arc<Mutex<HashMap<Option<StreamDescriptor>, serde_json::Value>>>;

enum PersistMessage {
    Write { stream: Option<StreamDescriptor>, state: serde_json::Value },
}

/// A channel-backed, coalescing [`SyncPersistence`]. The latest state per
/// stream wins; callers only ever care about the most recent checkpoint.
pub struct BufferedSyncPersistence {
    sender: Mutex<Option<mpsc::Sender<PersistMessage>>>,
    flusher: Mutex<Option<tokio::task::JoinHandle<()>>>,
    committed: StateMap,
}

impl BufferedSyncPersistence {
    pub fn new(channel_capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel(channel_capacity);
        let committed: StateMap = Arc::new(Mutex::new(HashMap::new()));
        let flusher_committed = committed.clone();
        let flusher = tokio::spawn(async move {
            while let Some(PersistMessage::Write { stream, state }) = receiver.recv().await {
                flusher_committed.lock().insert(stream, state);
            }
        });
        Self { sender: Mutex::new(Some(sender)), flusher: Mutex::new(Some(flusher)), committed }
    }

    /// Snapshot of everything committed to the in-memory map so far. Real
    /// deployments would back this with durable storage; this crate keeps
    /// the backing store in-process since the spec does not name one.
    pub fn committed_snapshot(&self) -> HashMap<Option<StreamDescriptor>, serde_json::Value> {
        self.committed.lock().clone()
    }
}

#[async_trait]
impl SyncPersistence for BufferedSyncPersistence {
    async fn persist(&self, _connection_id: &str, stream: Option<StreamDescriptor>, state: serde_json::Value) {
        let sender = self.sender.lock().clone();
        if let Some(sender) = sender {
            let _ = sender.send(PersistMessage::Write { stream, state }).await;
        }
    }

    async fn close(&self, timeout: Duration) -> PersistenceCloseOutcome {
        // Drop our own sender handle so the channel closes once every
        // in-flight `persist` clone finishes; the flusher loop then exits.
        self.sender.lock().take();
        let handle = self.flusher.lock().take();
        let Some(handle) = handle else {
            return PersistenceCloseOutcome::Flushed;
        };
        match tokio::time::timeout(timeout, handle).await {
            Ok(_) => PersistenceCloseOutcome::Flushed,
            Err(_) => PersistenceCloseOutcome::TimedOut,
        }
    }
}

#[cfg(test)]
#[path = "persistence_tests.rs"]
mod tests;
