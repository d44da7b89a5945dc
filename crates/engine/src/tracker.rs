// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Aggregates record/byte/state counters and correlates source-emitted
//! state checkpoints against destination acknowledgements.

use parking_lot::Mutex;
use rw_core::{
    FailureOrigin, FailureReason, FailureType, Message, StreamDescriptor, StreamSyncStats, SyncStats, TraceMessage,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

/// Bound on the per-stream history of source-emitted state content hashes.
/// Past this, the oldest entry is evicted and the run is marked as having
/// unreliable state timing — unbounded history would let a single
/// long-running stream grow memory without limit.
pub const MAX_STATE_HISTORY: usize = 1000;

#[derive(Default)]
struct StreamAccumulator {
    records_emitted: u64,
    bytes_emitted: u64,
    source_state_messages_emitted: u64,
    destination_state_messages_emitted: u64,
    records_committed: u64,
    /// (content hash, records_emitted snapshot at time of that source state)
    history: VecDeque<(u64, u64)>,
}

/// Tracks per-stream message counters and whether destination-acknowledged
/// states can be trusted to report `records_committed`.
pub struct MessageTracker {
    streams: Mutex<HashMap<StreamDescriptor, StreamAccumulator>>,
    /// States with no stream identity (a single checkpoint spanning every
    /// stream). Tracked separately since they don't map onto one stream's
    /// committed count, but still count toward reliable-timing.
    global_history: Mutex<VecDeque<u64>>,
    reliable_state_timing: AtomicBool,
    trace_message_failure: Mutex<Option<FailureReason>>,
}

impl Default for MessageTracker {
    fn default() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            global_history: Mutex::new(VecDeque::new()),
            reliable_state_timing: AtomicBool::new(true),
            trace_message_failure: Mutex::new(None),
        }
    }
}

impl MessageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a message read from the source (Loop A).
    pub fn accept_from_source(&self, message: &Message, now_epoch_ms: u64) {
        match message {
            Message::Record { record } => {
                let mut streams = self.streams.lock();
                let acc = streams.entry(record.descriptor()).or_default();
                acc.records_emitted += 1;
                acc.bytes_emitted += record.byte_size();
            }
            Message::State { state } => {
                let hash = state.content_hash();
                match &state.stream {
                    Some(descriptor) => {
                        let mut streams = self.streams.lock();
                        let acc = streams.entry(descriptor.clone()).or_default();
                        acc.source_state_messages_emitted += 1;
                        acc.history.push_back((hash, acc.records_emitted));
                        if acc.history.len() > MAX_STATE_HISTORY {
                            acc.history.pop_front();
                            self.reliable_state_timing.store(false, Ordering::Relaxed);
                        }
                    }
                    None => {
                        let mut history = self.global_history.lock();
                        history.push_back(hash);
                        if history.len() > MAX_STATE_HISTORY {
                            history.pop_front();
                            self.reliable_state_timing.store(false, Ordering::Relaxed);
                        }
                    }
                }
            }
            Message::Trace { trace } => self.record_trace(trace, FailureOrigin::Source, now_epoch_ms),
            _ => {}
        }
    }

    /// Feed a message read from the destination (Loop B). Returns `true` iff
    /// the message was a `STATE` the engine should consider acknowledged
    /// (used by eager-state persistence).
    pub fn accept_from_destination(&self, message: &Message, now_epoch_ms: u64) -> bool {
        match message {
            Message::State { state } => {
                let hash = state.content_hash();
                match &state.stream {
                    Some(descriptor) => {
                        let mut streams = self.streams.lock();
                        let acc = streams.entry(descriptor.clone()).or_default();
                        acc.destination_state_messages_emitted += 1;
                        self.match_against_history(&mut acc.history, hash, |snapshot| acc.records_committed = snapshot);
                    }
                    None => {
                        let mut history = self.global_history.lock();
                        self.match_against_history_u64(&mut history, hash);
                    }
                }
                true
            }
            Message::Trace { trace } => {
                self.record_trace(trace, FailureOrigin::Destination, now_epoch_ms);
                false
            }
            _ => false,
        }
    }

    /// Matches `hash` against the front of `history`. An in-order match
    /// advances via `on_commit`; anything else (no match, or a match not at
    /// the front) permanently clears reliable state timing for the run.
    fn match_against_history(&self, history: &mut VecDeque<(u64, u64)>, hash: u64, on_commit: impl FnOnce(u64)) {
        match history.iter().position(|(h, _)| *h == hash) {
            Some(0) => {
                let (_, snapshot) = history.pop_front().expect("position 0 implies non-empty");
                on_commit(snapshot);
            }
            Some(position) => {
                for _ in 0..=position {
                    history.pop_front();
                }
                self.reliable_state_timing.store(false, Ordering::Relaxed);
            }
            None => {
                self.reliable_state_timing.store(false, Ordering::Relaxed);
            }
        }
    }

    fn match_against_history_u64(&self, history: &mut VecDeque<u64>, hash: u64) {
        match history.iter().position(|h| *h == hash) {
            Some(0) => {
                history.pop_front();
            }
            Some(position) => {
                for _ in 0..=position {
                    history.pop_front();
                }
                self.reliable_state_timing.store(false, Ordering::Relaxed);
            }
            None => {
                self.reliable_state_timing.store(false, Ordering::Relaxed);
            }
        }
    }

    fn record_trace(&self, trace: &TraceMessage, origin: FailureOrigin, now_epoch_ms: u64) {
        if let TraceMessage::Error { message, internal_message, stack_trace } = trace {
            let mut reason = FailureReason::new(
                origin,
                FailureType::SystemError,
                internal_message.clone().unwrap_or_else(|| message.clone()),
                now_epoch_ms,
            )
            .with_external_message(message.clone());
            if let Some(stack_trace) = stack_trace.clone() {
                reason = reason.with_stack_trace(stack_trace);
            }
            *self.trace_message_failure.lock() = Some(reason);
        }
    }

    pub fn reliable_state_timing(&self) -> bool {
        self.reliable_state_timing.load(Ordering::Relaxed)
    }

    pub fn trace_message_failure(&self) -> Option<FailureReason> {
        self.trace_message_failure.lock().clone()
    }

    /// Assembles the final per-stream and total stats. `records_committed`
    /// is only populated when the run's state timing stayed reliable.
    pub fn stream_stats(&self) -> Vec<StreamSyncStats> {
        let reliable = self.reliable_state_timing();
        let streams = self.streams.lock();
        let mut stats: Vec<StreamSyncStats> = streams
            .iter()
            .map(|(descriptor, acc)| StreamSyncStats {
                stream: descriptor.clone(),
                records_emitted: acc.records_emitted,
                bytes_emitted: acc.bytes_emitted,
                records_committed: reliable.then_some(acc.records_committed),
                source_state_messages_emitted: acc.source_state_messages_emitted,
                destination_state_messages_emitted: acc.destination_state_messages_emitted,
            })
            .collect();
        stats.sort_by(|a, b| a.stream.to_string().cmp(&b.stream.to_string()));
        stats
    }

    pub fn totals(&self) -> SyncStats {
        rw_core::totals_from_streams(&self.stream_stats())
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
