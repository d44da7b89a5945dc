// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-run and per-stream counters.
//!
//! Invariant: `recordsCommitted <= recordsEmitted` for every stream whenever
//! `recordsCommitted` is non-null; it is reportable only when the tracker
//! declares state timing reliable (see `rw_engine::tracker`).

use crate::message::StreamDescriptor;
use serde::{Deserialize, Serialize};

/// Totals across every stream in a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncStats {
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    /// `None` when the tracker never observed reliable state timing.
    pub records_committed: Option<u64>,
    pub source_state_messages_emitted: u64,
    pub destination_state_messages_emitted: u64,
}

/// Counters scoped to one stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSyncStats {
    pub stream: StreamDescriptor,
    pub records_emitted: u64,
    pub bytes_emitted: u64,
    pub records_committed: Option<u64>,
    pub source_state_messages_emitted: u64,
    pub destination_state_messages_emitted: u64,
}

impl StreamSyncStats {
    pub fn new(stream: StreamDescriptor) -> Self {
        Self {
            stream,
            records_emitted: 0,
            bytes_emitted: 0,
            records_committed: None,
            source_state_messages_emitted: 0,
            destination_state_messages_emitted: 0,
        }
    }
}

/// Fold per-stream stats into run totals.
///
/// `records_committed` is `Some` only if every stream's is `Some` — a single
/// stream with unreliable timing makes the whole run's total unreliable too.
pub fn totals_from_streams(streams: &[StreamSyncStats]) -> SyncStats {
    let mut totals = SyncStats::default();
    let mut committed_sum = Some(0u64);

    for s in streams {
        totals.records_emitted += s.records_emitted;
        totals.bytes_emitted += s.bytes_emitted;
        totals.source_state_messages_emitted += s.source_state_messages_emitted;
        totals.destination_state_messages_emitted += s.destination_state_messages_emitted;

        committed_sum = match (committed_sum, s.records_committed) {
            (Some(acc), Some(v)) => Some(acc + v),
            _ => None,
        };
    }

    totals.records_committed = committed_sum;
    totals
}

#[cfg(test)]
#[path = "stats_tests.rs"]
mod tests;
