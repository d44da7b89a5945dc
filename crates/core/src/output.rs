// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's terminal artifact.

use crate::catalog::ConfiguredCatalog;
use crate::failure::FailureReason;
use crate::simple_display;
use crate::stats::{StreamSyncStats, SyncStats};
use serde::{Deserialize, Serialize};

/// Terminal status of a replication run.
///
/// Precedence when more than one condition is true at teardown:
/// `Cancelled > Failed > Completed`. See [`resolve_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplicationStatus {
    Completed,
    Failed,
    Cancelled,
}

simple_display! {
    ReplicationStatus {
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

/// Resolve the terminal status from the two booleans the engine tracks:
/// whether `cancel()` was observed, and whether any failure was recorded.
///
/// `cancelled` wins regardless of `failed` — cancellation-triggered stream
/// closures must not be misreported as failures (§8 scenario 4).
pub fn resolve_status(cancelled: bool, failed: bool) -> ReplicationStatus {
    if cancelled {
        ReplicationStatus::Cancelled
    } else if failed {
        ReplicationStatus::Failed
    } else {
        ReplicationStatus::Completed
    }
}

/// Totals, per-stream stats, and timing bounds for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSummary {
    pub total_stats: SyncStats,
    pub stream_stats: Vec<StreamSyncStats>,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

/// The engine's terminal artifact, returned from `ReplicationWorker::run`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationOutput {
    pub status: ReplicationStatus,
    pub attempt_summary: AttemptSummary,
    pub output_catalog: ConfiguredCatalog,
    /// Present only when not in eager-state mode (the caller persists it);
    /// absent in eager-state mode since persistence already owns the state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    pub failures: Vec<FailureReason>,
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
