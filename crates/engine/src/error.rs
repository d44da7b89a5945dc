// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine's "sync failed" escape hatch error and the loop-internal
//! failure sum type `classify_failure` turns into a `FailureReason`.

use rw_connectors::{ConnectorError, HeartbeatTimeoutError};
use rw_core::{FailureOrigin, FailureReason, FailureType};
use thiserror::Error;

/// Propagated out of `ReplicationWorker::run` only for unexpected
/// engine-internal faults — every recognized failure mode instead comes
/// back as a `FAILED` `ReplicationOutput` (see [`crate::worker`]).
#[derive(Debug, Error)]
pub enum ReplicationError {
    #[error("run() was already called on this worker")]
    AlreadyRun,
    #[error("teardown failed: {0}")]
    Teardown(String),
    #[error("internal engine error: {0}")]
    Internal(String),
}

/// What went wrong inside one loop iteration, before it's classified into a
/// `FailureReason`.
#[derive(Debug)]
pub enum LoopFailure {
    Source(ConnectorError),
    Destination(ConnectorError),
    Heartbeat(HeartbeatTimeoutError),
    /// The source subprocess exited with this non-zero code after its
    /// output stream closed cleanly.
    SourceExit(i32),
    /// The destination subprocess exited with this non-zero code after its
    /// output stream closed cleanly.
    DestinationExit(i32),
    /// A loop's spawned task itself panicked or was cancelled.
    Internal(String),
}

/// Converts a loop-internal failure into the taxonomy `ReplicationOutput`
/// reports, per the engine's "SourceException -> sourceFailure" etc mapping.
pub fn classify_failure(failure: LoopFailure, now_epoch_ms: u64) -> FailureReason {
    match failure {
        LoopFailure::Source(err) => {
            FailureReason::new(FailureOrigin::Source, FailureType::SystemError, err.to_string(), now_epoch_ms)
        }
        LoopFailure::Destination(err) => {
            FailureReason::new(FailureOrigin::Destination, FailureType::SystemError, err.to_string(), now_epoch_ms)
        }
        LoopFailure::Heartbeat(err) => {
            FailureReason::new(FailureOrigin::SourceHeartbeat, FailureType::TransientError, err.to_string(), now_epoch_ms)
                .with_retryable(true)
        }
        LoopFailure::SourceExit(code) => FailureReason::new(
            FailureOrigin::Source,
            FailureType::SystemError,
            format!("source connector exited with code {code}"),
            now_epoch_ms,
        ),
        LoopFailure::DestinationExit(code) => FailureReason::new(
            FailureOrigin::Destination,
            FailureType::SystemError,
            format!("destination connector exited with code {code}"),
            now_epoch_ms,
        ),
        LoopFailure::Internal(message) => {
            FailureReason::new(FailureOrigin::Replication, FailureType::SystemError, message, now_epoch_ms)
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
