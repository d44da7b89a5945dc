// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Liveness watchdog: fails a running task if the source has gone silent
//! for longer than its configured heartbeat timeout.

use async_trait::async_trait;
use rw_core::Clock;
use std::future::Future;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("source produced no messages for {silent_for:?}, exceeding the {threshold:?} heartbeat timeout")]
pub struct HeartbeatTimeoutError {
    pub silent_for: Duration,
    pub threshold: Duration,
}

/// Source of the per-connection heartbeat gate and threshold.
#[async_trait]
pub trait FeatureFlagClient: Send + Sync {
    fn heartbeat_enabled(&self, connection_id: &str) -> bool;
    fn heartbeat_timeout(&self, connection_id: &str) -> Duration;
}

/// A flag client with a fixed answer, for tests and for callers that decide
/// the heartbeat policy out-of-band.
#[derive(Debug, Clone, Copy)]
pub struct StaticFlagClient {
    pub enabled: bool,
    pub timeout: Duration,
}

impl StaticFlagClient {
    pub fn new(enabled: bool, timeout: Duration) -> Self {
        Self { enabled, timeout }
    }
}

#[async_trait]
impl FeatureFlagClient for StaticFlagClient {
    fn heartbeat_enabled(&self, _connection_id: &str) -> bool {
        self.enabled
    }

    fn heartbeat_timeout(&self, _connection_id: &str) -> Duration {
        self.timeout
    }
}

/// Reads `REPLICATION_HEARTBEAT_ENABLED` / `REPLICATION_HEARTBEAT_SECONDS`
/// from the process environment. Ambient convenience for the CLI binary;
/// not part of the engine's contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvFlagClient;

#[async_trait]
impl FeatureFlagClient for EnvFlagClient {
    fn heartbeat_enabled(&self, _connection_id: &str) -> bool {
        std::env::var("REPLICATION_HEARTBEAT_ENABLED").map(|v| v != "false" && v != "0").unwrap_or(true)
    }

    fn heartbeat_timeout(&self, _connection_id: &str) -> Duration {
        std::env::var("REPLICATION_HEARTBEAT_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(6 * 60 * 60))
    }
}

/// Wraps a task with a watchdog that polls `last_message_at` and fails the
/// task if the source has been silent past its configured threshold. When
/// the gate is off for a connection, the chaperone is a pure pass-through.
pub struct HeartbeatTimeoutChaperone<F, C> {
    flags: F,
    clock: C,
    poll_interval: Duration,
}

impl<F, C> HeartbeatTimeoutChaperone<F, C>
where
    F: FeatureFlagClient,
    C: Clock,
{
    pub fn new(flags: F, clock: C, poll_interval: Duration) -> Self {
        Self { flags, clock, poll_interval }
    }

    pub async fn run_with_heartbeat_thread<Fut, T>(
        &self,
        connection_id: &str,
        last_message_at: impl Fn() -> Instant + Send + Sync,
        task: Fut,
    ) -> Result<T, HeartbeatTimeoutError>
    where
        Fut: Future<Output = T> + Send,
    {
        if !self.flags.heartbeat_enabled(connection_id) {
            return Ok(task.await);
        }
        let threshold = self.flags.heartbeat_timeout(connection_id);
        tokio::pin!(task);
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.tick().await; // first tick fires immediately
        loop {
            tokio::select! {
                biased;
                result = &mut task => return Ok(result),
                _ = ticker.tick() => {
                    let silent_for = self.clock.now().saturating_duration_since(last_message_at());
                    if silent_for > threshold {
                        return Err(HeartbeatTimeoutError { silent_for, threshold });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
