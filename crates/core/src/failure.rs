// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure taxonomy shared by every error path the engine can surface in a
//! [`crate::output::ReplicationOutput`].

use crate::simple_display;
use serde::{Deserialize, Serialize};

/// Where a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureOrigin {
    Source,
    Destination,
    Replication,
    SourceHeartbeat,
}

simple_display! {
    FailureOrigin {
        Source => "source",
        Destination => "destination",
        Replication => "replication",
        SourceHeartbeat => "source_heartbeat",
    }
}

/// What kind of failure it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureType {
    SystemError,
    ConfigError,
    ManualCancellation,
    TransientError,
}

simple_display! {
    FailureType {
        SystemError => "system_error",
        ConfigError => "config_error",
        ManualCancellation => "manual_cancellation",
        TransientError => "transient_error",
    }
}

/// A single classified failure, ready to be attached to a
/// [`crate::output::ReplicationOutput`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub failure_origin: FailureOrigin,
    pub failure_type: FailureType,
    pub internal_message: String,
    pub external_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retryable: Option<bool>,
}

impl FailureReason {
    pub fn new(
        origin: FailureOrigin,
        failure_type: FailureType,
        message: impl Into<String>,
        timestamp_ms: u64,
    ) -> Self {
        let message = message.into();
        Self {
            failure_origin: origin,
            failure_type,
            internal_message: message.clone(),
            external_message: message,
            stack_trace: None,
            timestamp_ms,
            retryable: None,
        }
    }

    pub fn with_external_message(mut self, message: impl Into<String>) -> Self {
        self.external_message = message.into();
        self
    }

    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    pub fn with_retryable(mut self, retryable: bool) -> Self {
        self.retryable = Some(retryable);
        self
    }
}

#[cfg(test)]
#[path = "failure_tests.rs"]
mod tests;
