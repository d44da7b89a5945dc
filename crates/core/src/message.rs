// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The connector wire message and the stream descriptor that keys every
//! per-stream map in the tracker and validator.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A logical table identity: name plus an optional namespace.
///
/// Equality is structural. Descriptors key every per-stream map in the
/// tracker and validator, so this type is cheap to clone and hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl StreamDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: None }
    }

    pub fn with_namespace(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: Some(namespace.into()) }
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A single record emitted by a source for a given stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub stream: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub data: serde_json::Value,
    pub emitted_at_ms: u64,
}

impl RecordMessage {
    pub fn descriptor(&self) -> StreamDescriptor {
        StreamDescriptor { name: self.stream.clone(), namespace: self.namespace.clone() }
    }

    /// Approximate wire size in bytes, used for `bytesEmitted`.
    pub fn byte_size(&self) -> u64 {
        serde_json::to_vec(&self.data).map(|v| v.len() as u64).unwrap_or(0)
    }
}

/// An opaque per-stream or global checkpoint blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<StreamDescriptor>,
    pub data: serde_json::Value,
}

impl StateMessage {
    /// Stable content hash used to match source-emitted states against
    /// destination-acknowledged ones.
    pub fn content_hash(&self) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.stream.hash(&mut hasher);
        // serde_json::Value doesn't implement Hash; hash its canonical string form.
        if let Ok(s) = serde_json::to_string(&self.data) {
            s.hash(&mut hasher);
        }
        hasher.finish()
    }
}

/// Control sub-messages. Only `ConnectorConfig` is consumed by the engine;
/// other variants are forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    ConnectorConfig { config: serde_json::Value },
    #[serde(other)]
    Other,
}

/// Severity-tagged trace payloads. Error traces surface as run failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TraceMessage {
    Error { message: String, internal_message: Option<String>, stack_trace: Option<String> },
    Estimate { stream: StreamDescriptor, row_estimate: Option<u64>, byte_estimate: Option<u64> },
    #[serde(other)]
    Other,
}

/// A plain log line forwarded to the operator's logging sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogMessage {
    pub level: String,
    pub message: String,
}

/// A single line of the connector wire protocol.
///
/// Only `Record`, `State`, `Trace`, and `Control` are semantically meaningful
/// to the engine; `Log`, `Spec`, and `Catalog` are forwarded or ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Message {
    Record { record: RecordMessage },
    State { state: StateMessage },
    Control { control: ControlMessage },
    Trace { trace: TraceMessage },
    Log { log: LogMessage },
    Spec { spec: serde_json::Value },
    Catalog { catalog: serde_json::Value },
}

impl Message {
    pub fn as_record(&self) -> Option<&RecordMessage> {
        match self {
            Message::Record { record } => Some(record),
            _ => None,
        }
    }

    pub fn as_state(&self) -> Option<&StateMessage> {
        match self {
            Message::State { state } => Some(state),
            _ => None,
        }
    }

    pub fn as_control(&self) -> Option<&ControlMessage> {
        match self {
            Message::Control { control } => Some(control),
            _ => None,
        }
    }

    pub fn as_trace(&self) -> Option<&TraceMessage> {
        match self {
            Message::Trace { trace } => Some(trace),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::Record { .. } => "RECORD",
            Message::State { .. } => "STATE",
            Message::Control { .. } => "CONTROL",
            Message::Trace { .. } => "TRACE",
            Message::Log { .. } => "LOG",
            Message::Spec { .. } => "SPEC",
            Message::Catalog { .. } => "CATALOG",
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
