// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration inputs enumerated in the external interface contract.
//!
//! These are deserialized from the `SyncInput` blob the workflow harness
//! hands the engine; the engine itself never constructs them from scratch.

use crate::catalog::ConfiguredCatalog;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Run-scoped flags that change engine behavior, independent of any one
/// connector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    pub job_id: String,
    pub attempt: u32,
    pub connection_id: String,
    #[serde(default)]
    pub field_selection_enabled: bool,
    #[serde(default)]
    pub remove_validation_limit: bool,
    #[serde(default)]
    pub commit_state_asap: bool,
    #[serde(default)]
    pub commit_stats_asap: bool,
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

fn default_heartbeat_timeout_secs() -> u64 {
    6 * 60 * 60 // 6 hours, a typical long-sync default
}

impl ReplicationConfig {
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

/// Launch parameters for the source subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLaunchConfig {
    pub image: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub catalog: ConfiguredCatalog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    pub config: serde_json::Value,
}

/// Launch parameters for the destination subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DestinationLaunchConfig {
    pub image: String,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub catalog: ConfiguredCatalog,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<serde_json::Value>,
    pub config: serde_json::Value,
}

/// Everything `ReplicationWorker::run` needs for one attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncInput {
    pub config: ReplicationConfig,
    pub source: SourceLaunchConfig,
    pub destination: DestinationLaunchConfig,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
