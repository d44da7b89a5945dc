// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configured catalog: the declared set of streams with schemas and sync
//! modes for a run.

use crate::message::StreamDescriptor;
use crate::simple_display;
use serde::{Deserialize, Serialize};

/// How the source reads a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    FullRefresh,
    Incremental,
}

simple_display! {
    SyncMode {
        FullRefresh => "full_refresh",
        Incremental => "incremental",
    }
}

/// How the destination writes a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationSyncMode {
    Append,
    Overwrite,
    AppendDedup,
}

simple_display! {
    DestinationSyncMode {
        Append => "append",
        Overwrite => "overwrite",
        AppendDedup => "append_dedup",
    }
}

/// One stream entry in a configured catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredStream {
    pub descriptor: StreamDescriptor,
    pub json_schema: serde_json::Value,
    pub sync_mode: SyncMode,
    pub destination_sync_mode: DestinationSyncMode,
    /// Explicit top-level field selection. `None` disables field selection
    /// for this stream even if the run as a whole has it enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_fields: Option<Vec<String>>,
}

/// Ordered collection of stream entries for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfiguredCatalog {
    pub streams: Vec<ConfiguredStream>,
}

impl ConfiguredCatalog {
    pub fn find(&self, descriptor: &StreamDescriptor) -> Option<&ConfiguredStream> {
        self.streams.iter().find(|s| &s.descriptor == descriptor)
    }

    pub fn contains(&self, descriptor: &StreamDescriptor) -> bool {
        self.find(descriptor).is_some()
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
