// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn stream(name: &str) -> ConfiguredStream {
    ConfiguredStream {
        descriptor: StreamDescriptor::new(name),
        json_schema: json!({"type": "object"}),
        sync_mode: SyncMode::Incremental,
        destination_sync_mode: DestinationSyncMode::Append,
        selected_fields: None,
    }
}

#[test]
fn find_locates_stream_by_descriptor() {
    let catalog = ConfiguredCatalog { streams: vec![stream("users"), stream("orders")] };
    let found = catalog.find(&StreamDescriptor::new("orders")).unwrap();
    assert_eq!(found.descriptor.name, "orders");
}

#[test]
fn contains_is_false_for_unknown_stream() {
    let catalog = ConfiguredCatalog { streams: vec![stream("users")] };
    assert!(!catalog.contains(&StreamDescriptor::new("ghost")));
}

#[test]
fn sync_mode_display_uses_snake_case() {
    assert_eq!(SyncMode::FullRefresh.to_string(), "full_refresh");
    assert_eq!(DestinationSyncMode::AppendDedup.to_string(), "append_dedup");
}
