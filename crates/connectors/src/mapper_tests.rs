// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rw_core::{DestinationSyncMode, RecordMessage, StreamDescriptor, SyncMode};

fn catalog_with_selection(selected_fields: Option<Vec<String>>) -> ConfiguredCatalog {
    ConfiguredCatalog {
        streams: vec![ConfiguredStream {
            descriptor: StreamDescriptor::new("users"),
            json_schema: serde_json::json!({}),
            sync_mode: SyncMode::FullRefresh,
            destination_sync_mode: DestinationSyncMode::Append,
            selected_fields,
        }],
    }
}

fn record_message() -> Message {
    Message::Record {
        record: RecordMessage {
            stream: "users".to_string(),
            namespace: None,
            data: serde_json::json!({"id": 1, "name": "ada", "ssn": "secret"}),
            emitted_at_ms: 0,
        },
    }
}

#[test]
fn field_selection_retains_only_selected_keys() {
    let catalog = catalog_with_selection(Some(vec!["id".to_string(), "name".to_string()]));
    let mapped = apply_field_selection(&catalog, record_message());
    let Message::Record { record } = mapped else { panic!("expected record") };
    assert_eq!(record.data, serde_json::json!({"id": 1, "name": "ada"}));
}

#[test]
fn field_selection_passes_through_when_not_configured() {
    let catalog = catalog_with_selection(None);
    let mapped = apply_field_selection(&catalog, record_message());
    let Message::Record { record } = mapped else { panic!("expected record") };
    assert_eq!(record.data, serde_json::json!({"id": 1, "name": "ada", "ssn": "secret"}));
}

#[test]
fn field_selection_passes_through_unknown_stream() {
    let catalog = ConfiguredCatalog::default();
    let mapped = apply_field_selection(&catalog, record_message());
    assert_eq!(mapped, record_message());
}

#[test]
fn field_selection_ignores_non_record_messages() {
    let catalog = catalog_with_selection(Some(vec!["id".to_string()]));
    let state = Message::State {
        state: rw_core::StateMessage { stream: Some(StreamDescriptor::new("users")), data: serde_json::json!({}) },
    };
    let mapped = apply_field_selection(&catalog, state.clone());
    assert_eq!(mapped, state);
}

struct UppercaseStreamMapper;

impl AirbyteMapper for UppercaseStreamMapper {
    fn map_catalog(&self, mut catalog: ConfiguredCatalog) -> ConfiguredCatalog {
        for stream in &mut catalog.streams {
            stream.descriptor.name = stream.descriptor.name.to_uppercase();
        }
        catalog
    }

    fn map_message(&self, message: Message) -> Message {
        match message {
            Message::Record { mut record } => {
                record.stream = record.stream.to_uppercase();
                Message::Record { record }
            }
            other => other,
        }
    }
}

#[test]
fn identity_mapper_passes_everything_through() {
    let catalog = catalog_with_selection(None);
    let mapper = IdentityMapper;
    assert_eq!(mapper.map_catalog(catalog.clone()), catalog);
    assert_eq!(mapper.map_message(record_message()), record_message());
}

#[test]
fn composed_mapper_folds_left_to_right() {
    let composed = ComposedMapper::new(vec![Box::new(UppercaseStreamMapper), Box::new(IdentityMapper)]);
    let mapped = composed.map_message(record_message());
    let Message::Record { record } = mapped else { panic!("expected record") };
    assert_eq!(record.stream, "USERS");
}
