// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn record_round_trips_through_json() {
    let msg = Message::Record {
        record: RecordMessage {
            stream: "users".to_string(),
            namespace: None,
            data: json!({"id": 1}),
            emitted_at_ms: 10,
        },
    };
    let encoded = serde_json::to_string(&msg).unwrap();
    assert!(encoded.contains("\"type\":\"RECORD\""));
    let decoded: Message = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded, msg);
}

#[test]
fn state_content_hash_is_stable_for_equal_payloads() {
    let a = StateMessage { stream: Some(StreamDescriptor::new("users")), data: json!({"cursor": 5}) };
    let b = StateMessage { stream: Some(StreamDescriptor::new("users")), data: json!({"cursor": 5}) };
    assert_eq!(a.content_hash(), b.content_hash());
}

#[test]
fn state_content_hash_differs_for_different_payloads() {
    let a = StateMessage { stream: Some(StreamDescriptor::new("users")), data: json!({"cursor": 5}) };
    let b = StateMessage { stream: Some(StreamDescriptor::new("users")), data: json!({"cursor": 6}) };
    assert_ne!(a.content_hash(), b.content_hash());
}

#[test]
fn control_other_variant_accepts_unknown_tags() {
    let json = json!({"type": "SOMETHING_ELSE"});
    let control: ControlMessage = serde_json::from_value(json).unwrap();
    assert_eq!(control, ControlMessage::Other);
}

#[test]
fn descriptor_display_includes_namespace_when_present() {
    let with_ns = StreamDescriptor::with_namespace("orders", "public");
    assert_eq!(with_ns.to_string(), "public.orders");
    let without_ns = StreamDescriptor::new("orders");
    assert_eq!(without_ns.to_string(), "orders");
}

#[test]
fn message_kind_reports_the_wire_discriminator() {
    let msg = Message::Log { log: LogMessage { level: "INFO".to_string(), message: "hi".to_string() } };
    assert_eq!(msg.kind(), "LOG");
}
