// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_defaults_external_message_to_internal() {
    let reason = FailureReason::new(FailureOrigin::Source, FailureType::SystemError, "boom", 100);
    assert_eq!(reason.internal_message, "boom");
    assert_eq!(reason.external_message, "boom");
    assert!(reason.stack_trace.is_none());
    assert!(reason.retryable.is_none());
}

#[test]
fn builder_methods_override_fields() {
    let reason = FailureReason::new(FailureOrigin::Destination, FailureType::TransientError, "internal", 1)
        .with_external_message("safe to show")
        .with_stack_trace("at foo.rs:1")
        .with_retryable(true);

    assert_eq!(reason.external_message, "safe to show");
    assert_eq!(reason.stack_trace.as_deref(), Some("at foo.rs:1"));
    assert_eq!(reason.retryable, Some(true));
}

#[test]
fn origin_and_type_display_as_snake_case() {
    assert_eq!(FailureOrigin::SourceHeartbeat.to_string(), "source_heartbeat");
    assert_eq!(FailureType::ManualCancellation.to_string(), "manual_cancellation");
}
