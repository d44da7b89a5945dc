// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-engine: the replication orchestrator.
//!
//! [`worker::ReplicationWorker`] drives the two-loop sync against a source
//! and destination connector, while [`tracker::MessageTracker`] and
//! [`validator::RecordSchemaValidator`] do the per-message bookkeeping each
//! loop needs along the way.

pub mod error;
pub mod tracker;
pub mod validator;
pub mod worker;

pub use error::{classify_failure, LoopFailure, ReplicationError};
pub use tracker::{MessageTracker, MAX_STATE_HISTORY};
pub use validator::{RecordSchemaValidator, ValidationMode};
pub use worker::ReplicationWorker;
