// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-core: shared data model for the replication engine.
//!
//! Every type here is a plain value type or a small trait (`Clock`) — no
//! subprocess management, no I/O. Downstream crates (`rw-protocol`,
//! `rw-connectors`, `rw-engine`) all depend on this one.

pub mod macros;

pub mod catalog;
pub mod clock;
pub mod config;
pub mod failure;
pub mod message;
pub mod output;
pub mod stats;

pub use catalog::{ConfiguredCatalog, ConfiguredStream, DestinationSyncMode, SyncMode};
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{DestinationLaunchConfig, ReplicationConfig, SourceLaunchConfig, SyncInput};
pub use failure::{FailureOrigin, FailureReason, FailureType};
pub use message::{ControlMessage, LogMessage, Message, RecordMessage, StateMessage, StreamDescriptor, TraceMessage};
pub use output::{resolve_status, AttemptSummary, ReplicationOutput, ReplicationStatus};
pub use stats::{totals_from_streams, StreamSyncStats, SyncStats};
