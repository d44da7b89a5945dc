// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-connectors: the adapter layer around everything the engine treats as
//! an external, side-effecting collaborator — source/destination
//! subprocesses, message mappers, the heartbeat watchdog, and the state
//! persistence sink. One trait per concern, each with a real subprocess-
//! or channel-backed implementation and (behind `test-support`) a fake.

mod heartbeat;
mod mapper;
mod persistence;
mod process;

pub use heartbeat::{EnvFlagClient, FeatureFlagClient, HeartbeatTimeoutChaperone, HeartbeatTimeoutError, StaticFlagClient};
pub use mapper::{apply_field_selection, AirbyteMapper, ComposedMapper, IdentityMapper};
pub use persistence::{BufferedSyncPersistence, PersistenceCloseOutcome, SyncPersistence};
pub use process::{ConnectorError, DestinationConnector, SourceConnector, SubprocessDestination, SubprocessSource};

#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeDestination, FakeSource};
