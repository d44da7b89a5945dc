// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rw-protocol: the line-delimited JSON wire format connectors speak over
//! their stdout/stdin.
//!
//! Wire format: one `rw_core::Message` JSON object per line. The engine does
//! not define the message schema — it is an external contract consumed as-is.

mod codec;

pub use codec::{decode_line, encode_line, read_message, write_message, ProtocolError};
