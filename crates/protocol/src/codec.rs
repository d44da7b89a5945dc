// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-delimited JSON codec.

use rw_core::Message;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed message line: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Parse one line of the wire protocol into a [`Message`].
///
/// Returns `Err` for both invalid JSON and JSON that doesn't match any known
/// message shape; callers decide whether that's fatal or just a line to skip
/// (most callers treat it as the latter — see `rw-connectors`).
pub fn decode_line(line: &str) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Serialize a [`Message`] as a single JSON line (no trailing newline).
pub fn encode_line(message: &Message) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(message)?)
}

/// Read the next message line from a buffered async reader.
///
/// Returns `Ok(None)` at EOF — the caller's signal that the peer has closed
/// its output. Blank lines are skipped transparently (connectors sometimes
/// emit them between messages).
pub async fn read_message<R>(reader: &mut R) -> Result<Option<Message>, ProtocolError>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await?;
        if n == 0 {
            return Ok(None);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.is_empty() {
            continue;
        }
        return Ok(Some(decode_line(trimmed)?));
    }
}

/// Write one message as a newline-terminated JSON line and flush.
pub async fn write_message<W>(writer: &mut W, message: &Message) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = encode_line(message)?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
