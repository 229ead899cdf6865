//! Line codec for the command link
//!
//! Outbound packets become one JSON object per line; a line is split into
//! chunks no larger than the per-write payload bound before it reaches the
//! radio. Inbound notifications are plain text.

use crate::errors::LinkError;
use crate::packet::{CommandPacket, ControlRequest};
use crate::Result;

/// Line terminator appended to every outbound message
pub const LINE_TERMINATOR: u8 = b'\n';

/// Per-write payload bound, kept under a 20-byte transport unit
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 18;

// ----------------------------------------------------------------------------
// Outbound
// ----------------------------------------------------------------------------

/// Encode a packet as its canonical newline-terminated wire line
pub fn encode(packet: &CommandPacket) -> Result<String> {
    let mut line = serde_json::to_string(packet)?;
    line.push(LINE_TERMINATOR as char);
    Ok(line)
}

/// Append the line terminator unless the message already ends with one
pub fn ensure_line_terminator(bytes: &[u8]) -> Vec<u8> {
    let mut line = Vec::with_capacity(bytes.len() + 1);
    line.extend_from_slice(bytes);
    if line.last() != Some(&LINE_TERMINATOR) {
        line.push(LINE_TERMINATOR);
    }
    line
}

/// Split a message into ordered chunks of at most `max` bytes
///
/// A `max` of zero is treated as one byte per chunk.
pub fn chunk(bytes: &[u8], max: usize) -> core::slice::Chunks<'_, u8> {
    bytes.chunks(max.max(1))
}

/// Number of writes needed for a message of `len` bytes
pub fn chunk_count(len: usize, max: usize) -> usize {
    len.div_ceil(max.max(1))
}

// ----------------------------------------------------------------------------
// Inbound
// ----------------------------------------------------------------------------

/// Decode a notification payload into a trimmed text line
///
/// Returns `None` for payloads that are empty after trimming.
pub fn decode_notification(bytes: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(bytes);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse an operator request line in either the current or the legacy form
pub fn parse_request(line: &str) -> Result<ControlRequest> {
    serde_json::from_str(line.trim()).map_err(LinkError::from)
}
