//! Plaintext datagram format
//!
//! ```text
//! request:   <TRIGGER>[=<ARGUMENT>]        (CRLF optional)
//! response:  <TAG>=<VALUE>\r\n  |  INVALID COMMAND\r\n
//! push:      <TAG>=<VALUE>\r\n  ...  SEQUENCENUMBER=<n>\r\n
//! pairing:   PAIR=0\r\n                    (broadcast)
//! ```
//!
//! One line per datagram, ASCII.

use std::fmt::Display;

/// Maximum datagram the request handler accepts
pub const MAX_DATAGRAM_SIZE: usize = 1024;

/// Reply for anything that does not resolve to a command
pub const INVALID_COMMAND: &str = "INVALID COMMAND\r\n";

/// Pairing announcement and unpair notice
pub const PAIR_NOTICE: &str = "PAIR=0\r\n";

/// Tag of the trailing line of every push cycle
pub const SEQUENCE_TAG: &str = "SEQUENCENUMBER";

/// Format one `TAG=VALUE\r\n` line
pub fn format_line(tag: &str, value: impl Display) -> String {
    format!("{}={}\r\n", tag, value)
}

/// Extract the request text from a raw datagram
///
/// Everything from the first NUL on is ignored, then surrounding whitespace
/// (including CR/LF) is trimmed. Returns `None` for non-UTF-8 payloads.
pub fn decode_request(raw: &[u8]) -> Option<&str> {
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    std::str::from_utf8(&raw[..end]).ok().map(str::trim)
}
