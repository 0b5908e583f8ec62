// src/io/mod.rs
//
// Serial port I/O: framing of the incoming byte stream and the port
// connection itself.

pub mod framer;
pub mod serial;

use serde::{Deserialize, Serialize};

/// Connection state reported to the frontend on the `port-status` event and
/// returned from the connection commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    NoPortSelected,
    NoBaudRateSelected,
    PortAlreadyOpen,
    PortNotWritable,
}

/// Decode raw bytes into the character string a record carries. Each byte
/// maps to one code point (0x00-0xFF), so the codec's byte grouping can
/// reconstruct the original bytes.
pub fn bytes_to_text(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Encode a record/message character string back to raw bytes. Code points
/// above 0xFF are truncated to their low byte.
pub fn text_to_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (c as u32 & 0xFF) as u8).collect()
}
