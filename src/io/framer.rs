// src/io/framer.rs
//
// Framing implementations for the incoming serial byte stream. Each framing
// mode turns the raw stream into the chunks that become data records:
// fixed-size groups, delimiter-separated messages, regex-separated messages,
// or a pass-through gated on a ready marker.

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::bytes_to_text;

// ============================================================================
// Types
// ============================================================================

/// Framing configuration, selected in the connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FramingMode {
    /// Emit frames of exactly `length` bytes.
    ByteLength { length: usize },
    /// Emit frames separated by a byte sequence.
    Delimiter {
        delimiter: Vec<u8>,
        include_delimiter: bool,
    },
    /// Split the stream on regular expression matches.
    Regex { pattern: String },
    /// Discard everything until the ready marker is seen once, then pass
    /// the stream through unframed.
    Ready { delimiter: Vec<u8> },
}

impl Default for FramingMode {
    fn default() -> Self {
        FramingMode::ByteLength { length: 1 }
    }
}

/// Unescape the delimiter notation used in the settings dialog, where
/// control characters are typed as escape sequences.
pub fn unescape_delimiter(value: &str) -> String {
    value
        .replace("\\n", "\n")
        .replace("\\t", "\t")
        .replace("\\r", "\r")
        .replace("\\0", "\0")
        .replace("\\'", "'")
        .replace("\\\"", "\"")
}

// ============================================================================
// Internal Framer Trait
// ============================================================================

trait FramerImpl {
    fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>>;
    fn flush(&mut self) -> Option<Vec<u8>>;
}

// ============================================================================
// Byte Length Framer
// ============================================================================

struct ByteLengthFramer {
    buffer: Vec<u8>,
    length: usize,
}

impl ByteLengthFramer {
    fn new(length: usize) -> Self {
        ByteLengthFramer {
            buffer: Vec::new(),
            // A zero length would never emit a frame
            length: length.max(1),
        }
    }
}

impl FramerImpl for ByteLengthFramer {
    fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        for &byte in data {
            self.buffer.push(byte);
            if self.buffer.len() >= self.length {
                frames.push(self.buffer.drain(..).collect());
            }
        }
        frames
    }

    fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.drain(..).collect())
        }
    }
}

// ============================================================================
// Delimiter Framer
// ============================================================================

struct DelimiterFramer {
    buffer: Vec<u8>,
    delimiter: Vec<u8>,
    include_delimiter: bool,
}

impl DelimiterFramer {
    fn new(delimiter: Vec<u8>, include_delimiter: bool) -> Self {
        DelimiterFramer {
            buffer: Vec::new(),
            delimiter,
            include_delimiter,
        }
    }
}

impl FramerImpl for DelimiterFramer {
    fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        if self.delimiter.is_empty() {
            // Degenerates to pass-through
            if !data.is_empty() {
                frames.push(data.to_vec());
            }
            return frames;
        }

        for &byte in data {
            self.buffer.push(byte);

            // Check for delimiter match at end of buffer
            if self.buffer.len() >= self.delimiter.len() {
                let start = self.buffer.len() - self.delimiter.len();
                if self.buffer[start..] == self.delimiter[..] {
                    let frame: Vec<u8> = if self.include_delimiter {
                        self.buffer.drain(..).collect()
                    } else {
                        let frame = self.buffer.drain(..start).collect();
                        self.buffer.clear();
                        frame
                    };
                    if !frame.is_empty() {
                        frames.push(frame);
                    }
                }
            }
        }
        frames
    }

    fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.drain(..).collect())
        }
    }
}

// ============================================================================
// Regex Framer
// ============================================================================

struct RegexFramer {
    buffer: String,
    regex: Option<Regex>,
}

impl RegexFramer {
    fn new(pattern: &str) -> Self {
        // An invalid pattern falls back to pass-through rather than failing
        // the connection; the settings dialog validates before saving.
        let regex = Regex::new(pattern).ok();
        RegexFramer {
            buffer: String::new(),
            regex,
        }
    }
}

impl FramerImpl for RegexFramer {
    fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        let mut frames = Vec::new();
        let Some(regex) = &self.regex else {
            if !data.is_empty() {
                frames.push(data.to_vec());
            }
            return frames;
        };

        self.buffer.push_str(&bytes_to_text(data));
        loop {
            let (start, end) = match regex.find(&self.buffer) {
                // A zero-width match would never consume input
                Some(m) if m.end() > m.start() => (m.start(), m.end()),
                _ => break,
            };
            if start > 0 {
                frames.push(super::text_to_bytes(&self.buffer[..start]));
            }
            self.buffer.drain(..end);
        }
        frames
    }

    fn flush(&mut self) -> Option<Vec<u8>> {
        if self.buffer.is_empty() {
            None
        } else {
            let frame = super::text_to_bytes(&self.buffer);
            self.buffer.clear();
            Some(frame)
        }
    }
}

// ============================================================================
// Ready Framer
// ============================================================================

struct ReadyFramer {
    buffer: Vec<u8>,
    delimiter: Vec<u8>,
    ready: bool,
}

impl ReadyFramer {
    fn new(delimiter: Vec<u8>) -> Self {
        let ready = delimiter.is_empty();
        ReadyFramer {
            buffer: Vec::new(),
            delimiter,
            ready,
        }
    }
}

impl FramerImpl for ReadyFramer {
    fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        if self.ready {
            if data.is_empty() {
                return Vec::new();
            }
            return vec![data.to_vec()];
        }

        self.buffer.extend_from_slice(data);
        let Some(pos) = self
            .buffer
            .windows(self.delimiter.len())
            .position(|w| w == self.delimiter)
        else {
            return Vec::new();
        };

        self.ready = true;
        let rest: Vec<u8> = self.buffer.split_off(pos + self.delimiter.len());
        self.buffer.clear();
        if rest.is_empty() {
            Vec::new()
        } else {
            vec![rest]
        }
    }

    fn flush(&mut self) -> Option<Vec<u8>> {
        // Data before the ready marker is discarded by design
        self.buffer.clear();
        None
    }
}

// ============================================================================
// Public SerialFramer
// ============================================================================

/// Stateful framer for the live serial stream. Feed raw reads in, get
/// complete frames out.
pub struct SerialFramer {
    framer: Box<dyn FramerImpl + Send>,
}

impl SerialFramer {
    /// Create a new framer for the given mode.
    pub fn new(mode: FramingMode) -> Self {
        let framer: Box<dyn FramerImpl + Send> = match mode {
            FramingMode::ByteLength { length } => Box::new(ByteLengthFramer::new(length)),
            FramingMode::Delimiter {
                delimiter,
                include_delimiter,
            } => Box::new(DelimiterFramer::new(delimiter, include_delimiter)),
            FramingMode::Regex { pattern } => Box::new(RegexFramer::new(&pattern)),
            FramingMode::Ready { delimiter } => Box::new(ReadyFramer::new(delimiter)),
        };
        SerialFramer { framer }
    }

    /// Feed raw bytes into the framer and return any complete frames.
    pub fn feed(&mut self, data: &[u8]) -> Vec<Vec<u8>> {
        self.framer.feed(data)
    }

    /// Flush any remaining buffered data as a final frame. Call when the
    /// stream ends.
    pub fn flush(&mut self) -> Option<Vec<u8>> {
        self.framer.flush()
    }
}
