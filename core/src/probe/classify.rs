//! Response classification for the second probe phase.

use std::fmt;

use gmf_common::config::ScanConfig;
use gmf_protocols::http;

use super::Outcome;

/// Stands in for bodies that are not text.
pub const BINARY_SENTINEL: &str = "<binary data>";

/// A reportable response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Text(String),
    Binary,
}

impl Body {
    /// Text bodies go through [`decode`], so stray Latin-1 bytes are dropped.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        if is_binary(bytes) {
            Body::Binary
        } else {
            Body::Text(decode(bytes))
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Body::Binary)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Body::Text(text) => text,
            Body::Binary => BINARY_SENTINEL,
        }
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tab, newline, form feed, carriage return, escape and `0x20..=0xFF` minus DEL.
pub fn is_text_byte(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | 0x0c | b'\r' | 0x1b | 0x20..=0x7e | 0x80..=0xff)
}

pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.iter().any(|&byte| !is_text_byte(byte))
}

/// UTF-8 decoding that skips invalid sequences instead of replacing them,
/// so `caf\xe9` reads as `caf` rather than `caf\u{FFFD}`.
pub fn decode(bytes: &[u8]) -> String {
    bytes.utf8_chunks().map(|chunk| chunk.valid()).collect()
}

/// Decides the outcome of the target request.
///
/// The exclusion pattern is checked against the decoded body whether or not
/// the body is binary.
pub fn classify(config: &ScanConfig, status: u16, body: &[u8]) -> Outcome {
    let text: String = decode(body);
    if config.is_excluded(&text) {
        return Outcome::Negative;
    }
    if !http::is_success(status) {
        return Outcome::Negative;
    }
    Outcome::Positive(Body::from_bytes(body))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
