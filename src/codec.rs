// src/codec.rs
//
// Encoding conversions between character data and its binary, decimal and
// hexadecimal text representations. Exposed to the frontend via Tauri commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Types
// ============================================================================

/// Supported display encodings for monitored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionKind {
    Ascii,
    Bin,
    Dec,
    Hex,
}

/// One unit of data read from or written to the serial port, carried in all
/// four encodings. The encoded fields are always derived from `value` via
/// [`DataRecord::with_timestamp`] and never set independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "valueAsBin", skip_serializing_if = "Option::is_none")]
    pub value_as_bin: Option<String>,
    #[serde(rename = "valueAsDec", skip_serializing_if = "Option::is_none")]
    pub value_as_dec: Option<String>,
    #[serde(rename = "valueAsHex", skip_serializing_if = "Option::is_none")]
    pub value_as_hex: Option<String>,
}

impl DataRecord {
    /// Build a record for `value` stamped with the current time.
    pub fn from_value(value: &str) -> Self {
        Self::with_timestamp(Utc::now(), value)
    }

    /// Build a record for `value` with an explicit receipt time.
    pub fn with_timestamp(timestamp: DateTime<Utc>, value: &str) -> Self {
        DataRecord {
            timestamp: Some(timestamp),
            value: Some(value.to_string()),
            value_as_bin: Some(ascii_to_bin(value)),
            value_as_dec: Some(ascii_to_decimal(value)),
            value_as_hex: Some(ascii_to_hex(value)),
        }
    }
}

// ============================================================================
// Character String -> Encoded String
// ============================================================================

/// Convert a character string to a binary string. One value per UTF-16 code
/// unit, joined with `,`, no leading zeros.
///
/// "abc123\n" -> "1100001,1100010,1100011,110001,110010,110011,1010"
pub fn ascii_to_bin(text: &str) -> String {
    text.encode_utf16()
        .map(|u| format!("{:b}", u))
        .collect::<Vec<_>>()
        .join(",")
}

/// Convert a character string to a decimal string. One value per UTF-16 code
/// unit, joined with `,`, no leading zeros.
///
/// "abc123\n" -> "97,98,99,49,50,51,10"
pub fn ascii_to_decimal(text: &str) -> String {
    text.encode_utf16()
        .map(|u| u.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Convert a character string to an upper-case hex string. One value per
/// UTF-16 code unit, joined with `,`, no leading zeros.
///
/// "abc123\n" -> "61,62,63,31,32,33,A"
pub fn ascii_to_hex(text: &str) -> String {
    text.encode_utf16()
        .map(|u| format!("{:X}", u))
        .collect::<Vec<_>>()
        .join(",")
}

// ============================================================================
// Number -> Encoded String
// ============================================================================

/// Render a decimal number as a binary string without leading zeros.
/// Negative numbers are wrapped to 8 bits via two's complement.
///
/// -1 -> "11111111", 12 -> "1100"
pub fn decimal_to_binary(num: i64) -> String {
    let value = if num < 0 { ((1 << 8) + num) & 0xFF } else { num };
    format!("{:b}", value as u64)
}

/// Render a decimal number as an upper-case hex string without leading zeros.
pub fn decimal_to_hex(num: i64) -> String {
    if num < 0 {
        format!("-{:X}", num.unsigned_abs())
    } else {
        format!("{:X}", num)
    }
}

// ============================================================================
// Encoded String -> Character String
// ============================================================================

/// Convert a decimal number back to a character string. The number's binary
/// form is split into bytes from the right; each byte becomes one character.
/// Values above one byte therefore decode to multi-character strings.
///
/// 65 -> "A", 65256 -> "þè"
pub fn decimal_to_ascii(num: i64) -> String {
    bin_array_to_ascii(&bin_to_bin_array(&decimal_to_binary(num)))
}

/// Convert a hex string back to a character string, byte-grouped the same
/// way as [`decimal_to_ascii`]. Non-hex input decodes to garbage rather than
/// failing; call sites pre-validate through key-filtered input fields.
pub fn hex_to_ascii(hex: &str) -> String {
    let num = i64::from_str_radix(hex.trim(), 16).unwrap_or(0);
    bin_array_to_ascii(&bin_to_bin_array(&decimal_to_binary(num)))
}

/// Split a binary digit string into byte values, grouping by 8 digits from
/// the right. The leftmost group may be shorter than 8 digits, so input
/// never needs leading zeros.
///
/// "11001100" -> [204], "101010001111" -> [10, 143]
pub fn bin_to_bin_array(bin: &str) -> Vec<u32> {
    let mut groups = Vec::new();
    let mut end = bin.len();
    while end > 0 {
        let start = end.saturating_sub(8);
        let group = bin.get(start..end).unwrap_or("");
        groups.push(u32::from_str_radix(group, 2).unwrap_or(0));
        end = start;
    }
    groups.reverse();
    groups
}

/// Map each value to one UTF-16 code unit and concatenate.
///
/// [97, 98] -> "ab"
pub fn bin_array_to_ascii(binaries: &[u32]) -> String {
    binaries
        .iter()
        .map(|&b| char::from_u32(b & 0xFFFF).unwrap_or('\u{FFFD}'))
        .collect()
}

// ============================================================================
// High-Level Functions
// ============================================================================

/// Convert a user-entered value in the given encoding to the raw character
/// string that goes onto the wire. The encoding must match the value; a
/// binary string tagged as decimal decodes to garbage, not an error.
pub fn to_transmit_string(value: &str, kind: ConversionKind) -> String {
    match kind {
        ConversionKind::Ascii => value.to_string(),
        ConversionKind::Bin => bin_array_to_ascii(&bin_to_bin_array(value)),
        ConversionKind::Dec => decimal_to_ascii(value.trim().parse().unwrap_or(0)),
        ConversionKind::Hex => hex_to_ascii(value),
    }
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Convert a character string to the requested encoding.
#[tauri::command]
pub fn convert_ascii_cmd(text: String, target: ConversionKind) -> String {
    match target {
        ConversionKind::Ascii => text,
        ConversionKind::Bin => ascii_to_bin(&text),
        ConversionKind::Dec => ascii_to_decimal(&text),
        ConversionKind::Hex => ascii_to_hex(&text),
    }
}

/// Convert an encoded value back to its character string.
#[tauri::command]
pub fn convert_to_ascii_cmd(value: String, source: ConversionKind) -> String {
    to_transmit_string(&value, source)
}
