// src/export.rs
//
// Builds export content from captured data records, either as delimited raw
// text or as JSON. The encoded fields on each record are already derived by
// the codec; this module only formats and joins them.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tauri::AppHandle;

use crate::codec::{ConversionKind, DataRecord};
use crate::settings;

// ============================================================================
// Types
// ============================================================================

/// Supported export file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Delimited plain text, written as `.log`
    Raw,
    /// JSON array with one object per record, written as `.json`
    Json,
}

/// Encodings are always emitted in this order, independent of selection order.
const ENCODING_ORDER: [ConversionKind; 4] = [
    ConversionKind::Ascii,
    ConversionKind::Bin,
    ConversionKind::Dec,
    ConversionKind::Hex,
];

// ============================================================================
// Value Formatting
// ============================================================================

/// Render a record's timestamp as ISO-8601 with milliseconds in UTC.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Format one encoded field of a record. The field may hold several
/// `,`-joined sub-values (one per original character); each sub-value is
/// optionally left-padded to the encoding's full byte width and joined to
/// its neighbours with `delimiter`. A single sub-value is instead prefixed
/// with `record_delimiter`, which is how consecutive single-character
/// records end up delimiter-separated in raw output.
///
/// A record missing the requested field aborts the export: it means an
/// upstream component failed to derive the encodings.
fn convert_value(
    data: Option<&str>,
    record_delimiter: &str,
    delimiter: &str,
    split_on_comma: bool,
    zeros: &str,
    leading_zeros: bool,
) -> Result<String, String> {
    let data = data.ok_or_else(|| "Value for export missing".to_string())?;
    let values: Vec<&str> = if split_on_comma {
        data.split(',').collect()
    } else {
        data.char_indices()
            .map(|(i, c)| &data[i..i + c.len_utf8()])
            .collect()
    };

    let zeros = if leading_zeros { zeros } else { "" };
    let mut res = String::new();
    let mut multi_delimiter = "";
    for value in &values {
        let padding = zeros.get(value.len()..).unwrap_or("");
        if values.len() > 1 {
            res.push_str(multi_delimiter);
            res.push_str(padding);
            res.push_str(value);
            multi_delimiter = delimiter;
        } else {
            res.push_str(record_delimiter);
            res.push_str(padding);
            res.push_str(value);
        }
    }
    Ok(res)
}

/// Format the field of `record` selected by `kind` with that encoding's
/// padding template. Hex output is upper-cased unconditionally.
fn convert_encoded(
    record: &DataRecord,
    kind: ConversionKind,
    record_delimiter: &str,
    delimiter: &str,
    leading_zeros: bool,
) -> Result<String, String> {
    match kind {
        ConversionKind::Ascii => convert_value(
            record.value.as_deref(),
            record_delimiter,
            delimiter,
            false,
            "",
            false,
        ),
        ConversionKind::Bin => convert_value(
            record.value_as_bin.as_deref(),
            record_delimiter,
            delimiter,
            true,
            "00000000",
            leading_zeros,
        ),
        ConversionKind::Dec => convert_value(
            record.value_as_dec.as_deref(),
            record_delimiter,
            delimiter,
            true,
            "000",
            leading_zeros,
        ),
        ConversionKind::Hex => {
            // Upper-cased on the field itself; delimiters pass through unchanged
            let hex = record.value_as_hex.as_deref().map(str::to_uppercase);
            convert_value(
                hex.as_deref(),
                record_delimiter,
                delimiter,
                true,
                "00",
                leading_zeros,
            )
        }
    }
}

// ============================================================================
// Content Builders
// ============================================================================

/// Build raw text content. Records follow each other separated by the
/// delimiter; when timestamps are requested, every record is preceded by a
/// `<iso-timestamp>:` line and the record delimiter restarts after it.
pub fn build_raw_content(
    encodings: &[ConversionKind],
    data: &[DataRecord],
    delimiter: &str,
    leading_zeros: bool,
    include_timestamp: bool,
) -> Result<String, String> {
    let mut res = String::new();
    let mut timestamp_delimiter = "";
    let mut record_delimiter = String::new();
    for record in data {
        if include_timestamp {
            let timestamp = record
                .timestamp
                .ok_or_else(|| "Timestamp for export missing".to_string())?;
            res.push_str(timestamp_delimiter);
            res.push_str(&format_timestamp(&timestamp));
            res.push_str(":\n");
            record_delimiter.clear();
        }
        for kind in ENCODING_ORDER {
            if encodings.contains(&kind) {
                res.push_str(&convert_encoded(
                    record,
                    kind,
                    &record_delimiter,
                    delimiter,
                    leading_zeros,
                )?);
            }
        }
        record_delimiter = delimiter.to_string();
        timestamp_delimiter = "\n";
    }
    Ok(res)
}

/// Build JSON content: one object per record holding only the requested
/// fields, serialised with 2-space indentation. The JSON structure itself
/// separates records, so no record delimiter is applied.
pub fn build_json_content(
    encodings: &[ConversionKind],
    data: &[DataRecord],
    delimiter: &str,
    leading_zeros: bool,
    include_timestamp: bool,
) -> Result<String, String> {
    let mut res = Vec::new();
    for record in data {
        let mut point = serde_json::Map::new();
        if include_timestamp {
            let timestamp = record
                .timestamp
                .ok_or_else(|| "Timestamp for export missing".to_string())?;
            point.insert("timestamp".to_string(), json!(format_timestamp(&timestamp)));
        }
        for kind in ENCODING_ORDER {
            if encodings.contains(&kind) {
                let value = convert_encoded(record, kind, "", delimiter, leading_zeros)?;
                let field = match kind {
                    ConversionKind::Ascii => "value",
                    ConversionKind::Bin => "valueAsBin",
                    ConversionKind::Dec => "valueAsDec",
                    ConversionKind::Hex => "valueAsHex",
                };
                point.insert(field.to_string(), json!(value));
            }
        }
        res.push(serde_json::Value::Object(point));
    }
    serde_json::to_string_pretty(&res).map_err(|e| format!("Failed to serialise export: {}", e))
}

// ============================================================================
// Tauri Commands
// ============================================================================

/// Build export content without writing it anywhere, e.g. for a preview.
#[tauri::command]
pub fn build_export_content_cmd(
    format: ExportFormat,
    encodings: Vec<ConversionKind>,
    data: Vec<DataRecord>,
    delimiter: String,
    leading_zeros: bool,
    include_timestamp: bool,
) -> Result<String, String> {
    match format {
        ExportFormat::Raw => {
            build_raw_content(&encodings, &data, &delimiter, leading_zeros, include_timestamp)
        }
        ExportFormat::Json => {
            build_json_content(&encodings, &data, &delimiter, leading_zeros, include_timestamp)
        }
    }
}

/// Build export content and write it to the configured export directory
/// with a timestamped filename. Returns the path written.
#[tauri::command]
pub async fn export_data(
    app: AppHandle,
    format: ExportFormat,
    encodings: Vec<ConversionKind>,
    data: Vec<DataRecord>,
    delimiter: String,
    leading_zeros: bool,
    include_timestamp: bool,
) -> Result<String, String> {
    let app_settings = settings::load_settings(app).await?;

    let (content, extension) = match format {
        ExportFormat::Raw => (
            build_raw_content(&encodings, &data, &delimiter, leading_zeros, include_timestamp)?,
            "log",
        ),
        ExportFormat::Json => (
            build_json_content(&encodings, &data, &delimiter, leading_zeros, include_timestamp)?,
            "json",
        ),
    };

    let export_dir = PathBuf::from(&app_settings.export_dir);
    std::fs::create_dir_all(&export_dir)
        .map_err(|e| format!("Failed to create export directory: {}", e))?;

    let filename = chrono::Local::now()
        .format(&format!("output-%Y%m%d-%H%M%S.{}", extension))
        .to_string();
    let path = export_dir.join(&filename);

    std::fs::write(&path, content).map_err(|e| format!("Failed to write export file: {}", e))?;
    tlog!("[export] Wrote {}", path.display());

    Ok(path.to_string_lossy().to_string())
}
