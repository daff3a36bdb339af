//! Decoding raw snapshot bytes into a [`TabularDataset`]

use crate::dataset::{Cell, TabularDataset};
use crate::error::{Result, TabdeltaError};
use encoding_rs::Encoding;
use std::collections::HashMap;

/// Encodings tried in order when decoding an uploaded table
pub const ENCODING_FALLBACKS: &[&str] = &["utf-8-sig", "utf-8", "shift_jis", "windows-31j"];

/// A raw table as handed over by the caller
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a table from disk, naming it after the file
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            TabdeltaError::invalid_input(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Decode and parse a delimited table, trying each fallback encoding.
///
/// An encoding is rejected when the bytes are malformed for it or when the
/// decoded text does not parse as CSV.
pub fn read_table(bytes: &[u8]) -> Result<TabularDataset> {
    let mut last_parse_error = None;

    for label in ENCODING_FALLBACKS {
        let Some(text) = decode_as(bytes, label) else {
            log::debug!("Bytes are not valid {}", label);
            continue;
        };

        match parse_csv(&text) {
            Ok(dataset) => {
                log::debug!("Decoded table as {} ({} rows)", label, dataset.len());
                return Ok(dataset);
            }
            Err(e) => {
                log::debug!("CSV parse failed after decoding as {}: {}", label, e);
                last_parse_error = Some(format!("{} (as {})", e, label));
            }
        }
    }

    Err(TabdeltaError::UnrecognizedEncoding {
        tried: ENCODING_FALLBACKS.join(", "),
        last_parse_error,
    })
}

fn decode_as(bytes: &[u8], label: &str) -> Option<String> {
    if label == "utf-8-sig" {
        let stripped = bytes.strip_prefix(b"\xEF\xBB\xBF")?;
        return std::str::from_utf8(stripped).ok().map(|s| s.to_string());
    }

    let encoding = Encoding::for_label(label.as_bytes())?;
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}

/// Parse CSV text with a header row.
///
/// Empty fields become missing cells, short records are padded, and records
/// wider than the header are rejected.
pub fn parse_csv(text: &str) -> Result<TabularDataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(TabdeltaError::invalid_input("Table has no header row"));
    }
    let columns = dedupe_headers(headers);
    let width = columns.len();

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > width {
            return Err(TabdeltaError::invalid_input(format!(
                "Record {} has {} fields but the header has {}",
                line + 1,
                record.len(),
                width
            )));
        }

        let mut cells: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(field.to_string())
                }
            })
            .collect();
        cells.resize(width, None);
        rows.push(cells);
    }

    TabularDataset::from_rows(columns, rows)
}

/// Make header names unique: a repeated `name` becomes `name.1`, `name.2`, ...
fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut result = Vec::with_capacity(headers.len());

    for header in headers {
        let count = seen.entry(header.clone()).or_insert(0);
        if *count == 0 {
            result.push(header);
        } else {
            result.push(format!("{}.{}", header, count));
        }
        *count += 1;
    }

    result
}
