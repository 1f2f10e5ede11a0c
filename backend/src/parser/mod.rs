//! Sample data reader.
//!
//! Turns a CSV extract of a source endpoint into JSON records keyed by column
//! name. Encoding (via `chardet`) and delimiter are detected. Quotes around
//! cells are stripped; quoted delimiters are not supported.
//!
//! The records feed [`preview`](crate::transform::preview) and the header row
//! plus first record become the [`SourceSample`] sent to automap.

use serde::Serialize;
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::{SampleError, SampleResult};
use crate::models::SourceSample;

/// Delimiters tried by [`detect_delimiter`], in tie-break order.
pub const CANDIDATE_DELIMITERS: [char; 4] = [';', ',', '\t', '|'];

/// Parsed sample data with detection metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SampleData {
    pub headers: Vec<String>,
    pub records: Vec<Value>,
    pub encoding: String,
    pub delimiter: char,
}

impl SampleData {
    /// Field names plus the first record.
    pub fn source_sample(&self) -> SourceSample {
        let sample = self
            .records
            .first()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        SourceSample {
            fields: self.headers.clone(),
            sample,
        }
    }

    /// First `n` records.
    pub fn head(&self, n: usize) -> &[Value] {
        &self.records[..n.min(self.records.len())]
    }
}

/// Guess the encoding of raw bytes.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "" | "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode with a named encoding. Unknown labels decode as UTF-8.
///
/// Bytes that are invalid in the encoding are an error, never replaced.
pub fn decode_content(bytes: &[u8], encoding: &str) -> SampleResult<String> {
    let label = encoding.to_lowercase();
    if label == "utf-8" || label == "utf8" || label == "ascii" {
        return decode_utf8(bytes, encoding);
    }

    let codec = match label.as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => encoding_rs::ISO_8859_15,
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252,
        other => match encoding_rs::Encoding::for_label(other.as_bytes()) {
            Some(codec) => codec,
            None => return decode_utf8(bytes, encoding),
        },
    };

    let (text, _, had_errors) = codec.decode(bytes);
    if had_errors {
        return Err(SampleError::Decode {
            encoding: encoding.to_string(),
        });
    }
    Ok(text.into_owned())
}

fn decode_utf8(bytes: &[u8], encoding: &str) -> SampleResult<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| SampleError::Decode {
        encoding: encoding.to_string(),
    })
}

/// Most frequent candidate delimiter on the header line (`;` when none occur).
pub fn detect_delimiter(content: &str) -> char {
    let header = content.lines().next().unwrap_or("");
    let mut best = (CANDIDATE_DELIMITERS[0], 0);
    for &sep in &CANDIDATE_DELIMITERS {
        let count = header.matches(sep).count();
        if count > best.1 {
            best = (sep, count);
        }
    }
    best.0
}

fn clean_cell(cell: &str) -> &str {
    cell.trim().trim_matches('"')
}

/// Parse decoded text with a known delimiter.
///
/// Blank lines are skipped. Short rows pad with empty strings; extra cells
/// are dropped.
pub fn parse_text(content: &str, delimiter: char, encoding: &str) -> SampleResult<SampleData> {
    let mut lines = content.lines();
    let header = lines
        .next()
        .filter(|l| !l.trim().is_empty())
        .ok_or(SampleError::Empty)?;

    let headers: Vec<String> = header
        .split(delimiter)
        .map(|h| clean_cell(h).to_string())
        .collect();

    let records = lines
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            let cells: Vec<&str> = line.split(delimiter).collect();
            let row: Map<String, Value> = headers
                .iter()
                .enumerate()
                .map(|(i, h)| {
                    let cell = cells.get(i).map(|c| clean_cell(c)).unwrap_or("");
                    (h.clone(), Value::String(cell.to_string()))
                })
                .collect();
            Value::Object(row)
        })
        .collect();

    Ok(SampleData {
        headers,
        records,
        encoding: encoding.to_string(),
        delimiter,
    })
}

/// Detect encoding and delimiter, then parse.
pub fn parse_bytes(bytes: &[u8]) -> SampleResult<SampleData> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;
    let delimiter = detect_delimiter(&content);
    parse_text(&content, delimiter, &encoding)
}

/// Read and parse a sample file.
pub fn read_sample_file<P: AsRef<Path>>(path: P) -> SampleResult<SampleData> {
    let bytes = std::fs::read(path.as_ref())?;
    parse_bytes(&bytes)
}
