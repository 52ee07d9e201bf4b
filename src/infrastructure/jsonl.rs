// ============================================================
// LINE-DELIMITED JSON
// ============================================================
// Readers and writers for JSON arrays and JSONL record files

use std::path::Path;

use serde_json::value::RawValue;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::infrastructure::storage;

const PROGRESS_EVERY: usize = 1000;

/// Records read from a JSONL file plus the lines that failed to parse
#[derive(Debug, Clone, Default)]
pub struct JsonlLoad {
    pub records: Vec<Value>,
    pub skipped: usize,
}

/// Parse JSONL text; blank lines are ignored, malformed lines skipped
pub fn parse_jsonl_str(content: &str) -> JsonlLoad {
    let mut load = JsonlLoad::default();

    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(value) => load.records.push(value),
            Err(err) => {
                warn!(line = idx + 1, error = %err, "Skipping malformed JSONL line");
                load.skipped += 1;
            }
        }
    }

    load
}

/// One compact JSON document per line, non-ASCII kept as-is
pub fn to_jsonl_string(records: &[Value]) -> Result<String> {
    let mut out = String::new();
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 && idx % PROGRESS_EVERY == 0 {
            info!(processed = idx, "Writing JSONL records");
        }
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    Ok(out)
}

pub fn read_jsonl(path: &Path) -> Result<JsonlLoad> {
    let content = storage::read_text(path)?;
    let load = parse_jsonl_str(&content);
    info!(
        path = %path.display(),
        records = load.records.len(),
        skipped = load.skipped,
        "Loaded JSONL file"
    );
    Ok(load)
}

/// Read a file holding a single JSON array
pub fn read_json_array(path: &Path) -> Result<Vec<Value>> {
    let content = storage::read_text(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => Ok(items),
        other => Err(AppError::ValidationError(format!(
            "{} must contain a JSON array, found {}",
            path.display(),
            json_kind(&other)
        ))),
    }
}

pub fn write_jsonl(path: &Path, records: &[Value]) -> Result<()> {
    storage::write_text(path, &to_jsonl_string(records)?)
}

/// Convert a JSON array file into JSONL; returns the record count.
///
/// Each record's source text is copied with insignificant whitespace
/// removed, so key order and number literals come out unchanged.
pub fn convert_json_to_jsonl(input: &Path, output: &Path) -> Result<usize> {
    info!(input = %input.display(), output = %output.display(), "Converting JSON to JSONL");
    let content = storage::read_text(input)?;
    let records: Vec<&RawValue> = serde_json::from_str(&content).map_err(|e| {
        AppError::ValidationError(format!(
            "{} must contain a JSON array: {}",
            input.display(),
            e
        ))
    })?;
    info!(records = records.len(), "Loaded JSON array");

    let mut out = String::with_capacity(content.len());
    for (idx, record) in records.iter().enumerate() {
        if idx > 0 && idx % PROGRESS_EVERY == 0 {
            info!(processed = idx, "Writing JSONL records");
        }
        push_compact(&mut out, record.get());
        out.push('\n');
    }

    storage::write_text(output, &out)?;
    info!(path = %output.display(), "Conversion finished");
    Ok(records.len())
}

/// Append JSON text minus whitespace outside string literals
fn push_compact(out: &mut String, json: &str) {
    let mut in_string = false;
    let mut escaped = false;
    for ch in json.chars() {
        if in_string {
            out.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if !ch.is_ascii_whitespace() {
            if ch == '"' {
                in_string = true;
            }
            out.push(ch);
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
