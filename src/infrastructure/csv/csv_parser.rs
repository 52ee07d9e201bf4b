// ============================================================
// CSV PARSER
// ============================================================
// Parse CSV files with encoding detection and error handling

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};

use crate::domain::csv::{CsvField, CsvRow};
use crate::domain::error::AppError;

/// Parsed CSV: header plus data rows
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<CsvRow>,
}

/// CSV parser with encoding detection
pub struct CsvParser {
    /// Delimiter character (default: comma)
    delimiter: u8,
}

impl Default for CsvParser {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl CsvParser {
    /// Create a new CSV parser with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse CSV content from string
    pub fn parse_content(&self, content: &str) -> Result<CsvTable, AppError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true) // Allow rows with different lengths
            .from_reader(content.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| AppError::ParseError(format!("Failed to read CSV headers: {}", e)))?
            .clone();

        let mut rows = Vec::new();

        for (index, result) in reader.records().enumerate() {
            let record = result.map_err(|e| {
                AppError::ParseError(format!("Failed to parse CSV row {}: {}", index + 1, e))
            })?;

            rows.push(Self::parse_row(index, &headers, &record));
        }

        Ok(CsvTable {
            headers: headers.iter().map(str::to_string).collect(),
            rows,
        })
    }

    /// Parse a single CSV row; missing trailing cells become empty
    fn parse_row(index: usize, headers: &StringRecord, record: &StringRecord) -> CsvRow {
        let fields = headers
            .iter()
            .enumerate()
            .map(|(idx, header)| {
                let value = record.get(idx).unwrap_or("").to_string();
                CsvField::new(header.to_string(), value)
            })
            .collect();

        CsvRow::new(index, fields)
    }

    /// Detect delimiter from content (comma, semicolon, tab, pipe)
    pub fn detect_delimiter(content: &str) -> u8 {
        let candidates = [b',', b';', b'\t', b'|'];

        let mut best_delimiter = b',';
        let mut best_score = 0.0f32;

        let sample_lines: Vec<_> = content.lines().take(10).collect();
        if sample_lines.is_empty() {
            return best_delimiter;
        }

        for &delimiter in &candidates {
            let field_counts: Vec<usize> = sample_lines
                .iter()
                .map(|line| line.bytes().filter(|&b| b == delimiter).count())
                .collect();

            // Score by consistency (low standard deviation) and frequency
            let avg = field_counts.iter().sum::<usize>() as f32 / field_counts.len() as f32;
            let variance = field_counts
                .iter()
                .map(|&x| (x as f32 - avg).powi(2))
                .sum::<f32>()
                / field_counts.len() as f32;

            let score = avg / (1.0 + variance.sqrt());

            if score > best_score {
                best_score = score;
                best_delimiter = delimiter;
            }
        }

        best_delimiter
    }
}

/// Read a file as UTF-8, falling back to Windows-1252 for legacy exports
pub fn read_with_encoding_detection(path: &Path) -> Result<String, AppError> {
    let mut file = File::open(path).map_err(|e| {
        AppError::IoError(format!("Failed to open {}: {}", path.display(), e))
    })?;

    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer).map_err(|e| {
        AppError::IoError(format!("Failed to read {}: {}", path.display(), e))
    })?;

    Ok(decode_bytes(&buffer))
}

/// Decode bytes as UTF-8 (BOM stripped) or Windows-1252
pub fn decode_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(content) => content.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Serialize a header and rows as CSV text
pub fn write_csv_string<'a, I>(headers: &[String], rows: I, delimiter: u8) -> Result<String, AppError>
where
    I: IntoIterator<Item = Vec<&'a str>>,
{
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::IoError(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::ParseError(format!("CSV is not UTF-8: {}", e)))
}
