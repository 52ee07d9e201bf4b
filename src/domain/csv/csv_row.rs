// ============================================================
// CSV ROW TYPES
// ============================================================
// Data structures representing parsed CSV content

use serde::{Deserialize, Serialize};

/// A single field in a CSV row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvField {
    /// Original field name (header)
    pub name: String,

    /// Cleaned field name (lowercase, underscores)
    pub clean_name: String,

    /// Field value, untouched
    pub value: String,

    /// Whether the value is blank
    pub is_empty: bool,
}

impl CsvField {
    /// Create a new CSV field
    pub fn new(name: String, value: String) -> Self {
        let is_empty = value.trim().is_empty();
        let clean_name = Self::clean_field_name(&name);

        Self {
            name,
            clean_name,
            value,
            is_empty,
        }
    }

    /// Clean field name for matching
    /// Replace special characters with underscores, keep only alphanumeric
    fn clean_field_name(name: &str) -> String {
        name.chars()
            .map(|c| {
                if c.is_alphanumeric() {
                    c.to_lowercase().next().unwrap_or(c)
                } else {
                    '_'
                }
            })
            .collect::<String>()
            .split('_')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// A single row in a CSV file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CsvRow {
    /// Row index (0-based, header excluded)
    pub index: usize,

    /// All fields in header order
    pub fields: Vec<CsvField>,
}

impl CsvRow {
    /// Create a new CSV row
    pub fn new(index: usize, fields: Vec<CsvField>) -> Self {
        Self { index, fields }
    }

    /// Value of the column with the given original header
    pub fn value(&self, header: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == header)
            .map(|f| f.value.as_str())
    }

    /// Whether the named column is blank or absent
    pub fn is_blank(&self, header: &str) -> bool {
        self.fields
            .iter()
            .find(|f| f.name == header)
            .map(|f| f.is_empty)
            .unwrap_or(true)
    }

    /// Values in header order, for writing the row back out
    pub fn values(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.value.as_str()).collect()
    }
}
