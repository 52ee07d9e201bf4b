// ============================================================
// ROW PATTERN FILTER
// ============================================================
// Case-insensitive pattern set applied to CSV cells

use regex::{RegexSet, RegexSetBuilder};

use crate::domain::csv::CsvRow;
use crate::domain::error::AppError;

/// Compiled set of case-insensitive patterns
pub struct PatternFilter {
    set: RegexSet,
}

impl PatternFilter {
    /// Compile patterns; `^`/`$` anchor at the start and end of the whole cell
    pub fn new(patterns: &[String]) -> Result<Self, AppError> {
        let set = RegexSetBuilder::new(patterns)
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::ValidationError(format!("Invalid row pattern: {}", e)))?;
        Ok(Self { set })
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Whether the text matches any pattern
    pub fn matches(&self, text: &str) -> bool {
        self.set.is_match(text)
    }

    /// Whether any cell in the row matches any pattern
    pub fn matches_row(&self, row: &CsvRow) -> bool {
        row.fields.iter().any(|f| self.matches(&f.value))
    }
}
