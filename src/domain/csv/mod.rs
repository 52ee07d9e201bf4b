// ============================================================
// CSV DOMAIN LAYER
// ============================================================
// Core types and value objects for CSV cleaning
// No I/O, no async

mod cleaning_config;
mod csv_row;

pub use cleaning_config::{CleaningConfig, ColumnRoles};
pub use csv_row::{CsvField, CsvRow};

use serde::{Deserialize, Serialize};

/// Outcome of a cleaning pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_before: usize,
    pub rows_after: usize,
    pub removed_by_denylist: usize,
    pub removed_by_title: usize,
    pub removed_by_description: usize,
    pub removed_duplicates: usize,
    pub removed_missing: usize,
    pub headers: Vec<String>,
    pub columns: ColumnRoles,
}

impl CleaningReport {
    pub fn removed(&self) -> usize {
        self.rows_before - self.rows_after
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "CSV cleaning ({} -> {} rows):\n\
             - Interface text rows: {}\n\
             - Generic title rows: {}\n\
             - Interface descriptions: {}\n\
             - Duplicate links: {}\n\
             - Missing title/link: {}",
            self.rows_before,
            self.rows_after,
            self.removed_by_denylist,
            self.removed_by_title,
            self.removed_by_description,
            self.removed_duplicates,
            self.removed_missing
        )
    }
}
