// ============================================================
// CSV INFRASTRUCTURE LAYER
// ============================================================
// CSV parsing, encoding detection, and row pattern matching

mod csv_parser;
mod row_filter;

pub use csv_parser::{read_with_encoding_detection, write_csv_string, CsvParser, CsvTable};
pub use row_filter::PatternFilter;
