// ============================================================
// CSV CLEANER USE CASE
// ============================================================
// Strip job-board interface text that leaked into scraped CSV
// exports, then drop duplicate and incomplete rows

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::csv::{CleaningConfig, CleaningReport, ColumnRoles, CsvRow};
use crate::domain::error::AppError;
use crate::infrastructure::csv::{
    read_with_encoding_detection, write_csv_string, CsvParser, CsvTable, PatternFilter,
};
use crate::infrastructure::storage;

/// Cleaned table plus what was removed
#[derive(Debug, Clone)]
pub struct CleanedCsv {
    pub table: CsvTable,
    pub report: CleaningReport,
}

/// CSV cleaning use case
pub struct CsvCleaner {
    config: CleaningConfig,
    row_filter: PatternFilter,
    description_filter: PatternFilter,
}

impl CsvCleaner {
    /// Create a new cleaner; fails on an invalid pattern
    pub fn new(config: CleaningConfig) -> Result<Self, AppError> {
        config.validate().map_err(|e| {
            AppError::ValidationError(format!("Invalid cleaning config: {}", e))
        })?;

        let row_filter = PatternFilter::new(&config.row_denylist)?;
        let description_filter = PatternFilter::new(&config.description_denylist)?;

        Ok(Self {
            config,
            row_filter,
            description_filter,
        })
    }

    /// Create with default configuration
    pub fn default_config() -> Result<Self, AppError> {
        Self::new(CleaningConfig::default())
    }

    /// Clean a parsed table
    pub fn clean_table(&self, table: CsvTable) -> CleanedCsv {
        let columns = ColumnRoles::detect(table.headers.iter().map(String::as_str));
        let mut report = CleaningReport {
            rows_before: table.rows.len(),
            headers: table.headers.clone(),
            columns: columns.clone(),
            ..Default::default()
        };

        let mut rows: Vec<CsvRow> = table.rows;

        // Interface text anywhere in the row
        let before = rows.len();
        rows.retain(|row| !self.row_filter.matches_row(row));
        report.removed_by_denylist = before - rows.len();

        if let Some(title_col) = columns.title.as_deref() {
            if !self.config.generic_title.is_empty() {
                let before = rows.len();
                rows.retain(|row| row.value(title_col) != Some(self.config.generic_title.as_str()));
                report.removed_by_title = before - rows.len();
            }
        }

        if let Some(desc_col) = columns.description.as_deref() {
            if !self.description_filter.is_empty() {
                let before = rows.len();
                rows.retain(|row| {
                    let desc = row.value(desc_col).unwrap_or("");
                    !self.description_filter.matches(desc)
                });
                report.removed_by_description = before - rows.len();
            }
        }

        if let Some(link_col) = columns.link.as_deref() {
            if self.config.dedupe_links {
                let before = rows.len();
                let mut seen = HashSet::new();
                rows.retain(|row| seen.insert(row.value(link_col).unwrap_or("").to_string()));
                report.removed_duplicates = before - rows.len();
            }
        }

        if self.config.require_essentials {
            let essentials: Vec<&str> = [columns.title.as_deref(), columns.link.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if !essentials.is_empty() {
                let before = rows.len();
                rows.retain(|row| essentials.iter().all(|col| !row.is_blank(col)));
                report.removed_missing = before - rows.len();
            }
        }

        report.rows_after = rows.len();

        CleanedCsv {
            table: CsvTable {
                headers: table.headers,
                rows,
            },
            report,
        }
    }

    /// Clean CSV text (delimiter auto-detected); output keeps the delimiter
    pub fn clean_content(&self, content: &str) -> Result<(String, CleaningReport), AppError> {
        let delimiter = CsvParser::detect_delimiter(content);
        let table = CsvParser::new()
            .with_delimiter(delimiter)
            .parse_content(content)
            .map_err(|e| AppError::ParseError(format!("Failed to parse CSV content: {}", e)))?;

        let cleaned = self.clean_table(table);
        let output = render(&cleaned.table, delimiter)?;
        Ok((output, cleaned.report))
    }

    /// Clean a file in place or into `output`.
    /// With `backup`, `<input>.backup` is created once before the first overwrite.
    pub fn clean_file(
        &self,
        input: &Path,
        output: Option<&Path>,
        backup: bool,
    ) -> Result<CleaningReport, AppError> {
        let output: PathBuf = output.map(Path::to_path_buf).unwrap_or_else(|| input.to_path_buf());

        info!(path = %input.display(), "Cleaning CSV file");
        let content = read_with_encoding_detection(input)?;
        let (text, report) = self.clean_content(&content)?;

        if backup && output == input {
            if let Some(created) = storage::backup_once(input)? {
                info!(path = %created.display(), "Backup created");
            }
        }

        storage::write_text(&output, &text)?;

        info!(
            rows_before = report.rows_before,
            rows_after = report.rows_after,
            removed = report.removed(),
            path = %output.display(),
            "Clean CSV saved"
        );
        Ok(report)
    }
}

fn render(table: &CsvTable, delimiter: u8) -> Result<String, AppError> {
    write_csv_string(&table.headers, table.rows.iter().map(CsvRow::values), delimiter)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRAPED_CSV: &str = "\
Titulo,Link,Descricao,Empresa
Desenvolvedor Java,https://x/vagas/dev-java/1/,Construir APIs,Acme
Vagas de emprego em todo Brasil,https://x/vagas/,Lista,Catho
Menu Ajuda Perfil,https://x/menu/,nada,Catho
Analista de Dados,https://x/vagas/analista/2/,12.345 resultados encontrados,Beta
Suporte Técnico,https://x/vagas/suporte/3/,Menu principal do site,Gama
Desenvolvedor Java,https://x/vagas/dev-java/1/,Construir APIs de novo,Acme
Sem Link,,Atender clientes,Delta
Contador,https://x/vagas/contador/4/,Apurar impostos,Epsilon";

    #[test]
    fn test_clean_content_pipeline() {
        let cleaner = CsvCleaner::default_config().unwrap();
        let (output, report) = cleaner.clean_content(SCRAPED_CSV).unwrap();

        assert_eq!(report.rows_before, 8);
        assert_eq!(report.removed_by_denylist, 3);
        assert_eq!(report.removed_by_description, 1);
        assert_eq!(report.removed_duplicates, 1);
        assert_eq!(report.removed_missing, 1);
        assert_eq!(report.rows_after, 2);
        assert_eq!(report.removed(), 6);

        assert!(output.starts_with("Titulo,Link,Descricao,Empresa\n"));
        assert!(output.contains("Desenvolvedor Java"));
        assert!(output.contains("Contador"));
        assert!(!output.contains("de novo"));
    }

    #[test]
    fn test_denylist_keeps_every_clean_row() {
        let cleaner = CsvCleaner::new(CleaningConfig::denylist_only()).unwrap();
        let content = "a,b\nok,1\nOrdenar por: data,2\nfine,3\nMENU AJUDA PERFIL,4\n";
        let (output, report) = cleaner.clean_content(content).unwrap();

        assert_eq!(report.removed_by_denylist, 2);
        assert_eq!(output, "a,b\nok,1\nfine,3\n");
    }

    #[test]
    fn test_generic_title_only_when_exact() {
        let cleaner = CsvCleaner::new(CleaningConfig {
            row_denylist: Vec::new(),
            ..Default::default()
        })
        .unwrap();
        let content = "título,link\nVagas de emprego em todo Brasil,a\nVagas de emprego em todo Brasil - SP,b\n";
        let (_, report) = cleaner.clean_content(content).unwrap();
        assert_eq!(report.removed_by_title, 1);
        assert_eq!(report.rows_after, 1);
    }

    #[test]
    fn test_semicolon_delimiter_preserved() {
        let cleaner = CsvCleaner::default_config().unwrap();
        let (output, _) = cleaner
            .clean_content("titulo;link\nDev;https://a\nDev;https://a\n")
            .unwrap();
        assert_eq!(output, "titulo;link\nDev;https://a\n");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = CleaningConfig {
            description_denylist: vec!["[".to_string()],
            ..Default::default()
        };
        assert!(matches!(CsvCleaner::new(config), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_clean_file_in_place_with_backup() {
        let dir = std::env::temp_dir().join(format!("vagas_clean_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("vagas.csv");
        std::fs::write(&input, SCRAPED_CSV).unwrap();

        let cleaner = CsvCleaner::default_config().unwrap();
        let report = cleaner.clean_file(&input, None, true).unwrap();
        assert_eq!(report.rows_after, 2);

        let backup = dir.join("vagas.csv.backup");
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), SCRAPED_CSV);

        // Second run keeps the first backup
        cleaner.clean_file(&input, None, true).unwrap();
        assert_eq!(std::fs::read_to_string(&backup).unwrap(), SCRAPED_CSV);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clean_file_decodes_legacy_encoding_into_output() {
        let dir = std::env::temp_dir().join(format!("vagas_clean_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("legacy.csv");
        let output = dir.join("limpo.csv");
        // "Descrição" and "Técnico" in Windows-1252
        std::fs::write(
            &input,
            b"Titulo;Link;Descri\xe7\xe3o\nT\xe9cnico;https://x/vagas/t/1/;Manuten\xe7\xe3o\nOrdenar por: data;https://x/;-\n",
        )
        .unwrap();

        let cleaner = CsvCleaner::default_config().unwrap();
        let report = cleaner.clean_file(&input, Some(&output), true).unwrap();

        assert_eq!(report.removed(), 1);
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            "Titulo;Link;Descrição\nTécnico;https://x/vagas/t/1/;Manutenção\n"
        );
        assert!(!dir.join("legacy.csv.backup").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
