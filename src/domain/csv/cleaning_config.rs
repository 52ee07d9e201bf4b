// ============================================================
// CLEANING CONFIGURATION
// ============================================================
// Patterns identifying job-board interface text that leaked
// into scraped CSV exports

use serde::{Deserialize, Serialize};

/// Configuration for CSV cleaning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Patterns removing a row when any column matches (case-insensitive)
    pub row_denylist: Vec<String>,

    /// Patterns removing a row when its description column matches
    pub description_denylist: Vec<String>,

    /// Exact title value marking the board's generic landing heading
    pub generic_title: String,

    /// Drop repeated links, keeping the first occurrence
    pub dedupe_links: bool,

    /// Drop rows with an empty title or link
    pub require_essentials: bool,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            row_denylist: vec![
                r#"O que v""#.to_string(),
                r"Menu\s+Ajuda\s+Perfil".to_string(),
                r"717\.300 resultados".to_string(),
                r"\d+\.\d+ resultados".to_string(),
                r"Vagas de emprego em todo Brasil".to_string(),
                r"Ordenar por:".to_string(),
                r"Limpar filtros".to_string(),
                r"Para salvar a busca".to_string(),
                r"mais relevantes".to_string(),
                r"^\s*Menu\s*$".to_string(),
                r"Buscar\s+Salário\s+Distância".to_string(),
            ],
            description_denylist: vec![
                r"^Menu\s".to_string(),
                r"Ajuda\s+Perfil\s+Buscar".to_string(),
                r"\d+ resultados\s*Ordenar por".to_string(),
                r"^\s*$".to_string(),
            ],
            generic_title: "Vagas de emprego em todo Brasil".to_string(),
            dedupe_links: true,
            require_essentials: true,
        }
    }
}

impl CleaningConfig {
    /// Only the row denylist, no column-aware passes
    pub fn denylist_only() -> Self {
        Self {
            description_denylist: Vec::new(),
            generic_title: String::new(),
            dedupe_links: false,
            require_essentials: false,
            ..Default::default()
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        for pattern in self.row_denylist.iter().chain(&self.description_denylist) {
            regex::Regex::new(pattern)
                .map_err(|e| format!("invalid pattern {:?}: {}", pattern, e))?;
        }
        Ok(())
    }
}

/// Header keywords used to locate the interesting columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRoles {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
}

impl ColumnRoles {
    /// Detect roles from headers; the last matching header wins
    pub fn detect<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut roles = Self::default();
        for header in headers {
            let lower = header.to_lowercase();
            if lower.contains("titulo") || lower.contains("título") {
                roles.title = Some(header.to_string());
            } else if lower.contains("link") {
                roles.link = Some(header.to_string());
            } else if lower.contains("descricao") || lower.contains("descrição") {
                roles.description = Some(header.to_string());
            }
        }
        roles
    }
}
