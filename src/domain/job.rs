use serde::{Deserialize, Serialize};

/// Salary as printed on a listing, amounts kept verbatim ("R$ 2.500,00")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Salary {
    Range { min: String, max: String },
    Value { value: String },
}

impl Salary {
    pub fn display(&self) -> String {
        match self {
            Salary::Range { min, max } => format!("{} - {}", min, max),
            Salary::Value { value } => value.clone(),
        }
    }
}

/// Fields recovered from a listing page's visible text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedListing {
    pub title: Option<String>,
    pub company: Option<String>,
    pub published_at: Option<String>,
    pub location: Option<String>,
    pub salary: Option<Salary>,
    pub contract_regime: Option<String>,
    pub schedule: Option<String>,
    pub benefits: Vec<String>,
    pub requirements: Vec<String>,
    pub competencies: Vec<String>,
    pub work_model: Option<String>,
    pub level: Option<String>,
    pub raw_text: String,
}

/// A scraped job ready for persistence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrapedJob {
    pub source: String,
    pub title: String,
    pub link: String,
    pub area: Option<String>,
    pub location: Option<String>,
    pub salary: Option<String>,
    pub skills: Option<String>,
    pub company: Option<String>,
    pub published_at: Option<String>,
    pub work_model: Option<String>,
    pub requirements: Option<String>,
    pub description: Option<String>,
    pub sector: Option<String>,
    pub benefits: Option<String>,
    pub schedule: Option<String>,
    pub contract_regime: Option<String>,
    pub level: Option<String>,
}

impl ScrapedJob {
    /// Flatten a parsed page into a storable job
    pub fn from_parsed(source: &str, link: &str, sector: Option<&str>, parsed: ParsedListing) -> Self {
        let join = |items: &[String]| {
            if items.is_empty() {
                None
            } else {
                Some(items.join("; "))
            }
        };

        Self {
            source: source.to_string(),
            title: parsed.title.clone().unwrap_or_default(),
            link: link.to_string(),
            area: None,
            location: parsed.location.clone(),
            salary: parsed.salary.as_ref().map(Salary::display),
            skills: join(&parsed.competencies),
            company: parsed.company.clone(),
            published_at: parsed.published_at.clone(),
            work_model: parsed.work_model.clone(),
            requirements: join(&parsed.requirements),
            description: Some(parsed.raw_text.clone()).filter(|t| !t.is_empty()),
            sector: sector.map(str::to_string),
            benefits: join(&parsed.benefits),
            schedule: parsed.schedule.clone(),
            contract_regime: parsed.contract_regime.clone(),
            level: parsed.level,
        }
    }
}

/// Flat list of listing titles captured from a board's landing page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TitleCatalog {
    #[serde(default)]
    pub total_titles: usize,
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub timestamp: String,
}

impl TitleCatalog {
    pub fn new(titles: Vec<String>, timestamp: String) -> Self {
        Self {
            total_titles: titles.len(),
            titles,
            timestamp,
        }
    }
}
