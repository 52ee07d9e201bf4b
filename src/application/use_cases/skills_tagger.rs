// ============================================================
// SKILL TAGGER
// ============================================================
// Tag listings with skills from a per-sector taxonomy and
// aggregate sector/skill statistics

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Trim};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::domain::error::{AppError, Result};
use crate::domain::listing::ListingRecord;
use crate::infrastructure::csv::{read_with_encoding_detection, write_csv_string};
use crate::infrastructure::{jsonl, storage};

pub const TAGGED_FILE: &str = "vagas_tagged.jsonl";
pub const SKILLS_AGG_FILE: &str = "skills_agg.csv";
pub const COVERAGE_FILE: &str = "coverage_report.csv";
pub const SECTOR_MAP_TEMPLATE: &str = "sector_map_template.csv";
pub const SKILLS_TEMPLATE: &str = "skills_taxonomy_template.csv";

pub const FALLBACK_SECTOR: &str = "Outros";

const TEMPLATE_SKILLS: [&str; 6] = ["comunicacao", "excel", "word", "powerpoint", "ingles", "espanhol"];

static NOISE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"https?://[^\s]+",
        r"www\.[^\s]+",
        r"mostrar menos",
        r"compartilhar",
        r"clique aqui",
        r"saiba mais",
        r"entre em contato",
        r"envie seu currículo",
        r"cadastre-se",
        r"inscreva-se",
        // Job boards and aggregators
        r"catho\s*online",
        r"vagas\.com",
        r"indeed",
        r"linkedin",
        r"glassdoor",
        r"infojobs",
        r"trabalha brasil",
        r"sine",
    ]
    .iter()
    .map(|p| Regex::new(&format!("(?i){}", p)).unwrap())
    .collect()
});

static NON_ALNUM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").unwrap());

static WHITESPACE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

const PRIORITY_SECTIONS: [&str; 21] = [
    "requisitos",
    "requirements",
    "atividades",
    "activities",
    "atribuições",
    "atribuicoes",
    "responsabilidades",
    "responsibilities",
    "qualificações",
    "qualificacoes",
    "qualifications",
    "competências",
    "competencias",
    "skills",
    "habilidades",
    "abilities",
    "experiência",
    "experiencia",
    "experience",
    "conhecimentos",
    "knowledge",
];

const IGNORED_SECTIONS: [&str; 21] = [
    "benefícios",
    "beneficios",
    "benefits",
    "horário",
    "horario",
    "schedule",
    "local",
    "localização",
    "location",
    "salário",
    "salario",
    "salary",
    "remuneração",
    "remuneracao",
    "quem somos",
    "sobre a empresa",
    "about us",
    "contato",
    "contact",
    "como se candidatar",
    "how to apply",
];

/// Lines shorter than this outside a known section are dropped
const MIN_LOOSE_LINE_CHARS: usize = 20;

// ============================================================
// TEXT CLEANING
// ============================================================

/// Remove URLs, call-to-action phrases and job-board names
pub fn remove_noise(text: &str) -> String {
    NOISE_PATTERNS
        .iter()
        .fold(text.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// Keep lines from requirement-like sections plus long loose lines
pub fn extract_relevant_sections(text: &str) -> String {
    let mut relevant = Vec::new();
    let mut in_relevant_section = false;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let lower = line.to_lowercase();

        if PRIORITY_SECTIONS.iter().any(|s| lower.contains(s)) {
            in_relevant_section = true;
            relevant.push(line);
            continue;
        }

        if IGNORED_SECTIONS.iter().any(|s| lower.contains(s)) {
            in_relevant_section = false;
            continue;
        }

        if in_relevant_section || line.chars().count() > MIN_LOOSE_LINE_CHARS {
            relevant.push(line);
        }
    }

    relevant.join("\n")
}

/// Lowercase, strip accents, keep `[a-z0-9]` words separated by single spaces
pub fn normalize_text(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let folded = folded.replace('|', "\n");
    let ascii = NON_ALNUM_PATTERN.replace_all(&folded, " ");
    WHITESPACE_PATTERN.replace_all(&ascii, " ").trim().to_string()
}

pub fn clean_text(text: &str) -> String {
    normalize_text(&extract_relevant_sections(&remove_noise(text)))
}

/// All free text of a listing that may mention skills
pub fn listing_text(record: &ListingRecord) -> String {
    let value = record.as_value();
    let mut parts: Vec<String> = Vec::new();

    let desc = record.description();
    if !desc.is_empty() {
        parts.push(desc.to_string());
    }
    if let Some(segments) = value
        .pointer("/descricao_completa/segmentos_separados")
        .and_then(Value::as_array)
    {
        parts.extend(segments.iter().filter_map(Value::as_str).map(str::to_string));
    }
    if let Some(req) = value
        .pointer("/requisitos/requisitos_texto_original")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
    {
        parts.push(req.to_string());
    }
    parts.extend(record.responsibilities().into_iter().map(str::to_string));

    if let Some(skills) = value
        .get("habilidades_e_competencias")
        .and_then(Value::as_object)
    {
        for item in skills.values() {
            match item {
                Value::String(s) => parts.push(s.clone()),
                Value::Array(items) => parts.extend(
                    items
                        .iter()
                        .filter(|v| !v.is_null())
                        .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string())),
                ),
                _ => {}
            }
        }
    }

    parts.join(" ")
}

// ============================================================
// TAXONOMIES
// ============================================================

#[derive(Debug, Deserialize)]
struct TaxonomyRow {
    sector: String,
    skill: String,
    alias: String,
}

#[derive(Debug, Deserialize)]
struct SectorMapRow {
    raw_sector: String,
    normalized_sector: String,
    alias: String,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let content = read_with_encoding_detection(path)?;
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize()
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|e| AppError::ParseError(format!("{}: {}", path.display(), e)))
}

/// sector -> skill -> aliases (lowercased)
#[derive(Debug, Clone, Default)]
pub struct SkillTaxonomy {
    sectors: BTreeMap<String, BTreeMap<String, Vec<String>>>,
}

impl SkillTaxonomy {
    pub fn load(path: &Path) -> Result<Self> {
        let mut taxonomy = Self::default();
        for row in read_rows::<TaxonomyRow>(path)? {
            taxonomy.add(&row.sector, &row.skill, &row.alias);
        }
        info!(
            skills = taxonomy.skill_count(),
            sectors = taxonomy.sectors.len(),
            "Loaded skill taxonomy"
        );
        Ok(taxonomy)
    }

    pub fn add(&mut self, sector: &str, skill: &str, alias: &str) {
        self.sectors
            .entry(sector.trim().to_string())
            .or_default()
            .entry(skill.trim().to_string())
            .or_default()
            .push(alias.trim().to_lowercase());
    }

    pub fn skill_count(&self) -> usize {
        self.sectors
            .values()
            .flat_map(|skills| skills.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }

    /// Skills of `sector` with at least one alias in `text`
    pub fn find_skills(&self, text: &str, sector: &str) -> Vec<String> {
        if text.is_empty() {
            return Vec::new();
        }
        let Some(skills) = self.sectors.get(sector) else {
            return Vec::new();
        };

        let lower = text.to_lowercase();
        skills
            .iter()
            .filter(|(_, aliases)| aliases.iter().any(|a| !a.is_empty() && lower.contains(a.as_str())))
            .map(|(skill, _)| skill.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct SectorResolver {
    map: HashMap<String, String>,
    /// (normalized sector, aliases) in file order
    aliases: Vec<(String, Vec<String>)>,
}

impl SectorResolver {
    pub fn load(path: &Path) -> Result<Self> {
        let mut resolver = Self::default();
        for row in read_rows::<SectorMapRow>(path)? {
            resolver.add(&row.raw_sector, &row.normalized_sector, &row.alias);
        }
        info!(sectors = resolver.map.len(), "Loaded sector map");
        Ok(resolver)
    }

    pub fn add(&mut self, raw: &str, normalized: &str, alias: &str) {
        let normalized = normalized.trim().to_string();
        self.map.insert(raw.trim().to_string(), normalized.clone());

        let alias = alias.trim().to_lowercase();
        match self.aliases.iter_mut().find(|(name, _)| *name == normalized) {
            Some((_, list)) => list.push(alias),
            None => self.aliases.push((normalized, vec![alias])),
        }
    }

    pub fn resolve(&self, record: &ListingRecord) -> String {
        if let Some(raw) = record.sector().map(str::trim).filter(|s| !s.is_empty()) {
            return self.map.get(raw).cloned().unwrap_or_else(|| raw.to_string());
        }

        let text = [record.raw_title(), record.company(), record.description()]
            .join(" ")
            .to_lowercase();

        self.aliases
            .iter()
            .find(|(_, aliases)| aliases.iter().any(|a| !a.is_empty() && text.contains(a.as_str())))
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| FALLBACK_SECTOR.to_string())
    }
}

// ============================================================
// TAGGING AND AGGREGATION
// ============================================================

/// Running sector/skill counts
#[derive(Debug, Clone, Default)]
pub struct SkillStats {
    pub sector_totals: BTreeMap<String, usize>,
    pub skill_counts: BTreeMap<String, BTreeMap<String, usize>>,
}

impl SkillStats {
    pub fn record(&mut self, sector: &str, skills: &[String]) {
        *self.sector_totals.entry(sector.to_string()).or_insert(0) += 1;
        let counts = self.skill_counts.entry(sector.to_string()).or_default();
        for skill in skills {
            *counts.entry(skill.clone()).or_insert(0) += 1;
        }
    }

    /// `setor,skill,contagem,total_setor,percentual`
    pub fn skills_agg_csv(&self) -> Result<String> {
        let headers = csv_headers(&["setor", "skill", "contagem", "total_setor", "percentual"]);
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (sector, skills) in &self.skill_counts {
            let total = self.sector_totals.get(sector).copied().unwrap_or(0);
            for (skill, count) in skills {
                let pct = if total > 0 {
                    *count as f64 / total as f64 * 100.0
                } else {
                    0.0
                };
                rows.push(vec![
                    sector.clone(),
                    skill.clone(),
                    count.to_string(),
                    total.to_string(),
                    format!("{:.2}%", pct),
                ]);
            }
        }

        write_owned_rows(&headers, &rows)
    }

    /// `setor,total_vagas,skills_encontradas,top3_skills`
    pub fn coverage_csv(&self) -> Result<String> {
        let headers = csv_headers(&["setor", "total_vagas", "skills_encontradas", "top3_skills"]);
        let mut rows: Vec<Vec<String>> = Vec::new();

        for (sector, total) in &self.sector_totals {
            let skills = self.skill_counts.get(sector);
            let mut ranked: Vec<(&String, &usize)> =
                skills.map(|s| s.iter().collect()).unwrap_or_default();
            ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

            let top3 = ranked
                .iter()
                .take(3)
                .map(|(skill, count)| format!("{}({})", skill, count))
                .collect::<Vec<_>>()
                .join(", ");

            rows.push(vec![
                sector.clone(),
                total.to_string(),
                skills.map(BTreeMap::len).unwrap_or(0).to_string(),
                top3,
            ]);
        }

        write_owned_rows(&headers, &rows)
    }
}

/// Output of a tagging run
#[derive(Debug, Clone, Default)]
pub struct TaggingOutcome {
    pub tagged: Vec<Value>,
    pub skipped: usize,
    pub stats: SkillStats,
}

pub struct SkillTagger {
    taxonomy: SkillTaxonomy,
    resolver: SectorResolver,
}

impl SkillTagger {
    pub fn new(taxonomy: SkillTaxonomy, resolver: SectorResolver) -> Self {
        Self { taxonomy, resolver }
    }

    /// Load whichever taxonomy files are given; missing ones stay empty
    pub fn from_files(skills_csv: Option<&Path>, sector_csv: Option<&Path>) -> Result<Self> {
        let taxonomy = match skills_csv {
            Some(path) if path.exists() => SkillTaxonomy::load(path)?,
            Some(path) => {
                warn!(path = %path.display(), "Skill taxonomy not found, no skills will be tagged");
                SkillTaxonomy::default()
            }
            None => SkillTaxonomy::default(),
        };
        let resolver = match sector_csv {
            Some(path) if path.exists() => SectorResolver::load(path)?,
            Some(path) => {
                warn!(path = %path.display(), "Sector map not found, raw sectors are kept");
                SectorResolver::default()
            }
            None => SectorResolver::default(),
        };
        Ok(Self::new(taxonomy, resolver))
    }

    /// Resolved sector and skills found for one record
    pub fn tag_record(&self, record: &ListingRecord) -> (String, Vec<String>) {
        let sector = self.resolver.resolve(record);
        let text = clean_text(&listing_text(record));
        let skills = self.taxonomy.find_skills(&text, &sector);
        (sector, skills)
    }

    pub fn tag_all(&self, records: Vec<Value>) -> TaggingOutcome {
        let mut outcome = TaggingOutcome::default();

        for (idx, value) in records.into_iter().enumerate() {
            if idx > 0 && idx % 1000 == 0 {
                info!(processed = idx, "Tagging listings");
            }
            if !value.is_object() {
                warn!(index = idx, "Skipping non-object listing");
                outcome.skipped += 1;
                continue;
            }

            let record = ListingRecord::new(value);
            let (sector, skills) = self.tag_record(&record);
            outcome.stats.record(&sector, &skills);

            let mut value = record.into_value();
            if let Some(obj) = value.as_object_mut() {
                obj.insert("setor_resolvido".to_string(), Value::from(sector));
                obj.insert("skills_mapeadas".to_string(), Value::from(skills));
            }
            outcome.tagged.push(value);
        }

        outcome
    }
}

/// Write tagged JSONL and both statistics CSVs into `out_dir`
pub fn write_outputs(outcome: &TaggingOutcome, out_dir: &Path) -> Result<Vec<PathBuf>> {
    storage::ensure_dir(out_dir)?;

    let tagged = out_dir.join(TAGGED_FILE);
    jsonl::write_jsonl(&tagged, &outcome.tagged)?;

    let agg = out_dir.join(SKILLS_AGG_FILE);
    storage::write_text(&agg, &outcome.stats.skills_agg_csv()?)?;

    let coverage = out_dir.join(COVERAGE_FILE);
    storage::write_text(&coverage, &outcome.stats.coverage_csv()?)?;

    Ok(vec![tagged, agg, coverage])
}

/// Write the sector map and skill taxonomy templates for the sectors in `records`
pub fn write_templates(records: &[Value], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let sectors: BTreeSet<String> = records
        .iter()
        .map(|v| ListingRecord::new(v.clone()))
        .filter_map(|r| r.sector().map(|s| s.trim().to_string()))
        .filter(|s| !s.is_empty())
        .collect();

    storage::ensure_dir(out_dir)?;

    let sector_rows: Vec<Vec<String>> = sectors
        .iter()
        .map(|s| vec![s.clone(), s.replace(['/', ' '], "_"), s.to_lowercase()])
        .collect();
    let sector_path = out_dir.join(SECTOR_MAP_TEMPLATE);
    storage::write_text(
        &sector_path,
        &write_owned_rows(
            &csv_headers(&["raw_sector", "normalized_sector", "alias"]),
            &sector_rows,
        )?,
    )?;

    let skill_rows: Vec<Vec<String>> = sectors
        .iter()
        .flat_map(|s| {
            TEMPLATE_SKILLS
                .iter()
                .map(move |skill| vec![s.clone(), skill.to_string(), skill.to_string()])
        })
        .collect();
    let skills_path = out_dir.join(SKILLS_TEMPLATE);
    storage::write_text(
        &skills_path,
        &write_owned_rows(&csv_headers(&["sector", "skill", "alias"]), &skill_rows)?,
    )?;

    info!(sectors = sectors.len(), "Templates written");
    Ok(vec![sector_path, skills_path])
}

fn csv_headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn write_owned_rows(headers: &[String], rows: &[Vec<String>]) -> Result<String> {
    write_csv_string(
        headers,
        rows.iter().map(|r| r.iter().map(String::as_str).collect()),
        b',',
    )
}
