// ============================================================
// LISTING QUALITY AUDIT
// ============================================================
// Flag records whose fields were corrupted during extraction

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::domain::listing::ListingRecord;

/// Sector label for records without one
const UNKNOWN_SECTOR: &str = "Desconhecido";

const MAX_EXAMPLES: usize = 20;
const SHOWN_EXAMPLES: usize = 10;
const EXAMPLE_FIELD_CHARS: usize = 50;

const MAX_DESCRIPTION_PARTS: usize = 5;
const MAX_COMPANY_CHARS: usize = 100;
const MAX_CITY_CHARS: usize = 50;
const MAX_STATE_CHARS: usize = 5;
const MAX_RESPONSIBILITY_CHARS: usize = 500;

const CITY_VERBS: [&str; 3] = ["acompanhar", "realizar", "desenvolver"];
const GENERIC_SKILLS: [&str; 5] = ["Excel", "Word", "PowerPoint", "Comunicação", "Trabalho em equipe"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditProblem {
    ConcatenatedDescription,
    CorruptedCompany,
    UrlInTitle,
    CorruptedCity,
    CorruptedState,
    ConcatenatedResponsibility,
    GenericSkills,
}

impl AuditProblem {
    pub fn describe(&self) -> &'static str {
        match self {
            AuditProblem::ConcatenatedDescription => "Description concatenates several listings",
            AuditProblem::CorruptedCompany => "Company field is corrupted",
            AuditProblem::UrlInTitle => "Title contains a URL",
            AuditProblem::CorruptedCity => "City holds responsibility text",
            AuditProblem::CorruptedState => "State is corrupted",
            AuditProblem::ConcatenatedResponsibility => "Responsibility is too long",
            AuditProblem::GenericSkills => "Skills are too generic",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SectorAuditStats {
    pub total_jobs: usize,
    pub jobs_with_problems: usize,
    pub unique_companies: usize,
    pub unique_responsibilities: usize,
    pub unique_skills: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditExample {
    pub id: String,
    pub sector: String,
    pub problems: Vec<AuditProblem>,
    pub company: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditReport {
    pub total_analyzed: usize,
    pub problem_counts: BTreeMap<AuditProblem, usize>,
    pub sectors: BTreeMap<String, SectorAuditStats>,
    pub examples: Vec<AuditExample>,
}

/// Unique values collected while scanning one sector
#[derive(Default)]
struct SectorSets<'a> {
    stats: SectorAuditStats,
    companies: BTreeSet<&'a str>,
    responsibilities: BTreeSet<&'a str>,
    skills: BTreeSet<&'a str>,
}

/// Problems detected on a single record, in check order
pub fn detect_problems(record: &ListingRecord) -> Vec<AuditProblem> {
    let mut problems = Vec::new();

    let description = record.description();
    if description.split('|').count() > MAX_DESCRIPTION_PARTS {
        problems.push(AuditProblem::ConcatenatedDescription);
    }

    let company = record.company();
    if company.contains("http") || char_len(company) > MAX_COMPANY_CHARS {
        problems.push(AuditProblem::CorruptedCompany);
    }

    let title = record.raw_title();
    if title.contains("http") || title.contains("catho.com.br") {
        problems.push(AuditProblem::UrlInTitle);
    }

    let city = record.city();
    let city_lower = city.to_lowercase();
    if char_len(city) > MAX_CITY_CHARS || CITY_VERBS.iter().any(|v| city_lower.contains(v)) {
        problems.push(AuditProblem::CorruptedCity);
    }

    let state = record.state();
    if char_len(state) > MAX_STATE_CHARS || state.chars().any(|c| c.is_ascii_digit()) {
        problems.push(AuditProblem::CorruptedState);
    }

    if record
        .responsibilities()
        .iter()
        .any(|r| char_len(r) > MAX_RESPONSIBILITY_CHARS)
    {
        problems.push(AuditProblem::ConcatenatedResponsibility);
    }

    let skills = record.technical_skills();
    if !skills.is_empty() && skills.iter().take(3).all(|s| GENERIC_SKILLS.contains(s)) {
        problems.push(AuditProblem::GenericSkills);
    }

    problems
}

/// Audit up to `limit` records (all when `None`)
pub fn audit(records: &[ListingRecord], limit: Option<usize>) -> AuditReport {
    let mut report = AuditReport::default();
    let mut sectors: BTreeMap<String, SectorSets> = BTreeMap::new();

    for record in records.iter().take(limit.unwrap_or(usize::MAX)) {
        report.total_analyzed += 1;

        let sector = record.sector().unwrap_or(UNKNOWN_SECTOR);
        let sets = sectors.entry(sector.to_string()).or_default();
        sets.stats.total_jobs += 1;

        let problems = detect_problems(record);
        for problem in &problems {
            *report.problem_counts.entry(*problem).or_insert(0) += 1;
        }

        for responsibility in record.responsibilities() {
            if char_len(responsibility) < MAX_RESPONSIBILITY_CHARS {
                sets.responsibilities.insert(responsibility);
            }
        }
        sets.skills.extend(record.technical_skills());

        let company = record.company();
        if !company.is_empty() && char_len(company) < MAX_COMPANY_CHARS {
            sets.companies.insert(company);
        }

        if problems.is_empty() {
            continue;
        }
        sets.stats.jobs_with_problems += 1;

        if report.examples.len() < MAX_EXAMPLES {
            report.examples.push(AuditExample {
                id: record.id_label(),
                sector: sector.to_string(),
                problems,
                company: shorten(company, EXAMPLE_FIELD_CHARS),
                title: shorten(record.raw_title(), EXAMPLE_FIELD_CHARS),
            });
        }
    }

    report.sectors = sectors
        .into_iter()
        .map(|(name, sets)| {
            let stats = SectorAuditStats {
                unique_companies: sets.companies.len(),
                unique_responsibilities: sets.responsibilities.len(),
                unique_skills: sets.skills.len(),
                ..sets.stats
            };
            (name, stats)
        })
        .collect();

    report
}

pub fn render_text(report: &AuditReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "=== LISTING QUALITY AUDIT ===");
    let _ = writeln!(out, "Records analysed: {}", report.total_analyzed);

    let _ = writeln!(out, "\n=== PROBLEMS ===");
    for (problem, count) in &report.problem_counts {
        let _ = writeln!(out, "{}: {}", problem.describe(), count);
    }

    let _ = writeln!(out, "\n=== BY SECTOR ===");
    for (sector, stats) in &report.sectors {
        let _ = writeln!(out, "\n{}:", sector);
        let _ = writeln!(out, "  - Jobs: {}", stats.total_jobs);
        let _ = writeln!(out, "  - Jobs with problems: {}", stats.jobs_with_problems);
        let _ = writeln!(out, "  - Unique companies: {}", stats.unique_companies);
        let _ = writeln!(out, "  - Unique responsibilities: {}", stats.unique_responsibilities);
        let _ = writeln!(out, "  - Unique skills: {}", stats.unique_skills);
    }

    if !report.examples.is_empty() {
        let _ = writeln!(out, "\n=== EXAMPLES ===");
        for (idx, example) in report.examples.iter().take(SHOWN_EXAMPLES).enumerate() {
            let problems: Vec<_> = example.problems.iter().map(AuditProblem::describe).collect();
            let _ = writeln!(out, "\n{}. Job ID {} ({})", idx + 1, example.id, example.sector);
            let _ = writeln!(out, "   Company: {}", example.company);
            let _ = writeln!(out, "   Title: {}", example.title);
            let _ = writeln!(out, "   Problems: {}", problems.join(", "));
        }
    }

    out
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clean_record() -> serde_json::Value {
        json!({
            "id": 1,
            "informacoes_basicas": {"setor": "Saúde", "empresa_principal": "Hospital X", "titulo": "Enfermeiro"},
            "localizacao": {"cidade_extraida": "Natal", "estado_extraido": "RN"},
            "descricao_completa": {"texto_completo": "Cuidar | de | pacientes"},
            "responsabilidades": {"lista_responsabilidades": ["Atender", "Medicar"]},
            "habilidades_e_competencias": {"habilidades_tecnicas": ["Excel", "Triagem"]}
        })
    }

    #[test]
    fn test_clean_record_has_no_problems() {
        assert!(detect_problems(&ListingRecord::new(clean_record())).is_empty());
    }

    #[test]
    fn test_detects_each_problem() {
        let mut value = clean_record();
        value["descricao_completa"]["texto_completo"] = json!("a|b|c|d|e|f");
        value["informacoes_basicas"]["empresa_principal"] = json!("https://empresa");
        value["informacoes_basicas"]["titulo"] = json!("Vaga www.catho.com.br");
        value["localizacao"]["cidade_extraida"] = json!("Realizar atendimento");
        value["localizacao"]["estado_extraido"] = json!("R2");
        value["responsabilidades"]["lista_responsabilidades"] = json!(["x".repeat(501)]);
        value["habilidades_e_competencias"]["habilidades_tecnicas"] =
            json!(["Word", "Excel", "Comunicação", "Rust"]);

        let problems = detect_problems(&ListingRecord::new(value));
        assert_eq!(
            problems,
            vec![
                AuditProblem::ConcatenatedDescription,
                AuditProblem::CorruptedCompany,
                AuditProblem::UrlInTitle,
                AuditProblem::CorruptedCity,
                AuditProblem::CorruptedState,
                AuditProblem::ConcatenatedResponsibility,
                AuditProblem::GenericSkills,
            ]
        );
    }

    #[test]
    fn test_audit_sector_stats_and_limit() {
        let mut bad = clean_record();
        bad["id"] = json!(2);
        bad["localizacao"]["estado_extraido"] = json!("Rio Grande do Norte");
        bad["habilidades_e_competencias"]["habilidades_tecnicas"] = json!(["Triagem", "Suturas"]);

        let mut other = clean_record();
        other["informacoes_basicas"]["setor"] = json!("Vendas");

        let records: Vec<_> = [clean_record(), bad, other]
            .into_iter()
            .map(ListingRecord::new)
            .collect();

        let report = audit(&records, None);
        assert_eq!(report.total_analyzed, 3);
        assert_eq!(report.problem_counts.get(&AuditProblem::CorruptedState), Some(&1));

        let saude = &report.sectors["Saúde"];
        assert_eq!(saude.total_jobs, 2);
        assert_eq!(saude.jobs_with_problems, 1);
        assert_eq!(saude.unique_companies, 1);
        assert_eq!(saude.unique_responsibilities, 2);
        assert_eq!(saude.unique_skills, 3);
        assert_eq!(report.examples.len(), 1);
        assert_eq!(report.examples[0].id, "2");

        let limited = audit(&records, Some(1));
        assert_eq!(limited.total_analyzed, 1);
        assert!(limited.examples.is_empty());
        assert!(render_text(&report).contains("State is corrupted: 1"));
    }

    #[test]
    fn test_records_without_sector_group_as_unknown() {
        let mut value = clean_record();
        value["informacoes_basicas"]
            .as_object_mut()
            .unwrap()
            .remove("setor");
        value["localizacao"]["estado_extraido"] = json!("12");

        let report = audit(&[ListingRecord::new(value)], None);
        assert_eq!(report.sectors.keys().collect::<Vec<_>>(), vec!["Desconhecido"]);
        assert_eq!(report.sectors["Desconhecido"].jobs_with_problems, 1);
        assert_eq!(report.examples[0].sector, "Desconhecido");
    }
}
