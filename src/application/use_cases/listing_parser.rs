// ============================================================
// LISTING PAGE PARSER
// ============================================================
// Turns a job page's HTML into plain text and recovers the listing
// fields from that text. Everything here is pure; fetching lives in
// job_scraper.

use std::collections::HashSet;

use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::domain::job::{ParsedListing, Salary};

pub const UF_CODES: [&str; 27] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO",
];

const EXCLUDED_TAGS: [&str; 8] = ["script", "style", "noscript", "header", "footer", "nav", "aside", "svg"];
const SLUG_STOPWORDS: [&str; 9] = ["de", "da", "do", "e", "em", "para", "com", "a", "o"];

/// Lines that are page chrome, never a title or requirement
const NOISE_LINES: [&str; 7] = [
    "candidatura fácil",
    "candidatos",
    "compatibilidade",
    "gráfico de colunas",
    "suas chances",
    "mostrar menos",
    "compartilhar",
];

const VERB_PREFIXES: [&str; 29] = [
    "Realizar", "Análise", "Analisar", "Elaboração", "Elaborar", "Gestão", "Gerir", "Controle",
    "Controlar", "Cadastramento", "Cadastrar", "Verificação", "Verificar", "Relacionamento",
    "Relacionar", "Suporte", "Apoiar", "Auxiliar", "Examinar", "Impugnação", "Impugnar", "Emissão",
    "Atualização", "Definição", "Programação", "Conferência", "Acompanhamento", "Cadastro", "Cotação",
];

const TITLE_SCAN_LINES: usize = 80;

static CONTAINER_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    ["main", "article", "body"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static DAYS_AGO: Lazy<Regex> = Lazy::new(|| Regex::new(r"há\s+(\d+)\s+dias?").unwrap());
static DAY_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([0-3]?\d)/([01]?\d)(?:/(\d{2,4}))?").unwrap());

static COMPANY_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Dados da Empresa\s*\n([^\n]{2,100})").unwrap());
static PUBLISHED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)Publicada\s+(hoje|ontem|há\s+\d+\s+dias?|em\s+[0-3]?\d/[01]?\d(?:/\d{2,4})?)")
        .unwrap()
});
static LOCATION_LABELLED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)vagas?:\s*([A-Za-zÁ-ú\.\s\-]+-\s*([A-Z]{2}))").unwrap());
pub(crate) static LOCATION_LOOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([A-Za-zÁ-ú\. ]+)\s*-\s*([A-Z]{2})\b").unwrap());
pub(crate) static SALARY_TO_AGREE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bA combinar\b").unwrap());
pub(crate) static SALARY_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(R\$\s?[\d\.,]+)\s*(?:a|–|-|até)\s*(R\$\s?[\d\.,]+)").unwrap()
});
pub(crate) static SALARY_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"R\$\s?\d{1,3}(?:\.\d{3})*(?:,\d{2})?").unwrap());
static REGIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Regime de Contrata[cç][aã]o\s*\n([^\n]+)").unwrap());
static SCHEDULE_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)Hor[áa]rio\s*\n([^\n]+)").unwrap());
static SCHEDULE_SPAN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:Das?|de)\s*(\d{1,2}[:h]\d{2})\s*(?:às|as|-|a)\s*(\d{1,2}[:h]\d{2})").unwrap()
});
static REMOTE_WORK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)remote\s*work").unwrap());
static BENEFITS_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Benef[ií]cios\s*\n([^\n]+)").unwrap());
static GROUP_MEDICINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s*/\s*Medicina em grupo").unwrap());
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-–—]\s?").unwrap());
static FREE_REQUIREMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(Experi[êe]ncia|Ensino|Escolaridade|Gradua[cç][aã]o|Ingl[eê]s|Espanhol|Franc[eê]s|Alem[aã]o|Excel|Conhecimento|Sistema|Winthor)",
    )
    .unwrap()
});
static REQUIREMENT_TERM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(Experi[êe]ncia|Form[aá]?[cç][aã]o|Escolaridade|Certificado|Curso|Habilita[cç][aã]o|Conhecimento|Ingl[eê]s|Espanhol|Excel|Winthor|SQL|Power BI|Tableau)\b",
    )
    .unwrap()
});
static LEVEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(J[úu]nior|Junior|Pleno|S[êe]nior|Senior|Est[áa]gio|Trainee)\b").unwrap()
});

/// Visible text of a page, one text node per line.
///
/// Chrome tags are skipped and the first of `main`, `article` or `body`
/// is used as the container.
pub fn html_to_clean_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let container = CONTAINER_SELECTORS
        .iter()
        .find_map(|selector| {
            document
                .select(selector)
                .find(|el| !inside_excluded(el))
        })
        .unwrap_or_else(|| document.root_element());

    let mut parts: Vec<&str> = Vec::new();
    for node in container.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let excluded = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| EXCLUDED_TAGS.contains(&el.name()))
        });
        let trimmed = text.trim();
        if !excluded && !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    let text = parts
        .join("\n")
        .replace('·', "- ")
        .replace('•', "- ")
        .replace('\r', "\n");
    EXTRA_NEWLINES.replace_all(&text, "\n\n").trim().to_string()
}

fn inside_excluded(element: &ElementRef) -> bool {
    element.ancestors().any(|ancestor| {
        ancestor
            .value()
            .as_element()
            .map_or(false, |el| EXCLUDED_TAGS.contains(&el.name()))
    })
}

/// Title guessed from a `/vagas/<slug>/...` URL path
pub fn title_from_slug(link: &str) -> Option<String> {
    let parsed = url::Url::parse(link).ok()?;
    let mut segments = parsed.path().trim_matches('/').split('/');
    if segments.next()? != "vagas" {
        return None;
    }
    let slug = segments.next().filter(|s| !s.is_empty())?;

    let words: Vec<String> = slug
        .replace('-', " ")
        .split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            if SLUG_STOPWORDS.contains(&lower.as_str()) {
                lower
            } else {
                capitalize(word)
            }
        })
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

/// Resolve "hoje", "ontem", "há N dias" or "dd/mm[/yy[yy]]" to an ISO date
pub fn parse_relative_date(value: &str, today: NaiveDate) -> Option<String> {
    let value = value.trim().to_lowercase();

    let date = if value.starts_with("hoje") {
        Some(today)
    } else if value.starts_with("ontem") {
        today.checked_sub_signed(Duration::try_days(1)?)
    } else if let Some(caps) = DAYS_AGO.captures(&value) {
        let days: i64 = caps[1].parse().ok()?;
        today.checked_sub_signed(Duration::try_days(days)?)
    } else if let Some(caps) = DAY_MONTH.captures(&value) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = match caps.get(3).map(|m| m.as_str()) {
            Some(y) if y.len() == 2 => format!("20{}", y).parse().ok()?,
            Some(y) => y.parse().ok()?,
            None => today.year(),
        };
        NaiveDate::from_ymd_opt(year, month, day)
    } else {
        None
    };

    date.map(|d| d.format("%Y-%m-%d").to_string())
}

/// Numeric value of a "R$ 1.234,56" amount
pub(crate) fn money_value(amount: &str) -> Option<f64> {
    amount
        .replace("R$", "")
        .replace('.', "")
        .replace(',', ".")
        .trim()
        .parse()
        .ok()
}

/// Largest "R$" amount in the text, the first one on ties
pub(crate) fn max_amount(text: &str) -> Option<String> {
    SALARY_VALUE
        .find_iter(text)
        .filter_map(|m| money_value(m.as_str()).map(|v| (m.as_str(), v)))
        .fold(None::<(&str, f64)>, |best, (amount, value)| match best {
            Some((_, best_value)) if best_value >= value => best,
            _ => Some((amount, value)),
        })
        .map(|(amount, _)| amount.to_string())
}

/// Recover the listing fields from a page's clean text
pub fn parse_listing_text(text: &str, link: Option<&str>, today: NaiveDate) -> ParsedListing {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let title = lines
        .iter()
        .take(TITLE_SCAN_LINES)
        .find(|line| is_title_candidate(line))
        .map(|line| line.to_string())
        .or_else(|| link.and_then(title_from_slug));

    let company = COMPANY_BLOCK
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .filter(|c| !c.is_empty())
        .or_else(|| company_after_title(&lines, title.as_deref()));

    let published_at = PUBLISHED
        .captures(text)
        .and_then(|caps| parse_relative_date(&caps[1], today));

    let salary = parse_salary(text);

    let contract_regime = REGIME.captures(text).map(|caps| caps[1].trim().to_string());

    let mut schedule = SCHEDULE_BLOCK
        .captures(text)
        .map(|caps| caps[1].trim().to_string())
        .or_else(|| {
            SCHEDULE_SPAN.captures(text).map(|caps| {
                format!("{} às {}", caps[1].replace('h', ":"), caps[2].replace('h', ":"))
            })
        });

    let benefits = BENEFITS_BLOCK
        .captures(text)
        .map(|caps| {
            caps[1]
                .split([',', ';', '|'])
                .filter(|part| !part.trim().is_empty())
                .map(|part| GROUP_MEDICINE.replace_all(part, "").trim().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut work_model = detect_work_model(text);

    let (competencies, requirements) = split_bullets(&lines);

    let level = title.as_deref().and_then(detect_level);

    if schedule.as_deref().map_or(false, |s| REMOTE_WORK.is_match(s)) {
        work_model = work_model.or_else(|| Some("remoto".to_string()));
        schedule = None;
    }

    ParsedListing {
        title,
        company,
        published_at,
        location: parse_location(text),
        salary,
        contract_regime,
        schedule,
        benefits: dedup_case_insensitive(benefits),
        requirements,
        competencies,
        work_model,
        level,
        raw_text: text.to_string(),
    }
}

fn is_title_candidate(line: &str) -> bool {
    let lower = line.to_lowercase();
    if NOISE_LINES.contains(&lower.as_str()) || lower.contains("sobre a vaga") || line.ends_with(':') {
        return false;
    }
    let len = line.chars().count();
    len > 3 && len < 100 && !is_all_upper(line)
}

fn company_after_title(lines: &[&str], title: Option<&str>) -> Option<String> {
    let title = title?;
    let idx = lines.iter().position(|line| *line == title)?;
    let candidate = lines.get(idx + 1)?;
    let len = candidate.chars().count();
    if len > 2 && len < 80 && !candidate.to_lowercase().contains("vaga com recrutador") {
        Some(candidate.to_string())
    } else {
        None
    }
}

/// "Cidade - UF" with a known state code
pub fn parse_location(text: &str) -> Option<String> {
    if let Some(caps) = LOCATION_LABELLED.captures(text) {
        if is_uf(&caps[2]) {
            return Some(caps[1].trim().to_string());
        }
    }
    LOCATION_LOOSE.captures(text).and_then(|caps| {
        let uf = caps[2].to_uppercase();
        is_uf(&uf).then(|| format!("{} - {}", caps[1].trim(), uf))
    })
}

pub(crate) fn is_uf(code: &str) -> bool {
    UF_CODES.contains(&code.to_uppercase().as_str())
}

fn parse_salary(text: &str) -> Option<Salary> {
    if SALARY_TO_AGREE.is_match(text) {
        return None;
    }
    if let Some(caps) = SALARY_RANGE.captures(text) {
        return Some(Salary::Range {
            min: caps[1].to_string(),
            max: caps[2].to_string(),
        });
    }
    max_amount(text).map(|value| Salary::Value { value })
}

/// "remoto", "híbrido" or "presencial" from free text
pub fn detect_work_model(text: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let model = if lower.contains("remoto") || lower.contains("home office") {
        "remoto"
    } else if lower.contains("híbrido") || lower.contains("hibrido") {
        "híbrido"
    } else if lower.contains("presencial") {
        "presencial"
    } else {
        return None;
    };
    Some(model.to_string())
}

/// Bullet lines split into (competencies, requirements)
fn split_bullets(lines: &[&str]) -> (Vec<String>, Vec<String>) {
    let mut competencies = Vec::new();
    let mut requirements = Vec::new();

    for line in lines {
        if !BULLET.is_match(line) || line.chars().count() < 2 {
            continue;
        }
        let item = BULLET
            .replace(line, "")
            .trim_matches(|c: char| c == ' ' || c == '.' || c == ';')
            .to_string();

        if VERB_PREFIXES.iter().any(|prefix| item.starts_with(prefix)) {
            competencies.push(item);
        } else if REQUIREMENT_TERM.is_match(&item) {
            requirements.push(item);
        } else {
            competencies.push(item);
        }
    }

    requirements.extend(
        lines
            .iter()
            .filter(|line| !NOISE_LINES.contains(&line.to_lowercase().as_str()))
            .filter(|line| FREE_REQUIREMENT.is_match(line))
            .map(|line| line.to_string()),
    );

    (dedup_case_insensitive(competencies), dedup_case_insensitive(requirements))
}

fn detect_level(title: &str) -> Option<String> {
    let caps = LEVEL.captures(title)?;
    let level = match capitalize(&caps[1]).as_str() {
        "Junior" => "Júnior".to_string(),
        "Senior" => "Sênior".to_string(),
        other => other.to_string(),
    };
    Some(level)
}

fn dedup_case_insensitive(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty() && seen.insert(item.to_lowercase()))
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn is_all_upper(text: &str) -> bool {
    text.chars().any(char::is_uppercase) && !text.chars().any(char::is_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    const PAGE_TEXT: &str = "\
CANDIDATURA FÁCIL
Analista Fiscal Pleno
Contabilidade Alfa
Publicada há 2 dias
1 vaga: São Paulo - SP
R$ 3.000,00 a R$ 4.500,00
Regime de Contratação
CLT (Efetivo)
Horário
Das 08:00 às 17:00
Benefícios
Vale-transporte, Vale-refeição; Plano de saúde / Medicina em grupo
Sobre a vaga
- Realizar apuração de impostos.
- Experiência com SPED
- Trabalho em equipe
Ensino superior completo
Vaga presencial";

    #[test]
    fn test_html_to_clean_text_prefers_main_and_drops_chrome() {
        let html = r#"<html><head><style>p{}</style></head><body>
            <header>Menu</header>
            <main><h1>Auxiliar Administrativo</h1><script>var x = 1;</script>
            <ul><li>• Atender clientes</li></ul>
            <nav>Links</nav></main>
            <footer>Rodapé</footer></body></html>"#;
        let text = html_to_clean_text(html);
        assert_eq!(text, "Auxiliar Administrativo\n-  Atender clientes");
    }

    #[test]
    fn test_html_to_clean_text_falls_back_to_body() {
        let html = "<html><body><p>Vaga</p><aside>Anúncio</aside><p>Recife</p></body></html>";
        assert_eq!(html_to_clean_text(html), "Vaga\nRecife");
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(
            title_from_slug("https://www.catho.com.br/vagas/analista-de-compras-em-recife/123/").as_deref(),
            Some("Analista de Compras em Recife")
        );
        assert_eq!(title_from_slug("https://www.catho.com.br/empresa/acme/"), None);
        assert_eq!(title_from_slug("https://www.catho.com.br/vagas/"), None);
        assert_eq!(title_from_slug("not a url"), None);
    }

    #[test]
    fn test_parse_relative_date() {
        assert_eq!(parse_relative_date("Hoje", today()).as_deref(), Some("2024-03-15"));
        assert_eq!(parse_relative_date("ontem", today()).as_deref(), Some("2024-03-14"));
        assert_eq!(parse_relative_date("há 10 dias", today()).as_deref(), Some("2024-03-05"));
        assert_eq!(parse_relative_date("em 02/01/23", today()).as_deref(), Some("2023-01-02"));
        assert_eq!(parse_relative_date("em 9/12", today()).as_deref(), Some("2024-12-09"));
        assert_eq!(parse_relative_date("em 31/02", today()), None);
        assert_eq!(parse_relative_date("semana passada", today()), None);
    }

    #[test]
    fn test_parse_relative_date_out_of_range_day_counts() {
        assert_eq!(parse_relative_date("há 200000000000000 dias", today()), None);
        assert_eq!(parse_relative_date("há 99999999999999999999 dias", today()), None);
        assert_eq!(parse_relative_date("há 100000000 dias", today()), None);

        let parsed = parse_listing_text("Vendedor\nPublicada há 200000000000000 dias", None, today());
        assert_eq!(parsed.published_at, None);
    }

    #[test]
    fn test_parse_listing_text_fields() {
        let parsed = parse_listing_text(PAGE_TEXT, None, today());

        assert_eq!(parsed.title.as_deref(), Some("Analista Fiscal Pleno"));
        assert_eq!(parsed.company.as_deref(), Some("Contabilidade Alfa"));
        assert_eq!(parsed.published_at.as_deref(), Some("2024-03-13"));
        assert_eq!(parsed.location.as_deref(), Some("São Paulo - SP"));
        assert_eq!(
            parsed.salary,
            Some(Salary::Range {
                min: "R$ 3.000,00".to_string(),
                max: "R$ 4.500,00".to_string()
            })
        );
        assert_eq!(parsed.contract_regime.as_deref(), Some("CLT (Efetivo)"));
        assert_eq!(parsed.schedule.as_deref(), Some("Das 08:00 às 17:00"));
        assert_eq!(parsed.benefits, vec!["Vale-transporte", "Vale-refeição", "Plano de saúde"]);
        assert_eq!(parsed.work_model.as_deref(), Some("presencial"));
        assert_eq!(parsed.level.as_deref(), Some("Pleno"));
        assert_eq!(
            parsed.competencies,
            vec!["Realizar apuração de impostos", "Trabalho em equipe"]
        );
        assert_eq!(parsed.requirements, vec!["Experiência com SPED", "Ensino superior completo"]);
        assert_eq!(parsed.raw_text, PAGE_TEXT);
    }

    #[test]
    fn test_parse_listing_text_fallbacks() {
        let text = "SOBRE A VAGA\nREQUISITOS:\nSalário: R$ 1.500 ou R$ 2.100,50 conforme\nAtendimento das 8h00 as 14h00";
        let parsed = parse_listing_text(
            text,
            Some("https://www.catho.com.br/vagas/vendedor-senior/42/"),
            today(),
        );

        assert_eq!(parsed.title.as_deref(), Some("Salário: R$ 1.500 ou R$ 2.100,50 conforme"));
        assert_eq!(
            parsed.salary,
            Some(Salary::Value {
                value: "R$ 2.100,50".to_string()
            })
        );
        assert_eq!(parsed.schedule.as_deref(), Some("8:00 às 14:00"));
        assert_eq!(parsed.location, None);

        let only_slug = parse_listing_text("", Some("https://www.catho.com.br/vagas/vendedor-senior/42/"), today());
        assert_eq!(only_slug.title.as_deref(), Some("Vendedor Senior"));
        assert_eq!(only_slug.level.as_deref(), Some("Sênior"));
    }

    #[test]
    fn test_salary_to_agree_and_remote_work() {
        let text = "Motorista\nSalário a combinar R$ 2.000,00\nHorário\nRemote Work";
        let parsed = parse_listing_text(text, None, today());
        assert_eq!(parsed.salary, None);
        assert_eq!(parsed.schedule, None);
        assert_eq!(parsed.work_model.as_deref(), Some("remoto"));
    }

    #[test]
    fn test_parse_location_rejects_unknown_uf() {
        assert_eq!(parse_location("Cidade Nova - XX"), None);
        assert_eq!(parse_location("Atuação em Natal - RN").as_deref(), Some("Atuação em Natal - RN"));
    }
}
