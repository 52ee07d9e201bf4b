// ============================================================
// JOB BOARD SCRAPER
// ============================================================
// Sequential fetcher for the board's sector listings and job pages

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, REFERER};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::application::use_cases::listing_parser::{
    html_to_clean_text, is_uf, max_amount, parse_listing_text, parse_relative_date,
    title_from_slug, LOCATION_LOOSE, SALARY_RANGE, SALARY_TO_AGREE,
};
use crate::domain::error::{AppError, Result};
use crate::domain::job::{ScrapedJob, TitleCatalog};
use crate::infrastructure::config::Settings;
use crate::infrastructure::storage;

pub const BOARD_BASE: &str = "https://www.catho.com.br";
pub const LANDING_URL: &str = "https://www.catho.com.br/vagas/";
pub const SOURCE: &str = "catho";

const JOB_DELAY: Duration = Duration::from_millis(200);
const MAX_EMPTY_PAGES: usize = 3;
const FALLBACK_TITLE_LINKS: usize = 20;

/// One board sector and its listing URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorSource {
    pub name: &'static str,
    pub url: &'static str,
}

pub static SECTORS: [SectorSource; 19] = [
    SectorSource { name: "Administracao", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=1&area_id%5B1%5D=3&area_id%5B2%5D=12&area_id%5B3%5D=20&area_id%5B4%5D=47&area_id%5B5%5D=67&area_id%5B6%5D=69&area_id%5B7%5D=73&area_id%5B8%5D=74&area_id%5B9%5D=75&area_id%5B10%5D=1906&area_id%5B11%5D=1937" },
    SectorSource { name: "Comercial e vendas", url: "https://www.catho.com.br/vagas/area-comercial-vendas/" },
    SectorSource { name: "Comercio exterior", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=15&area_id%5B1%5D=70" },
    SectorSource { name: "Educacao", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=24&area_id%5B1%5D=87" },
    SectorSource { name: "Financeira", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=2&area_id%5B1%5D=11&area_id%5B2%5D=19&area_id%5B3%5D=23&area_id%5B4%5D=40&area_id%5B5%5D=76" },
    SectorSource { name: "Hotelaria e turismo", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=48&area_id%5B1%5D=72" },
    SectorSource { name: "Informatica", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=51&area_id%5B1%5D=52" },
    SectorSource { name: "Saude", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=13&area_id%5B1%5D=26&area_id%5B2%5D=39&area_id%5B3%5D=41&area_id%5B4%5D=43&area_id%5B5%5D=45&area_id%5B6%5D=46&area_id%5B7%5D=58&area_id%5B8%5D=61&area_id%5B9%5D=62&area_id%5B10%5D=65&area_id%5B11%5D=1902" },
    SectorSource { name: "Suprimentos", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=55&area_id%5B1%5D=88" },
    SectorSource { name: "Agricultura,pecuaria e veterinaria", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=1858&area_id%5B1%5D=1859&area_id%5B2%5D=1904&area_id%5B3%5D=1943" },
    SectorSource { name: "Artes,arquitetura e design", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=5&area_id%5B1%5D=6&area_id%5B2%5D=7&area_id%5B3%5D=21&area_id%5B4%5D=60" },
    SectorSource { name: "Comunicacao e marketing", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=53&area_id%5B1%5D=57&area_id%5B2%5D=66&area_id%5B3%5D=71&area_id%5B4%5D=1965" },
    SectorSource { name: "Engenharia", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=18&area_id%5B1%5D=29&area_id%5B2%5D=30&area_id%5B3%5D=31&area_id%5B4%5D=32&area_id%5B5%5D=34&area_id%5B6%5D=35&area_id%5B7%5D=36&area_id%5B8%5D=37&area_id%5B9%5D=38&area_id%5B10%5D=483&area_id%5B11%5D=484" },
    SectorSource { name: "Industrial", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=9&area_id%5B1%5D=10&area_id%5B2%5D=25&area_id%5B3%5D=50&area_id%5B4%5D=56" },
    SectorSource { name: "Juridica", url: "https://www.catho.com.br/vagas/area-juridica/" },
    SectorSource { name: "Tecnica", url: "https://www.catho.com.br/vagas/?area_id%5B0%5D=79&area_id%5B1%5D=80" },
    SectorSource { name: "Telemarketing", url: "https://www.catho.com.br/vagas/area-atendimento-ao-cliente-call-center-telemarketing/" },
    SectorSource { name: "Telecomunicacoes", url: "https://www.catho.com.br/vagas/area-telecomunicacoes-engenharia-de-telecomunicacoes/" },
    SectorSource { name: "ServicoSocial", url: "https://www.catho.com.br/vagas/area-servico-social/" },
];

/// Case-insensitive lookup in the sector catalog
pub fn find_sector(name: &str) -> Option<&'static SectorSource> {
    SECTORS.iter().find(|s| s.name.eq_ignore_ascii_case(name.trim()))
}

/// Listing URL for a 1-based page
pub fn page_url(base: &str, page: usize) -> String {
    let separator = if base.contains('?') { "&p=" } else { "?p=" };
    format!("{}{}{}", base, separator, page)
}

// ============================================================
// HTML EXTRACTION
// ============================================================

const SKIPPED_LINK_PARTS: [&str; 10] = [
    "/empresa/",
    "/company/",
    "/anunciar",
    "/cadastro",
    "/login",
    "/por-local/",
    "/por-area/",
    "filtros",
    "busca-de-vagas",
    "/vagas/?",
];

const TITLE_KEYWORDS: [&str; 10] = [
    "desenvolvedor",
    "analista",
    "gerente",
    "coordenador",
    "assistente",
    "técnico",
    "especialista",
    "consultor",
    "supervisor",
    "diretor",
];

static JOB_ANCHOR: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href*="/vagas/"]"#).unwrap());
static JOB_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"/vagas/[^/]+/\d+/?$").unwrap());

static TITLE_CANDIDATES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "h2",
        "h3",
        ".job-title",
        "[data-testid*='job']",
        ".vaga-titulo",
        ".titulo-vaga",
        "a[href*='/vagas/']",
        "[class*='title']",
        "[class*='titulo']",
        "[class*='job']",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

fn selectors(list: &[&str]) -> Vec<Selector> {
    list.iter().map(|s| Selector::parse(s).unwrap()).collect()
}

static TITLE_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[r#"h1[data-testid="job-title"]"#, "h1", ".job-title", ".vacancy-title", ".position-title"])
});
static COMPANY_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".company-name", ".employer-name", r#"[data-testid="company-name"]"#, ".job-company", ".job-header .company"])
});
static LOCATION_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".location", ".job-location", r#"[data-testid="location"]"#, ".job-header .location", ".position-location"])
});
static SALARY_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".salary", ".wage", ".compensation", r#"[data-testid="salary"]"#, ".job-salary"])
});
static WORK_MODEL_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".work-mode", ".job-type", ".employment-type", r#"[data-testid="work-mode"]"#])
});
static PUBLISHED_FIELD: Lazy<Vec<Selector>> = Lazy::new(|| {
    selectors(&[".publication-date", ".posted-date", r#"[data-testid="publication-date"]"#, ".date-posted"])
});

fn element_text(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text of the first matching element with more than one char
fn pick(document: &Html, candidates: &[Selector]) -> Option<String> {
    candidates.iter().find_map(|selector| {
        document
            .select(selector)
            .next()
            .map(|el| element_text(&el))
            .filter(|text| text.chars().count() > 1)
    })
}

/// Links to individual job pages found on a listing page, deduplicated
pub fn extract_job_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&JOB_ANCHOR) {
        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        let lower = href.to_lowercase();
        if href.is_empty() || SKIPPED_LINK_PARTS.iter().any(|part| lower.contains(part)) {
            continue;
        }
        if !JOB_PATH.is_match(href) {
            continue;
        }
        if let Some(absolute) = normalize_link(href) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    }

    links
}

fn normalize_link(href: &str) -> Option<String> {
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    url::Url::parse(BOARD_BASE)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .ok()
}

/// Role-like titles from the board's landing page
pub fn extract_titles(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut titles: Vec<String> = Vec::new();

    for selector in TITLE_CANDIDATES.iter() {
        for element in document.select(selector) {
            let text = element_text(&element);
            if text.chars().count() <= 10 || titles.contains(&text) {
                continue;
            }
            let lower = text.to_lowercase();
            if TITLE_KEYWORDS.iter().any(|keyword| lower.contains(keyword)) {
                titles.push(text);
            }
        }
    }

    if titles.is_empty() {
        debug!("No role titles found, falling back to job links");
        for anchor in document.select(&JOB_ANCHOR).take(FALLBACK_TITLE_LINKS) {
            let text = element_text(&anchor);
            if text.chars().count() > 5 && !titles.contains(&text) {
                titles.push(text);
            }
        }
    }

    titles
}

fn normalize_work_model(raw: String) -> String {
    let lower = raw.to_lowercase();
    if lower.contains("remoto") || lower.contains("home office") {
        "remoto".to_string()
    } else if lower.contains("híbrido") || lower.contains("hibrido") {
        "híbrido".to_string()
    } else if lower.contains("presencial") {
        "presencial".to_string()
    } else {
        raw
    }
}

fn salary_from_field(raw: &str) -> Option<String> {
    if SALARY_TO_AGREE.is_match(raw) {
        return None;
    }
    match SALARY_RANGE.captures(raw) {
        Some(caps) => Some(format!("{} - {}", &caps[1], &caps[2])),
        None => max_amount(raw),
    }
}

/// A location picked from the page is dropped when its state code is unknown
fn location_from_field(raw: String) -> Option<String> {
    match LOCATION_LOOSE.captures(&raw) {
        Some(caps) if !is_uf(&caps[2]) => None,
        _ => Some(raw),
    }
}

/// Build a job from a detail page.
///
/// Dedicated page elements win over fields recovered from the page
/// text. Returns `None` when no title can be found at all.
pub fn build_job(html: &str, link: &str, sector: &str, today: NaiveDate) -> Option<ScrapedJob> {
    let document = Html::parse_document(html);
    let picked_title = pick(&document, &TITLE_FIELD);
    let picked_company = pick(&document, &COMPANY_FIELD);
    let picked_location = pick(&document, &LOCATION_FIELD).and_then(location_from_field);
    let picked_salary = pick(&document, &SALARY_FIELD).and_then(|raw| salary_from_field(&raw));
    let picked_work_model = pick(&document, &WORK_MODEL_FIELD).map(normalize_work_model);
    let picked_published = pick(&document, &PUBLISHED_FIELD)
        .map(|raw| parse_relative_date(&raw, today).unwrap_or(raw));

    let text = html_to_clean_text(html);
    let parsed = parse_listing_text(&text, Some(link), today);

    let title = picked_title
        .or_else(|| parsed.title.clone())
        .filter(|t| t.trim().to_lowercase() != "sobre a vaga")
        .or_else(|| title_from_slug(link))?;

    let mut job = ScrapedJob::from_parsed(SOURCE, link, Some(sector), parsed);
    job.title = title;
    job.company = picked_company.or(job.company);
    job.location = picked_location.or(job.location);
    job.salary = picked_salary.or(job.salary);
    job.work_model = picked_work_model.or(job.work_model);
    job.published_at = picked_published.or(job.published_at);
    Some(job)
}

// ============================================================
// HTTP
// ============================================================

pub struct JobScraper {
    client: Client,
    pages: usize,
    delay: Duration,
}

impl JobScraper {
    pub fn new(settings: &Settings, pages: usize) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("pt-BR,pt;q=0.9,en;q=0.8"));
        headers.insert("DNT", HeaderValue::from_static("1"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.google.com/"));

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            pages: pages.max(1),
            delay: JOB_DELAY,
        })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            return Err(AppError::HttpError(format!("HTTP error {}: {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::HttpError(format!("Failed to read response body: {}", e)))
    }

    /// Walk a sector's listing pages and fetch every linked job page.
    ///
    /// Stops at a 404 listing page, after three empty pages in a row, or
    /// once `max_jobs` jobs are collected.
    pub async fn scrape_sector(&self, sector: &SectorSource, max_jobs: Option<usize>) -> Vec<ScrapedJob> {
        let limit = max_jobs.unwrap_or(usize::MAX);
        let mut jobs = Vec::new();
        let mut empty_pages = 0;

        info!(sector = sector.name, pages = self.pages, "Scraping sector");

        for page in 1..=self.pages {
            let url = page_url(sector.url, page);
            let html = match self.fetch(&url).await {
                Ok(html) => html,
                Err(AppError::NotFound(_)) => {
                    info!(sector = sector.name, page, "Listing page not found, sector finished");
                    break;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Failed to fetch listing page");
                    continue;
                }
            };

            let links = extract_job_links(&html);
            debug!(page, links = links.len(), "Job links collected");
            if links.is_empty() {
                empty_pages += 1;
                if empty_pages >= MAX_EMPTY_PAGES {
                    info!(sector = sector.name, "Three empty pages in a row, sector finished");
                    break;
                }
                continue;
            }
            empty_pages = 0;

            for link in links {
                if jobs.len() >= limit {
                    return jobs;
                }
                match self.fetch(&link).await {
                    Ok(html) => {
                        let today = Local::now().date_naive();
                        match build_job(&html, &link, sector.name, today) {
                            Some(job) => jobs.push(job),
                            None => debug!(link = %link, "Job page without title skipped"),
                        }
                    }
                    Err(e) => warn!(link = %link, error = %e, "Failed to fetch job page"),
                }
                tokio::time::sleep(self.delay).await;
            }
        }

        info!(sector = sector.name, jobs = jobs.len(), "Sector finished");
        jobs
    }

    /// Collect role titles from a landing page
    pub async fn fetch_titles(&self, url: &str) -> Result<TitleCatalog> {
        let html = self.fetch(url).await?;
        let titles = extract_titles(&html);
        info!(url, titles = titles.len(), "Titles extracted");
        Ok(TitleCatalog::new(
            titles,
            Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        ))
    }
}

pub fn save_catalog(catalog: &TitleCatalog, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(catalog)?;
    storage::write_text(path, &json)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_HTML: &str = r#"<html><body>
        <a href="/vagas/analista-fiscal/123/">Analista Fiscal</a>
        <a href="https://www.catho.com.br/vagas/vendedor/456">Vendedor</a>
        <a href="/vagas/analista-fiscal/123/">Analista Fiscal (repetido)</a>
        <a href="/vagas/empresa/acme/789/">Empresa</a>
        <a href="/vagas/?q=analista">Busca</a>
        <a href="/vagas/por-local/recife/">Recife</a>
        <a href="/vagas/area-juridica/">Jurídica</a>
    </body></html>"#;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("https://x/vagas/area-juridica/", 2), "https://x/vagas/area-juridica/?p=2");
        assert_eq!(page_url("https://x/vagas/?area_id=1", 3), "https://x/vagas/?area_id=1&p=3");
    }

    #[test]
    fn test_find_sector() {
        assert_eq!(find_sector("juridica").map(|s| s.name), Some("Juridica"));
        assert_eq!(find_sector(" Saude ").map(|s| s.name), Some("Saude"));
        assert!(find_sector("Astronomia").is_none());
        assert_eq!(SECTORS.len(), 19);
    }

    #[test]
    fn test_extract_job_links() {
        let links = extract_job_links(LISTING_HTML);
        assert_eq!(
            links,
            vec![
                "https://www.catho.com.br/vagas/analista-fiscal/123/",
                "https://www.catho.com.br/vagas/vendedor/456",
            ]
        );
    }

    #[test]
    fn test_extract_titles_keyword_filter() {
        let html = r#"<html><body>
            <h2>Analista de Sistemas Pleno</h2>
            <h2>Vagas em destaque</h2>
            <h3>Gerente Comercial</h3>
            <div class="job-title">Analista de Sistemas Pleno</div>
            <a href="/vagas/x/1/">Coordenador de Logística</a>
        </body></html>"#;
        assert_eq!(
            extract_titles(html),
            vec!["Analista de Sistemas Pleno", "Gerente Comercial", "Coordenador de Logística"]
        );
    }

    #[test]
    fn test_extract_titles_falls_back_to_links() {
        let html = r#"<html><body>
            <a href="/vagas/a/1/">Motorista</a>
            <a href="/vagas/b/2/">Caixa</a>
        </body></html>"#;
        assert_eq!(extract_titles(html), vec!["Motorista"]);
    }

    #[test]
    fn test_build_job_prefers_page_elements() {
        let html = r#"<html><body><main>
            <h1 data-testid="job-title">Analista Contábil Júnior</h1>
            <span class="company-name">Contabilidade Alfa</span>
            <span class="location">Recife - PE</span>
            <span class="salary">R$ 2.000,00 a R$ 2.500,00</span>
            <span class="work-mode">Home office</span>
            <span class="publication-date">Ontem</span>
            <ul><li>- Conciliar contas</li><li>- Experiência com Excel</li></ul>
            <p>Benefícios</p><p>VR, VT</p>
        </main></body></html>"#;
        let link = "https://www.catho.com.br/vagas/analista-contabil/1/";
        let job = build_job(html, link, "Financeira", today()).unwrap();

        assert_eq!(job.source, "catho");
        assert_eq!(job.title, "Analista Contábil Júnior");
        assert_eq!(job.company.as_deref(), Some("Contabilidade Alfa"));
        assert_eq!(job.location.as_deref(), Some("Recife - PE"));
        assert_eq!(job.salary.as_deref(), Some("R$ 2.000,00 - R$ 2.500,00"));
        assert_eq!(job.work_model.as_deref(), Some("remoto"));
        assert_eq!(job.published_at.as_deref(), Some("2024-03-14"));
        assert_eq!(job.skills.as_deref(), Some("Conciliar contas"));
        assert_eq!(job.requirements.as_deref(), Some("Experiência com Excel"));
        assert_eq!(job.benefits.as_deref(), Some("VR; VT"));
        assert_eq!(job.level.as_deref(), Some("Júnior"));
        assert_eq!(job.sector.as_deref(), Some("Financeira"));
        assert_eq!(job.link, link);
    }

    #[test]
    fn test_build_job_rejects_unknown_state_and_uses_slug() {
        let html = r#"<html><body><main>
            <h1>Sobre a vaga</h1>
            <span class="location">Lugar - ZZ</span>
        </main></body></html>"#;
        let link = "https://www.catho.com.br/vagas/auxiliar-de-cozinha/9/";
        let job = build_job(html, link, "Hotelaria e turismo", today()).unwrap();
        assert_eq!(job.title, "Auxiliar de Cozinha");
        assert_eq!(job.location, None);
    }
}
