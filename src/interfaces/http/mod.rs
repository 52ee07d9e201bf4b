use crate::domain::error::{AppError, Result};
use crate::domain::job::TitleCatalog;
use crate::infrastructure::config::Settings;
use crate::infrastructure::storage;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{get, web, App, HttpResponse, HttpServer, Responder, ResponseError};
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};
use validator::Validate;

const JOB_SOURCE: &str = "catho.com.br";

pub struct ApiState {
    pub titles_file: PathBuf,
}

impl ApiState {
    /// Re-read the title file; a missing file is an empty catalog
    fn load_catalog(&self) -> Result<TitleCatalog> {
        if !self.titles_file.exists() {
            return Ok(TitleCatalog::default());
        }
        let content = storage::read_text(&self.titles_file)?;
        serde_json::from_str(&content).map_err(|e| {
            AppError::ParseError(format!("{}: {}", self.titles_file.display(), e))
        })
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            AppError::NotFound(msg) | AppError::ValidationError(msg) => msg.clone(),
            other => other.to_string(),
        };
        if self.status_code().is_server_error() {
            warn!(error = %self, "Request failed");
        }
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": message,
        }))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: usize,
    #[serde(default = "default_per_page")]
    #[validate(range(min = 1, max = 100))]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobEntry {
    pub id: usize,
    pub title: String,
    pub source: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
}

fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "message": "Job listings API",
        "version": "1.0",
        "endpoints": {
            "/": "API information",
            "/vagas": "All extracted job titles, paginated",
            "/vagas/count": "Number of extracted job titles",
            "/vagas/search?q=term": "Search job titles by term",
            "/vagas/{id}": "Single job title by id",
            "/health": "Service health"
        },
        "timestamp": now_iso(),
    }))
}

#[get("/vagas")]
async fn list_jobs(data: web::Data<ApiState>, query: web::Query<PageQuery>) -> Result<HttpResponse> {
    query
        .validate()
        .map_err(|e| AppError::ValidationError(format!("Invalid pagination: {}", e)))?;

    let catalog = data.load_catalog()?;
    let total = catalog.titles.len();
    let start = (query.page - 1).saturating_mul(query.per_page);

    let jobs: Vec<JobEntry> = catalog
        .titles
        .into_iter()
        .enumerate()
        .skip(start)
        .take(query.per_page)
        .map(|(idx, title)| JobEntry {
            id: idx + 1,
            title,
            source: JOB_SOURCE,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": jobs,
        "pagination": Pagination {
            page: query.page,
            per_page: query.per_page,
            total,
            total_pages: total.div_ceil(query.per_page),
        },
        "extracted_at": catalog.timestamp,
    })))
}

#[get("/vagas/count")]
async fn count_jobs(data: web::Data<ApiState>) -> Result<HttpResponse> {
    let catalog = data.load_catalog()?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "total_jobs": catalog.total_titles,
        "extracted_at": catalog.timestamp,
    })))
}

#[get("/vagas/search")]
async fn search_jobs(data: web::Data<ApiState>, query: web::Query<SearchQuery>) -> Result<HttpResponse> {
    let term = query.q.as_deref().unwrap_or("").to_lowercase();
    if term.is_empty() {
        return Err(AppError::ValidationError(
            "Query parameter 'q' is required".to_string(),
        ));
    }

    let catalog = data.load_catalog()?;
    let results: Vec<JobEntry> = catalog
        .titles
        .into_iter()
        .enumerate()
        .filter(|(_, title)| title.to_lowercase().contains(&term))
        .map(|(idx, title)| JobEntry {
            id: idx + 1,
            title,
            source: JOB_SOURCE,
        })
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "query": term,
        "results_count": results.len(),
        "data": results,
        "extracted_at": catalog.timestamp,
    })))
}

#[get("/vagas/{id}")]
async fn get_job(data: web::Data<ApiState>, path: web::Path<usize>) -> Result<HttpResponse> {
    let id = path.into_inner();
    let catalog = data.load_catalog()?;

    let title = id
        .checked_sub(1)
        .and_then(|idx| catalog.titles.get(idx))
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "data": {
            "id": id,
            "title": title,
            "source": JOB_SOURCE,
            "extracted_at": catalog.timestamp,
        },
    })))
}

#[get("/health")]
async fn health(data: web::Data<ApiState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "timestamp": now_iso(),
        "data_available": data.titles_file.exists(),
    }))
}

/// Routes and extractor error handling, shared by the server and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::QueryConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(err.to_string()).into()
    }))
    .service(index)
    .service(list_jobs)
    .service(count_jobs)
    .service(search_jobs)
    .service(get_job)
    .service(health);
}

pub async fn serve(settings: &Settings, titles_file: PathBuf) -> Result<()> {
    info!(
        host = %settings.listen_host,
        port = settings.listen_port,
        titles = %titles_file.display(),
        "Starting job listings API"
    );

    let state = web::Data::new(ApiState { titles_file });

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((settings.listen_host.as_str(), settings.listen_port))?
    .run()
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use serde_json::Value;

    fn titles_file(titles: Option<&[&str]>) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vagas_titles_{}.json", uuid::Uuid::new_v4()));
        if let Some(titles) = titles {
            let catalog = TitleCatalog::new(
                titles.iter().map(|t| t.to_string()).collect(),
                "2024-03-15 10:00:00".to_string(),
            );
            std::fs::write(&path, serde_json::to_string(&catalog).unwrap()).unwrap();
        }
        path
    }

    macro_rules! app {
        ($path:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(ApiState { titles_file: $path.clone() }))
                    .configure(configure),
            )
            .await
        };
    }

    const TITLES: [&str; 3] = ["Analista de Dados", "Desenvolvedor Rust", "Analista Fiscal"];

    #[actix_web::test]
    async fn test_list_jobs_paginates() {
        let path = titles_file(Some(&TITLES[..]));
        let app = app!(path);

        let req = test::TestRequest::get().uri("/vagas?page=2&per_page=2").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["id"], 3);
        assert_eq!(body["data"][0]["title"], "Analista Fiscal");
        assert_eq!(body["data"][0]["source"], "catho.com.br");
        assert_eq!(body["pagination"]["total"], 3);
        assert_eq!(body["pagination"]["total_pages"], 2);
        assert_eq!(body["extracted_at"], "2024-03-15 10:00:00");

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn test_invalid_pagination_is_bad_request() {
        let path = titles_file(Some(&TITLES[..]));
        let app = app!(path);

        for uri in ["/vagas?per_page=0", "/vagas?per_page=101", "/vagas?page=0", "/vagas?page=abc"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["success"], false);
        }

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn test_search_and_lookup() {
        let path = titles_file(Some(&TITLES[..]));
        let app = app!(path);

        let req = test::TestRequest::get().uri("/vagas/search?q=ANALISTA").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["query"], "analista");
        assert_eq!(body["results_count"], 2);
        assert_eq!(body["data"][1]["id"], 3);

        let req = test::TestRequest::get().uri("/vagas/search").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::get().uri("/vagas/2").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["title"], "Desenvolvedor Rust");

        for uri in ["/vagas/0", "/vagas/4"] {
            let req = test::TestRequest::get().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{}", uri);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["error"], "Job not found");
        }

        let req = test::TestRequest::get().uri("/vagas/count").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_jobs"], 3);

        let _ = std::fs::remove_file(path);
    }

    #[actix_web::test]
    async fn test_missing_file_is_empty_catalog() {
        let path = titles_file(None);
        let app = app!(path);

        let req = test::TestRequest::get().uri("/vagas/count").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["total_jobs"], 0);
        assert_eq!(body["extracted_at"], "");

        let req = test::TestRequest::get().uri("/health").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["data_available"], false);

        let req = test::TestRequest::get().uri("/").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["endpoints"]["/vagas"].is_string());
    }
}
