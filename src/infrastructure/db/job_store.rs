use std::path::Path;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::domain::error::{AppError, Result};
use crate::domain::job::ScrapedJob;
use crate::infrastructure::storage;

pub const EXPORT_HEADER: [&str; 18] = [
    "Fonte",
    "Titulo",
    "Link",
    "Area",
    "Localidade",
    "Salario",
    "Habilidades",
    "Empresa",
    "Publicada em",
    "Modalidade",
    "Requisitos",
    "Descricao",
    "Setor",
    "Beneficios",
    "Horario",
    "Regime contratacao",
    "Data publicacao",
    "Nivel",
];

const COLUMNS: &str = "fonte, titulo, link, area, localidade, salario, habilidades, empresa, \
    publicada_em, modalidade, requisitos, descricao, setor, beneficios, horario, \
    regime_contratacao, data_publicacao, nivel";

/// Scraped jobs keyed by link
pub struct JobStore {
    pool: Pool<Sqlite>,
}

impl JobStore {
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            storage::ensure_dir(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS jobs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                fonte TEXT NOT NULL,
                titulo TEXT NOT NULL,
                link TEXT UNIQUE NOT NULL,
                area TEXT,
                localidade TEXT,
                salario TEXT,
                habilidades TEXT,
                empresa TEXT,
                publicada_em TEXT,
                modalidade TEXT,
                requisitos TEXT,
                descricao TEXT,
                setor TEXT,
                beneficios TEXT,
                horario TEXT,
                regime_contratacao TEXT,
                data_publicacao TEXT,
                nivel TEXT,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create table: {}", e)))?;

        Ok(Self { pool })
    }

    /// Insert a job, replacing any row with the same link
    pub async fn upsert(&self, job: &ScrapedJob) -> Result<()> {
        sqlx::query(&format!(
            "INSERT OR REPLACE INTO jobs ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            COLUMNS
        ))
        .bind(&job.source)
        .bind(&job.title)
        .bind(&job.link)
        .bind(&job.area)
        .bind(&job.location)
        .bind(&job.salary)
        .bind(&job.skills)
        .bind(&job.company)
        .bind(&job.published_at)
        .bind(&job.work_model)
        .bind(&job.requirements)
        .bind(&job.description)
        .bind(&job.sector)
        .bind(&job.benefits)
        .bind(&job.schedule)
        .bind(&job.contract_regime)
        .bind(&job.published_at)
        .bind(&job.level)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to save job: {}", e)))?;

        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to count jobs: {}", e)))
    }

    /// Write every job to a CSV file, newest first. Returns the row count.
    pub async fn export_csv(&self, path: &Path) -> Result<usize> {
        let rows = sqlx::query_as::<_, JobRow>(&format!(
            "SELECT {} FROM jobs ORDER BY id DESC",
            COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read jobs: {}", e)))?;

        if let Some(parent) = path.parent() {
            storage::ensure_dir(parent)?;
        }
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(EXPORT_HEADER)?;
        for row in &rows {
            writer.write_record(row.fields())?;
        }
        writer.flush()?;

        info!(path = %path.display(), rows = rows.len(), "Jobs exported");
        Ok(rows.len())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    fonte: String,
    titulo: String,
    link: String,
    area: Option<String>,
    localidade: Option<String>,
    salario: Option<String>,
    habilidades: Option<String>,
    empresa: Option<String>,
    publicada_em: Option<String>,
    modalidade: Option<String>,
    requisitos: Option<String>,
    descricao: Option<String>,
    setor: Option<String>,
    beneficios: Option<String>,
    horario: Option<String>,
    regime_contratacao: Option<String>,
    data_publicacao: Option<String>,
    nivel: Option<String>,
}

impl JobRow {
    fn fields(&self) -> Vec<&str> {
        let optional = [
            &self.area,
            &self.localidade,
            &self.salario,
            &self.habilidades,
            &self.empresa,
            &self.publicada_em,
            &self.modalidade,
            &self.requisitos,
            &self.descricao,
            &self.setor,
            &self.beneficios,
            &self.horario,
            &self.regime_contratacao,
            &self.data_publicacao,
            &self.nivel,
        ];
        let mut fields = vec![self.fonte.as_str(), self.titulo.as_str(), self.link.as_str()];
        fields.extend(optional.iter().map(|value| value.as_deref().unwrap_or("")));
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(link: &str, title: &str) -> ScrapedJob {
        ScrapedJob {
            source: "catho".to_string(),
            title: title.to_string(),
            link: link.to_string(),
            sector: Some("Juridica".to_string()),
            published_at: Some("2024-03-14".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_link_and_exports_newest_first() {
        let dir = std::env::temp_dir().join(format!("vagas_store_{}", uuid::Uuid::new_v4()));
        let store = JobStore::open(&dir.join("jobs.db")).await.unwrap();

        store.upsert(&job("https://x/vagas/a/1", "Advogado")).await.unwrap();
        store.upsert(&job("https://x/vagas/b/2", "Paralegal")).await.unwrap();
        store.upsert(&job("https://x/vagas/a/1", "Advogado Pleno")).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let out = dir.join("export.csv");
        assert_eq!(store.export_csv(&out).await.unwrap(), 2);

        let mut reader = csv::Reader::from_path(&out).unwrap();
        let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(header, EXPORT_HEADER.to_vec());

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][1], "Advogado Pleno");
        assert_eq!(&rows[1][1], "Paralegal");
        assert_eq!(&rows[0][12], "Juridica");
        assert_eq!(&rows[0][16], "2024-03-14");
        assert_eq!(&rows[0][3], "");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
