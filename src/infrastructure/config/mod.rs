use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::domain::error::{AppError, Result};

pub const CONFIG_FILE: &str = "vagas.toml";

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36";

/// Runtime settings shared by every command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub supabase_url: Option<String>,
    pub supabase_key: Option<String>,
    pub listen_host: String,
    pub listen_port: u16,
    pub titles_file: String,
    pub job_store_path: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            supabase_url: None,
            supabase_key: None,
            listen_host: "0.0.0.0".to_string(),
            listen_port: 5000,
            titles_file: "catho_job_titles.json".to_string(),
            job_store_path: "jobs.db".to_string(),
            http_timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Credentials for the hosted backend
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub key: String,
}

impl Settings {
    /// Load `.env`, then defaults < vagas.toml < VAGAS_* < SUPABASE_* variables
    pub fn load() -> Result<Self> {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "Failed to read .env file");
            }
        }
        Self::from_figment(Self::figment())
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("VAGAS_"))
            .merge(
                Env::raw()
                    .only(&["SUPABASE_ANON_KEY"])
                    .map(|_| "supabase_key".into()),
            )
            .merge(Env::raw().only(&["SUPABASE_URL", "SUPABASE_KEY"]))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| AppError::ConfigError(format!("Invalid configuration: {}", e)))
    }

    /// Backend credentials; both variables are required
    pub fn backend(&self) -> Result<BackendConfig> {
        let url = non_empty(&self.supabase_url)
            .ok_or_else(|| AppError::ConfigError("SUPABASE_URL is not set".to_string()))?;
        let key = non_empty(&self.supabase_key).ok_or_else(|| {
            AppError::ConfigError("SUPABASE_KEY (or SUPABASE_ANON_KEY) is not set".to_string())
        })?;

        Ok(BackendConfig {
            url: url.trim_end_matches('/').to_string(),
            key: key.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_figment(base()).unwrap();
        assert_eq!(settings.listen_port, 5000);
        assert_eq!(settings.titles_file, "catho_job_titles.json");
        assert!(settings.supabase_url.is_none());
    }

    #[test]
    fn test_backend_requires_both_values() {
        let settings = Settings::from_figment(
            base().merge(Serialized::default("supabase_url", "https://db.example.co/")),
        )
        .unwrap();
        let err = settings.backend().unwrap_err();
        assert!(err.to_string().contains("SUPABASE_KEY"));

        let settings = Settings::from_figment(
            base()
                .merge(Serialized::default("supabase_url", "https://db.example.co/"))
                .merge(Serialized::default("supabase_key", "secret")),
        )
        .unwrap();
        let backend = settings.backend().unwrap();
        assert_eq!(backend.url, "https://db.example.co");
        assert_eq!(backend.key, "secret");
    }

    #[test]
    fn test_blank_url_is_missing() {
        let settings = Settings {
            supabase_url: Some("  ".to_string()),
            supabase_key: Some("k".to_string()),
            ..Default::default()
        };
        assert!(matches!(settings.backend(), Err(AppError::ConfigError(_))));
    }
}
