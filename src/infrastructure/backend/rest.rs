use super::TableClient;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::BackendConfig;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// PostgREST-style client for `{url}/rest/v1/{table}`
pub struct RestTableClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestTableClient {
    pub fn new(config: &BackendConfig, timeout_secs: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.key)
            .map_err(|e| AppError::ConfigError(format!("Invalid backend key: {}", e)))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.key))
            .map_err(|e| AppError::ConfigError(format!("Invalid backend key: {}", e)))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn send(&self, table: &str, request: RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("Request to {} failed: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(table, status, &text));
        }

        Ok(response)
    }

    async fn rows(&self, table: &str, request: RequestBuilder) -> Result<Vec<Value>> {
        self.send(table, request)
            .await?
            .json()
            .await
            .map_err(|e| AppError::BackendError(format!("Failed to parse JSON from {}: {}", table, e)))
    }
}

/// Error for a non-2xx reply, carrying the status and response body
fn status_error(table: &str, status: StatusCode, body: &str) -> AppError {
    AppError::BackendError(format!("{} ({}): {}", table, status, body.trim()))
}

/// Total from a `Content-Range` header such as `0-0/42` or `*/42`
fn parse_content_range(value: &str) -> Option<usize> {
    value.rsplit('/').next()?.trim().parse().ok()
}

#[async_trait]
impl TableClient for RestTableClient {
    async fn select(&self, table: &str, columns: &str, limit: Option<usize>) -> Result<Vec<Value>> {
        let mut query = vec![("select", columns.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let request = self.client.get(self.table_url(table)).query(&query);
        self.rows(table, request).await
    }

    async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&[("select", "*".to_string()), (column, format!("eq.{}", value))]);
        self.rows(table, request).await
    }

    async fn insert(&self, table: &str, rows: &[Value]) -> Result<Vec<Value>> {
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(rows);
        self.rows(table, request).await
    }

    async fn delete_eq(&self, table: &str, column: &str, value: &str) -> Result<usize> {
        let request = self
            .client
            .delete(self.table_url(table))
            .header("Prefer", "return=representation")
            .query(&[(column, format!("eq.{}", value))]);
        Ok(self.rows(table, request).await?.len())
    }

    async fn count(&self, table: &str) -> Result<usize> {
        let request = self
            .client
            .head(self.table_url(table))
            .header("Prefer", "count=exact")
            .query(&[("select", "*")]);
        let response = self.send(table, request).await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range)
            .ok_or_else(|| AppError::BackendError(format!("{}: missing row count", table)))
    }
}
