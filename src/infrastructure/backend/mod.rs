pub mod rest;

use crate::domain::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use rest::RestTableClient;

/// Table-level access to the hosted backend
#[async_trait]
pub trait TableClient: Send + Sync {
    async fn select(&self, table: &str, columns: &str, limit: Option<usize>) -> Result<Vec<Value>>;
    async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>>;
    /// Returns the rows as stored by the backend
    async fn insert(&self, table: &str, rows: &[Value]) -> Result<Vec<Value>>;
    /// Returns the number of deleted rows
    async fn delete_eq(&self, table: &str, column: &str, value: &str) -> Result<usize>;
    async fn count(&self, table: &str) -> Result<usize>;
}
