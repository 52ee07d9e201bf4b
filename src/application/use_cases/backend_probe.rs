// ============================================================
// BACKEND PROBES
// ============================================================
// Table existence checks, a write round-trip and batched uploads
// against the hosted backend

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::error::{AppError, Result};
use crate::domain::listing::ListingRecord;
use crate::infrastructure::backend::TableClient;

pub const KNOWN_TABLES: [&str; 6] = [
    "jobs",
    "vagas",
    "companies",
    "job_tags",
    "skills_statistics",
    "sector_mapping",
];

pub const DEFAULT_BATCH_SIZE: usize = 50;
const REASON_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableStatus {
    /// `columns` comes from the first row, empty when the table has none
    Exists { columns: Vec<String> },
    Missing { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableCheck {
    pub table: String,
    #[serde(flatten)]
    pub status: TableStatus,
}

/// Select one row from each table; a failure marks that table missing
pub async fn check_tables(client: &dyn TableClient, tables: &[&str]) -> Vec<TableCheck> {
    let mut checks = Vec::with_capacity(tables.len());

    for table in tables {
        let status = match client.select(table, "*", Some(1)).await {
            Ok(rows) => {
                let columns = rows
                    .first()
                    .and_then(Value::as_object)
                    .map(|row| row.keys().cloned().collect())
                    .unwrap_or_default();
                info!(table, "Table exists");
                TableStatus::Exists { columns }
            }
            Err(e) => {
                warn!(table, error = %e, "Table not accessible");
                TableStatus::Missing {
                    reason: truncate(&e.to_string(), REASON_CHARS),
                }
            }
        };
        checks.push(TableCheck {
            table: table.to_string(),
            status,
        });
    }

    checks
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeAction {
    Insert,
    Read,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeStep {
    pub action: ProbeAction,
    pub ok: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeReport {
    pub table: String,
    pub test_id: String,
    pub steps: Vec<ProbeStep>,
}

impl ProbeReport {
    pub fn succeeded(&self) -> bool {
        self.steps.len() == 3 && self.steps.iter().all(|step| step.ok)
    }
}

/// Insert a throwaway `test_` row keyed by `key_column`, read it back and
/// delete it. Read and delete are skipped when the insert fails.
pub async fn probe_write(client: &dyn TableClient, table: &str, key_column: &str) -> ProbeReport {
    let test_id = format!("test_{}", &uuid::Uuid::new_v4().simple().to_string()[..8]);
    let mut report = ProbeReport {
        table: table.to_string(),
        test_id: test_id.clone(),
        steps: Vec::new(),
    };

    let row = json!({ key_column: test_id });
    match client.insert(table, std::slice::from_ref(&row)).await {
        Ok(rows) => report.steps.push(ProbeStep {
            action: ProbeAction::Insert,
            ok: true,
            detail: format!("{} row(s) inserted", rows.len()),
        }),
        Err(e) => {
            warn!(table, error = %e, "Probe insert failed");
            report.steps.push(ProbeStep {
                action: ProbeAction::Insert,
                ok: false,
                detail: e.to_string(),
            });
            return report;
        }
    }

    let read = match client.select_eq(table, key_column, &test_id).await {
        Ok(rows) if rows.is_empty() => ProbeStep {
            action: ProbeAction::Read,
            ok: false,
            detail: "inserted row not found".to_string(),
        },
        Ok(rows) => ProbeStep {
            action: ProbeAction::Read,
            ok: true,
            detail: format!("{} row(s) read back", rows.len()),
        },
        Err(e) => ProbeStep {
            action: ProbeAction::Read,
            ok: false,
            detail: e.to_string(),
        },
    };
    report.steps.push(read);

    let delete = match client.delete_eq(table, key_column, &test_id).await {
        Ok(deleted) => ProbeStep {
            action: ProbeAction::Delete,
            ok: deleted > 0,
            detail: format!("{} row(s) deleted", deleted),
        },
        Err(e) => ProbeStep {
            action: ProbeAction::Delete,
            ok: false,
            detail: e.to_string(),
        },
    };
    report.steps.push(delete);

    info!(table, test_id = %report.test_id, ok = report.succeeded(), "Write probe finished");
    report
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UploadSummary {
    pub total: usize,
    pub uploaded: usize,
    pub batches: usize,
    pub failed_batches: usize,
    /// Rows in the table after the upload, when the count succeeded
    pub final_count: Option<usize>,
}

/// Flat backend row for a listing record
pub fn upload_row(record: &ListingRecord) -> Value {
    json!({
        "title": record.title(),
        "company_name": record.company(),
        "sector": record.sector(),
        "location_city": record.city(),
        "location_state": record.state(),
        "description": record.description(),
    })
}

/// Insert records in batches, then count the table.
///
/// A failed batch is counted and skipped. A failed count leaves
/// `final_count` empty.
pub async fn upload_records(
    client: &dyn TableClient,
    table: &str,
    records: &[ListingRecord],
    batch_size: usize,
) -> Result<UploadSummary> {
    if batch_size == 0 {
        return Err(AppError::ValidationError("Batch size must be at least 1".to_string()));
    }

    let mut summary = UploadSummary {
        total: records.len(),
        ..Default::default()
    };

    for (idx, batch) in records.chunks(batch_size).enumerate() {
        summary.batches += 1;
        let rows: Vec<Value> = batch.iter().map(upload_row).collect();
        match client.insert(table, &rows).await {
            Ok(_) => {
                summary.uploaded += rows.len();
                info!(batch = idx + 1, rows = rows.len(), total = summary.uploaded, "Batch uploaded");
            }
            Err(e) => {
                summary.failed_batches += 1;
                warn!(batch = idx + 1, error = %e, "Batch upload failed");
            }
        }
    }

    match client.count(table).await {
        Ok(count) => {
            info!(table, rows = count, "Rows in table after upload");
            summary.final_count = Some(count);
        }
        Err(e) => warn!(table, error = %e, "Failed to count rows after upload"),
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    /// Tables held in memory; inserts into `failing_inserts` tables error
    #[derive(Default)]
    struct MemoryTables {
        tables: Mutex<HashMap<String, Vec<Value>>>,
        failing_inserts: HashSet<String>,
        failing_count: bool,
        insert_calls: Mutex<usize>,
    }

    impl MemoryTables {
        fn with_tables(names: &[&str]) -> Self {
            let tables = names.iter().map(|n| (n.to_string(), Vec::new())).collect();
            Self {
                tables: Mutex::new(tables),
                ..Default::default()
            }
        }

        fn missing(table: &str) -> AppError {
            AppError::BackendError(format!(
                "{} (404 Not Found): relation \"public.{}\" does not exist in the schema cache",
                table, table
            ))
        }
    }

    #[async_trait]
    impl TableClient for MemoryTables {
        async fn select(&self, table: &str, _columns: &str, limit: Option<usize>) -> Result<Vec<Value>> {
            let tables = self.tables.lock().unwrap();
            let rows = tables.get(table).ok_or_else(|| Self::missing(table))?;
            Ok(rows.iter().take(limit.unwrap_or(usize::MAX)).cloned().collect())
        }

        async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>> {
            let tables = self.tables.lock().unwrap();
            let rows = tables.get(table).ok_or_else(|| Self::missing(table))?;
            Ok(rows
                .iter()
                .filter(|row| row[column].as_str() == Some(value))
                .cloned()
                .collect())
        }

        async fn insert(&self, table: &str, rows: &[Value]) -> Result<Vec<Value>> {
            let call = {
                let mut calls = self.insert_calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.failing_inserts.contains(table) || self.failing_inserts.contains(&format!("call{}", call)) {
                return Err(AppError::BackendError(format!("{} (400 Bad Request): rejected", table)));
            }
            let mut tables = self.tables.lock().unwrap();
            let stored = tables.get_mut(table).ok_or_else(|| Self::missing(table))?;
            stored.extend(rows.iter().cloned());
            Ok(rows.to_vec())
        }

        async fn delete_eq(&self, table: &str, column: &str, value: &str) -> Result<usize> {
            let mut tables = self.tables.lock().unwrap();
            let stored = tables.get_mut(table).ok_or_else(|| Self::missing(table))?;
            let before = stored.len();
            stored.retain(|row| row[column].as_str() != Some(value));
            Ok(before - stored.len())
        }

        async fn count(&self, table: &str) -> Result<usize> {
            if self.failing_count {
                return Err(AppError::BackendError(format!("{} (500 Internal Server Error): timeout", table)));
            }
            let tables = self.tables.lock().unwrap();
            tables.get(table).map(Vec::len).ok_or_else(|| Self::missing(table))
        }
    }

    fn sample_records(n: usize) -> Vec<ListingRecord> {
        (1..=n)
            .map(|i| {
                ListingRecord::new(json!({
                    "id": i,
                    "informacoes_basicas": {"setor": "Vendas", "titulo": format!("Vaga {}", i), "empresa_principal": "Acme"},
                    "localizacao": {"cidade_extraida": "Recife", "estado_extraido": "PE"}
                }))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_check_tables_reports_each_table() {
        let client = MemoryTables::with_tables(&["vagas", "companies"]);
        client
            .insert("vagas", &[json!({"id": 1, "titulo": "Vendedor"})])
            .await
            .unwrap();

        let checks = check_tables(&client, &["vagas", "jobs", "companies"]).await;
        assert_eq!(checks.len(), 3);
        assert_eq!(
            checks[0].status,
            TableStatus::Exists {
                columns: vec!["id".to_string(), "titulo".to_string()]
            }
        );
        match &checks[1].status {
            TableStatus::Missing { reason } => {
                assert_eq!(reason.chars().count(), 50);
                assert!(reason.starts_with("Backend error: jobs (404"));
            }
            other => panic!("expected missing table, got {:?}", other),
        }
        assert_eq!(checks[2].status, TableStatus::Exists { columns: vec![] });
    }

    #[tokio::test]
    async fn test_probe_write_round_trip_leaves_table_clean() {
        let client = MemoryTables::with_tables(&["vagas"]);
        let report = probe_write(&client, "vagas", "external_id").await;

        assert!(report.test_id.starts_with("test_"));
        assert_eq!(report.test_id.len(), 13);
        assert!(report.succeeded());
        assert_eq!(
            report.steps.iter().map(|s| s.action).collect::<Vec<_>>(),
            vec![ProbeAction::Insert, ProbeAction::Read, ProbeAction::Delete]
        );
        assert_eq!(client.count("vagas").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_probe_write_stops_after_failed_insert() {
        let client = MemoryTables::with_tables(&[]);
        let report = probe_write(&client, "vagas", "external_id").await;
        assert_eq!(report.steps.len(), 1);
        assert!(!report.steps[0].ok);
        assert!(!report.succeeded());
    }

    #[tokio::test]
    async fn test_upload_counts_failed_batches_and_continues() {
        let mut client = MemoryTables::with_tables(&["vagas"]);
        client.failing_inserts.insert("call2".to_string());
        let records = sample_records(5);

        let summary = upload_records(&client, "vagas", &records, 2).await.unwrap();
        assert_eq!(
            summary,
            UploadSummary {
                total: 5,
                uploaded: 3,
                batches: 3,
                failed_batches: 1,
                final_count: Some(3),
            }
        );

        let stored = client.select("vagas", "*", None).await.unwrap();
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[0]["title"], "Vaga 1");
        assert_eq!(stored[0]["company_name"], "Acme");
        assert_eq!(stored[0]["location_state"], "PE");
        assert_eq!(stored[2]["title"], "Vaga 5");

        assert!(upload_records(&client, "vagas", &records, 0).await.is_err());
    }

    #[tokio::test]
    async fn test_upload_final_count_includes_existing_rows() {
        let client = MemoryTables::with_tables(&["vagas"]);
        client.insert("vagas", &[json!({"title": "Antiga"})]).await.unwrap();

        let summary = upload_records(&client, "vagas", &sample_records(2), 50).await.unwrap();
        assert_eq!(summary.batches, 1);
        assert_eq!(summary.uploaded, 2);
        assert_eq!(summary.final_count, Some(3));
    }

    #[tokio::test]
    async fn test_upload_survives_failed_count() {
        let client = MemoryTables {
            failing_count: true,
            ..MemoryTables::with_tables(&["vagas"])
        };

        let summary = upload_records(&client, "vagas", &sample_records(3), 2).await.unwrap();
        assert_eq!(summary.uploaded, 3);
        assert_eq!(summary.failed_batches, 0);
        assert_eq!(summary.final_count, None);
    }
}
