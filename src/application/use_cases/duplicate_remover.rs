// ============================================================
// DUPLICATE REMOVER
// ============================================================
// Drop near-duplicate listings posted by the same company in the
// same sector and city

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use strsim::normalized_levenshtein;
use tracing::{debug, info};

use crate::domain::error::AppError;
use crate::domain::listing::ListingRecord;

pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.85;

/// A removed record and the kept record it duplicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicatePair {
    pub removed_id: String,
    pub kept_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupeSummary {
    pub original: usize,
    pub unique: usize,
    pub removed: usize,
    pub reduction_pct: f64,
    pub pairs: Vec<DuplicatePair>,
}

/// Normalized comparison fields of one record
struct Comparable {
    company: String,
    sector: String,
    city: String,
    title: String,
    description: String,
}

impl Comparable {
    fn from_record(record: &ListingRecord) -> Self {
        Self {
            company: normalize_text(record.company()),
            sector: normalize_text(record.sector().unwrap_or("")),
            city: normalize_text(record.city()),
            title: normalize_text(record.title()),
            description: normalize_text(record.description()),
        }
    }

    fn signature(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.company,
            self.sector,
            self.city,
            self.title,
            hash8(&self.description)
        )
    }
}

/// Lowercase, trim and collapse double spaces
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase().trim().replace("  ", " ")
}

/// First 8 hex chars of the SHA-256 digest; empty input gives ""
fn hash8(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(digest)[..8].to_string()
}

pub struct DuplicateRemover {
    threshold: f64,
}

impl Default for DuplicateRemover {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl DuplicateRemover {
    pub fn new(threshold: f64) -> Result<Self, AppError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::ValidationError(format!(
                "Similarity threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
        Ok(Self { threshold })
    }

    /// Same company, sector and city, plus similar description or title
    fn is_duplicate(&self, a: &Comparable, b: &Comparable) -> bool {
        if a.company != b.company || a.sector != b.sector || a.city != b.city {
            return false;
        }

        let similar = |x: &str, y: &str| {
            !x.is_empty() && !y.is_empty() && normalized_levenshtein(x, y) > self.threshold
        };

        similar(&a.description, &b.description) || similar(&a.title, &b.title)
    }

    /// Keep the first record of each duplicate cluster and renumber ids from 1.
    /// Output is ordered by signature group, groups in first-appearance order.
    pub fn dedupe(&self, records: Vec<ListingRecord>) -> (Vec<ListingRecord>, DedupeSummary) {
        let original = records.len();
        info!(records = original, "Removing duplicates");

        let mut group_index: HashMap<String, usize> = HashMap::new();
        let mut groups: Vec<Vec<(ListingRecord, Comparable)>> = Vec::new();

        for record in records {
            let comparable = Comparable::from_record(&record);
            let signature = comparable.signature();
            let idx = *group_index.entry(signature).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[idx].push((record, comparable));
        }

        let mut unique: Vec<ListingRecord> = Vec::with_capacity(original);
        let mut pairs = Vec::new();

        for group in groups {
            let mut kept: Vec<(ListingRecord, Comparable)> = Vec::new();
            for (record, comparable) in group {
                let existing = kept
                    .iter()
                    .find(|(_, other)| self.is_duplicate(&comparable, other));

                match existing {
                    Some((kept_record, _)) => {
                        debug!(
                            removed = %record.id_label(),
                            kept = %kept_record.id_label(),
                            "Duplicate found"
                        );
                        pairs.push(DuplicatePair {
                            removed_id: record.id_label(),
                            kept_id: kept_record.id_label(),
                        });
                    }
                    None => kept.push((record, comparable)),
                }
            }
            unique.extend(kept.into_iter().map(|(record, _)| record));
        }

        for (idx, record) in unique.iter_mut().enumerate() {
            record.set_id(idx as u64 + 1);
        }

        let removed = original - unique.len();
        let reduction_pct = if original == 0 {
            0.0
        } else {
            removed as f64 / original as f64 * 100.0
        };

        info!(unique = unique.len(), removed, "Duplicate removal finished");

        let summary = DedupeSummary {
            original,
            unique: unique.len(),
            removed,
            reduction_pct,
            pairs,
        };
        (unique, summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn job(id: u64, company: &str, city: &str, title: &str, desc: &str) -> ListingRecord {
        ListingRecord::new(json!({
            "id": id,
            "informacoes_basicas": {"setor": "Vendas", "empresa_principal": company, "fonte": title},
            "localizacao": {"cidade_extraida": city},
            "descricao_completa": {"texto_completo": desc}
        }))
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Vendedor  Externo "), "vendedor externo");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn test_hash8() {
        assert_eq!(hash8(""), "");
        // sha256("abc")
        assert_eq!(hash8("abc"), "ba7816bf");
    }

    #[test]
    fn test_exact_duplicates_collapse() {
        let records = vec![
            job(10, "Acme", "Recife", "Vendedor", "Vender produtos"),
            job(11, "Beta", "Recife", "Vendedor", "Vender produtos"),
            job(12, "ACME", "recife", "vendedor", "vender  produtos"),
        ];
        let (unique, summary) = DuplicateRemover::default().dedupe(records);

        assert_eq!(summary.original, 3);
        assert_eq!(summary.unique, 2);
        assert_eq!(summary.removed, 1);
        assert!((summary.reduction_pct - 100.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.pairs,
            vec![DuplicatePair {
                removed_id: "12".to_string(),
                kept_id: "10".to_string()
            }]
        );

        let ids: Vec<_> = unique.iter().map(|r| r.id_label()).collect();
        assert_eq!(ids, vec!["1", "2"]);
        assert_eq!(unique[0].company(), "Acme");
        assert_eq!(unique[1].company(), "Beta");
    }

    #[test]
    fn test_different_city_never_duplicate() {
        let records = vec![
            job(1, "Acme", "Recife", "Vendedor", "Vender"),
            job(2, "Acme", "Olinda", "Vendedor", "Vender"),
        ];
        let (unique, summary) = DuplicateRemover::default().dedupe(records);
        assert_eq!(unique.len(), 2);
        assert!(summary.pairs.is_empty());
    }

    #[test]
    fn test_similarity_rule() {
        let remover = DuplicateRemover::default();
        let a = Comparable::from_record(&job(1, "Acme", "Recife", "Vendedor Externo", ""));
        let b = Comparable::from_record(&job(2, "Acme", "Recife", "Vendedor Externa", ""));
        let c = Comparable::from_record(&job(3, "Acme", "Recife", "Gerente", ""));
        assert!(remover.is_duplicate(&a, &b));
        assert!(!remover.is_duplicate(&a, &c));

        // Empty titles and descriptions are never similar
        let empty = Comparable::from_record(&job(4, "Acme", "Recife", "", ""));
        assert!(!remover.is_duplicate(&empty, &empty));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(DuplicateRemover::new(1.5).is_err());
        assert!(DuplicateRemover::new(0.9).is_ok());
    }
}
