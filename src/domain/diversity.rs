// ============================================================
// DESCRIPTION DIVERSITY TYPES
// ============================================================
// Report structures for per-sector description diversity

use serde::{Deserialize, Serialize};

/// Thresholds driving sector classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityThresholds {
    /// Sectors below this rate are flagged as problematic (default: 50)
    pub problematic_rate: f64,

    /// Minimum jobs before a sector can be flagged (default: 3)
    pub problematic_min_jobs: usize,

    /// Rate at or above which a sector is healthy (default: 80)
    pub healthy_rate: f64,

    /// Rate at or above which a sector is only a warning (default: 60)
    pub warning_rate: f64,

    /// Sample jobs listed per repeated description (default: 5)
    pub sample_jobs: usize,

    /// Characters of a repeated description shown in reports (default: 100)
    pub preview_chars: usize,
}

impl Default for DiversityThresholds {
    fn default() -> Self {
        Self {
            problematic_rate: 50.0,
            problematic_min_jobs: 3,
            healthy_rate: 80.0,
            warning_rate: 60.0,
            sample_jobs: 5,
            preview_chars: 100,
        }
    }
}

impl DiversityThresholds {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("problematic_rate", self.problematic_rate),
            ("healthy_rate", self.healthy_rate),
            ("warning_rate", self.warning_rate),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(format!("{} must be between 0 and 100", name));
            }
        }
        if self.warning_rate > self.healthy_rate {
            return Err("warning_rate must be <= healthy_rate".to_string());
        }
        Ok(())
    }
}

/// Health band of a sector's diversity rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiversityStatus {
    Healthy,
    Warning,
    Critical,
}

impl DiversityStatus {
    pub fn classify(rate: f64, thresholds: &DiversityThresholds) -> Self {
        if rate >= thresholds.healthy_rate {
            DiversityStatus::Healthy
        } else if rate >= thresholds.warning_rate {
            DiversityStatus::Warning
        } else {
            DiversityStatus::Critical
        }
    }

    pub fn marker(&self) -> &'static str {
        match self {
            DiversityStatus::Healthy => "[ok]",
            DiversityStatus::Warning => "[warn]",
            DiversityStatus::Critical => "[bad]",
        }
    }
}

/// A job sharing a repeated description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRef {
    pub id: String,
    pub title: String,
    pub company: String,
}

/// A description text used by more than one job in a sector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepeatedDescription {
    pub preview: String,
    pub count: usize,
    pub samples: Vec<JobRef>,
    /// Jobs with this description not listed in `samples`
    pub omitted: usize,
}

/// Diversity figures for a single sector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectorDiversity {
    pub sector: String,
    pub total_jobs: usize,
    pub unique_descriptions: usize,
    /// unique / total * 100, always within [0, 100]
    pub diversity_rate: f64,
    pub status: DiversityStatus,
    pub repeated: Vec<RepeatedDescription>,
    /// Descriptions still carrying the "candidatura fácil" boilerplate
    pub boilerplate_count: usize,
}

/// Whole-dataset diversity report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiversityReport {
    pub total_jobs: usize,
    pub total_sectors: usize,
    pub sectors: Vec<SectorDiversity>,
    /// Sector names below the problematic threshold, lowest rate first
    pub problematic: Vec<String>,
    /// Sector names at exactly 100%
    pub fully_diverse: Vec<String>,
    pub total_descriptions: usize,
    pub global_unique: usize,
    pub overall_rate: f64,
    pub generated_at: String,
}

impl DiversityReport {
    pub fn sector(&self, name: &str) -> Option<&SectorDiversity> {
        self.sectors.iter().find(|s| s.sector == name)
    }
}

/// unique / total as a percentage, 0 for an empty group
pub fn diversity_rate(unique: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (unique.min(total) as f64 / total as f64) * 100.0
}
