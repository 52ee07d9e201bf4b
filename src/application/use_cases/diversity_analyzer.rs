// ============================================================
// DESCRIPTION DIVERSITY ANALYZER
// ============================================================
// Group listings by sector and measure how many distinct
// description texts each sector carries

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write as _;

use chrono::Utc;

use crate::domain::diversity::{
    diversity_rate, DiversityReport, DiversityStatus, DiversityThresholds, JobRef,
    RepeatedDescription, SectorDiversity,
};
use crate::domain::error::AppError;
use crate::domain::listing::ListingRecord;

static BOILERPLATE_MARKERS: [&str; 2] = ["candidatura fácil", "candidatura facil"];

const RULE_WIDTH: usize = 80;

/// Per-sector description diversity analysis
pub struct DiversityAnalyzer {
    thresholds: DiversityThresholds,
}

impl Default for DiversityAnalyzer {
    fn default() -> Self {
        Self::new(DiversityThresholds::default())
    }
}

impl DiversityAnalyzer {
    pub fn new(thresholds: DiversityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn with_validated(thresholds: DiversityThresholds) -> Result<Self, AppError> {
        thresholds
            .validate()
            .map_err(|e| AppError::ValidationError(format!("Invalid thresholds: {}", e)))?;
        Ok(Self::new(thresholds))
    }

    /// Build the full report; records without a sector group under "Não informado"
    pub fn analyze(&self, records: &[ListingRecord]) -> DiversityReport {
        let mut by_sector: BTreeMap<&str, Vec<&ListingRecord>> = BTreeMap::new();
        for record in records {
            by_sector
                .entry(record.sector_or_default())
                .or_default()
                .push(record);
        }

        let sectors: Vec<SectorDiversity> = by_sector
            .iter()
            .map(|(sector, jobs)| self.analyze_sector(sector, jobs))
            .collect();

        let mut problematic: Vec<&SectorDiversity> = sectors
            .iter()
            .filter(|s| {
                s.diversity_rate < self.thresholds.problematic_rate
                    && s.total_jobs >= self.thresholds.problematic_min_jobs
            })
            .collect();
        problematic.sort_by(|a, b| a.diversity_rate.total_cmp(&b.diversity_rate));

        let fully_diverse = sectors
            .iter()
            .filter(|s| s.total_jobs > 0 && s.unique_descriptions == s.total_jobs)
            .map(|s| s.sector.clone())
            .collect();

        let global_unique = records
            .iter()
            .map(ListingRecord::description)
            .collect::<HashSet<_>>()
            .len();

        DiversityReport {
            total_jobs: records.len(),
            total_sectors: sectors.len(),
            problematic: problematic.iter().map(|s| s.sector.clone()).collect(),
            fully_diverse,
            total_descriptions: records.len(),
            global_unique,
            overall_rate: diversity_rate(global_unique, records.len()),
            generated_at: Utc::now().to_rfc3339(),
            sectors,
        }
    }

    fn analyze_sector(&self, sector: &str, jobs: &[&ListingRecord]) -> SectorDiversity {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for job in jobs {
            *counts.entry(job.description()).or_insert(0) += 1;
        }

        let mut repeated: Vec<(&str, usize)> = counts
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(&text, &count)| (text, count))
            .collect();
        repeated.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let repeated = repeated
            .into_iter()
            .map(|(text, count)| {
                let samples: Vec<JobRef> = jobs
                    .iter()
                    .filter(|job| job.description() == text)
                    .take(self.thresholds.sample_jobs)
                    .map(|job| JobRef {
                        id: job.id_label(),
                        title: job.title().to_string(),
                        company: job.company().to_string(),
                    })
                    .collect();

                RepeatedDescription {
                    preview: preview(text, self.thresholds.preview_chars),
                    count,
                    omitted: count - samples.len(),
                    samples,
                }
            })
            .collect();

        let boilerplate_count = jobs
            .iter()
            .filter(|job| {
                let lower = job.description().to_lowercase();
                BOILERPLATE_MARKERS.iter().any(|m| lower.contains(m))
            })
            .count();

        let rate = diversity_rate(counts.len(), jobs.len());

        SectorDiversity {
            sector: sector.to_string(),
            total_jobs: jobs.len(),
            unique_descriptions: counts.len(),
            diversity_rate: rate,
            status: DiversityStatus::classify(rate, &self.thresholds),
            repeated,
            boilerplate_count,
        }
    }
}

/// First `max_chars` characters, with "..." when cut
fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Console rendering of a diversity report
pub fn render_text(report: &DiversityReport) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "=== DESCRIPTION DIVERSITY BY SECTOR ===");
    let _ = writeln!(out, "Jobs analysed: {}", report.total_jobs);
    let _ = writeln!(out, "Sectors: {}", report.total_sectors);
    let _ = writeln!(out, "{}", rule);

    for sector in &report.sectors {
        let _ = writeln!(out, "\n{} SECTOR: {}", sector.status.marker(), sector.sector);
        let _ = writeln!(out, "  Jobs: {}", sector.total_jobs);
        let _ = writeln!(out, "  Unique descriptions: {}", sector.unique_descriptions);
        let _ = writeln!(out, "  Diversity rate: {:.1}%", sector.diversity_rate);
        if sector.boilerplate_count > 0 {
            let _ = writeln!(
                out,
                "  Descriptions with \"candidatura fácil\" boilerplate: {}",
                sector.boilerplate_count
            );
        }

        if !sector.repeated.is_empty() {
            let _ = writeln!(out, "  Repeated descriptions:");
            for repeated in &sector.repeated {
                let _ = writeln!(out, "    - {}x: {}", repeated.count, repeated.preview);
                for job in &repeated.samples {
                    let _ = writeln!(out, "        ID {}: {} - {}", job.id, job.title, job.company);
                }
                if repeated.omitted > 0 {
                    let _ = writeln!(out, "        ... and {} more", repeated.omitted);
                }
            }
        }
    }

    if !report.problematic.is_empty() {
        let _ = writeln!(out, "\n{}", rule);
        let _ = writeln!(out, "LOW DIVERSITY SECTORS:");
        let _ = writeln!(out, "{}", rule);
        for name in &report.problematic {
            if let Some(sector) = report.sector(name) {
                let _ = writeln!(out, "\n{}:", sector.sector);
                let _ = writeln!(
                    out,
                    "  - {} jobs, {} unique descriptions",
                    sector.total_jobs, sector.unique_descriptions
                );
                let _ = writeln!(out, "  - Diversity rate: {:.1}%", sector.diversity_rate);
                let _ = writeln!(out, "  - {} repeated descriptions", sector.repeated.len());
            }
        }
    }

    let _ = writeln!(out, "\n{}", rule);
    let _ = writeln!(out, "OVERALL:");
    let _ = writeln!(out, "{}", rule);
    let _ = writeln!(out, "Descriptions: {}", report.total_descriptions);
    let _ = writeln!(out, "Globally unique descriptions: {}", report.global_unique);
    let _ = writeln!(out, "Overall diversity rate: {:.1}%", report.overall_rate);
    let _ = writeln!(
        out,
        "Fully diverse sectors: {} of {}",
        report.fully_diverse.len(),
        report.total_sectors
    );
    let _ = writeln!(
        out,
        "Problematic sectors: {} of {}",
        report.problematic.len(),
        report.total_sectors
    );

    out
}
