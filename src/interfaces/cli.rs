use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{info, warn};

use crate::application::use_cases::backend_probe::{
    self, TableStatus, DEFAULT_BATCH_SIZE, KNOWN_TABLES,
};
use crate::application::use_cases::csv_cleaner::CsvCleaner;
use crate::application::use_cases::diversity_analyzer::{self, DiversityAnalyzer};
use crate::application::use_cases::duplicate_remover::{DuplicateRemover, DEFAULT_SIMILARITY_THRESHOLD};
use crate::application::use_cases::job_scraper::{self, JobScraper, LANDING_URL, SECTORS};
use crate::application::use_cases::quality_audit;
use crate::application::use_cases::skills_tagger::{self, SkillTagger};
use crate::domain::csv::CleaningConfig;
use crate::domain::diversity::DiversityThresholds;
use crate::domain::error::{AppError, Result};
use crate::domain::listing::ListingRecord;
use crate::infrastructure::backend::RestTableClient;
use crate::infrastructure::config::Settings;
use crate::infrastructure::db::JobStore;
use crate::infrastructure::{jsonl, storage};
use crate::interfaces::http;

const STRUCTURED_JSONL: &str = "vagas_todos_setores_estruturadas_completo.jsonl";
const STRUCTURED_JSON: &str = "vagas_todos_setores_estruturadas_completo.json";
const DEDUPED_JSONL: &str = "vagas_todos_setores_sem_duplicatas.jsonl";

#[derive(Parser)]
#[command(name = "vagas", about = "Job listings data toolkit")]
struct Cmd {
    #[command(subcommand)]
    command: SubCommandType,
}

#[derive(Subcommand)]
enum SubCommandType {
    /// Per-sector description diversity report
    Diversity {
        #[arg(default_value = STRUCTURED_JSONL)]
        input: PathBuf,
        /// Also write the report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
        #[arg(long, default_value_t = 50.0)]
        problematic_rate: f64,
        #[arg(long, default_value_t = 3)]
        min_jobs: usize,
    },
    /// Remove near-duplicate listings
    Dedupe {
        #[arg(default_value = STRUCTURED_JSONL)]
        input: PathBuf,
        #[arg(default_value = DEDUPED_JSONL)]
        output: PathBuf,
        #[arg(long, default_value_t = DEFAULT_SIMILARITY_THRESHOLD)]
        threshold: f64,
    },
    /// Data-quality audit of listing fields
    Audit {
        #[arg(default_value = DEDUPED_JSONL)]
        input: PathBuf,
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Convert a JSON array file to JSON Lines
    ToJsonl {
        #[arg(default_value = STRUCTURED_JSON)]
        input: PathBuf,
        #[arg(default_value = STRUCTURED_JSONL)]
        output: PathBuf,
    },
    /// Strip interface text and duplicates from a scraped CSV
    CleanCsv {
        input: PathBuf,
        /// Defaults to overwriting the input
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long)]
        no_backup: bool,
        /// Only drop rows matching the interface-text denylist
        #[arg(long)]
        denylist_only: bool,
    },
    /// Tag listings with sector skills and write statistics
    TagSkills {
        input: PathBuf,
        #[arg(long, default_value = "skills_taxonomy.csv")]
        skills: PathBuf,
        #[arg(long, default_value = "sector_map.csv")]
        sectors: PathBuf,
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
        /// Only write the taxonomy templates for the input's sectors
        #[arg(long)]
        templates: bool,
    },
    /// Scrape job pages into the local store
    Scrape {
        /// Sector names; all sectors when omitted
        #[arg(long = "sector")]
        sectors: Vec<String>,
        #[arg(long, default_value_t = 1)]
        pages: usize,
        #[arg(long)]
        max_jobs: Option<usize>,
        #[arg(long)]
        db: Option<PathBuf>,
        /// Export the store to CSV when done
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Capture role titles from the board's landing page
    Titles {
        #[arg(long, default_value = LANDING_URL)]
        url: String,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Export the local job store to CSV
    StoreExport {
        output: PathBuf,
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Check which backend tables are reachable
    CheckTables {
        tables: Vec<String>,
    },
    /// Insert, read back and delete a test row
    ProbeBackend {
        #[arg(long, default_value = "vagas")]
        table: String,
        #[arg(long, default_value = "external_id")]
        key_column: String,
    },
    /// Upload listing records to a backend table
    Upload {
        input: PathBuf,
        #[arg(long, default_value = "vagas")]
        table: String,
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,
    },
    /// Serve the title file over HTTP
    Serve {
        #[arg(long)]
        titles: Option<PathBuf>,
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
}

pub async fn run() -> Result<()> {
    let args = Cmd::parse();
    let mut settings = Settings::load()?;

    match args.command {
        SubCommandType::Diversity {
            input,
            report,
            problematic_rate,
            min_jobs,
        } => {
            let thresholds = DiversityThresholds {
                problematic_rate,
                problematic_min_jobs: min_jobs,
                ..Default::default()
            };
            let analyzer = DiversityAnalyzer::with_validated(thresholds)?;
            let records = load_records(&input)?;
            let result = analyzer.analyze(&records);
            println!("{}", diversity_analyzer::render_text(&result));
            if let Some(path) = report {
                write_json(&path, &result)?;
            }
        }
        SubCommandType::Dedupe {
            input,
            output,
            threshold,
        } => {
            let remover = DuplicateRemover::new(threshold)?;
            let records = load_records(&input)?;
            let (unique, summary) = remover.dedupe(records);
            let values: Vec<Value> = unique.into_iter().map(ListingRecord::into_value).collect();
            save_records(&output, &values)?;

            println!("Original records: {}", summary.original);
            println!("Unique records:   {}", summary.unique);
            println!("Removed:          {} ({:.1}%)", summary.removed, summary.reduction_pct);
            for pair in summary.pairs.iter().take(10) {
                println!("  - {} duplicates {}", pair.removed_id, pair.kept_id);
            }
        }
        SubCommandType::Audit {
            input,
            limit,
            report,
        } => {
            let records = load_records(&input)?;
            let result = quality_audit::audit(&records, limit);
            println!("{}", quality_audit::render_text(&result));
            if let Some(path) = report {
                write_json(&path, &result)?;
            }
        }
        SubCommandType::ToJsonl { input, output } => {
            let count = jsonl::convert_json_to_jsonl(&input, &output)?;
            println!("Converted {} records to {}", count, output.display());
        }
        SubCommandType::CleanCsv {
            input,
            output,
            no_backup,
            denylist_only,
        } => {
            let cleaner = if denylist_only {
                CsvCleaner::new(CleaningConfig::denylist_only())?
            } else {
                CsvCleaner::default_config()?
            };
            let report = cleaner.clean_file(&input, output.as_deref(), !no_backup)?;
            println!("{}", report.summary());
            println!("Removed {} rows in total", report.removed());
        }
        SubCommandType::TagSkills {
            input,
            skills,
            sectors,
            out_dir,
            templates,
        } => {
            let records = load_values(&input)?;
            let written = if templates {
                skills_tagger::write_templates(&records, &out_dir)?
            } else {
                let tagger = SkillTagger::from_files(Some(&skills), Some(&sectors))?;
                let outcome = tagger.tag_all(records);
                println!(
                    "Tagged {} listings ({} skipped) across {} sectors",
                    outcome.tagged.len(),
                    outcome.skipped,
                    outcome.stats.sector_totals.len()
                );
                skills_tagger::write_outputs(&outcome, &out_dir)?
            };
            for path in written {
                println!("Wrote {}", path.display());
            }
        }
        SubCommandType::Scrape {
            sectors,
            pages,
            max_jobs,
            db,
            csv,
        } => {
            let selected = select_sectors(&sectors)?;
            let scraper = JobScraper::new(&settings, pages)?;
            let db_path = db.unwrap_or_else(|| PathBuf::from(&settings.job_store_path));
            let store = JobStore::open(&db_path).await?;

            let mut saved = 0;
            for sector in selected {
                for job in scraper.scrape_sector(sector, max_jobs).await {
                    match store.upsert(&job).await {
                        Ok(()) => saved += 1,
                        Err(e) => warn!(link = %job.link, error = %e, "Failed to save job"),
                    }
                }
            }
            println!("Saved {} jobs ({} in store)", saved, store.count().await?);

            if let Some(path) = csv {
                let rows = store.export_csv(&path).await?;
                println!("Exported {} jobs to {}", rows, path.display());
            }
        }
        SubCommandType::Titles { url, output } => {
            let output = output.unwrap_or_else(|| PathBuf::from(&settings.titles_file));
            let scraper = JobScraper::new(&settings, 1)?;
            let catalog = scraper.fetch_titles(&url).await?;
            job_scraper::save_catalog(&catalog, &output)?;
            for (idx, title) in catalog.titles.iter().enumerate() {
                println!("{}. {}", idx + 1, title);
            }
            println!("Saved {} titles to {}", catalog.total_titles, output.display());
        }
        SubCommandType::StoreExport { output, db } => {
            let db_path = db.unwrap_or_else(|| PathBuf::from(&settings.job_store_path));
            let store = JobStore::open(&db_path).await?;
            let rows = store.export_csv(&output).await?;
            println!("Exported {} jobs to {}", rows, output.display());
        }
        SubCommandType::CheckTables { tables } => {
            let client = backend_client(&settings)?;
            let names: Vec<&str> = if tables.is_empty() {
                KNOWN_TABLES.to_vec()
            } else {
                tables.iter().map(String::as_str).collect()
            };
            for check in backend_probe::check_tables(&client, &names).await {
                match check.status {
                    TableStatus::Exists { columns } if columns.is_empty() => {
                        println!("[ok]      {} (empty)", check.table)
                    }
                    TableStatus::Exists { columns } => {
                        println!("[ok]      {} ({})", check.table, columns.join(", "))
                    }
                    TableStatus::Missing { reason } => {
                        println!("[missing] {}: {}", check.table, reason)
                    }
                }
            }
        }
        SubCommandType::ProbeBackend { table, key_column } => {
            let client = backend_client(&settings)?;
            let report = backend_probe::probe_write(&client, &table, &key_column).await;
            for step in &report.steps {
                let mark = if step.ok { "ok" } else { "failed" };
                println!("{:?}: {} ({})", step.action, mark, step.detail);
            }
            if !report.succeeded() {
                return Err(AppError::BackendError(format!(
                    "Write probe on {} failed",
                    report.table
                )));
            }
        }
        SubCommandType::Upload {
            input,
            table,
            batch_size,
        } => {
            let client = backend_client(&settings)?;
            let records = load_records(&input)?;
            let summary =
                backend_probe::upload_records(&client, &table, &records, batch_size).await?;
            println!(
                "Uploaded {}/{} records to {} ({} of {} batches failed)",
                summary.uploaded, summary.total, table, summary.failed_batches, summary.batches
            );
            match summary.final_count {
                Some(count) => println!("Rows in {} after upload: {}", table, count),
                None => println!("Could not count rows in {} after upload", table),
            }
        }
        SubCommandType::Serve { titles, host, port } => {
            if let Some(host) = host {
                settings.listen_host = host;
            }
            if let Some(port) = port {
                settings.listen_port = port;
            }
            let titles = titles.unwrap_or_else(|| PathBuf::from(&settings.titles_file));
            http::serve(&settings, titles).await?;
        }
    }

    Ok(())
}

fn backend_client(settings: &Settings) -> Result<RestTableClient> {
    let config = settings.backend()?;
    info!(url = %config.url, "Connecting to backend");
    RestTableClient::new(&config, settings.http_timeout_secs)
}

fn select_sectors(names: &[String]) -> Result<Vec<&'static job_scraper::SectorSource>> {
    if names.is_empty() {
        return Ok(SECTORS.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            job_scraper::find_sector(name).ok_or_else(|| {
                AppError::ValidationError(format!("Unknown sector: {}", name))
            })
        })
        .collect()
}

/// JSON array for `.json` files, JSON Lines otherwise
fn load_values(path: &Path) -> Result<Vec<Value>> {
    if is_json_array_file(path) {
        return jsonl::read_json_array(path);
    }
    let load = jsonl::read_jsonl(path)?;
    if load.skipped > 0 {
        warn!(path = %path.display(), skipped = load.skipped, "Skipped malformed lines");
    }
    Ok(load.records)
}

fn load_records(path: &Path) -> Result<Vec<ListingRecord>> {
    let records: Vec<ListingRecord> = load_values(path)?.into_iter().map(ListingRecord::new).collect();
    info!(path = %path.display(), records = records.len(), "Records loaded");
    Ok(records)
}

fn save_records(path: &Path, values: &[Value]) -> Result<()> {
    if is_json_array_file(path) {
        write_json(path, values)
    } else {
        jsonl::write_jsonl(path, values)
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    storage::write_text(path, &serde_json::to_string_pretty(value)?)?;
    info!(path = %path.display(), "JSON written");
    Ok(())
}

fn is_json_array_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}
