pub mod backend_probe;
pub mod csv_cleaner;
pub mod diversity_analyzer;
pub mod duplicate_remover;
pub mod job_scraper;
pub mod listing_parser;
pub mod quality_audit;
pub mod skills_tagger;
