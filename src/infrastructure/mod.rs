pub mod backend;
pub mod config;
pub mod csv;
pub mod db;
pub mod jsonl;
pub mod storage;
