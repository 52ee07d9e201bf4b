pub mod diversity;
pub mod error;
pub mod job;
pub mod listing;

// CSV cleaning module
pub mod csv;
