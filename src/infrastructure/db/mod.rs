pub mod job_store;

pub use job_store::JobStore;
