mod application;
mod domain;
mod infrastructure;
mod interfaces;

pub use domain::error::{AppError, Result};

/// Parse the command line and run the selected subcommand
pub async fn run() -> Result<()> {
    interfaces::cli::run().await
}
