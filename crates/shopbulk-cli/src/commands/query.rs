//! `shopbulk query` command implementation
//!
//! Runs an arbitrary bulk query and prints each materialized record, with
//! nested connections stitched in, as one JSON line.

use crate::commands::{connect, load_config, output};
use crate::error::{CliError, Result};
use crate::progress::create_spinner;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::info;

/// Run the query in `file`
pub async fn run(file: &Path, output: Option<&Path>, progress: bool) -> Result<()> {
    let query = read_query(file)?;
    let config = load_config()?;
    let service = connect(&config, progress)?;

    let spinner = create_spinner("Running bulk query", progress);
    let result = service.bulk_query::<Map<String, Value>>(&query).await;
    spinner.finish_and_clear();
    let records = result?;

    info!(records = records.len(), "Bulk query complete");
    output::write_records(&records, output)
}

/// Read a query document, rejecting blank files
pub fn read_query(file: &Path) -> Result<String> {
    if !file.exists() {
        return Err(CliError::FileNotFound(file.display().to_string()));
    }

    let query = std::fs::read_to_string(file)?;
    if query.trim().is_empty() {
        return Err(CliError::EmptyQuery(file.display().to_string()));
    }

    Ok(query)
}
