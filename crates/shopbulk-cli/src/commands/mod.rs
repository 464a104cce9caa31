//! CLI command implementations
//!
//! Each subcommand group has its own module.

pub mod list;
pub mod operation;
pub mod output;
pub mod query;

use crate::error::{CliError, Result};
use shopbulk::{BulkQueryService, GraphqlTransport, HttpDownloader, JobController};
use shopbulk_common::config::StoreConfig;

/// Load store settings from the environment
pub fn load_config() -> Result<StoreConfig> {
    Ok(StoreConfig::from_env()?)
}

/// Bulk query service for the configured store
pub fn connect(config: &StoreConfig, progress: bool) -> Result<BulkQueryService<GraphqlTransport, HttpDownloader>> {
    let downloader = HttpDownloader::new(config.http_timeout())
        .map_err(|e| CliError::setup(e.to_string()))?
        .with_progress(progress);

    Ok(BulkQueryService::from_config_with_downloader(config, downloader)?)
}

/// Job controller for the configured store
pub fn controller(config: &StoreConfig) -> Result<JobController<GraphqlTransport>> {
    let transport =
        GraphqlTransport::from_config(config).map_err(|e| CliError::setup(e.to_string()))?;

    Ok(JobController::new(transport)
        .with_poll_interval(config.poll_interval())
        .with_max_wait(config.max_wait()))
}
