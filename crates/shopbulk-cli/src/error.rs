//! Error types for the shopbulk CLI
//!
//! User-facing errors with clear, actionable messages.

use shopbulk::{BulkError, JobError};
use shopbulk_common::CommonError;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Error type for CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    /// Store configuration is missing or invalid
    #[error("Configuration error: {0}. Set SHOPIFY_STORE_NAME and SHOPIFY_ACCESS_TOKEN (a .env file works too).")]
    Config(#[from] CommonError),

    /// Running a bulk query failed
    #[error("Bulk query failed: {0}. Run 'shopbulk status' to inspect the current operation.")]
    Bulk(#[from] BulkError),

    /// Inspecting or controlling the current operation failed
    #[error("Bulk operation error: {0}")]
    Job(#[from] JobError),

    /// Query file is missing
    #[error("File not found: '{0}'. Verify the file path exists and you have read permissions.")]
    FileNotFound(String),

    /// Query file has no content
    #[error("Query file '{0}' is empty. Write a GraphQL query with at least one connection.")]
    EmptyQuery(String),

    /// Store client could not be created
    #[error("Failed to set up store client: {0}")]
    Setup(String),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed
    #[error("Failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Create a setup error
    pub fn setup(msg: impl Into<String>) -> Self {
        Self::Setup(msg.into())
    }
}
