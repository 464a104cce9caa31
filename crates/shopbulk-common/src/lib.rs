//! shopbulk common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared configuration, logging, and error handling for the shopbulk
//! workspace members.
//!
//! - **Configuration**: store credentials and polling settings loaded from the
//!   environment ([`config::StoreConfig`])
//! - **Logging**: `tracing` subscriber setup ([`logging::init_logging`])
//! - **Error Handling**: [`CommonError`] and the [`Result`] alias
//!
//! # Example
//!
//! ```no_run
//! use shopbulk_common::config::StoreConfig;
//!
//! fn endpoint() -> shopbulk_common::Result<String> {
//!     let config = StoreConfig::from_env()?;
//!     Ok(config.graphql_url()?.to_string())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
