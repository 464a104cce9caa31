//! shopbulk CLI Library
//!
//! Command-line interface for running Shopify bulk queries.
//!
//! # Overview
//!
//! - **Arbitrary queries**: run any bulk query and print JSON lines (`shopbulk query`)
//! - **Resource listings**: products, orders, collections and customers with
//!   their nested connections (`shopbulk products`, ...)
//! - **Operation control**: inspect, wait for or cancel the store's current
//!   bulk operation (`shopbulk status/wait/cancel/url`)
//!
//! Store credentials come from `SHOPIFY_STORE_NAME` and `SHOPIFY_ACCESS_TOKEN`
//! (a `.env` file in the working directory is honoured).

pub mod commands;
pub mod error;
pub mod progress;

pub use error::{CliError, Result};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// shopbulk - Shopify bulk query runner
#[derive(Parser, Debug)]
#[command(name = "shopbulk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Show progress while waiting and downloading
    #[arg(long, global = true)]
    pub progress: bool,

    /// Print the CLI reference as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a bulk query from a file and print the records as JSON lines
    Query {
        /// File containing the GraphQL query
        #[arg(short, long)]
        file: PathBuf,

        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List products with variants and metafields
    Products {
        /// Admin API search filter, e.g. "status:active"
        #[arg(short, long)]
        filter: Option<String>,

        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List orders with line items
    Orders {
        /// Admin API search filter, e.g. "financial_status:paid"
        #[arg(short, long)]
        filter: Option<String>,

        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List collections with their products
    Collections {
        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List customers with metafields
    Customers {
        /// Write JSON lines to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the store's current bulk operation
    Status {
        /// Print the raw operation as JSON
        #[arg(long)]
        json: bool,
    },

    /// Wait until the current bulk operation finishes
    Wait,

    /// Cancel the current bulk operation if it is still running
    Cancel,

    /// Print the result URL of the current bulk operation
    Url,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_products_with_filter() {
        let cli = Cli::parse_from(["shopbulk", "products", "--filter", "status:active", "--progress"]);
        assert!(cli.progress);
        match cli.command {
            Some(Commands::Products { filter, output }) => {
                assert_eq!(filter.as_deref(), Some("status:active"));
                assert!(output.is_none());
            },
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_query_requires_file() {
        assert!(Cli::try_parse_from(["shopbulk", "query"]).is_err());
    }
}
