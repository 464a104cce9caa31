//! Build automation tasks for shopbulk
//!
//! Currently generates the CLI reference from the clap definitions.

use clap::Parser;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for shopbulk", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => generate_cli_docs(&output_dir)?,
    }

    Ok(())
}

fn generate_cli_docs(output_dir: &str) -> anyhow::Result<()> {
    println!("Generating CLI documentation...");

    let markdown = clap_markdown::help_markdown::<shopbulk_cli::Cli>();

    let content = format!(
        r#"# shopbulk CLI Reference

This documentation is auto-generated from the CLI source code. Last updated: {}.

## Overview

`shopbulk` runs read queries against a Shopify store as bulk operations, waits
for the export, and prints the results as JSON lines with nested connections
stitched back onto their parents.

## Installation

```bash
cargo install --path crates/shopbulk-cli
```

## Environment Variables

- `SHOPIFY_STORE_NAME` - Store handle or `*.myshopify.com` domain (required)
- `SHOPIFY_ACCESS_TOKEN` - Admin API access token (required)
- `SHOPIFY_API_VERSION` - Admin API version (default: `2024-04`)
- `SHOPIFY_GRAPHQL_URL` - Override the GraphQL endpoint
- `SHOPBULK_HTTP_TIMEOUT_SECS` - HTTP timeout (default: `60`)
- `SHOPBULK_POLL_INTERVAL_SECS` - Status poll interval (default: `1`)
- `SHOPBULK_MAX_WAIT_SECS` - Give up waiting after this many seconds
- `SHOPBULK_CANCEL_PRIOR` - Cancel a running operation instead of waiting for it
- `LOG_LEVEL`, `LOG_OUTPUT`, `LOG_FORMAT`, `LOG_FILTER` - Logging overrides

## Quick Start

```bash
# Active products with variants and metafields
shopbulk products --filter "status:active" --output products.jsonl

# Any bulk query
shopbulk query --file orders.graphql --progress

# Inspect or cancel the current operation
shopbulk status
shopbulk cancel
```

Nested connections in custom queries must select `id` on every node.

## Commands

{}

---

*This documentation is automatically generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        chrono::Utc::now().format("%Y-%m-%d"),
        markdown
    );

    let output_path = PathBuf::from(output_dir);
    fs::create_dir_all(&output_path)?;

    let file_path = output_path.join("cli-reference.md");
    fs::write(&file_path, content)?;

    println!("Generated CLI documentation at: {}", file_path.display());

    Ok(())
}
