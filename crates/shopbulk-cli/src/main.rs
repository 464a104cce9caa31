//! shopbulk CLI - Main entry point

use clap::Parser;
use shopbulk_cli::commands::list::Listing;
use shopbulk_cli::{Cli, Commands};
use shopbulk_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(ref command) = cli.command else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Warn })
        .output(LogOutput::Console)
        .log_file_prefix("shopbulk")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    let _guard = init_logging(&log_config).ok();

    if let Err(e) = execute_command(&cli, command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, command: &Commands) -> shopbulk_cli::Result<()> {
    use shopbulk_cli::commands::{list, operation, query};

    match command {
        Commands::Query { file, output } => query::run(file, output.as_deref(), cli.progress).await,

        Commands::Products { filter, output } => {
            list::run(
                Listing::Products {
                    filter: filter.clone(),
                },
                output.as_deref(),
                cli.progress,
            )
            .await
        },

        Commands::Orders { filter, output } => {
            list::run(
                Listing::Orders {
                    filter: filter.clone(),
                },
                output.as_deref(),
                cli.progress,
            )
            .await
        },

        Commands::Collections { output } => {
            list::run(Listing::Collections, output.as_deref(), cli.progress).await
        },

        Commands::Customers { output } => {
            list::run(Listing::Customers, output.as_deref(), cli.progress).await
        },

        Commands::Status { json } => operation::status(*json).await,

        Commands::Wait => operation::wait(cli.progress).await,

        Commands::Cancel => operation::cancel(cli.progress).await,

        Commands::Url => operation::url().await,
    }
}
