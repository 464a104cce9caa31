//! Current bulk operation commands
//!
//! `shopbulk status`, `wait`, `cancel` and `url`.

use crate::commands::{controller, load_config};
use crate::error::Result;
use crate::progress::{create_spinner, format_bytes};
use colored::{ColoredString, Colorize};
use shopbulk::{BulkOperation, BulkOperationStatus};

/// Show the current bulk operation
pub async fn status(json: bool) -> Result<()> {
    let jobs = controller(&load_config()?)?;
    let current = jobs.current_status().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&current)?);
        return Ok(());
    }

    match current {
        Some(op) => print_operation(&op),
        None => println!("No bulk operation has been run on this store."),
    }

    Ok(())
}

/// Block until the current operation finishes
pub async fn wait(progress: bool) -> Result<()> {
    let jobs = controller(&load_config()?)?;

    let spinner = create_spinner("Waiting for bulk operation", progress);
    let settled = jobs.wait_until_terminal(jobs.poll_interval()).await;
    spinner.finish_and_clear();

    match settled? {
        Some(op) => print_operation(&op),
        None => println!("No bulk operation has been run on this store."),
    }

    Ok(())
}

/// Cancel the current operation if it is still running
pub async fn cancel(progress: bool) -> Result<()> {
    let jobs = controller(&load_config()?)?;

    let spinner = create_spinner("Cancelling bulk operation", progress);
    let cancelled = jobs.cancel().await;
    spinner.finish_and_clear();
    cancelled?;

    match jobs.current_status().await? {
        Some(op) => println!("Bulk operation {} is {}", op.id, colored_status(op.status)),
        None => println!("No bulk operation has been run on this store."),
    }

    Ok(())
}

/// Print the current operation's result URL
pub async fn url() -> Result<()> {
    let jobs = controller(&load_config()?)?;

    match jobs.current_result_url().await? {
        Some(url) => println!("{url}"),
        None => eprintln!("The current bulk operation returned no objects."),
    }

    Ok(())
}

fn print_operation(op: &BulkOperation) {
    println!("{}", "Bulk Operation:".cyan().bold());
    println!("  ID:        {}", op.id);
    println!("  Status:    {}", colored_status(op.status));
    if let Some(code) = op.error_code() {
        println!("  Error:     {}", code.red());
    }
    println!("  Objects:   {}", op.object_count);
    if let Some(size) = op.file_size {
        println!("  Size:      {}", format_bytes(size));
    }
    if let Some(created) = op.created_at {
        println!("  Created:   {created}");
    }
    if let Some(completed) = op.completed_at {
        println!("  Completed: {completed}");
    }
    if let Some(ref url) = op.url {
        println!("  URL:       {url}");
    }
    if let Some(ref url) = op.partial_data_url {
        println!("  Partial:   {url}");
    }
}

fn colored_status(status: BulkOperationStatus) -> ColoredString {
    match status {
        BulkOperationStatus::Completed => status.as_str().green(),
        BulkOperationStatus::Failed | BulkOperationStatus::Expired => status.as_str().red(),
        BulkOperationStatus::Canceled => status.as_str().dimmed(),
        _ => status.as_str().yellow(),
    }
}
