//! Resource listing commands
//!
//! `shopbulk products`, `orders`, `collections` and `customers` run the
//! built-in bulk queries and print typed records as JSON lines.

use crate::commands::{connect, load_config, output};
use crate::error::Result;
use crate::progress::create_spinner;
use std::path::Path;

/// Resource to list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Products { filter: Option<String> },
    Orders { filter: Option<String> },
    Collections,
    Customers,
}

impl Listing {
    fn label(&self) -> &'static str {
        match self {
            Listing::Products { .. } => "products",
            Listing::Orders { .. } => "orders",
            Listing::Collections => "collections",
            Listing::Customers => "customers",
        }
    }
}

/// Run the bulk query for `listing` and print the results
pub async fn run(listing: Listing, output: Option<&Path>, progress: bool) -> Result<()> {
    let config = load_config()?;
    let service = connect(&config, progress)?;

    let spinner = create_spinner(&format!("Fetching {}", listing.label()), progress);

    match &listing {
        Listing::Products { filter } => {
            let records = service.list_products(filter.as_deref()).await;
            spinner.finish_and_clear();
            output::write_records(&records?, output)
        },
        Listing::Orders { filter } => {
            let records = service.list_orders(filter.as_deref()).await;
            spinner.finish_and_clear();
            output::write_records(&records?, output)
        },
        Listing::Collections => {
            let records = service.list_collections().await;
            spinner.finish_and_clear();
            output::write_records(&records?, output)
        },
        Listing::Customers => {
            let records = service.list_customers().await;
            spinner.finish_and_clear();
            output::write_records(&records?, output)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(Listing::Products { filter: None }.label(), "products");
        assert_eq!(Listing::Customers.label(), "customers");
    }
}
