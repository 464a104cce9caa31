//! Shopify bulk operation runner
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Runs large read queries against a store's Admin GraphQL API as bulk
//! operations and rebuilds the nested result shape from the flat JSONL export.
//!
//! - **Lifecycle**: submit, poll and cancel operations ([`job::JobController`])
//! - **Transport**: Admin GraphQL over reqwest ([`transport::GraphqlTransport`])
//! - **Materialization**: stitch child lines back onto their parents
//!   ([`materialize`])
//! - **Orchestration**: one call from query text to typed records
//!   ([`bulk::BulkQueryService`])
//!
//! # Example
//!
//! ```no_run
//! use shopbulk::{BulkQueryService, Product};
//! use shopbulk_common::config::StoreConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = StoreConfig::from_env()?;
//! let service = BulkQueryService::from_config(&config)?;
//!
//! let products: Vec<Product> = service.list_products(Some("status:active")).await?;
//! for product in &products {
//!     let variants = product.variants.as_ref().map_or(0, |v| v.len());
//!     println!("{} has {variants} variants", product.id);
//! }
//! # Ok(())
//! # }
//! ```

pub mod bulk;
pub mod download;
pub mod job;
pub mod materialize;
pub mod model;
pub mod operation;
pub mod queries;
pub mod record;
pub mod resource;
pub mod transport;

pub use bulk::{BulkError, BulkQueryService, PriorJobPolicy};
pub use download::{DownloadError, Downloader, HttpDownloader};
pub use job::{JobController, JobError};
pub use materialize::{MaterializeError, MaterializeStats};
pub use model::{
    ChildNode, Collection, Connection, Customer, Edge, FulfillmentOrder, FulfillmentOrderLineItem,
    LineItem, Metafield, Order, PageInfo, Product, ProductVariant,
};
pub use operation::{BulkOperation, BulkOperationStatus};
pub use record::BulkRecord;
pub use resource::{ResourceError, ResourceKind};
pub use transport::{BulkTransport, GraphqlTransport, TransportError};
