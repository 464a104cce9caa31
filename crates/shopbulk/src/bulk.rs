//! Bulk query orchestration
//!
//! [`BulkQueryService`] runs one query end to end: settle any prior
//! operation, submit, wait, download the export and materialize it. Each
//! call is all-or-nothing.

use crate::download::{DownloadError, Downloader, HttpDownloader};
use crate::job::{JobController, JobError};
use crate::materialize::{self, MaterializeError, MaterializeStats};
use crate::model::{Collection, Customer, Order, Product};
use crate::queries;
use crate::record::BulkRecord;
use crate::transport::{BulkTransport, GraphqlTransport, TransportError};
use shopbulk_common::config::StoreConfig;
use std::fs::File;
use std::io::BufReader;
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Error, Debug)]
pub enum BulkError {
    #[error(transparent)]
    Job(#[from] JobError),

    #[error("failed to create temporary export file: {0}")]
    TempFile(#[source] std::io::Error),

    #[error("failed to download bulk results: {0}")]
    Download(#[from] DownloadError),

    #[error("failed to parse bulk results: {0}")]
    Materialize(#[from] MaterializeError),

    #[error("failed to set up store client: {0}")]
    Setup(#[from] TransportError),
}

/// What to do with an operation already running when a new query is submitted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorJobPolicy {
    /// Wait for it to finish
    #[default]
    Wait,
    /// Cancel it
    Cancel,
}

/// End-to-end bulk query runner for one store
pub struct BulkQueryService<T, D> {
    jobs: JobController<T>,
    downloader: D,
    prior_jobs: PriorJobPolicy,
}

impl BulkQueryService<GraphqlTransport, HttpDownloader> {
    /// Build a service talking to the store described by `config`
    pub fn from_config(config: &StoreConfig) -> Result<Self, BulkError> {
        let downloader = HttpDownloader::new(config.http_timeout())?;
        Self::from_config_with_downloader(config, downloader)
    }
}

impl<D: Downloader> BulkQueryService<GraphqlTransport, D> {
    /// Like [`BulkQueryService::from_config`], fetching exports through `downloader`
    pub fn from_config_with_downloader(config: &StoreConfig, downloader: D) -> Result<Self, BulkError> {
        let transport = GraphqlTransport::from_config(config)?;

        let jobs = JobController::new(transport)
            .with_poll_interval(config.poll_interval())
            .with_max_wait(config.max_wait());

        let prior_jobs = if config.cancel_prior {
            PriorJobPolicy::Cancel
        } else {
            PriorJobPolicy::Wait
        };

        Ok(Self::new(jobs, downloader).with_prior_jobs(prior_jobs))
    }
}

impl<T: BulkTransport, D: Downloader> BulkQueryService<T, D> {
    pub fn new(jobs: JobController<T>, downloader: D) -> Self {
        Self {
            jobs,
            downloader,
            prior_jobs: PriorJobPolicy::default(),
        }
    }

    pub fn with_prior_jobs(mut self, policy: PriorJobPolicy) -> Self {
        self.prior_jobs = policy;
        self
    }

    pub fn with_downloader<D2: Downloader>(self, downloader: D2) -> BulkQueryService<T, D2> {
        BulkQueryService {
            jobs: self.jobs,
            downloader,
            prior_jobs: self.prior_jobs,
        }
    }

    pub fn jobs(&self) -> &JobController<T> {
        &self.jobs
    }

    /// Run `query` as a bulk operation and materialize the result
    pub async fn bulk_query<R: BulkRecord>(&self, query: &str) -> Result<Vec<R>, BulkError> {
        let mut out = Vec::new();
        self.bulk_query_into(query, &mut out).await?;
        Ok(out)
    }

    /// Like [`Self::bulk_query`], appending to `out` only if every phase succeeds
    #[instrument(skip_all)]
    pub async fn bulk_query_into<R: BulkRecord>(
        &self,
        query: &str,
        out: &mut Vec<R>,
    ) -> Result<MaterializeStats, BulkError> {
        match self.prior_jobs {
            PriorJobPolicy::Wait => {
                self.jobs.wait_until_terminal(self.jobs.poll_interval()).await?;
            },
            PriorJobPolicy::Cancel => self.jobs.cancel().await?,
        }

        let id = self.jobs.submit(query).await?;

        let Some(url) = self.jobs.resolve_result_location(Some(&id)).await? else {
            return Ok(MaterializeStats::default());
        };

        let export = tempfile::Builder::new()
            .prefix("shopbulk-")
            .suffix(".jsonl")
            .tempfile()
            .map_err(BulkError::TempFile)?;

        let bytes = self.downloader.download(&url, export.path()).await?;
        info!(id = %id, bytes, "Downloaded bulk export");

        let file = File::open(export.path()).map_err(BulkError::TempFile)?;
        let stats = materialize::materialize_into(BufReader::new(file), out)?;

        info!(
            id = %id,
            records = stats.records,
            child_edges = stats.child_edges,
            "Bulk query finished"
        );
        Ok(stats)
    }

    /// All products matching `filter`, with variants and metafields
    pub async fn list_products(&self, filter: Option<&str>) -> Result<Vec<Product>, BulkError> {
        self.bulk_query(&queries::products_query(filter)).await
    }

    /// All orders matching `filter`, with line items
    pub async fn list_orders(&self, filter: Option<&str>) -> Result<Vec<Order>, BulkError> {
        self.bulk_query(&queries::orders_query(filter)).await
    }

    pub async fn list_collections(&self) -> Result<Vec<Collection>, BulkError> {
        self.bulk_query(&queries::collections_query()).await
    }

    pub async fn list_customers(&self) -> Result<Vec<Customer>, BulkError> {
        self.bulk_query(&queries::customers_query()).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::job::testing::*;
    use crate::operation::BulkOperationStatus::*;
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    const PRIOR: &str = "gid://shopify/BulkOperation/1";
    const ID: &str = "gid://shopify/BulkOperation/2";

    /// Writes a fixed body instead of fetching
    #[derive(Default)]
    struct FakeDownloader {
        body: String,
        urls: Mutex<Vec<String>>,
    }

    impl FakeDownloader {
        fn serving(body: &str) -> Self {
            Self {
                body: body.to_string(),
                urls: Mutex::default(),
            }
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
            self.urls.lock().unwrap().push(url.to_string());
            std::fs::write(dest, &self.body).unwrap();
            Ok(self.body.len() as u64)
        }
    }

    fn service(
        transport: FakeTransport,
        downloader: FakeDownloader,
    ) -> (BulkQueryService<Arc<FakeTransport>, Arc<FakeDownloader>>, Arc<FakeTransport>, Arc<FakeDownloader>)
    {
        let transport = Arc::new(transport);
        let downloader = Arc::new(downloader);
        let service =
            BulkQueryService::new(JobController::new(transport.clone()), downloader.clone());
        (service, transport, downloader)
    }

    const EXPORT: &str = concat!(
        "{\"id\":\"gid://shopify/Product/1\",\"title\":\"T\"}\n",
        "{\"__parentId\":\"gid://shopify/Product/1\",\"id\":\"gid://shopify/ProductVariant/9\",\"sku\":\"X\"}\n",
    );

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_prior_job_then_materializes() {
        let transport = FakeTransport::with_snapshots(vec![
            Some(operation(PRIOR, Running)),
            Some(completed(PRIOR, 10, Some("https://old"))),
            Some(completed(ID, 2, Some("https://storage/export.jsonl"))),
        ])
        .accepting(ID);

        let (service, transport, downloader) = service(transport, FakeDownloader::serving(EXPORT));
        let products: Vec<Product> = service.bulk_query("{ products }").await.unwrap();

        assert_eq!(transport.submitted.lock().unwrap().len(), 1);
        assert!(transport.cancelled.lock().unwrap().is_empty());
        assert_eq!(
            downloader.urls.lock().unwrap().as_slice(),
            ["https://storage/export.jsonl"]
        );

        assert_eq!(products.len(), 1);
        let variants = products[0].variants.as_ref().unwrap();
        assert_eq!(variants.edges[0].node.sku.as_deref(), Some("X"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_objects_skips_download() {
        let transport = FakeTransport::with_snapshots(vec![None, Some(completed(ID, 0, None))])
            .accepting(ID);

        let (service, _, downloader) = service(transport, FakeDownloader::serving(EXPORT));
        let products: Vec<Product> = service.bulk_query("{ products }").await.unwrap();

        assert!(products.is_empty());
        assert!(downloader.urls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_policy_cancels_running_job() {
        let transport = FakeTransport::with_snapshots(vec![
            Some(operation(PRIOR, Running)),
            Some(operation(PRIOR, Canceled)),
            Some(completed(ID, 0, None)),
        ])
        .accepting(ID);

        let (service, transport, _) = service(transport, FakeDownloader::default());
        let service = service.with_prior_jobs(PriorJobPolicy::Cancel);

        let products: Vec<Product> = service.bulk_query("{ products }").await.unwrap();
        assert!(products.is_empty());
        assert_eq!(transport.cancelled.lock().unwrap().as_slice(), [PRIOR]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_leaves_output_untouched() {
        let transport = FakeTransport::with_snapshots(vec![
            None,
            Some(completed(ID, 2, Some("https://storage/export.jsonl"))),
        ])
        .accepting(ID);

        let bad_export = "{\"id\":\"gid://shopify/Product/1\"}\n{\"__parentId\":\"gid://shopify/Product/1\",\"id\":\"gid://shopify/Video/1\"}\n";
        let (service, _, _) = service(transport, FakeDownloader::serving(bad_export));

        let mut out = vec![Product::default()];
        let err = service.bulk_query_into("{ products }", &mut out).await.unwrap_err();

        assert!(matches!(err, BulkError::Materialize(MaterializeError::Resource { .. })));
        assert_eq!(out.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_job_reported() {
        let transport = FakeTransport::with_snapshots(vec![None, Some(operation(ID, Expired))])
            .accepting(ID);

        let (service, _, downloader) = service(transport, FakeDownloader::default());
        let err = service.bulk_query::<Product>("{ products }").await.unwrap_err();

        assert!(matches!(err, BulkError::Job(JobError::Incomplete { status: Expired, .. })));
        assert!(downloader.urls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_helpers_submit_resource_queries() {
        let transport = FakeTransport::with_snapshots(vec![None, Some(completed(ID, 0, None))])
            .accepting(ID);

        let (service, transport, _) = service(transport, FakeDownloader::default());
        service.list_orders(Some("status:open")).await.unwrap();

        let submitted = transport.submitted.lock().unwrap();
        assert!(submitted[0].contains(r#"orders(query: "status:open")"#));
        assert!(submitted[0].contains("lineItems"));
    }

    #[test]
    fn test_from_config_honours_cancel_prior() {
        let mut config = StoreConfig::new("my-shop", "shpat_123");
        config.cancel_prior = true;

        let service = BulkQueryService::from_config(&config).unwrap();
        assert_eq!(service.prior_jobs, PriorJobPolicy::Cancel);
        assert_eq!(service.jobs().poll_interval(), config.poll_interval());
    }

    #[tokio::test]
    async fn test_from_config_with_downloader_uses_given_downloader() {
        let mut config = StoreConfig::new("my-shop", "shpat_123");
        config.cancel_prior = true;

        let downloader = Arc::new(FakeDownloader::serving(EXPORT));
        let service = BulkQueryService::from_config_with_downloader(&config, downloader.clone()).unwrap();
        assert_eq!(service.prior_jobs, PriorJobPolicy::Cancel);

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("export.jsonl");
        service.downloader.download("https://storage/a.jsonl", &dest).await.unwrap();

        assert_eq!(downloader.urls.lock().unwrap().as_slice(), ["https://storage/a.jsonl"]);
        assert_eq!(std::fs::read_to_string(&dest).unwrap(), EXPORT);
    }
}
