//! Authenticated Admin API transport
//!
//! [`BulkTransport`] is the narrow surface the job controller needs: submit a
//! bulk query, read the current operation and cancel one. [`GraphqlTransport`]
//! implements it over reqwest against a store's Admin GraphQL endpoint.

use crate::operation::{BulkOperation, CancelPayload, RunQueryPayload};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use shopbulk_common::config::StoreConfig;
use shopbulk_common::CommonError;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Header carrying the Admin API access token
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

const RUN_QUERY_MUTATION: &str = r#"
mutation bulkOperationRunQuery($query: String!) {
  bulkOperationRunQuery(query: $query) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}
"#;

const CURRENT_OPERATION_QUERY: &str = r#"
query {
  currentBulkOperation {
    id
    status
    errorCode
    objectCount
    fileSize
    url
    partialDataUrl
    query
    createdAt
    completedAt
  }
}
"#;

const CANCEL_MUTATION: &str = r#"
mutation bulkOperationCancel($id: ID!) {
  bulkOperationCancel(id: $id) {
    bulkOperation {
      id
      status
    }
    userErrors {
      field
      message
    }
  }
}
"#;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Admin API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("GraphQL errors: {}", describe_graphql_errors(.0))]
    Graphql(Vec<GraphqlError>),

    #[error("failed to decode GraphQL response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("GraphQL response has no `{0}` data")]
    MissingData(&'static str),

    #[error(transparent)]
    Config(#[from] CommonError),
}

/// One entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<Value>>,
}

fn describe_graphql_errors(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|err| err.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunQueryData {
    bulk_operation_run_query: Option<RunQueryPayload>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentOperationData {
    current_bulk_operation: Option<BulkOperation>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelData {
    bulk_operation_cancel: Option<CancelPayload>,
}

/// Remote bulk operation primitives
#[async_trait]
pub trait BulkTransport: Send + Sync {
    /// Submit `query` as a new bulk operation
    async fn run_query(&self, query: &str) -> Result<RunQueryPayload, TransportError>;

    /// Snapshot of the store's most recent bulk operation, if any
    async fn current_operation(&self) -> Result<Option<BulkOperation>, TransportError>;

    /// Request cancellation of the operation `id`
    async fn cancel(&self, id: &str) -> Result<CancelPayload, TransportError>;
}

#[async_trait]
impl<T: BulkTransport + ?Sized> BulkTransport for std::sync::Arc<T> {
    async fn run_query(&self, query: &str) -> Result<RunQueryPayload, TransportError> {
        (**self).run_query(query).await
    }

    async fn current_operation(&self) -> Result<Option<BulkOperation>, TransportError> {
        (**self).current_operation().await
    }

    async fn cancel(&self, id: &str) -> Result<CancelPayload, TransportError> {
        (**self).cancel(id).await
    }
}

/// Admin GraphQL client for a single store
#[derive(Debug, Clone)]
pub struct GraphqlTransport {
    client: Client,
    endpoint: Url,
    access_token: String,
}

impl GraphqlTransport {
    pub fn new(
        endpoint: Url,
        access_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            endpoint,
            access_token: access_token.into(),
        })
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, TransportError> {
        Self::new(
            config.graphql_url()?,
            config.access_token.clone(),
            config.http_timeout(),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Execute a GraphQL document and decode its `data`
    pub async fn execute<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<T, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let envelope: GraphqlResponse<T> = serde_json::from_slice(&bytes)?;

        if !envelope.errors.is_empty() {
            return Err(TransportError::Graphql(envelope.errors));
        }

        envelope.data.ok_or(TransportError::MissingData("data"))
    }
}

#[async_trait]
impl BulkTransport for GraphqlTransport {
    async fn run_query(&self, query: &str) -> Result<RunQueryPayload, TransportError> {
        debug!(endpoint = %self.endpoint, "Submitting bulk operation");

        let data: RunQueryData = self
            .execute(RUN_QUERY_MUTATION, json!({ "query": query }))
            .await?;

        data.bulk_operation_run_query
            .ok_or(TransportError::MissingData("bulkOperationRunQuery"))
    }

    async fn current_operation(&self) -> Result<Option<BulkOperation>, TransportError> {
        let data: CurrentOperationData = self
            .execute(CURRENT_OPERATION_QUERY, json!({}))
            .await?;

        Ok(data.current_bulk_operation)
    }

    async fn cancel(&self, id: &str) -> Result<CancelPayload, TransportError> {
        debug!(id, "Cancelling bulk operation");

        let data: CancelData = self.execute(CANCEL_MUTATION, json!({ "id": id })).await?;

        data.bulk_operation_cancel
            .ok_or(TransportError::MissingData("bulkOperationCancel"))
    }
}
