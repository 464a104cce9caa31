//! Bulk operation lifecycle
//!
//! A store runs at most one bulk query at a time. [`JobController`] submits
//! operations, polls the current one until it settles, cancels stale ones and
//! turns a finished operation into a result download location.
//!
//! ```text
//! CREATED -> RUNNING -> COMPLETED | FAILED
//! CREATED | RUNNING -> CANCELING -> CANCELED
//! any pending status -> EXPIRED
//! ```

use crate::operation::{describe_user_errors, BulkOperation, BulkOperationStatus, UserError};
use crate::transport::{BulkTransport, TransportError};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

/// Poll interval used when none is configured
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum JobError {
    #[error("failed to submit bulk query: {0}")]
    Submission(#[source] TransportError),

    #[error("bulk query rejected: {}", describe_user_errors(.0))]
    SubmissionRejected(Vec<UserError>),

    #[error("bulk query submission returned no operation id")]
    MissingOperationId,

    #[error("failed to query current bulk operation: {0}")]
    Transport(#[source] TransportError),

    #[error("failed to cancel bulk operation {id}: {message}")]
    Mutation {
        id: String,
        message: String,
        #[source]
        source: Option<TransportError>,
    },

    #[error("bulk operation {id} did not complete: status {status}, error code {}", describe_code(.error_code))]
    Incomplete {
        id: String,
        status: BulkOperationStatus,
        error_code: Option<String>,
    },

    #[error("bulk operation {id} completed with results but no download URL")]
    EmptyUrl { id: String },

    #[error("bulk operation id mismatch: expected {expected}, current is {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("no bulk operation has been run on this store")]
    NoOperation,

    #[error("bulk operation {id} still {status} after waiting {waited:?}")]
    PollTimeout {
        id: String,
        status: BulkOperationStatus,
        waited: Duration,
    },
}

fn describe_code(code: &Option<String>) -> &str {
    code.as_deref().unwrap_or("none")
}

/// Submits, polls and cancels bulk operations through a transport
#[derive(Debug, Clone)]
pub struct JobController<T> {
    transport: T,
    poll_interval: Duration,
    max_wait: Option<Duration>,
}

impl<T: BulkTransport> JobController<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: None,
        }
    }

    /// Interval used when waiting internally (cancel drain, result resolution)
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fail waits that take longer than `max_wait` with [`JobError::PollTimeout`]
    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Submit a bulk query, returning the new operation id
    #[instrument(skip_all)]
    pub async fn submit(&self, query: &str) -> Result<String, JobError> {
        let payload = self
            .transport
            .run_query(query)
            .await
            .map_err(JobError::Submission)?;

        if !payload.user_errors.is_empty() {
            return Err(JobError::SubmissionRejected(payload.user_errors));
        }

        let operation = payload
            .bulk_operation
            .filter(|op| !op.id.is_empty())
            .ok_or(JobError::MissingOperationId)?;

        info!(id = %operation.id, status = %operation.status, "Bulk operation submitted");
        Ok(operation.id)
    }

    /// Current operation snapshot; `None` if the store never ran one
    pub async fn current_status(&self) -> Result<Option<BulkOperation>, JobError> {
        self.transport
            .current_operation()
            .await
            .map_err(JobError::Transport)
    }

    /// Poll until the current operation is no longer pending
    #[instrument(skip(self))]
    pub async fn wait_until_terminal(
        &self,
        interval: Duration,
    ) -> Result<Option<BulkOperation>, JobError> {
        let started = Instant::now();
        let mut current = self.current_status().await?;

        while let Some(op) = current.as_ref().filter(|op| op.status.is_pending()) {
            let waited = started.elapsed();
            if let Some(max_wait) = self.max_wait {
                if waited >= max_wait {
                    return Err(JobError::PollTimeout {
                        id: op.id.clone(),
                        status: op.status,
                        waited,
                    });
                }
            }

            debug!(id = %op.id, status = %op.status, objects = op.object_count, "Bulk operation still pending");
            tokio::time::sleep(interval).await;
            current = self.current_status().await?;
        }

        match &current {
            Some(op) => debug!(id = %op.id, status = %op.status, "Bulk operation settled"),
            None => debug!("No bulk operation on store"),
        }

        Ok(current)
    }

    /// Cancel the current operation if it is still created or running
    ///
    /// Waits for the operation to settle afterwards. Does nothing if there is
    /// no operation or it has already finished.
    #[instrument(skip(self))]
    pub async fn cancel(&self) -> Result<(), JobError> {
        let Some(op) = self.current_status().await? else {
            return Ok(());
        };

        if op.status.is_cancellable() {
            warn!(id = %op.id, status = %op.status, "Cancelling bulk operation");

            let payload = self.transport.cancel(&op.id).await.map_err(|source| {
                JobError::Mutation {
                    id: op.id.clone(),
                    message: source.to_string(),
                    source: Some(source),
                }
            })?;

            if !payload.user_errors.is_empty() {
                return Err(JobError::Mutation {
                    id: op.id,
                    message: describe_user_errors(&payload.user_errors),
                    source: None,
                });
            }
        } else if op.status.is_terminal() {
            return Ok(());
        }

        if let Some(settled) = self.wait_until_terminal(self.poll_interval).await? {
            info!(id = %settled.id, status = %settled.status, "Bulk operation cancelled");
        }
        Ok(())
    }

    /// Wait for the current operation and return its result URL
    ///
    /// `Ok(None)` means the operation completed with zero objects and there is
    /// nothing to download.
    #[instrument(skip(self))]
    pub async fn resolve_result_location(
        &self,
        expected_id: Option<&str>,
    ) -> Result<Option<String>, JobError> {
        let op = self
            .wait_until_terminal(self.poll_interval)
            .await?
            .ok_or(JobError::NoOperation)?;

        if let Some(expected) = expected_id {
            if op.id != expected {
                return Err(JobError::Mismatch {
                    expected: expected.to_string(),
                    actual: op.id,
                });
            }
        }

        if op.status != BulkOperationStatus::Completed || op.error_code().is_some() {
            return Err(JobError::Incomplete {
                status: op.status,
                error_code: op.error_code().map(str::to_string),
                id: op.id,
            });
        }

        if op.object_count == 0 {
            info!(id = %op.id, "Bulk operation returned no objects");
            return Ok(None);
        }

        match op.url.filter(|url| !url.is_empty()) {
            Some(url) => {
                info!(id = %op.id, objects = op.object_count, bytes = ?op.file_size, "Bulk operation result ready");
                Ok(Some(url))
            },
            None => Err(JobError::EmptyUrl { id: op.id }),
        }
    }

    /// Result URL of whatever operation is current
    pub async fn current_result_url(&self) -> Result<Option<String>, JobError> {
        self.resolve_result_location(None).await
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory transport shared by the unit tests

    use super::*;
    use crate::operation::{CancelPayload, OperationRef, RunQueryPayload};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub fn operation(id: &str, status: BulkOperationStatus) -> BulkOperation {
        BulkOperation {
            id: id.to_string(),
            status,
            error_code: None,
            object_count: 0,
            file_size: None,
            url: None,
            partial_data_url: None,
            query: None,
            created_at: None,
            completed_at: None,
        }
    }

    pub fn completed(id: &str, objects: u64, url: Option<&str>) -> BulkOperation {
        BulkOperation {
            object_count: objects,
            url: url.map(str::to_string),
            ..operation(id, BulkOperationStatus::Completed)
        }
    }

    /// Returns snapshots in order, repeating the last one once exhausted
    #[derive(Default)]
    pub struct FakeTransport {
        snapshots: Mutex<VecDeque<Option<BulkOperation>>>,
        last: Mutex<Option<BulkOperation>>,
        pub submitted: Mutex<Vec<String>>,
        pub cancelled: Mutex<Vec<String>>,
        pub status_calls: Mutex<usize>,
        pub submit_response: Mutex<RunQueryPayload>,
        pub cancel_errors: Mutex<Vec<UserError>>,
        pub fail_status: Mutex<bool>,
    }

    impl FakeTransport {
        pub fn with_snapshots(snapshots: Vec<Option<BulkOperation>>) -> Self {
            let fake = Self::default();
            *fake.snapshots.lock().unwrap() = snapshots.into();
            fake
        }

        pub fn accepting(self, id: &str) -> Self {
            *self.submit_response.lock().unwrap() = RunQueryPayload {
                bulk_operation: Some(OperationRef {
                    id: id.to_string(),
                    status: BulkOperationStatus::Created,
                }),
                user_errors: Vec::new(),
            };
            self
        }

        pub fn status_calls(&self) -> usize {
            *self.status_calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl BulkTransport for FakeTransport {
        async fn run_query(&self, query: &str) -> Result<RunQueryPayload, TransportError> {
            self.submitted.lock().unwrap().push(query.to_string());
            Ok(self.submit_response.lock().unwrap().clone())
        }

        async fn current_operation(&self) -> Result<Option<BulkOperation>, TransportError> {
            *self.status_calls.lock().unwrap() += 1;
            if *self.fail_status.lock().unwrap() {
                return Err(TransportError::MissingData("currentBulkOperation"));
            }

            let mut last = self.last.lock().unwrap();
            if let Some(next) = self.snapshots.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(last.clone())
        }

        async fn cancel(&self, id: &str) -> Result<CancelPayload, TransportError> {
            self.cancelled.lock().unwrap().push(id.to_string());
            Ok(CancelPayload {
                bulk_operation: None,
                user_errors: self.cancel_errors.lock().unwrap().clone(),
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::operation::BulkOperationStatus::*;
    use crate::operation::RunQueryPayload;

    const ID: &str = "gid://shopify/BulkOperation/1";

    #[tokio::test]
    async fn test_submit_returns_id() {
        let controller = JobController::new(FakeTransport::default().accepting(ID));
        assert_eq!(controller.submit("{ shop { id } }").await.unwrap(), ID);
        assert_eq!(
            controller.transport().submitted.lock().unwrap().as_slice(),
            ["{ shop { id } }"]
        );
    }

    #[tokio::test]
    async fn test_submit_rejected_with_user_errors() {
        let fake = FakeTransport::default();
        *fake.submit_response.lock().unwrap() = RunQueryPayload {
            bulk_operation: None,
            user_errors: vec![UserError {
                field: Some(vec!["query".into()]),
                message: "Invalid bulk query".into(),
            }],
        };

        let err = JobController::new(fake).submit("{").await.unwrap_err();
        assert!(matches!(err, JobError::SubmissionRejected(ref errors) if errors.len() == 1));
        assert!(err.to_string().contains("Invalid bulk query"));
    }

    #[tokio::test]
    async fn test_submit_without_operation() {
        let err = JobController::new(FakeTransport::default())
            .submit("{ shop { id } }")
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::MissingOperationId));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_immediately_when_terminal() {
        let controller =
            JobController::new(FakeTransport::with_snapshots(vec![Some(operation(ID, Failed))]));

        let started = Instant::now();
        let op = controller
            .wait_until_terminal(Duration::from_secs(5))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(op.status, Failed);
        assert_eq!(controller.transport().status_calls(), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_without_operation() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![None]));
        assert!(controller
            .wait_until_terminal(Duration::from_secs(1))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_at_interval() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![
            Some(operation(ID, Created)),
            Some(operation(ID, Running)),
            Some(operation(ID, Running)),
            Some(completed(ID, 3, Some("https://example.com/r.jsonl"))),
        ]));

        let started = Instant::now();
        let op = controller
            .wait_until_terminal(Duration::from_secs(2))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(op.status, Completed);
        assert_eq!(controller.transport().status_calls(), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_times_out() {
        let controller =
            JobController::new(FakeTransport::with_snapshots(vec![Some(operation(ID, Running))]))
                .with_max_wait(Some(Duration::from_secs(10)));

        let err = controller
            .wait_until_terminal(Duration::from_secs(3))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            JobError::PollTimeout { status: Running, waited, .. } if waited >= Duration::from_secs(10)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_surfaces_transport_error() {
        let fake = FakeTransport::default();
        *fake.fail_status.lock().unwrap() = true;

        let err = JobController::new(fake)
            .wait_until_terminal(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, JobError::Transport(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_noop_when_absent_or_terminal() {
        for snapshot in [None, Some(operation(ID, Completed)), Some(operation(ID, Canceled))] {
            let controller = JobController::new(FakeTransport::with_snapshots(vec![snapshot]));
            controller.cancel().await.unwrap();
            assert!(controller.transport().cancelled.lock().unwrap().is_empty());
            assert_eq!(controller.transport().status_calls(), 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_running_operation_and_drain() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![
            Some(operation(ID, Running)),
            Some(operation(ID, Canceling)),
            Some(operation(ID, Canceled)),
        ]));

        controller.cancel().await.unwrap();

        assert_eq!(controller.transport().cancelled.lock().unwrap().as_slice(), [ID]);
        assert_eq!(controller.transport().status_calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_canceling_only_drains() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![
            Some(operation(ID, Canceling)),
            Some(operation(ID, Canceled)),
        ]));

        controller.cancel().await.unwrap();
        assert!(controller.transport().cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_user_errors() {
        let fake = FakeTransport::with_snapshots(vec![Some(operation(ID, Created))]);
        *fake.cancel_errors.lock().unwrap() = vec![UserError {
            field: None,
            message: "Operation cannot be cancelled".into(),
        }];

        let err = JobController::new(fake).cancel().await.unwrap_err();
        assert!(matches!(err, JobError::Mutation { source: None, .. }));
        assert!(err.to_string().contains("cannot be cancelled"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_zero_objects() {
        let controller =
            JobController::new(FakeTransport::with_snapshots(vec![Some(completed(ID, 0, None))]));
        assert_eq!(controller.resolve_result_location(Some(ID)).await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_url_after_polling() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![
            Some(operation(ID, Running)),
            Some(completed(ID, 2, Some("https://example.com/r.jsonl"))),
        ]));

        assert_eq!(
            controller.resolve_result_location(Some(ID)).await.unwrap().as_deref(),
            Some("https://example.com/r.jsonl")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_mismatch() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![Some(completed(
            "gid://shopify/BulkOperation/2",
            1,
            Some("u"),
        ))]));

        let err = controller.resolve_result_location(Some(ID)).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Mismatch { ref expected, ref actual }
                if expected == ID && actual == "gid://shopify/BulkOperation/2"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_incomplete_carries_error_code() {
        let failed = BulkOperation {
            error_code: Some("TIMEOUT".into()),
            ..operation(ID, Failed)
        };
        let controller = JobController::new(FakeTransport::with_snapshots(vec![Some(failed)]));

        let err = controller.resolve_result_location(Some(ID)).await.unwrap_err();
        assert!(matches!(
            err,
            JobError::Incomplete { status: Failed, ref error_code, .. } if error_code.as_deref() == Some("TIMEOUT")
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_completed_with_error_code() {
        let completed_with_error = BulkOperation {
            error_code: Some("ACCESS_DENIED".into()),
            ..completed(ID, 5, Some("u"))
        };
        let controller =
            JobController::new(FakeTransport::with_snapshots(vec![Some(completed_with_error)]));

        let err = controller.resolve_result_location(None).await.unwrap_err();
        assert!(matches!(err, JobError::Incomplete { status: Completed, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_missing_url() {
        let controller =
            JobController::new(FakeTransport::with_snapshots(vec![Some(completed(ID, 5, None))]));

        let err = controller.current_result_url().await.unwrap_err();
        assert!(matches!(err, JobError::EmptyUrl { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_no_operation() {
        let controller = JobController::new(FakeTransport::with_snapshots(vec![None]));
        let err = controller.current_result_url().await.unwrap_err();
        assert!(matches!(err, JobError::NoOperation));
    }
}
