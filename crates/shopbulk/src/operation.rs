//! Bulk operation wire types
//!
//! Snapshots of the remote job as returned by `currentBulkOperation`,
//! `bulkOperationRunQuery` and `bulkOperationCancel`. These are never mutated
//! locally; every state change is observed by polling a fresh snapshot.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Remote job status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkOperationStatus {
    Created,
    Running,
    Canceling,
    Completed,
    Failed,
    #[serde(alias = "CANCELLED")]
    Canceled,
    Expired,
}

impl BulkOperationStatus {
    /// The job can no longer change state
    pub fn is_terminal(self) -> bool {
        !self.is_pending()
    }

    /// Still queued, running or winding down after a cancel request
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            BulkOperationStatus::Created | BulkOperationStatus::Running | BulkOperationStatus::Canceling
        )
    }

    /// Accepting a cancel request
    pub fn is_cancellable(self) -> bool {
        matches!(self, BulkOperationStatus::Created | BulkOperationStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BulkOperationStatus::Created => "CREATED",
            BulkOperationStatus::Running => "RUNNING",
            BulkOperationStatus::Canceling => "CANCELING",
            BulkOperationStatus::Completed => "COMPLETED",
            BulkOperationStatus::Failed => "FAILED",
            BulkOperationStatus::Canceled => "CANCELED",
            BulkOperationStatus::Expired => "EXPIRED",
        }
    }
}

impl fmt::Display for BulkOperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full status snapshot of the store's current bulk operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub id: String,
    pub status: BulkOperationStatus,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default, deserialize_with = "count")]
    pub object_count: u64,
    #[serde(default, deserialize_with = "optional_count")]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub partial_data_url: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl BulkOperation {
    /// Reported error code, ignoring blank values
    pub fn error_code(&self) -> Option<&str> {
        self.error_code.as_deref().filter(|code| !code.is_empty())
    }
}

/// The `{ id status }` selection returned by mutations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationRef {
    pub id: String,
    pub status: BulkOperationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

impl fmt::Display for UserError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(path) if !path.is_empty() => write!(f, "{}: {}", path.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// Join user errors into one message
pub fn describe_user_errors(errors: &[UserError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunQueryPayload {
    #[serde(default)]
    pub bulk_operation: Option<OperationRef>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelPayload {
    #[serde(default)]
    pub bulk_operation: Option<OperationRef>,
    #[serde(default)]
    pub user_errors: Vec<UserError>,
}

// Unsigned 64-bit counters are serialized by the Admin API as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCount {
    Text(String),
    Number(u64),
}

impl RawCount {
    fn parse<E: de::Error>(self) -> Result<u64, E> {
        match self {
            RawCount::Number(n) => Ok(n),
            RawCount::Text(text) => text
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid count `{text}`"))),
        }
    }
}

fn count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    Ok(optional_count(deserializer)?.unwrap_or(0))
}

fn optional_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    Option::<RawCount>::deserialize(deserializer)?
        .map(RawCount::parse)
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_completed_snapshot() {
        let op: BulkOperation = serde_json::from_value(json!({
            "id": "gid://shopify/BulkOperation/1",
            "status": "COMPLETED",
            "errorCode": null,
            "objectCount": "42",
            "fileSize": "1024",
            "url": "https://storage.example/export.jsonl",
            "partialDataUrl": null,
            "query": "{ products { edges { node { id } } } }",
            "createdAt": "2024-05-01T10:00:00Z",
            "completedAt": "2024-05-01T10:01:00Z"
        }))
        .unwrap();

        assert_eq!(op.status, BulkOperationStatus::Completed);
        assert_eq!(op.object_count, 42);
        assert_eq!(op.file_size, Some(1024));
        assert!(op.completed_at.is_some());
        assert_eq!(op.error_code(), None);
    }

    #[test]
    fn test_counts_accept_numbers_and_nulls() {
        let op: BulkOperation = serde_json::from_value(json!({
            "id": "gid://shopify/BulkOperation/2",
            "status": "RUNNING",
            "objectCount": 7,
            "fileSize": null
        }))
        .unwrap();

        assert_eq!(op.object_count, 7);
        assert_eq!(op.file_size, None);
    }

    #[test]
    fn test_invalid_count_rejected() {
        let result = serde_json::from_value::<BulkOperation>(json!({
            "id": "gid://shopify/BulkOperation/2",
            "status": "RUNNING",
            "objectCount": "many"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_status_spellings() {
        let canceled: BulkOperationStatus = serde_json::from_value(json!("CANCELLED")).unwrap();
        assert_eq!(canceled, BulkOperationStatus::Canceled);
        assert_eq!(serde_json::to_value(canceled).unwrap(), json!("CANCELED"));
    }

    #[test]
    fn test_status_classes() {
        use crate::operation::BulkOperationStatus::*;

        for status in [Created, Running, Canceling] {
            assert!(status.is_pending(), "{status}");
        }
        for status in [Completed, Failed, Canceled, Expired] {
            assert!(status.is_terminal(), "{status}");
            assert!(!status.is_cancellable(), "{status}");
        }
        assert!(Created.is_cancellable());
        assert!(Running.is_cancellable());
        assert!(!Canceling.is_cancellable());
    }

    #[test]
    fn test_blank_error_code_ignored() {
        let op: BulkOperation = serde_json::from_value(json!({
            "id": "gid://shopify/BulkOperation/3",
            "status": "COMPLETED",
            "errorCode": ""
        }))
        .unwrap();
        assert_eq!(op.error_code(), None);
    }

    #[test]
    fn test_describe_user_errors() {
        let errors = vec![
            UserError {
                field: Some(vec!["query".into()]),
                message: "Invalid bulk query".into(),
            },
            UserError {
                field: None,
                message: "A bulk operation is already running".into(),
            },
        ];
        assert_eq!(
            describe_user_errors(&errors),
            "query: Invalid bulk query; A bulk operation is already running"
        );
    }
}
