//! Bulk operation handle and response envelopes.

use crate::error::BulkError;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle status reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BulkStatus {
    Created,
    Running,
    Completed,
    Failed,
    Canceled,
    Canceling,
    Expired,
    /// Any status this crate does not know; treated as terminal
    #[serde(other)]
    Unknown,
}

impl BulkStatus {
    /// Polling stops once the status leaves CREATED/RUNNING
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BulkStatus::Created | BulkStatus::Running)
    }
}

impl fmt::Display for BulkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BulkStatus::Created => "CREATED",
            BulkStatus::Running => "RUNNING",
            BulkStatus::Completed => "COMPLETED",
            BulkStatus::Failed => "FAILED",
            BulkStatus::Canceled => "CANCELED",
            BulkStatus::Canceling => "CANCELING",
            BulkStatus::Expired => "EXPIRED",
            BulkStatus::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Which bulk operation slot a job occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BulkKind {
    Query,
    Mutation,
}

impl BulkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkKind::Query => "QUERY",
            BulkKind::Mutation => "MUTATION",
        }
    }
}

impl fmt::Display for BulkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a remote bulk operation.
///
/// Returned by the submit call and replaced by every poll. `url` is only present once the
/// job finished with data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOperation {
    pub id: String,
    pub status: BulkStatus,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub partial_data_url: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default, deserialize_with = "count_from_string_or_number")]
    pub object_count: Option<u64>,
    #[serde(default, deserialize_with = "count_from_string_or_number")]
    pub file_size: Option<u64>,
}

impl BulkOperation {
    pub fn new(id: impl Into<String>, status: BulkStatus) -> Self {
        Self {
            id: id.into(),
            status,
            url: None,
            partial_data_url: None,
            error_code: None,
            created_at: None,
            completed_at: None,
            object_count: None,
            file_size: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Wall time between creation and completion, when both are reported
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        let created = parse_timestamp(self.created_at.as_deref()?)?;
        let completed = parse_timestamp(self.completed_at.as_deref()?)?;
        Some(completed.signed_duration_since(created))
    }

    pub(crate) fn from_value(value: &Value) -> Result<Self, BulkError> {
        serde_json::from_value(value.clone())
            .map_err(|e| BulkError::Protocol(format!("Malformed bulk operation: {}", e)))
    }
}

fn parse_timestamp(ts: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(ts).ok()
}

// UnsignedInt64 scalars arrive as strings
fn count_from_string_or_number<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(u64),
        Text(String),
    }

    match Option::<Count>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Count::Number(n)) => Ok(Some(n)),
        Some(Count::Text(s)) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A `userErrors` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
}

/// Messages joined with `, `
pub fn join_messages<'a>(messages: impl IntoIterator<Item = &'a str>) -> String {
    messages.into_iter().collect::<Vec<_>>().join(", ")
}

/// Pull `data.{field}` out of a mutation response.
///
/// A payload with user errors, or a response without the payload, is a submission failure.
pub(crate) fn submission_payload<'a>(
    response: &'a Value,
    field: &str,
) -> Result<&'a Value, BulkError> {
    let payload = response
        .get("data")
        .and_then(|data| data.get(field))
        .filter(|payload| payload.is_object());

    let Some(payload) = payload else {
        let errors = graphql_error_messages(response);
        return Err(BulkError::Submission(if errors.is_empty() {
            format!("Response carries no {} payload", field)
        } else {
            errors
        }));
    };

    let user_errors: Vec<UserError> = match payload.get("userErrors") {
        Some(Value::Null) | None => Vec::new(),
        Some(errors) => serde_json::from_value(errors.clone())
            .map_err(|e| BulkError::Protocol(format!("Malformed userErrors: {}", e)))?,
    };
    if !user_errors.is_empty() {
        return Err(BulkError::Submission(join_messages(
            user_errors.iter().map(|e| e.message.as_str()),
        )));
    }

    Ok(payload)
}

/// Top-level GraphQL `errors[].message`, joined
pub(crate) fn graphql_error_messages(response: &Value) -> String {
    response
        .get("errors")
        .and_then(Value::as_array)
        .map(|errors| {
            join_messages(
                errors
                    .iter()
                    .filter_map(|e| e.get("message").and_then(Value::as_str)),
            )
        })
        .unwrap_or_default()
}
