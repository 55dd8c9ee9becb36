//! Bulk Operation Orchestrator
//!
//! Drives the submit, poll and retrieve lifecycle of Shopify bulk jobs. Bulk queries are
//! submitted directly; bulk mutations first stage their JSONL variables file through a
//! signed upload. Both variants poll `currentBulkOperation` on a fixed interval and stream
//! the finished result file through the line decoder.

use crate::cancel::CancellationToken;
use crate::client::GraphqlTransport;
use crate::error::BulkError;
use crate::stream::{open_lines, ByteSource, HttpByteSource, LineOptions, RetrievalPolicy};
use crate::tree::{flat_to_tree, forest_to_values, FlatRecord};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub mod documents;
pub mod operation;
pub mod poll;
pub mod upload;

#[cfg(test)]
pub(crate) mod testing;

pub use operation::{BulkKind, BulkOperation, BulkStatus, UserError};
pub use poll::Poller;
pub use upload::{JsonlPayload, MultipartUploader, StagedParameter, StagedTarget, StagedUploader};

/// Default delay before each status poll
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Shape of bulk query output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputShape {
    /// Records exactly as they appear in the result file, keys in file order
    #[default]
    Flat,
    /// Children nested under their parents
    Tree,
}

/// Tunables shared by every job an orchestrator runs
#[derive(Debug, Clone)]
pub struct BulkOptions {
    pub poll_interval: Duration,
    pub retrieval: RetrievalPolicy,
    pub lines: LineOptions,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            retrieval: RetrievalPolicy::SoftFail,
            lines: LineOptions::default(),
        }
    }
}

/// A finished job and the records of its result file
#[derive(Debug, Clone, PartialEq)]
pub struct BulkResult {
    pub operation: BulkOperation,
    pub records: Vec<Value>,
}

impl BulkResult {
    /// Records in the requested shape
    pub fn shaped(self, shape: OutputShape) -> Result<Vec<Value>, BulkError> {
        match shape {
            OutputShape::Flat => Ok(self.records),
            OutputShape::Tree => {
                let flat = self
                    .records
                    .into_iter()
                    .map(FlatRecord::try_from)
                    .collect::<Result<Vec<_>, _>>()?;
                forest_to_values(&flat_to_tree(&flat))
            }
        }
    }
}

/// Runs bulk jobs over a GraphQL transport, a result byte source and a staged uploader
pub struct BulkOrchestrator<T, S = HttpByteSource, U = MultipartUploader> {
    transport: T,
    source: S,
    uploader: U,
    options: BulkOptions,
    cancel: Option<CancellationToken>,
}

impl<T, S, U> BulkOrchestrator<T, S, U>
where
    T: GraphqlTransport,
    S: ByteSource,
    U: StagedUploader,
{
    pub fn new(transport: T, source: S, uploader: U, options: BulkOptions) -> Self {
        Self {
            transport,
            source,
            uploader,
            options,
            cancel: None,
        }
    }

    /// Stop poll waits when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn options(&self) -> &BulkOptions {
        &self.options
    }

    /// Submit, poll and retrieve a bulk query
    #[instrument(skip_all)]
    pub async fn run_query(&self, query: &str) -> Result<BulkResult, BulkError> {
        let submitted = self.submit_query(query).await?;
        let operation = self.poll(BulkKind::Query, submitted).await?;
        self.finish(operation).await
    }

    /// Stage, upload, submit, poll and retrieve a bulk mutation
    #[instrument(skip_all, fields(lines = payload.len()))]
    pub async fn run_mutation(
        &self,
        mutation: &str,
        payload: &JsonlPayload,
    ) -> Result<BulkResult, BulkError> {
        let target = self.stage_upload().await?;
        let staged_upload_path = target
            .staged_upload_path()
            .ok_or_else(|| {
                BulkError::Submission("Staged upload target has no key parameter".to_string())
            })?
            .to_string();

        self.uploader.upload(&target, payload).await?;

        let submitted = self.submit_mutation(mutation, &staged_upload_path).await?;
        let operation = self.poll(BulkKind::Mutation, submitted).await?;
        self.finish(operation).await
    }

    pub async fn submit_query(&self, query: &str) -> Result<BulkOperation, BulkError> {
        let variables = json!({ "query": query });
        let response = self
            .transport
            .execute(documents::RUN_QUERY, Some(&variables))
            .await?;
        let operation = submitted_operation(&response, "bulkOperationRunQuery")?;
        info!(id = %operation.id, status = %operation.status, "Submitted bulk query");
        Ok(operation)
    }

    /// Request a single staged upload target for mutation variables
    pub async fn stage_upload(&self) -> Result<StagedTarget, BulkError> {
        let response = self
            .transport
            .execute(documents::STAGED_UPLOADS_CREATE, None)
            .await?;
        let payload = operation::submission_payload(&response, "stagedUploadsCreate")?;

        let targets: Vec<StagedTarget> = match payload.get("stagedTargets") {
            Some(Value::Null) | None => Vec::new(),
            Some(targets) => serde_json::from_value(targets.clone())
                .map_err(|e| BulkError::Protocol(format!("Malformed staged targets: {}", e)))?,
        };

        let mut targets = targets.into_iter();
        match (targets.next(), targets.next()) {
            (Some(target), None) => {
                debug!(url = %target.url, "Staged upload target issued");
                Ok(target)
            }
            (None, _) => Err(BulkError::Submission(
                "Expected exactly one staged upload target, got 0".to_string(),
            )),
            (Some(_), Some(_)) => Err(BulkError::Submission(format!(
                "Expected exactly one staged upload target, got {}",
                2 + targets.count()
            ))),
        }
    }

    pub async fn submit_mutation(
        &self,
        mutation: &str,
        staged_upload_path: &str,
    ) -> Result<BulkOperation, BulkError> {
        let variables = json!({
            "mutation": documents::collapse_whitespace(mutation),
            "stagedUploadPath": staged_upload_path,
        });
        let response = self
            .transport
            .execute(documents::RUN_MUTATION, Some(&variables))
            .await?;
        let operation = submitted_operation(&response, "bulkOperationRunMutation")?;
        info!(id = %operation.id, status = %operation.status, "Submitted bulk mutation");
        Ok(operation)
    }

    pub async fn poll(
        &self,
        kind: BulkKind,
        operation: BulkOperation,
    ) -> Result<BulkOperation, BulkError> {
        Poller::new(&self.transport, self.options.poll_interval)
            .with_cancellation(self.cancel.as_ref())
            .run(kind, operation)
            .await
    }

    /// Parse every non-empty line of the result file as one JSON record
    pub async fn retrieve(&self, operation: &BulkOperation) -> Result<Vec<Value>, BulkError> {
        let Some(url) = operation.url.as_deref() else {
            debug!(id = %operation.id, "Bulk operation has no result file");
            return Ok(Vec::new());
        };

        let mut lines =
            open_lines(&self.source, url, &self.options.lines, self.options.retrieval).await?;
        let mut records: Vec<Value> = Vec::new();
        while let Some(line) = lines.next().await {
            let line = line?;
            if !line.is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }

        debug!(id = %operation.id, records = records.len(), "Retrieved bulk results");
        Ok(records)
    }

    async fn finish(&self, operation: BulkOperation) -> Result<BulkResult, BulkError> {
        if operation.status != BulkStatus::Completed {
            warn!(
                id = %operation.id,
                status = %operation.status,
                error_code = operation.error_code.as_deref().unwrap_or(""),
                "Bulk operation ended without completing"
            );
        } else {
            info!(
                id = %operation.id,
                objects = operation.object_count.unwrap_or(0),
                "Bulk operation completed"
            );
        }
        let records = self.retrieve(&operation).await?;
        Ok(BulkResult { operation, records })
    }
}

fn submitted_operation(response: &Value, field: &str) -> Result<BulkOperation, BulkError> {
    let payload = operation::submission_payload(response, field)?;
    match payload.get("bulkOperation") {
        Some(op) if op.is_object() => BulkOperation::from_value(op),
        _ => Err(BulkError::Submission(format!(
            "{} returned no bulk operation",
            field
        ))),
    }
}
