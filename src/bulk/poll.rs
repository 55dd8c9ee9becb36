//! Fixed-interval status polling.

use super::documents::current_bulk_operation;
use super::operation::{graphql_error_messages, BulkKind, BulkOperation};
use crate::cancel::CancellationToken;
use crate::client::GraphqlTransport;
use crate::error::BulkError;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Polls `currentBulkOperation` until the handle is terminal.
///
/// Every poll is preceded by one full interval. There is no backoff and no deadline; only
/// the cancellation token ends a job that never leaves RUNNING.
pub struct Poller<'a, T: ?Sized> {
    transport: &'a T,
    interval: Duration,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, T: GraphqlTransport + ?Sized> Poller<'a, T> {
    pub fn new(transport: &'a T, interval: Duration) -> Self {
        Self {
            transport,
            interval,
            cancel: None,
        }
    }

    pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    pub async fn run(
        &self,
        kind: BulkKind,
        mut operation: BulkOperation,
    ) -> Result<BulkOperation, BulkError> {
        let document = current_bulk_operation(kind);
        let mut polls = 0usize;

        while !operation.is_terminal() {
            self.wait(&operation.id).await?;

            let response = self.transport.execute(&document, None).await?;
            let next = current_operation(&response)?;
            polls += 1;

            if next.id != operation.id {
                warn!(
                    submitted = %operation.id,
                    current = %next.id,
                    "Current bulk operation differs from the submitted one"
                );
            }
            debug!(id = %next.id, status = %next.status, polls, "Polled bulk operation");
            operation = next;
        }

        Ok(operation)
    }

    async fn wait(&self, id: &str) -> Result<(), BulkError> {
        match self.cancel {
            None => {
                tokio::time::sleep(self.interval).await;
                Ok(())
            }
            Some(token) => {
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => Ok(()),
                    _ = token.cancelled() => Err(BulkError::Cancelled(id.to_string())),
                }
            }
        }
    }
}

fn current_operation(response: &Value) -> Result<BulkOperation, BulkError> {
    match response.get("data").and_then(|d| d.get("currentBulkOperation")) {
        Some(op) if op.is_object() => BulkOperation::from_value(op),
        _ => {
            let errors = graphql_error_messages(response);
            Err(BulkError::Protocol(if errors.is_empty() {
                "No current bulk operation".to_string()
            } else {
                format!("No current bulk operation: {}", errors)
            }))
        }
    }
}
