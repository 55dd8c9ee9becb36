//! Item Executor
//!
//! Runs a batch of input items against the shop. Each item is either an immediate GraphQL
//! request or a bulk query; its outputs are tagged with the item's index. A bulk mutation
//! instead folds every item's variables into one JSONL upload and produces a single untagged
//! result set.

use crate::bulk::{BulkOrchestrator, JsonlPayload, OutputShape, StagedUploader};
use crate::client::GraphqlTransport;
use crate::error::BulkError;
use crate::stream::ByteSource;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

/// One unit of work
#[derive(Debug, Clone, PartialEq)]
pub enum WorkItem {
    /// Immediate query or mutation; `variables` is raw JSON text
    Graphql {
        document: String,
        variables: Option<String>,
    },
    /// Bulk query, reshaped as requested
    BulkQuery { query: String, output: OutputShape },
}

/// One output record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputItem {
    pub json: Value,
    /// Input item this record came from; `None` for bulk mutation results
    #[serde(rename = "item", skip_serializing_if = "Option::is_none")]
    pub item_index: Option<usize>,
}

impl OutputItem {
    pub fn tagged(json: Value, index: usize) -> Self {
        Self {
            json,
            item_index: Some(index),
        }
    }

    pub fn untagged(json: Value) -> Self {
        Self {
            json,
            item_index: None,
        }
    }

    fn failure(err: &BulkError, index: usize) -> Self {
        Self::tagged(json!({ "error": err.to_string() }), index)
    }
}

/// Runs items sequentially over one orchestrator
pub struct ItemExecutor<'a, T, S, U> {
    orchestrator: &'a BulkOrchestrator<T, S, U>,
    continue_on_fail: bool,
}

impl<'a, T, S, U> ItemExecutor<'a, T, S, U>
where
    T: GraphqlTransport,
    S: ByteSource,
    U: StagedUploader,
{
    pub fn new(orchestrator: &'a BulkOrchestrator<T, S, U>) -> Self {
        Self {
            orchestrator,
            continue_on_fail: false,
        }
    }

    /// Record failures as `{"error": message}` outputs instead of aborting
    pub fn continue_on_fail(mut self, enabled: bool) -> Self {
        self.continue_on_fail = enabled;
        self
    }

    #[instrument(skip_all, fields(items = items.len()))]
    pub async fn execute(&self, items: &[WorkItem]) -> Result<Vec<OutputItem>, BulkError> {
        let mut outputs = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match self.execute_item(index, item).await {
                Ok(mut produced) => outputs.append(&mut produced),
                Err(err) => outputs.push(self.recover(err, index)?),
            }
        }
        Ok(outputs)
    }

    /// Fold every item's variables into one bulk mutation.
    ///
    /// Items whose variables are not valid JSON either abort the batch or, with
    /// `continue_on_fail`, are reported and left out of the upload.
    #[instrument(skip_all, fields(items = variables.len()))]
    pub async fn execute_bulk_mutation(
        &self,
        mutation: &str,
        variables: &[String],
    ) -> Result<Vec<OutputItem>, BulkError> {
        let mut outputs = Vec::new();
        let mut payload = JsonlPayload::new();
        for (index, raw) in variables.iter().enumerate() {
            if let Err(err) = payload.push_str(raw) {
                outputs.push(self.recover(err, index)?);
            }
        }

        info!(lines = payload.len(), "Running bulk mutation");
        let result = self.orchestrator.run_mutation(mutation, &payload).await?;
        outputs.extend(result.records.into_iter().map(OutputItem::untagged));
        Ok(outputs)
    }

    async fn execute_item(
        &self,
        index: usize,
        item: &WorkItem,
    ) -> Result<Vec<OutputItem>, BulkError> {
        match item {
            WorkItem::Graphql {
                document,
                variables,
            } => {
                let variables = match variables.as_deref().map(str::trim) {
                    Some(raw) if !raw.is_empty() => Some(serde_json::from_str::<Value>(raw)?),
                    _ => None,
                };
                let response = self
                    .orchestrator
                    .transport()
                    .execute(document, variables.as_ref())
                    .await?;
                Ok(vec![OutputItem::tagged(response, index)])
            }
            WorkItem::BulkQuery { query, output } => {
                let result = self.orchestrator.run_query(query).await?;
                Ok(result
                    .shaped(*output)?
                    .into_iter()
                    .map(|record| OutputItem::tagged(record, index))
                    .collect())
            }
        }
    }

    fn recover(&self, err: BulkError, index: usize) -> Result<OutputItem, BulkError> {
        if self.continue_on_fail {
            warn!(item = index, error = %err, "Item failed; continuing");
            Ok(OutputItem::failure(&err, index))
        } else {
            Err(err.for_item(index))
        }
    }
}
