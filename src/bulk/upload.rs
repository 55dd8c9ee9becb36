//! Staged upload of bulk mutation variables.

use crate::error::BulkError;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

/// Content type of the uploaded variables file
pub const JSONL_MIME: &str = "text/jsonl";

/// One JSON object per line, the input format of a bulk mutation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonlPayload {
    lines: Vec<String>,
}

impl JsonlPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one item as a compact JSON line
    pub fn push(&mut self, variables: &Value) -> Result<(), BulkError> {
        self.lines.push(serde_json::to_string(variables)?);
        Ok(())
    }

    /// Append raw JSON text; it is parsed and re-serialized compactly
    pub fn push_str(&mut self, raw: &str) -> Result<(), BulkError> {
        let value: Value = serde_json::from_str(raw)?;
        self.push(&value)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// File body: every line terminated by `\n`
    pub fn to_bytes(&self) -> Bytes {
        let mut body = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            body.push_str(line);
            body.push('\n');
        }
        Bytes::from(body)
    }
}

impl FromIterator<Value> for JsonlPayload {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(|v| v.to_string()).collect(),
        }
    }
}

/// A signed form field of a staged target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedParameter {
    pub name: String,
    pub value: String,
}

/// Upload destination issued by `stagedUploadsCreate`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedTarget {
    pub url: String,
    #[serde(default)]
    pub resource_url: Option<String>,
    #[serde(default)]
    pub parameters: Vec<StagedParameter>,
}

impl StagedTarget {
    /// Value of the `key` parameter, passed on as `stagedUploadPath`
    pub fn staged_upload_path(&self) -> Option<&str> {
        self.parameters
            .iter()
            .rev()
            .find(|p| p.name == "key")
            .map(|p| p.value.as_str())
    }
}

/// Sends a payload to a staged target
#[async_trait]
pub trait StagedUploader: Send + Sync {
    async fn upload(
        &self,
        target: &StagedTarget,
        payload: &JsonlPayload,
    ) -> Result<(), BulkError>;
}

/// Multipart form POST: signed fields in order, then the `file` part
#[derive(Debug, Clone, Default)]
pub struct MultipartUploader {
    client: Client,
}

impl MultipartUploader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StagedUploader for MultipartUploader {
    #[instrument(skip_all, fields(url = %target.url, lines = payload.len()))]
    async fn upload(
        &self,
        target: &StagedTarget,
        payload: &JsonlPayload,
    ) -> Result<(), BulkError> {
        let mut form = Form::new();
        for parameter in &target.parameters {
            form = form.text(parameter.name.clone(), parameter.value.clone());
        }
        let file = Part::bytes(payload.to_bytes().to_vec())
            .file_name("bulk_op_vars")
            .mime_str(JSONL_MIME)
            .map_err(|e| BulkError::Http(format!("Invalid upload content type: {}", e)))?;
        form = form.part("file", file);

        let response = self.client.post(&target.url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BulkError::Upload {
                status: status.to_string(),
                body,
            });
        }

        debug!(status = %status, "Uploaded bulk mutation variables");
        Ok(())
    }
}
