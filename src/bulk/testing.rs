//! Scripted transport, source and uploader for unit tests.

use super::{BulkOptions, BulkOrchestrator, JsonlPayload, StagedTarget, StagedUploader};
use crate::client::GraphqlTransport;
use crate::error::{BulkError, StreamError};
use crate::stream::{ByteSource, ByteStream};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// Replays canned responses and records every request
#[derive(Default)]
pub(crate) struct MockTransport {
    pub(crate) responses: Mutex<VecDeque<Value>>,
    pub(crate) requests: Mutex<Vec<(String, Option<Value>)>>,
}

impl MockTransport {
    pub(crate) fn new(responses: Vec<Value>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        }
    }

    /// Requests whose document contains `needle`
    pub(crate) fn count(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|(q, _)| q.contains(needle))
            .count()
    }
}

#[async_trait]
impl GraphqlTransport for MockTransport {
    async fn execute(&self, query: &str, variables: Option<&Value>) -> Result<Value, BulkError> {
        self.requests
            .lock()
            .push((query.to_string(), variables.cloned()));
        self.responses
            .lock()
            .pop_front()
            .ok_or_else(|| BulkError::Protocol("script exhausted".to_string()))
    }
}

/// Serves a fixed body in three-byte chunks
pub(crate) struct MockSource {
    pub(crate) body: &'static str,
    pub(crate) opened: Mutex<Vec<String>>,
}

#[async_trait]
impl ByteSource for MockSource {
    async fn open(&self, url: &str) -> Result<ByteStream, StreamError> {
        self.opened.lock().push(url.to_string());
        let chunks: Vec<Result<Bytes, StreamError>> = self
            .body
            .as_bytes()
            .chunks(3)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

#[derive(Default)]
pub(crate) struct MockUploader {
    pub(crate) uploads: Mutex<Vec<(String, Vec<String>)>>,
}

#[async_trait]
impl StagedUploader for MockUploader {
    async fn upload(&self, target: &StagedTarget, payload: &JsonlPayload) -> Result<(), BulkError> {
        self.uploads
            .lock()
            .push((target.url.clone(), payload.lines().to_vec()));
        Ok(())
    }
}

/// `currentBulkOperation` response for operation `gid://op/1`
pub(crate) fn status(status: &str, url: Option<&str>) -> Value {
    json!({"data": {"currentBulkOperation": {"id": "gid://op/1", "status": status, "url": url}}})
}

pub(crate) fn orchestrator(
    responses: Vec<Value>,
    body: &'static str,
) -> BulkOrchestrator<MockTransport, MockSource, MockUploader> {
    BulkOrchestrator::new(
        MockTransport::new(responses),
        MockSource {
            body,
            opened: Mutex::default(),
        },
        MockUploader::default(),
        BulkOptions::default(),
    )
}
