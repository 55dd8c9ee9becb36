//! Error types for bulk operations and result streaming.

use thiserror::Error;

/// Errors raised while opening or decoding a line stream
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid protocol: {0}. The URL must start with \"http://\" or \"https://\"")]
    InvalidScheme(String),

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid delimiter: {0}")]
    InvalidDelimiter(String),

    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("Failed to read response body: {0}")]
    Body(String),
}

impl StreamError {
    /// Whether this failure is one the soft-fail retrieval policy may swallow
    pub fn is_transport(&self) -> bool {
        matches!(self, StreamError::Transport(_) | StreamError::Body(_))
    }
}

/// Errors raised by the remote client, the bulk orchestrator and the item executor
#[derive(Debug, Error)]
pub enum BulkError {
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("Submission failed: {0}")]
    Submission(String),

    #[error("Upload failed: {status} {body}")]
    Upload { status: String, body: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Bulk operation {0} was cancelled while polling")]
    Cancelled(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Item {index}: {source}")]
    Item {
        index: usize,
        #[source]
        source: Box<BulkError>,
    },
}

impl BulkError {
    /// Attach the originating input index to an error, keeping an existing index
    pub fn for_item(self, index: usize) -> Self {
        match self {
            BulkError::Item { .. } => self,
            other => BulkError::Item {
                index,
                source: Box::new(other),
            },
        }
    }
}

impl From<reqwest::Error> for BulkError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            BulkError::HttpStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_timeout() {
            BulkError::Http(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            BulkError::Http(format!("Connection error: {}", err))
        } else {
            BulkError::Http(err.to_string())
        }
    }
}

impl From<serde_json::Error> for BulkError {
    fn from(err: serde_json::Error) -> Self {
        BulkError::Json(err.to_string())
    }
}

impl From<config::ConfigError> for BulkError {
    fn from(err: config::ConfigError) -> Self {
        BulkError::Config(err.to_string())
    }
}
