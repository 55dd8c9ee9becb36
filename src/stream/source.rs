//! Byte sources for line streams.

use super::{ByteStream, LineDecoder, LineOptions, LineStream, RetrievalPolicy};
use crate::error::StreamError;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};
use url::Url;

/// Opens a URL as a stream of raw chunks
#[async_trait]
pub trait ByteSource: Send + Sync {
    async fn open(&self, url: &str) -> Result<ByteStream, StreamError>;
}

/// Parse a URL and require an http or https scheme
pub fn validate_url(url: &str) -> Result<Url, StreamError> {
    let parsed = Url::parse(url).map_err(|e| StreamError::InvalidUrl {
        url: url.to_string(),
        message: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(StreamError::InvalidScheme(format!("{}:", other))),
    }
}

/// Fetches result files over HTTP(S) with a plain GET
#[derive(Debug, Clone, Default)]
pub struct HttpByteSource {
    client: Client,
}

impl HttpByteSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ByteSource for HttpByteSource {
    async fn open(&self, url: &str) -> Result<ByteStream, StreamError> {
        let url = validate_url(url)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StreamError::Transport(format!("HTTP Status: {}", status)));
        }
        if status == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            return Err(StreamError::Transport("Response body is empty".to_string()));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| StreamError::Body(e.to_string())));
        Ok(Box::pin(chunks))
    }
}

/// Open `url` and decode it into lines.
///
/// Options are validated before the source is touched. Under
/// [`RetrievalPolicy::SoftFail`] a source that cannot be opened yields an empty stream;
/// invalid URLs, schemes, delimiters and encodings always fail.
pub async fn open_lines(
    source: &dyn ByteSource,
    url: &str,
    options: &LineOptions,
    policy: RetrievalPolicy,
) -> Result<LineStream, StreamError> {
    options.delimiter.compile()?;
    super::TextEncoding::from_label(&options.encoding)?;
    validate_url(url)?;

    match source.open(url).await {
        Ok(bytes) => {
            debug!(url = %url, "Opened result stream");
            Ok(LineDecoder::new(bytes, options)?.into_stream())
        }
        Err(e) if e.is_transport() && policy == RetrievalPolicy::SoftFail => {
            warn!(url = %url, error = %e, "Result stream unavailable; treating as empty");
            Ok(Box::pin(futures::stream::empty::<Result<String, StreamError>>()))
        }
        Err(e) => Err(e),
    }
}
