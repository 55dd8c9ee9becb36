//! Line Streaming
//!
//! Turns a remote byte stream into a lazy sequence of text lines. Delimiter matches are
//! searched over a rolling decoded buffer, so neither delimiters nor multi-byte characters
//! need to line up with the chunks the transport happens to deliver.

use crate::error::StreamError;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

mod decoder;
mod delimiter;
mod encoding;
mod source;

pub use decoder::LineDecoder;
pub use delimiter::Delimiter;
pub use encoding::{TextDecoder, TextEncoding};
pub use source::{open_lines, validate_url, ByteSource, HttpByteSource};

/// Raw chunks as delivered by a byte source
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, StreamError>> + Send>>;

/// Decoded lines; forward-only and not restartable
pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, StreamError>> + Send>>;

/// Decoding options for a line stream
#[derive(Debug, Clone)]
pub struct LineOptions {
    /// Yield the text after the last delimiter even when it is empty
    pub include_last_empty_line: bool,
    /// Encoding label, e.g. `utf-8` or `iso-8859-1`
    pub encoding: String,
    pub delimiter: Delimiter,
}

impl Default for LineOptions {
    fn default() -> Self {
        Self {
            include_last_empty_line: true,
            encoding: "utf-8".to_string(),
            delimiter: Delimiter::default(),
        }
    }
}

/// What to do when a result stream cannot be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalPolicy {
    /// Treat an unreachable result URL as an empty result
    #[default]
    SoftFail,
    /// Surface transport failures to the caller
    Propagate,
}

/// Collect every line of a stream, stopping at the first error
pub async fn collect_lines(mut lines: LineStream) -> Result<Vec<String>, StreamError> {
    use futures::StreamExt;

    let mut collected = Vec::new();
    while let Some(line) = lines.next().await {
        collected.push(line?);
    }
    Ok(collected)
}
