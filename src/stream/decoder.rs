//! Rolling-buffer line decoder.

use super::{ByteStream, LineOptions, LineStream, TextDecoder, TextEncoding};
use crate::error::StreamError;
use bytes::Bytes;
use futures::StreamExt;
use regex::Regex;

/// Splits a byte stream into lines under a delimiter.
///
/// The buffer only ever holds the unconsumed remainder plus the latest chunk; the consumed
/// prefix is dropped before more bytes are appended.
pub struct LineDecoder {
    source: ByteStream,
    text: TextDecoder,
    matcher: Regex,
    include_last_empty_line: bool,
    buffer: String,
    offset: usize,
    exhausted: bool,
    finished: bool,
}

impl LineDecoder {
    /// Validate options and wrap a byte stream
    pub fn new(source: ByteStream, options: &LineOptions) -> Result<Self, StreamError> {
        let matcher = options.delimiter.compile()?;
        let encoding = TextEncoding::from_label(&options.encoding)?;
        Ok(Self {
            source,
            text: TextDecoder::new(encoding),
            matcher,
            include_last_empty_line: options.include_last_empty_line,
            buffer: String::new(),
            offset: 0,
            exhausted: false,
            finished: false,
        })
    }

    /// Decoder over in-memory chunks
    pub fn from_chunks<I>(chunks: I, options: &LineOptions) -> Result<Self, StreamError>
    where
        I: IntoIterator + 'static,
        I::Item: Into<Bytes> + 'static,
        I::IntoIter: Send + 'static,
    {
        let stream = futures::stream::iter(
            chunks
                .into_iter()
                .map(|chunk| Ok::<Bytes, StreamError>(chunk.into())),
        );
        Self::new(Box::pin(stream), options)
    }

    /// Next line, or `None` once the source is drained.
    ///
    /// After an error the decoder is finished and yields nothing further.
    pub async fn next_line(&mut self) -> Result<Option<String>, StreamError> {
        loop {
            if self.finished {
                return Ok(None);
            }

            if let Some(found) = self.matcher.find_at(&self.buffer, self.offset) {
                // A zero-width match (e.g. `\b`) never advances the offset
                if found.start() == found.end() {
                    self.finished = true;
                    return Err(StreamError::InvalidDelimiter(format!(
                        "pattern {:?} matched the empty string at offset {}",
                        self.matcher.as_str(),
                        found.start()
                    )));
                }
                let line = self.buffer[self.offset..found.start()].to_string();
                self.offset = found.end();
                return Ok(Some(line));
            }

            if self.exhausted {
                self.finished = true;
                let remainder = &self.buffer[self.offset..];
                if self.include_last_empty_line || !remainder.is_empty() {
                    let line = remainder.to_string();
                    self.buffer.clear();
                    self.offset = 0;
                    return Ok(Some(line));
                }
                return Ok(None);
            }

            self.buffer.drain(..self.offset);
            self.offset = 0;

            match self.source.next().await {
                Some(Ok(chunk)) => self.text.decode(&chunk, &mut self.buffer),
                Some(Err(e)) => {
                    self.finished = true;
                    return Err(e);
                }
                None => {
                    self.exhausted = true;
                    self.text.finish(&mut self.buffer);
                }
            }
        }
    }

    /// Convert into a boxed stream of lines
    pub fn into_stream(self) -> LineStream {
        Box::pin(futures::stream::unfold(self, |mut decoder| async move {
            match decoder.next_line().await {
                Ok(Some(line)) => Some((Ok(line), decoder)),
                Ok(None) => None,
                Err(e) => Some((Err(e), decoder)),
            }
        }))
    }
}
