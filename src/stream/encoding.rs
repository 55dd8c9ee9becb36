//! Incremental text decoding.
//!
//! Chunks may end in the middle of a multi-byte sequence; the incomplete tail is held back
//! and prepended to the next chunk.

use crate::error::StreamError;

const REPLACEMENT: char = '\u{FFFD}';
const BOM: char = '\u{FEFF}';

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

impl TextEncoding {
    /// Resolve an encoding label (case-insensitive)
    pub fn from_label(label: &str) -> Result<Self, StreamError> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" | "unicode-1-1-utf-8" => Ok(TextEncoding::Utf8),
            "iso-8859-1" | "latin1" | "latin-1" | "l1" => Ok(TextEncoding::Latin1),
            other => Err(StreamError::UnsupportedEncoding(other.to_string())),
        }
    }
}

/// Streaming decoder for one byte stream
#[derive(Debug)]
pub struct TextDecoder {
    encoding: TextEncoding,
    pending: Vec<u8>,
    started: bool,
}

impl TextDecoder {
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
            started: false,
        }
    }

    /// Decode a chunk, appending complete characters to `out`
    pub fn decode(&mut self, chunk: &[u8], out: &mut String) {
        match self.encoding {
            TextEncoding::Latin1 => out.extend(chunk.iter().map(|&b| char::from(b))),
            TextEncoding::Utf8 => {
                let start = out.len();
                self.decode_utf8(chunk, out);
                self.strip_bom(out, start);
            }
        }
    }

    /// Flush any held-back bytes at end of input
    pub fn finish(&mut self, out: &mut String) {
        if !self.pending.is_empty() {
            self.pending.clear();
            out.push(REPLACEMENT);
        }
    }

    fn decode_utf8(&mut self, chunk: &[u8], out: &mut String) {
        let owned;
        let mut rest: &[u8] = if self.pending.is_empty() {
            chunk
        } else {
            self.pending.extend_from_slice(chunk);
            owned = std::mem::take(&mut self.pending);
            &owned
        };

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&rest[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &rest[valid + len..];
                        }
                        None => {
                            self.pending = rest[valid..].to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn strip_bom(&mut self, out: &mut String, start: usize) {
        if self.started || out.len() == start {
            return;
        }
        self.started = true;
        if out[start..].starts_with(BOM) {
            out.replace_range(start..start + BOM.len_utf8(), "");
        }
    }
}
