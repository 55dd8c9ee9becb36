//! Line delimiters: literal strings or regular expressions.

use crate::error::StreamError;
use regex::Regex;

/// Default pattern: LF with an optional preceding CR
pub const DEFAULT_DELIMITER_PATTERN: &str = r"\r?\n";

/// Separator between lines
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delimiter {
    /// Matched byte-for-byte; must not be empty
    Literal(String),
    /// A `regex` pattern. Searches are always global, so there are no flags to normalize.
    Pattern(String),
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Pattern(DEFAULT_DELIMITER_PATTERN.to_string())
    }
}

impl Delimiter {
    pub fn literal(text: impl Into<String>) -> Self {
        Delimiter::Literal(text.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Delimiter::Pattern(pattern.into())
    }

    /// Compile into a matcher.
    ///
    /// Literals are escaped. Patterns that match an empty input are rejected here; patterns
    /// that only match zero-width inside text (such as `\b`) fail in the decoder at the
    /// first such match.
    pub fn compile(&self) -> Result<Regex, StreamError> {
        let source = match self {
            Delimiter::Literal(text) => {
                if text.is_empty() {
                    return Err(StreamError::InvalidDelimiter(
                        "delimiter cannot be empty string".to_string(),
                    ));
                }
                regex::escape(text)
            }
            Delimiter::Pattern(pattern) => pattern.clone(),
        };

        let matcher = Regex::new(&source)
            .map_err(|e| StreamError::InvalidDelimiter(format!("{}: {}", source, e)))?;

        if matcher.is_match("") {
            return Err(StreamError::InvalidDelimiter(format!(
                "pattern {:?} matches the empty string",
                source
            )));
        }

        Ok(matcher)
    }
}
