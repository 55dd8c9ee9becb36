//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::{BulkError, StreamError};

/// Map domain errors to a message for CLI output, prefixed with a stable category.
pub fn map_error(e: &BulkError) -> String {
    let category = match e {
        BulkError::Item { index, source } => {
            return format!("{} (item {})", map_error(source), index)
        }
        BulkError::Stream(StreamError::InvalidScheme(_) | StreamError::InvalidUrl { .. }) => {
            "invalid-url"
        }
        BulkError::Stream(_) => "stream",
        BulkError::Submission(_) => "submission",
        BulkError::Upload { .. } => "upload",
        BulkError::Http(_) | BulkError::HttpStatus { .. } => "http",
        BulkError::Auth(_) => "auth",
        BulkError::Json(_) | BulkError::Protocol(_) => "response",
        BulkError::Cancelled(_) => "cancelled",
        BulkError::Config(_) => "config",
    };
    format!("error[{}]: {}", category, e)
}
