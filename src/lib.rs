//! shopify-bulk: Shopify Admin GraphQL Bulk Operations
//!
//! Submits bulk queries and bulk mutations to the Shopify Admin API, polls them to completion
//! and streams their JSONL results line by line, optionally rebuilding the nested record
//! hierarchy that bulk queries flatten.

pub mod bulk;
pub mod cancel;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod stream;
pub mod tree;

pub use bulk::{BulkOperation, BulkOrchestrator, BulkResult, BulkStatus, OutputShape};
pub use cancel::CancellationToken;
pub use client::{GraphqlTransport, ShopifyClient};
pub use error::{BulkError, StreamError};
pub use executor::{ItemExecutor, OutputItem, WorkItem};
