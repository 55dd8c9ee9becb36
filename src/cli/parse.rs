//! CLI parse: clap types for shopify-bulk. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// shopify-bulk - Shopify Admin GraphQL queries and bulk operations
#[derive(Parser)]
#[command(name = "shopify-bulk")]
#[command(about = "Run Shopify Admin GraphQL requests and bulk operations, streaming JSONL results")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (holds config/config.toml)
    #[arg(long, default_value = ".", global = true)]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Shop subdomain ({shop}.myshopify.com)
    #[arg(long, global = true)]
    pub shop: Option<String>,

    /// Admin API version, e.g. 2025-07
    #[arg(long, global = true)]
    pub api_version: Option<String>,

    /// Authentication mode (api_key, access_token, oauth2)
    #[arg(long, global = true)]
    pub auth_mode: Option<String>,

    /// GraphQL endpoint override
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Enable verbose logging (default: warnings only)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long, global = true)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run an immediate GraphQL query or mutation once per input item
    Query {
        /// GraphQL document, or @path to read it from a file
        document: String,
        /// Variables as inline JSON, or @path
        #[arg(long, conflicts_with = "input")]
        variables: Option<String>,
        /// JSONL file with one variables object per item
        #[arg(long)]
        input: Option<PathBuf>,
        /// Record per-item failures as {"error": ...} and keep going
        #[arg(long)]
        continue_on_fail: bool,
        /// Prefix each output with its input item index
        #[arg(long)]
        with_index: bool,
    },
    /// Run a bulk query and stream its records
    BulkQuery {
        /// Query body to run in bulk, or @path
        query: String,
        /// Output shape (defaults to bulk.output from config)
        #[arg(long, value_enum)]
        output: Option<ShapeArg>,
    },
    /// Upload one variables object per input line and run a bulk mutation over them
    BulkMutation {
        /// Mutation document, or @path
        mutation: String,
        /// JSONL file with one variables object per line
        #[arg(long)]
        input: PathBuf,
        /// Skip input lines that are not valid JSON instead of aborting
        #[arg(long)]
        continue_on_fail: bool,
    },
    /// Fetch a remote file and print it line by line
    Lines {
        /// http(s) URL of the file
        url: String,
        /// Literal delimiter (default: \r?\n pattern)
        #[arg(long, conflicts_with = "pattern")]
        delimiter: Option<String>,
        /// Regular expression delimiter
        #[arg(long)]
        pattern: Option<String>,
        /// Text encoding (utf-8, iso-8859-1)
        #[arg(long, default_value = "utf-8")]
        encoding: String,
        /// Drop an empty final line
        #[arg(long)]
        skip_last_empty_line: bool,
        /// Fail on transport errors instead of printing nothing
        #[arg(long)]
        strict: bool,
    },
    /// Rebuild the hierarchy of a local bulk query result file
    Tree {
        /// JSONL file with __parentId/__typename records
        file: PathBuf,
        /// Pretty-print each root
        #[arg(long)]
        pretty: bool,
    },
    /// Show the effective configuration (secrets masked)
    Config {
        /// Only validate and report problems
        #[arg(long)]
        validate: bool,
    },
}

/// Output shape flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ShapeArg {
    Flat,
    Tree,
}
