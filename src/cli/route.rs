//! CLI route: single route table and run context. Dispatches to domain services and presentation.

use crate::bulk::{BulkOrchestrator, MultipartUploader, OutputShape};
use crate::cancel::CancellationToken;
use crate::cli::parse::{Cli, Commands, ShapeArg};
use crate::cli::presentation::{format_json_lines, format_output_items};
use crate::cli::{command_name, help::needs_shop};
use crate::client::{build_http_client, AuthMode, ShopifyClient};
use crate::config::{BulkConfig, ConfigLoader};
use crate::error::BulkError;
use crate::executor::{ItemExecutor, WorkItem};
use crate::stream::{
    collect_lines, open_lines, Delimiter, HttpByteSource, LineDecoder, LineOptions,
    RetrievalPolicy,
};
use crate::tree::{flat_to_tree, forest_to_values, FlatRecord};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: loaded configuration and the cancellation token.
pub struct RunContext {
    config: BulkConfig,
    cancel: CancellationToken,
}

impl RunContext {
    /// Load configuration from the workspace (or an explicit file) and fold in CLI overrides
    pub fn new(cli: &Cli) -> Result<Self, BulkError> {
        let mut config = match &cli.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&cli.workspace)?,
        };

        if let Some(shop) = &cli.shop {
            config.shop.subdomain = shop.clone();
        }
        if let Some(version) = &cli.api_version {
            config.shop.api_version = version.clone();
        }
        if let Some(mode) = &cli.auth_mode {
            config.auth.mode = mode.parse::<AuthMode>()?;
        }
        if let Some(endpoint) = &cli.endpoint {
            config.shop.endpoint = Some(endpoint.clone());
        }

        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &BulkConfig {
        &self.config
    }

    /// Token that stops bulk polling; the binary cancels it on Ctrl-C
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Execute a CLI command via the single route table.
    pub async fn execute(&self, command: &Commands) -> Result<String, BulkError> {
        let started = Instant::now();
        if needs_shop(command) {
            self.config.ensure_valid()?;
        }

        let result = match command {
            Commands::Query {
                document,
                variables,
                input,
                continue_on_fail,
                with_index,
            } => {
                let document = read_text_arg(document)?;
                let items: Vec<WorkItem> = match (input, variables) {
                    (Some(path), _) => read_jsonl_items(path)?
                        .into_iter()
                        .map(|variables| WorkItem::Graphql {
                            document: document.clone(),
                            variables: Some(variables),
                        })
                        .collect(),
                    (None, variables) => vec![WorkItem::Graphql {
                        document,
                        variables: variables.as_deref().map(read_text_arg).transpose()?,
                    }],
                };
                let bulk = self.orchestrator()?;
                let outputs = ItemExecutor::new(&bulk)
                    .continue_on_fail(*continue_on_fail)
                    .execute(&items)
                    .await?;
                format_output_items(&outputs, *with_index)
            }
            Commands::BulkQuery { query, output } => {
                let output = match output {
                    Some(ShapeArg::Flat) => OutputShape::Flat,
                    Some(ShapeArg::Tree) => OutputShape::Tree,
                    None => self.config.bulk.output,
                };
                let items = [WorkItem::BulkQuery {
                    query: read_text_arg(query)?,
                    output,
                }];
                let bulk = self.orchestrator()?;
                let outputs = ItemExecutor::new(&bulk).execute(&items).await?;
                format_output_items(&outputs, false)
            }
            Commands::BulkMutation {
                mutation,
                input,
                continue_on_fail,
            } => {
                let mutation = read_text_arg(mutation)?;
                let variables = read_jsonl_items(input)?;
                let bulk = self.orchestrator()?;
                let outputs = ItemExecutor::new(&bulk)
                    .continue_on_fail(*continue_on_fail)
                    .execute_bulk_mutation(&mutation, &variables)
                    .await?;
                format_output_items(&outputs, *continue_on_fail)
            }
            Commands::Lines {
                url,
                delimiter,
                pattern,
                encoding,
                skip_last_empty_line,
                strict,
            } => {
                let options = LineOptions {
                    include_last_empty_line: !skip_last_empty_line,
                    encoding: encoding.clone(),
                    delimiter: match (delimiter, pattern) {
                        (Some(literal), _) => Delimiter::literal(literal.clone()),
                        (None, Some(pattern)) => Delimiter::pattern(pattern.clone()),
                        (None, None) => Delimiter::default(),
                    },
                };
                let policy = if *strict {
                    RetrievalPolicy::Propagate
                } else {
                    RetrievalPolicy::SoftFail
                };
                let source = HttpByteSource::new(build_http_client(&self.config.http)?);
                let lines = collect_lines(open_lines(&source, url, &options, policy).await?).await?;
                Ok(lines.join("\n"))
            }
            Commands::Tree { file, pretty } => {
                let records = read_flat_records(file).await?;
                let forest = forest_to_values(&flat_to_tree(&records))?;
                format_json_lines(&forest, *pretty)
            }
            Commands::Config { validate } => {
                if *validate {
                    self.config.ensure_valid()?;
                    Ok("Configuration is valid".to_string())
                } else {
                    self.config.redacted().to_toml()
                }
            }
        };

        debug!(
            command = command_name(command),
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn orchestrator(&self) -> Result<BulkOrchestrator<ShopifyClient>, BulkError> {
        let http = build_http_client(&self.config.http)?;
        let shop = &self.config.shop;

        let mut builder =
            ShopifyClient::from_store(&self.config, self.config.auth.mode, &shop.api_version)?
                .http_client(http.clone());
        if let Some(endpoint) = &shop.endpoint {
            builder = builder.endpoint(endpoint.clone());
        }
        if let Some(token_url) = &shop.token_url {
            builder = builder.token_url(token_url.clone());
        }
        let client = builder.build()?;
        info!(endpoint = %client.endpoint(), mode = %client.mode(), "Shop client ready");

        Ok(BulkOrchestrator::new(
            client,
            HttpByteSource::new(http.clone()),
            MultipartUploader::new(http),
            self.config.bulk.options(),
        )
        .with_cancellation(self.cancel.clone()))
    }
}

/// Inline text, or the contents of a file when prefixed with `@`
fn read_text_arg(arg: &str) -> Result<String, BulkError> {
    match arg.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| BulkError::Config(format!("Failed to read {}: {}", path, e))),
        None => Ok(arg.to_string()),
    }
}

/// Non-blank lines of a JSONL input file, unparsed
fn read_jsonl_items(path: &Path) -> Result<Vec<String>, BulkError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BulkError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    Ok(text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Decode a local JSONL result file with the same line decoder used for remote results
async fn read_flat_records(path: &PathBuf) -> Result<Vec<FlatRecord>, BulkError> {
    let bytes = std::fs::read(path)
        .map_err(|e| BulkError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    let decoder = LineDecoder::from_chunks(vec![Bytes::from(bytes)], &LineOptions::default())?;
    let lines = collect_lines(decoder.into_stream()).await?;

    lines
        .iter()
        .filter(|line| !line.is_empty())
        .map(|line| FlatRecord::parse_line(line))
        .collect()
}
