//! shopify-bulk CLI Binary
//!
//! Command-line interface for Shopify Admin GraphQL requests and bulk operations.

use anyhow::{anyhow, Context};
use clap::Parser;
use shopify_bulk::cli::{command_name, map_error, Cli, RunContext};
use shopify_bulk::config::ConfigLoader;
use shopify_bulk::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info, warn};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("shopify-bulk starting");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            process::exit(1);
        }
    };

    match runtime.block_on(run(&cli)) {
        Ok(output) => {
            info!("Command completed successfully");
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{:#}", e);
            process::exit(1);
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<String> {
    let context = RunContext::new(cli).map_err(|e| anyhow!(map_error(&e)))?;

    // Ctrl-C stops bulk polling at the next wait
    let token = context.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; cancelling");
            token.cancel();
        }
    });

    context
        .execute(&cli.command)
        .await
        .map_err(|e| anyhow!(map_error(&e)))
        .with_context(|| format!("{} failed", command_name(&cli.command)))
}

/// Build logging configuration from CLI args, environment, and config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    // Without --verbose only warnings reach the terminal
    if !cli.verbose && cli.log_level.is_none() {
        config.level = "warn".to_string();
    }

    // Override with CLI arguments (highest priority)
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(format) = cli.log_format.as_deref().and_then(|f| f.parse().ok()) {
        config.format = format;
    }
    if let Some(output) = cli.log_output.as_deref().and_then(|o| o.parse().ok()) {
        config.output = output;
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }

    config
}
