//! CLI help and command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for log fields (e.g. "bulk-query").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Query { .. } => "query",
        Commands::BulkQuery { .. } => "bulk-query",
        Commands::BulkMutation { .. } => "bulk-mutation",
        Commands::Lines { .. } => "lines",
        Commands::Tree { .. } => "tree",
        Commands::Config { .. } => "config",
    }
}

/// Whether the command talks to the shop and so needs a valid shop config
pub fn needs_shop(command: &Commands) -> bool {
    matches!(
        command,
        Commands::Query { .. } | Commands::BulkQuery { .. } | Commands::BulkMutation { .. }
    )
}
