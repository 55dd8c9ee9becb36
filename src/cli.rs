//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to domain services.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::{command_name, needs_shop};
pub use output::map_error;
pub use parse::{Cli, Commands, ShapeArg};
pub use presentation::{format_json_lines, format_output_items};
pub use route::RunContext;
