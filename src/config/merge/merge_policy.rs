//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("shop.api_version", crate::client::DEFAULT_API_VERSION)?
        .set_default("auth.mode", "api_key")?
        .set_default("bulk.poll_interval_ms", 1000_i64)?
        .set_default("bulk.retrieval", "soft_fail")?
        .set_default("bulk.output", "flat")
}
