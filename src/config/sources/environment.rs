//! Environment source: SHOPIFY_BULK__SECTION__KEY

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub const PREFIX: &str = "SHOPIFY_BULK";

/// `SHOPIFY_BULK__SHOP__SUBDOMAIN=demo` sets `shop.subdomain`
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(builder.add_source(
        Environment::with_prefix(PREFIX)
            .prefix_separator("__")
            .separator("__"),
    ))
}
