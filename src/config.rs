//! Configuration System
//!
//! Layered configuration for shop access, authentication, bulk job tuning, HTTP timeouts and
//! logging. Sources merge in order: built-in defaults, the global config file, workspace
//! `config/config.toml`, `config/{SHOPIFY_BULK_ENV}.toml`, then `SHOPIFY_BULK__*` environment
//! variables.

use crate::bulk::{BulkOptions, OutputShape};
use crate::client::{AuthMode, CredentialStore, Credentials, DEFAULT_API_VERSION};
use crate::error::BulkError;
use crate::logging::LoggingConfig;
use crate::stream::{LineOptions, RetrievalPolicy};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::global_file::global_config_path;

const REDACTED: &str = "***";

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkConfig {
    #[serde(default)]
    pub shop: ShopConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub bulk: BulkSettings,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which shop to talk to and through which API version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShopConfig {
    /// `{subdomain}.myshopify.com`
    #[serde(default)]
    pub subdomain: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Full GraphQL endpoint, replacing the one derived from the subdomain
    #[serde(default)]
    pub endpoint: Option<String>,

    /// OAuth token endpoint, replacing the one derived from the subdomain
    #[serde(default)]
    pub token_url: Option<String>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

impl Default for ShopConfig {
    fn default() -> Self {
        Self {
            subdomain: String::new(),
            api_version: default_api_version(),
            endpoint: None,
            token_url: None,
        }
    }
}

/// Credentials for every mode; `mode` picks the ones in use
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl AuthConfig {
    fn missing(&self, mode: AuthMode) -> Vec<&'static str> {
        let absent = |v: &Option<String>| v.as_deref().map_or(true, str::is_empty);
        let mut missing = Vec::new();
        match mode {
            AuthMode::ApiKey => {
                if absent(&self.api_key) {
                    missing.push("api_key");
                }
                if absent(&self.password) {
                    missing.push("password");
                }
            }
            AuthMode::AccessToken => {
                if absent(&self.access_token) {
                    missing.push("access_token");
                }
            }
            AuthMode::OAuth2 => {
                // A pre-issued token stands in for the client credentials
                if absent(&self.access_token) {
                    if absent(&self.client_id) {
                        missing.push("client_id");
                    }
                    if absent(&self.client_secret) {
                        missing.push("client_secret");
                    }
                }
            }
        }
        missing
    }
}

/// Bulk job tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSettings {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// What happens when a result file cannot be fetched
    #[serde(default)]
    pub retrieval: RetrievalPolicy,

    /// Default shape of bulk query output
    #[serde(default)]
    pub output: OutputShape,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            retrieval: RetrievalPolicy::default(),
            output: OutputShape::default(),
        }
    }
}

impl BulkSettings {
    pub fn options(&self) -> BulkOptions {
        BulkOptions {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            retrieval: self.retrieval,
            lines: LineOptions::default(),
        }
    }
}

/// HTTP client timeouts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout; result downloads must finish within it
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    300
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    Shop(String),
    Auth(String),
    Bulk(String),
    Http(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Shop(msg) => write!(f, "shop: {}", msg),
            ValidationError::Auth(msg) => write!(f, "auth: {}", msg),
            ValidationError::Bulk(msg) => write!(f, "bulk: {}", msg),
            ValidationError::Http(msg) => write!(f, "http: {}", msg),
            ValidationError::Logging(msg) => write!(f, "logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl BulkConfig {
    /// Validate the entire configuration, reporting every problem
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.shop.subdomain.trim().is_empty() && self.shop.endpoint.is_none() {
            errors.push(ValidationError::Shop(
                "subdomain is required unless an endpoint is set".to_string(),
            ));
        }
        if self.shop.api_version.trim().is_empty() {
            errors.push(ValidationError::Shop("api_version cannot be empty".to_string()));
        }
        if let Some(endpoint) = &self.shop.endpoint {
            if let Err(e) = crate::stream::validate_url(endpoint) {
                errors.push(ValidationError::Shop(format!("endpoint: {}", e)));
            }
        }

        let missing = self.auth.missing(self.auth.mode);
        if !missing.is_empty() {
            errors.push(ValidationError::Auth(format!(
                "mode {} requires {}",
                self.auth.mode,
                missing.join(", ")
            )));
        }

        if self.bulk.poll_interval_ms == 0 {
            errors.push(ValidationError::Bulk(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.http.connect_timeout_secs == 0 || self.http.request_timeout_secs == 0 {
            errors.push(ValidationError::Http("timeouts must be greater than zero".to_string()));
        }

        if let Err(e) = self.logging.validate() {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fold validation problems into one error
    pub fn ensure_valid(&self) -> Result<(), BulkError> {
        self.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            BulkError::Config(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })
    }

    /// Copy with every secret masked, for display
    pub fn redacted(&self) -> Self {
        let mask = |v: &Option<String>| v.as_ref().map(|_| REDACTED.to_string());
        let mut copy = self.clone();
        copy.auth.api_key = mask(&self.auth.api_key);
        copy.auth.password = mask(&self.auth.password);
        copy.auth.access_token = mask(&self.auth.access_token);
        copy.auth.client_secret = mask(&self.auth.client_secret);
        copy
    }

    pub fn to_toml(&self) -> Result<String, BulkError> {
        toml::to_string_pretty(self)
            .map_err(|e| BulkError::Config(format!("Failed to render config: {}", e)))
    }
}

impl CredentialStore for BulkConfig {
    fn credentials(&self, mode: AuthMode) -> Result<Credentials, BulkError> {
        let missing = self.auth.missing(mode);
        if !missing.is_empty() {
            return Err(BulkError::Auth(format!(
                "Credentials for {} are incomplete: missing {}",
                mode,
                missing.join(", ")
            )));
        }

        let value = |v: &Option<String>| v.clone().unwrap_or_default();
        let shop_subdomain = self.shop.subdomain.clone();
        Ok(match mode {
            AuthMode::ApiKey => Credentials::ApiKey {
                shop_subdomain,
                api_key: value(&self.auth.api_key),
                password: value(&self.auth.password),
            },
            AuthMode::AccessToken => Credentials::AccessToken {
                shop_subdomain,
                access_token: value(&self.auth.access_token),
            },
            AuthMode::OAuth2 => Credentials::OAuth2 {
                shop_subdomain,
                client_id: value(&self.auth.client_id),
                client_secret: value(&self.auth.client_secret),
                access_token: self.auth.access_token.clone().filter(|t| !t.is_empty()),
            },
        })
    }
}
