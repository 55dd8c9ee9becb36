//! Authentication modes and credential lookup.

use crate::error::BulkError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How requests to the Admin API are authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AuthMode {
    /// Private app API key and password, sent as HTTP basic auth
    #[default]
    #[serde(rename = "api_key", alias = "apiKey")]
    ApiKey,
    /// Admin API access token header
    #[serde(rename = "access_token", alias = "accessToken")]
    AccessToken,
    /// Client credentials exchanged for an access token
    #[serde(rename = "oauth2", alias = "oAuth2")]
    OAuth2,
}

impl AuthMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthMode::ApiKey => "api_key",
            AuthMode::AccessToken => "access_token",
            AuthMode::OAuth2 => "oauth2",
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuthMode {
    type Err = BulkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api_key" | "apiKey" | "api-key" => Ok(AuthMode::ApiKey),
            "access_token" | "accessToken" | "access-token" => Ok(AuthMode::AccessToken),
            "oauth2" | "oAuth2" => Ok(AuthMode::OAuth2),
            other => Err(BulkError::Config(format!(
                "Unknown authentication mode: {} (expected api_key, access_token or oauth2)",
                other
            ))),
        }
    }
}

/// Resolved credentials for one shop
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    ApiKey {
        shop_subdomain: String,
        api_key: String,
        password: String,
    },
    AccessToken {
        shop_subdomain: String,
        access_token: String,
    },
    OAuth2 {
        shop_subdomain: String,
        client_id: String,
        client_secret: String,
        /// Previously issued token; skips the exchange when present
        access_token: Option<String>,
    },
}

impl Credentials {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credentials::ApiKey { .. } => AuthMode::ApiKey,
            Credentials::AccessToken { .. } => AuthMode::AccessToken,
            Credentials::OAuth2 { .. } => AuthMode::OAuth2,
        }
    }

    pub fn shop_subdomain(&self) -> &str {
        match self {
            Credentials::ApiKey { shop_subdomain, .. }
            | Credentials::AccessToken { shop_subdomain, .. }
            | Credentials::OAuth2 { shop_subdomain, .. } => shop_subdomain,
        }
    }
}

// Secrets never reach logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("mode", &self.mode())
            .field("shop_subdomain", &self.shop_subdomain())
            .finish_non_exhaustive()
    }
}

/// Looks up the credentials for an authentication mode
pub trait CredentialStore: Send + Sync {
    fn credentials(&self, mode: AuthMode) -> Result<Credentials, BulkError>;
}

/// Fixed set of credentials, one per mode
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    entries: Vec<Credentials>,
}

impl StaticCredentials {
    pub fn new(entries: Vec<Credentials>) -> Self {
        Self { entries }
    }
}

impl CredentialStore for StaticCredentials {
    fn credentials(&self, mode: AuthMode) -> Result<Credentials, BulkError> {
        self.entries
            .iter()
            .find(|c| c.mode() == mode)
            .cloned()
            .ok_or_else(|| BulkError::Auth(format!("No credentials configured for {}", mode)))
    }
}
