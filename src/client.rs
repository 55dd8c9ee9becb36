//! Remote Operation Client
//!
//! Sends a single GraphQL document (plus optional variables) to the Shopify Admin API and
//! hands back the decoded JSON body. GraphQL-level `errors` are returned as data; only
//! transport and authentication failures become errors here.

use crate::config::HttpConfig;
use crate::error::BulkError;
use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

mod auth;

pub use auth::{AuthMode, CredentialStore, Credentials, StaticCredentials};

/// Header carrying Admin API access tokens
pub const ACCESS_TOKEN_HEADER: &str = "X-Shopify-Access-Token";

/// Default Admin API version
pub const DEFAULT_API_VERSION: &str = "2025-07";

/// Executes GraphQL documents against a remote endpoint
#[async_trait]
pub trait GraphqlTransport: Send + Sync {
    async fn execute(&self, query: &str, variables: Option<&Value>) -> Result<Value, BulkError>;
}

#[async_trait]
impl<T: GraphqlTransport + ?Sized> GraphqlTransport for Arc<T> {
    async fn execute(&self, query: &str, variables: Option<&Value>) -> Result<Value, BulkError> {
        (**self).execute(query, variables).await
    }
}

/// `https://{shop}.myshopify.com/admin/api/{version}/graphql.json`
pub fn admin_endpoint(shop_subdomain: &str, api_version: &str) -> String {
    format!(
        "https://{}.myshopify.com/admin/api/{}/graphql.json",
        shop_subdomain, api_version
    )
}

fn token_endpoint(shop_subdomain: &str) -> String {
    format!("https://{}.myshopify.com/admin/oauth/access_token", shop_subdomain)
}

/// Build the shared HTTP client from timeout settings
pub fn build_http_client(config: &HttpConfig) -> Result<Client, BulkError> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| BulkError::Http(format!("Failed to create HTTP client: {}", e)))
}

/// Builder for [`ShopifyClient`]
#[derive(Debug, Clone)]
pub struct ShopifyClientBuilder {
    credentials: Credentials,
    api_version: String,
    endpoint: Option<String>,
    token_url: Option<String>,
    http: Option<Client>,
}

impl ShopifyClientBuilder {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            api_version: DEFAULT_API_VERSION.to_string(),
            endpoint: None,
            token_url: None,
            http: None,
        }
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Replace the derived Admin API endpoint
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Replace the derived OAuth token endpoint
    pub fn token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = Some(url.into());
        self
    }

    pub fn http_client(mut self, http: Client) -> Self {
        self.http = Some(http);
        self
    }

    pub fn build(self) -> Result<ShopifyClient, BulkError> {
        let http = match self.http {
            Some(http) => http,
            None => build_http_client(&HttpConfig::default())?,
        };
        let shop = self.credentials.shop_subdomain().to_string();
        if shop.is_empty() && self.endpoint.is_none() {
            return Err(BulkError::Config(
                "Shop subdomain is empty and no endpoint is set".to_string(),
            ));
        }
        Ok(ShopifyClient {
            endpoint: self
                .endpoint
                .unwrap_or_else(|| admin_endpoint(&shop, &self.api_version)),
            token_url: self.token_url.unwrap_or_else(|| token_endpoint(&shop)),
            credentials: self.credentials,
            http,
            token_cache: Mutex::new(None),
        })
    }
}

/// Admin API client for one shop and one authentication mode
pub struct ShopifyClient {
    http: Client,
    endpoint: String,
    token_url: String,
    credentials: Credentials,
    token_cache: Mutex<Option<String>>,
}

impl ShopifyClient {
    pub fn builder(credentials: Credentials) -> ShopifyClientBuilder {
        ShopifyClientBuilder::new(credentials)
    }

    /// Resolve credentials for `mode` and build a client
    pub fn from_store(
        store: &dyn CredentialStore,
        mode: AuthMode,
        api_version: &str,
    ) -> Result<ShopifyClientBuilder, BulkError> {
        let credentials = store.credentials(mode)?;
        Ok(ShopifyClientBuilder::new(credentials).api_version(api_version))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mode(&self) -> AuthMode {
        self.credentials.mode()
    }

    async fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder, BulkError> {
        match &self.credentials {
            Credentials::ApiKey {
                api_key, password, ..
            } => Ok(request.basic_auth(api_key, Some(password))),
            Credentials::AccessToken { access_token, .. } => {
                Ok(request.header(ACCESS_TOKEN_HEADER, access_token))
            }
            Credentials::OAuth2 { .. } => {
                let token = self.oauth_token().await?;
                Ok(request.header(ACCESS_TOKEN_HEADER, token))
            }
        }
    }

    /// Issued or cached OAuth access token
    async fn oauth_token(&self) -> Result<String, BulkError> {
        let Credentials::OAuth2 {
            client_id,
            client_secret,
            access_token,
            ..
        } = &self.credentials
        else {
            return Err(BulkError::Auth("Client is not in OAuth2 mode".to_string()));
        };

        if let Some(token) = access_token {
            return Ok(token.clone());
        }
        if let Some(token) = self.token_cache.lock().clone() {
            return Ok(token);
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
        }

        debug!(token_url = %self.token_url, "Exchanging client credentials for access token");
        let response = self
            .http
            .post(&self.token_url)
            .json(&json!({
                "client_id": client_id,
                "client_secret": client_secret,
                "grant_type": "client_credentials",
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(BulkError::Auth(format!(
                "Token exchange failed with status {}: {}",
                status, body
            )));
        }

        let issued: TokenResponse = response
            .json()
            .await
            .map_err(|e| BulkError::Auth(format!("Failed to parse token response: {}", e)))?;
        *self.token_cache.lock() = Some(issued.access_token.clone());
        Ok(issued.access_token)
    }
}

#[async_trait]
impl GraphqlTransport for ShopifyClient {
    #[instrument(skip_all, fields(endpoint = %self.endpoint, mode = %self.mode()))]
    async fn execute(&self, query: &str, variables: Option<&Value>) -> Result<Value, BulkError> {
        let mut body = json!({ "query": query });
        if let Some(variables) = variables {
            body["variables"] = variables.clone();
        }

        let request = self.authorize(self.http.post(&self.endpoint).json(&body)).await?;
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    BulkError::Auth(format!("Authentication failed ({}): {}", status, body))
                }
                _ => BulkError::HttpStatus {
                    status: status.as_u16(),
                    body,
                },
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| BulkError::Json(format!("Failed to parse response: {}", e)))?;
        debug!("GraphQL request completed");
        Ok(value)
    }
}
