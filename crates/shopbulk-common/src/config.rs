//! Store connection configuration
//!
//! Settings are read from environment variables (a `.env` file is honoured
//! through `dotenvy`). Credentials are required; everything else falls back to
//! the defaults below.

use crate::error::{CommonError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Admin API version used when `SHOPIFY_API_VERSION` is not set.
pub const DEFAULT_API_VERSION: &str = "2024-04";

/// Default HTTP request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

/// Default delay between bulk operation status polls, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;

const ENV_STORE_NAME: &str = "SHOPIFY_STORE_NAME";
const ENV_ACCESS_TOKEN: &str = "SHOPIFY_ACCESS_TOKEN";
const ENV_API_VERSION: &str = "SHOPIFY_API_VERSION";
const ENV_GRAPHQL_URL: &str = "SHOPIFY_GRAPHQL_URL";
const ENV_HTTP_TIMEOUT: &str = "SHOPBULK_HTTP_TIMEOUT_SECS";
const ENV_POLL_INTERVAL: &str = "SHOPBULK_POLL_INTERVAL_SECS";
const ENV_MAX_WAIT: &str = "SHOPBULK_MAX_WAIT_SECS";
const ENV_CANCEL_PRIOR: &str = "SHOPBULK_CANCEL_PRIOR";

/// Connection and polling settings for one store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store handle (`my-shop`) or full `my-shop.myshopify.com` domain
    pub store_name: String,

    /// Admin API access token
    pub access_token: String,

    /// Admin API version, e.g. `2024-04`
    pub api_version: String,

    /// Explicit GraphQL endpoint, bypassing the derived store URL
    #[serde(default)]
    pub graphql_url: Option<String>,

    pub http_timeout_secs: u64,

    pub poll_interval_secs: u64,

    /// Upper bound on how long a single wait for a terminal status may take
    #[serde(default)]
    pub max_wait_secs: Option<u64>,

    /// Cancel an in-flight bulk operation instead of waiting for it
    #[serde(default)]
    pub cancel_prior: bool,
}

impl StoreConfig {
    /// Create a config with default settings for the given credentials
    pub fn new(store_name: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            store_name: store_name.into(),
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            graphql_url: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_wait_secs: None,
            cancel_prior: false,
        }
    }

    /// Load configuration from the process environment
    ///
    /// Environment variables:
    /// - `SHOPIFY_STORE_NAME`: store handle or domain (required)
    /// - `SHOPIFY_ACCESS_TOKEN`: Admin API access token (required)
    /// - `SHOPIFY_API_VERSION`: API version (default `2024-04`)
    /// - `SHOPIFY_GRAPHQL_URL`: endpoint override
    /// - `SHOPBULK_HTTP_TIMEOUT_SECS`: request timeout (default 60)
    /// - `SHOPBULK_POLL_INTERVAL_SECS`: status poll interval (default 1)
    /// - `SHOPBULK_MAX_WAIT_SECS`: poll deadline (unset means no deadline)
    /// - `SHOPBULK_CANCEL_PRIOR`: cancel running operations before submitting
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_name = lookup(ENV_STORE_NAME).ok_or(CommonError::MissingEnv(ENV_STORE_NAME))?;
        let access_token =
            lookup(ENV_ACCESS_TOKEN).ok_or(CommonError::MissingEnv(ENV_ACCESS_TOKEN))?;

        let mut config = Self::new(store_name, access_token);

        if let Some(version) = lookup(ENV_API_VERSION) {
            config.api_version = version;
        }
        config.graphql_url = lookup(ENV_GRAPHQL_URL);

        if let Some(value) = lookup(ENV_HTTP_TIMEOUT) {
            config.http_timeout_secs = parse_var(ENV_HTTP_TIMEOUT, value)?;
        }
        if let Some(value) = lookup(ENV_POLL_INTERVAL) {
            config.poll_interval_secs = parse_var(ENV_POLL_INTERVAL, value)?;
        }
        if let Some(value) = lookup(ENV_MAX_WAIT) {
            config.max_wait_secs = Some(parse_var(ENV_MAX_WAIT, value)?);
        }
        if let Some(value) = lookup(ENV_CANCEL_PRIOR) {
            config.cancel_prior = parse_var(ENV_CANCEL_PRIOR, value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.store_name.trim().is_empty() {
            return Err(CommonError::config("store name cannot be empty"));
        }

        if self.access_token.trim().is_empty() {
            return Err(CommonError::config("access token cannot be empty"));
        }

        if self.poll_interval_secs == 0 {
            return Err(CommonError::config(
                "poll interval must be greater than 0 seconds",
            ));
        }

        if self.http_timeout_secs == 0 {
            return Err(CommonError::config(
                "HTTP timeout must be greater than 0 seconds",
            ));
        }

        self.graphql_url()?;
        Ok(())
    }

    /// Resolve the Admin GraphQL endpoint for this store
    pub fn graphql_url(&self) -> Result<Url> {
        if let Some(ref url) = self.graphql_url {
            return Ok(Url::parse(url)?);
        }

        let store = self.store_name.trim();
        let domain = if store.contains('.') {
            store.to_string()
        } else {
            format!("{store}.myshopify.com")
        };

        Ok(Url::parse(&format!(
            "https://{domain}/admin/api/{}/graphql.json",
            self.api_version
        ))?)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_secs.map(Duration::from_secs)
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: String) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CommonError::InvalidEnv { name, value })
}
