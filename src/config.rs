//! Provider configuration.
//!
//! Handles loading the provider configuration from:
//! - Default values
//! - An optional TOML file
//! - `ARM_*` environment variables, used as defaults for fields the file
//!   leaves empty
//!
//! ```toml
//! subscription_id = "00000000-0000-0000-0000-000000000000"
//! client_id = "..."
//! client_secret = "..."
//! tenant_id = "..."
//!
//! [endpoints]
//! authority_url = "https://login.microsoftonline.com"
//! management_url = "https://management.azure.com"
//! timeout = "30s"
//!
//! [logging]
//! level = "debug"
//! format = "json"
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::credentials::{
    CredentialSet, ENV_ACCESS_KEY, ENV_CLIENT_ID, ENV_CLIENT_SECRET, ENV_SUBSCRIPTION_ID,
    ENV_TENANT_ID,
};
use crate::error::{Error, Result};
use crate::logging::LoggingConfig;

/// Azure AD authority for the public cloud.
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Azure Resource Manager endpoint for the public cloud.
pub const DEFAULT_MANAGEMENT_URL: &str = "https://management.azure.com";

/// Environment variable overriding the management endpoint.
pub const ENV_MANAGEMENT_URL: &str = "ARM_ENDPOINT";

/// Environment variable overriding the identity authority.
pub const ENV_AUTHORITY_URL: &str = "ARM_AUTHORITY_URL";

/// Main provider configuration.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderConfig {
    /// Subscription ID (default: `ARM_SUBSCRIPTION_ID`)
    pub subscription_id: String,

    /// Service principal client ID (default: `ARM_CLIENT_ID`)
    pub client_id: String,

    /// Service principal secret (default: `ARM_CLIENT_SECRET`)
    #[serde(skip_serializing)]
    pub client_secret: String,

    /// Tenant ID (default: `ARM_TENANT_ID`)
    pub tenant_id: String,

    /// Optional storage access key (default: `ARM_ACCESS_KEY`, else empty)
    #[serde(skip_serializing)]
    pub access_key: String,

    /// Identity and management endpoints
    pub endpoints: EndpointConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("tenant_id", &self.tenant_id)
            .field("access_key", &"[REDACTED]")
            .field("endpoints", &self.endpoints)
            .field("logging", &self.logging)
            .finish()
    }
}

/// Endpoints used for the credential exchange and management calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Azure AD authority; the tenant ID is appended to it
    pub authority_url: String,

    /// Azure Resource Manager base URL
    pub management_url: String,

    /// Timeout applied to every HTTP request
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            management_url: DEFAULT_MANAGEMENT_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl EndpointConfig {
    /// Endpoints for a custom cloud (or a local mock server).
    pub fn new(authority_url: impl Into<String>, management_url: impl Into<String>) -> Self {
        Self {
            authority_url: authority_url.into(),
            management_url: management_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Checks that both endpoints are absolute http(s) URLs.
    pub fn validate(&self) -> Result<()> {
        check_url("endpoints.authority_url", &self.authority_url)?;
        check_url("endpoints.management_url", &self.management_url)
    }
}

fn check_url(key: &str, value: &str) -> Result<()> {
    let url = Url::parse(value).map_err(|e| Error::invalid_config(key, e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::invalid_config(
            key,
            format!("unsupported URL scheme '{}'", other),
        )),
    }
}

impl ProviderConfig {
    /// Load configuration from an optional file, then fill empty fields from
    /// the process environment.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        config.apply_env_defaults();
        config.endpoints.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file without consulting the
    /// environment.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config_load(path, e.to_string()))?;
        Self::from_toml(&content).map_err(|e| Error::config_load(path, e.to_string()))
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Fill empty fields from the process environment.
    pub fn apply_env_defaults(&mut self) {
        self.apply_env_defaults_from(|key| std::env::var(key).ok());
    }

    /// Fill empty fields using `lookup` as the environment.
    ///
    /// Explicitly configured values always win over the environment.
    pub fn apply_env_defaults_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fill = |field: &mut String, key: &str| {
            if field.is_empty() {
                if let Some(value) = lookup(key) {
                    *field = value;
                }
            }
        };

        fill(&mut self.subscription_id, ENV_SUBSCRIPTION_ID);
        fill(&mut self.client_id, ENV_CLIENT_ID);
        fill(&mut self.client_secret, ENV_CLIENT_SECRET);
        fill(&mut self.tenant_id, ENV_TENANT_ID);
        fill(&mut self.access_key, ENV_ACCESS_KEY);

        if let Some(url) = lookup(ENV_MANAGEMENT_URL).filter(|v| !v.is_empty()) {
            self.endpoints.management_url = url;
        }
        if let Some(url) = lookup(ENV_AUTHORITY_URL).filter(|v| !v.is_empty()) {
            self.endpoints.authority_url = url;
        }
    }

    /// Build the immutable credential set from this configuration.
    pub fn credentials(&self) -> CredentialSet {
        CredentialSet::new(
            self.subscription_id.clone(),
            self.client_id.clone(),
            self.client_secret.clone(),
            self.tenant_id.clone(),
        )
        .with_access_key(self.access_key.clone())
    }
}
