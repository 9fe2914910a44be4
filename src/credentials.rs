//! Service principal credentials.
//!
//! A [`CredentialSet`] is built once from provider configuration and never
//! mutated afterwards. Secret material is wrapped in [`SensitiveString`] so it
//! cannot leak through `Debug`/`Display` output or log lines.

use serde::{Serialize, Serializer};
use std::fmt;

/// Environment variable supplying the default subscription ID.
pub const ENV_SUBSCRIPTION_ID: &str = "ARM_SUBSCRIPTION_ID";
/// Environment variable supplying the default client ID.
pub const ENV_CLIENT_ID: &str = "ARM_CLIENT_ID";
/// Environment variable supplying the default client secret.
pub const ENV_CLIENT_SECRET: &str = "ARM_CLIENT_SECRET";
/// Environment variable supplying the default tenant ID.
pub const ENV_TENANT_ID: &str = "ARM_TENANT_ID";
/// Environment variable supplying the default storage access key.
pub const ENV_ACCESS_KEY: &str = "ARM_ACCESS_KEY";

/// A string whose value is never printed.
///
/// # Example
///
/// ```rust
/// use fixazurerm::credentials::SensitiveString;
///
/// let secret = SensitiveString::new("hunter2");
/// assert_eq!(format!("{secret}"), "[REDACTED]");
/// assert_eq!(secret.expose(), "hunter2");
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SensitiveString {
    value: String,
}

impl SensitiveString {
    /// Create a new sensitive string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Expose the underlying value.
    ///
    /// Only call this where the raw value has to go on the wire.
    pub fn expose(&self) -> &str {
        &self.value
    }

    /// Check if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

impl fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SensitiveString([REDACTED])")
    }
}

impl From<String> for SensitiveString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SensitiveString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// Serializes as redacted so dumped configuration never carries the secret
impl Serialize for SensitiveString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("[REDACTED]")
    }
}

/// Identity and secret used to authenticate against Azure Resource Manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialSet {
    subscription_id: String,
    client_id: String,
    client_secret: SensitiveString,
    tenant_id: String,
    access_key: SensitiveString,
}

impl CredentialSet {
    /// Create a credential set without a storage access key.
    pub fn new(
        subscription_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<SensitiveString>,
        tenant_id: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            tenant_id: tenant_id.into(),
            access_key: SensitiveString::default(),
        }
    }

    /// Attach a storage access key.
    pub fn with_access_key(mut self, access_key: impl Into<SensitiveString>) -> Self {
        self.access_key = access_key.into();
        self
    }

    /// The subscription every managed resource is created under.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The service principal's application (client) ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The service principal's secret.
    pub fn client_secret(&self) -> &SensitiveString {
        &self.client_secret
    }

    /// The Azure AD tenant that issues tokens for the service principal.
    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Optional storage access key, empty when not configured.
    pub fn access_key(&self) -> &SensitiveString {
        &self.access_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = CredentialSet::new("sub", "client", "top-secret", "tenant")
            .with_access_key("storage-key");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("sub"));
        assert!(debug.contains("tenant"));
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains("storage-key"));
    }

    #[test]
    fn test_serialize_redacts_secrets() {
        let creds = CredentialSet::new("sub", "client", "top-secret", "tenant");
        let json = serde_json::to_string(&creds).unwrap();

        assert!(json.contains("\"client_secret\":\"[REDACTED]\""));
        assert!(!json.contains("top-secret"));
    }

    #[test]
    fn test_access_key_defaults_empty() {
        let creds = CredentialSet::new("sub", "client", "secret", "tenant");
        assert!(creds.access_key().is_empty());
        assert_eq!(creds.client_secret().expose(), "secret");
    }
}
