//! Credential completeness checks.

use std::fmt;

use crate::credentials::CredentialSet;
use crate::error::{Error, Result};

/// Ordered list of violations found in a [`CredentialSet`].
///
/// An empty result means the credentials are complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
    violations: Vec<String>,
}

impl ValidationResult {
    /// Returns true when no violations were recorded.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// The recorded violations, in field order.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    /// Number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true when no violations were recorded.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Converts a non-empty result into [`Error::Configuration`].
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(Error::Configuration(self))
        }
    }

    fn push(&mut self, violation: impl Into<String>) {
        self.violations.push(violation.into());
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.violations.len() {
            0 => write!(f, "no configuration errors"),
            1 => write!(f, "1 error occurred:\n\t* {}", self.violations[0]),
            n => {
                write!(f, "{} errors occurred:", n)?;
                for violation in &self.violations {
                    write!(f, "\n\t* {}", violation)?;
                }
                Ok(())
            }
        }
    }
}

/// Checks that every required credential field is populated.
///
/// All four checks always run, so the caller sees every missing field at
/// once. Violations are reported in the order subscription, client, secret,
/// tenant. The access key is optional and never checked.
pub fn validate(credentials: &CredentialSet) -> ValidationResult {
    let mut result = ValidationResult::default();

    if credentials.subscription_id().is_empty() {
        result.push("Subscription ID must be configured for the AzureRM provider");
    }
    if credentials.client_id().is_empty() {
        result.push("Client ID must be configured for the AzureRM provider");
    }
    if credentials.client_secret().is_empty() {
        result.push("Client Secret must be configured for the AzureRM provider");
    }
    if credentials.tenant_id().is_empty() {
        result.push("Tenant ID must be configured for the AzureRM provider");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_complete_credentials_are_valid() {
        let result = validate(&CredentialSet::new("s", "c", "x", "t"));
        assert!(result.is_valid());
        assert!(result.into_result().is_ok());
    }

    #[test]
    fn test_all_missing_reports_in_field_order() {
        let result = validate(&CredentialSet::new("", "", "", ""));

        assert_eq!(
            result.violations(),
            &[
                "Subscription ID must be configured for the AzureRM provider".to_string(),
                "Client ID must be configured for the AzureRM provider".to_string(),
                "Client Secret must be configured for the AzureRM provider".to_string(),
                "Tenant ID must be configured for the AzureRM provider".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_secret_only() {
        let result = validate(&CredentialSet::new("s", "c", "", "t"));

        assert_eq!(result.len(), 1);
        assert!(result.violations()[0].starts_with("Client Secret must be configured"));
    }

    #[test]
    fn test_access_key_is_ignored() {
        let with_key = validate(&CredentialSet::new("s", "c", "x", "t").with_access_key("k"));
        let without_key = validate(&CredentialSet::new("s", "c", "x", "t"));
        assert_eq!(with_key, without_key);
    }

    #[test]
    fn test_display_lists_every_violation() {
        let result = validate(&CredentialSet::new("", "c", "", "t"));
        let rendered = result.to_string();

        assert!(rendered.starts_with("2 errors occurred:"));
        assert!(rendered.contains("\t* Subscription ID must be configured"));
        assert!(rendered.contains("\t* Client Secret must be configured"));
    }

    #[test]
    fn test_into_result_wraps_configuration_error() {
        let err = validate(&CredentialSet::new("s", "", "x", "t"))
            .into_result()
            .unwrap_err();

        match err {
            Error::Configuration(result) => assert_eq!(result.len(), 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
