//! Error types for fixazurerm.
//!
//! Every stage of the provider bootstrap reports failure through the [`Error`]
//! enum defined here. The three bootstrap stages each own a dedicated error
//! type that is wrapped by a variant of [`Error`]:
//!
//! - [`ValidationResult`] for missing credential fields
//! - [`AuthError`] for a failed credential exchange
//! - [`RegistrationError`] for resource providers that could not be registered

use std::path::PathBuf;
use thiserror::Error;

use crate::client::AuthError;
use crate::registration::RegistrationError;
use crate::validate::ValidationResult;

/// Result type alias for fixazurerm operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for fixazurerm.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Bootstrap Errors
    // ========================================================================
    /// One or more required credential fields are missing.
    #[error("{0}")]
    Configuration(ValidationResult),

    /// The credential exchange was rejected or the endpoint was unreachable.
    #[error("Azure authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// One or more resource providers failed to register.
    #[error("{0}")]
    Registration(#[from] RegistrationError),

    // ========================================================================
    // Lock Errors
    // ========================================================================
    /// A resource lock was released without being held.
    #[error("Resource lock '{0}' is not held")]
    LockNotHeld(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidConfig {
        /// Configuration key
        key: String,
        /// Error message
        message: String,
    },

    /// Configuration file could not be loaded.
    #[error("Failed to load configuration from '{path}': {message}")]
    ConfigLoad {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

impl Error {
    /// Creates a new invalid configuration error.
    pub fn invalid_config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a new configuration load error.
    pub fn config_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns true if the error was raised before any network access.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Configuration(_)
                | Error::Config(_)
                | Error::InvalidConfig { .. }
                | Error::ConfigLoad { .. }
                | Error::TomlParse(_)
        )
    }

    /// Returns the error code for CLI exit status.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Registration(_) => 2,
            Error::Auth(_) => 3,
            Error::Configuration(_)
            | Error::Config(_)
            | Error::InvalidConfig { .. }
            | Error::ConfigLoad { .. }
            | Error::TomlParse(_) => 4,
            _ => 1,
        }
    }
}
