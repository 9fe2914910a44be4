//! # fixazurerm - Azure Resource Manager provider bootstrap
//!
//! fixazurerm is the configuration stage of an Azure Resource Manager
//! infrastructure provider. Before any resource handler runs, the host
//! configures the provider once with a service principal. This crate turns
//! that configuration into a ready-to-use client:
//!
//! - **Validation**: every missing credential is reported at once, before any
//!   network traffic
//! - **Authentication**: the service principal is exchanged for a bearer token
//! - **Registration**: the standard resource provider namespaces are
//!   registered with the subscription, concurrently and at most once per
//!   process
//! - **Resource locks**: handlers that touch a shared cloud object serialize
//!   on its ID through a process-wide keyed lock registry
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     ProviderConfig (TOML + ARM_*)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 validate(CredentialSet) -> violations                │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │            ClientFactory::build_client (token exchange)              │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │        RegistrationCoordinator (one concurrent pass per process)     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                    │
//!                                    ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │         ConfiguredProvider { client, ResourceMutexRegistry }         │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use fixazurerm::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ProviderConfig::load(None)?;
//!     let provider = fixazurerm::provider::configure(&config).await?;
//!
//!     let _guard = provider.locks().lock("/subscriptions/s/.../vnet-1").await;
//!     // read-modify-write the virtual network
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    // Error handling
    pub use crate::error::{Error, Result};

    // Credentials and configuration
    pub use crate::config::{EndpointConfig, ProviderConfig};
    pub use crate::credentials::{CredentialSet, SensitiveString};
    pub use crate::validate::{validate, ValidationResult};

    // Clients
    pub use crate::client::{
        ArmClient, ArmClientFactory, AuthError, ClientFactory, ProviderRegistrar,
        RegistrationResponse,
    };

    // Registration
    pub use crate::registration::{
        RegistrationCatalog, RegistrationCoordinator, RegistrationError, RegistrationOutcome,
    };

    // Bootstrap
    pub use crate::locks::{ResourceLockGuard, ResourceMutexRegistry};
    pub use crate::provider::{Bootstrap, ConfiguredProvider};
}

// ============================================================================
// Core Modules
// ============================================================================

/// Error types and result aliases.
///
/// The main [`Error`](error::Error) enum separates local configuration
/// problems from authentication and registration failures, and maps each to
/// a process exit code.
pub mod error;

/// Credential set and secret redaction.
pub mod credentials;

/// Credential validation that reports every violation at once.
pub mod validate;

/// Provider configuration loaded from TOML and `ARM_*` environment variables.
pub mod config;

// ============================================================================
// Azure Resource Manager
// ============================================================================

/// Authenticated management client and the seams used to build it.
///
/// Contains the [`ProviderRegistrar`](client::ProviderRegistrar) and
/// [`ClientFactory`](client::ClientFactory) traits together with the reqwest
/// backed implementations that talk to Azure.
pub mod client;

/// Resource provider registration.
///
/// The [`RegistrationCoordinator`](registration::RegistrationCoordinator)
/// registers every namespace in the catalog concurrently, at most once per
/// process, and shares the outcome with every caller.
pub mod registration;

/// Keyed locks shared by resource handlers.
pub mod locks;

/// Location and name normalization.
pub mod location;

/// The configure pipeline tying validation, authentication and registration
/// together.
pub mod provider;

// ============================================================================
// Observability
// ============================================================================

/// Structured logging setup built on `tracing-subscriber`.
pub mod logging;

// ============================================================================
// Version Information
// ============================================================================

/// Returns the current version of fixazurerm.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
