//! Provider configuration pipeline.
//!
//! [`configure`] is invoked once when the host configures the provider. It
//! runs the bootstrap stages in order and stops at the first failure:
//!
//! 1. build a [`CredentialSet`](crate::credentials::CredentialSet) and
//!    validate it, reporting every missing field at once
//! 2. exchange the credentials for an authenticated client
//! 3. register the resource provider catalog with the subscription
//!
//! The result is a [`ConfiguredProvider`] that resource handlers use for
//! management calls and for serializing writes to shared cloud objects.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::client::{ArmClient, ArmClientFactory, ClientFactory, ProviderRegistrar};
use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::locks::ResourceMutexRegistry;
use crate::registration::RegistrationCoordinator;
use crate::validate::validate;

/// Everything a resource handler needs after configuration.
pub struct ConfiguredProvider<C> {
    client: Arc<C>,
    locks: &'static ResourceMutexRegistry,
}

impl<C> ConfiguredProvider<C> {
    /// The authenticated client.
    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    /// The process-wide resource lock registry.
    pub fn locks(&self) -> &'static ResourceMutexRegistry {
        self.locks
    }
}

impl<C> Clone for ConfiguredProvider<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            locks: self.locks,
        }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for ConfiguredProvider<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredProvider")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Runs the bootstrap stages against a client factory and a coordinator.
pub struct Bootstrap<'a, F> {
    factory: F,
    coordinator: &'a RegistrationCoordinator,
}

impl<F: ClientFactory> Bootstrap<'static, F> {
    /// Bootstrap with the process-wide registration coordinator.
    pub fn new(factory: F) -> Self {
        Self::with_coordinator(factory, RegistrationCoordinator::global())
    }
}

impl<'a, F: ClientFactory> Bootstrap<'a, F> {
    /// Bootstrap with a specific registration coordinator.
    pub fn with_coordinator(factory: F, coordinator: &'a RegistrationCoordinator) -> Self {
        Self {
            factory,
            coordinator,
        }
    }

    /// Validate, authenticate and register.
    #[instrument(skip_all, fields(subscription_id = %config.subscription_id))]
    pub async fn configure(&self, config: &ProviderConfig) -> Result<ConfiguredProvider<F::Client>> {
        let credentials = config.credentials();
        debug!(credentials = ?credentials, "Configuring provider");

        validate(&credentials).into_result()?;

        let client = Arc::new(self.factory.build_client(&credentials).await?);

        let registrar: Arc<dyn ProviderRegistrar> = client.clone();
        self.coordinator
            .register_all(registrar)
            .await
            .map_err(Error::Registration)?;

        info!("Provider configured");

        Ok(ConfiguredProvider {
            client,
            locks: ResourceMutexRegistry::global(),
        })
    }
}

/// Configure the provider against the endpoints named in `config`.
///
/// Uses the process-wide registration coordinator, so resource providers are
/// registered at most once no matter how often this is called.
///
/// `config` is used exactly as given. The `ARM_*` environment fallback is
/// applied by [`ProviderConfig::load`], so a configuration built by hand with
/// empty fields fails validation even when those variables are set.
pub async fn configure(config: &ProviderConfig) -> Result<ConfiguredProvider<ArmClient>> {
    config.endpoints.validate()?;

    let factory = ArmClientFactory::new(config.endpoints.clone())?;
    Bootstrap::new(factory).configure(config).await
}
