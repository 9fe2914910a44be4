//! Shared test doubles and fixtures for the fixazurerm test suite.
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use fixazurerm::client::{
    AuthError, ClientFactory, ProviderRegistrar, RegistrationResponse, TransportError,
};
use fixazurerm::config::ProviderConfig;
use fixazurerm::credentials::CredentialSet;

// ============================================================================
// Registrar double
// ============================================================================

/// Registrar that records every call and fails the namespaces it is told to.
#[derive(Default)]
pub struct RecordingRegistrar {
    calls: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    reject: HashSet<String>,
    unreachable: HashSet<String>,
    already_registered: HashSet<String>,
    delay: Option<Duration>,
}

impl RecordingRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `namespace` with a 403 rejection.
    pub fn rejecting(mut self, namespace: &str) -> Self {
        self.reject.insert(namespace.to_string());
        self
    }

    /// Fail `namespace` with a transport error.
    pub fn unreachable(mut self, namespace: &str) -> Self {
        self.unreachable.insert(namespace.to_string());
        self
    }

    /// Answer `namespace` as already registered.
    pub fn already_registered(mut self, namespace: &str) -> Self {
        self.already_registered.insert(namespace.to_string());
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of register calls for `namespace`.
    pub fn calls_for(&self, namespace: &str) -> usize {
        self.calls.lock().get(namespace).copied().unwrap_or(0)
    }

    /// Number of register calls across all namespaces.
    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderRegistrar for RecordingRegistrar {
    async fn register_provider(
        &self,
        namespace: &str,
    ) -> Result<RegistrationResponse, TransportError> {
        *self.calls.lock().entry(namespace.to_string()).or_insert(0) += 1;
        self.total.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.unreachable.contains(namespace) {
            return Err(TransportError("connection reset by peer".to_string()));
        }
        if self.reject.contains(namespace) {
            return Ok(RegistrationResponse::Rejected {
                status: Some(403),
                message: Some("AuthorizationFailed".to_string()),
            });
        }
        if self.already_registered.contains(namespace) {
            return Ok(RegistrationResponse::AlreadyRegistered);
        }
        Ok(RegistrationResponse::Registered)
    }
}

/// Lets an `Arc<RecordingRegistrar>` be handed out by a factory while the
/// test keeps its own handle for assertions.
pub struct SharedRegistrar(pub Arc<RecordingRegistrar>);

impl std::fmt::Debug for SharedRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedRegistrar")
            .field(&self.0.total_calls())
            .finish()
    }
}

#[async_trait]
impl ProviderRegistrar for SharedRegistrar {
    async fn register_provider(
        &self,
        namespace: &str,
    ) -> Result<RegistrationResponse, TransportError> {
        self.0.register_provider(namespace).await
    }
}

// ============================================================================
// Factory double
// ============================================================================

/// Factory that counts builds and hands out a shared recording registrar.
pub struct RecordingFactory {
    registrar: Arc<RecordingRegistrar>,
    builds: Arc<AtomicUsize>,
    error: Option<AuthError>,
}

impl RecordingFactory {
    pub fn new(registrar: Arc<RecordingRegistrar>) -> Self {
        Self {
            registrar,
            builds: Arc::new(AtomicUsize::new(0)),
            error: None,
        }
    }

    /// Fail every build with `error`.
    pub fn failing(error: AuthError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(RecordingRegistrar::new().into_arc())
        }
    }

    /// Shared build counter that stays readable after the factory is moved.
    pub fn build_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.builds)
    }
}

#[async_trait]
impl ClientFactory for RecordingFactory {
    type Client = SharedRegistrar;

    async fn build_client(&self, _credentials: &CredentialSet) -> Result<SharedRegistrar, AuthError> {
        self.builds.fetch_add(1, Ordering::SeqCst);
        match &self.error {
            Some(error) => Err(error.clone()),
            None => Ok(SharedRegistrar(Arc::clone(&self.registrar))),
        }
    }
}

// ============================================================================
// Fixtures
// ============================================================================

/// A configuration with all four required credentials present.
pub fn valid_config() -> ProviderConfig {
    config_with("sub-0001", "client-0001", "secret-0001", "tenant-0001")
}

pub fn config_with(subscription: &str, client: &str, secret: &str, tenant: &str) -> ProviderConfig {
    ProviderConfig {
        subscription_id: subscription.to_string(),
        client_id: client.to_string(),
        client_secret: secret.to_string(),
        tenant_id: tenant.to_string(),
        ..Default::default()
    }
}
