//! One-time resource provider registration.
//!
//! Every resource provider namespace the plugin may touch is registered with
//! the subscription up front, whether or not the configuration uses it. The
//! [`RegistrationCoordinator`] runs that pass at most once per process:
//!
//! ```text
//!            NotStarted ──first caller──► InProgress ──pass ends──► Done(outcome)
//!                                             │                         │
//!   concurrent callers wait on the pass ◄─────┘    later callers ◄──────┘
//!                                                  replay the outcome
//! ```
//!
//! The pass itself fans out one task per catalog namespace and joins all of
//! them before reducing to a single outcome.

use futures::future::join_all;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::client::{ProviderRegistrar, RegistrationResponse};

/// Namespaces registered with every subscription.
///
/// `Microsoft.Compute` is absent because it is registered while the client is
/// built.
pub const STANDARD_NAMESPACES: &[&str] = &[
    "Microsoft.Network",
    "Microsoft.Cdn",
    "Microsoft.Storage",
    "Microsoft.Sql",
    "Microsoft.Search",
    "Microsoft.Resources",
    "Microsoft.ServiceBus",
    "Microsoft.KeyVault",
    "Microsoft.EventHub",
];

/// A fixed, compile-time set of provider namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistrationCatalog {
    namespaces: &'static [&'static str],
}

impl RegistrationCatalog {
    /// A catalog over the given namespaces.
    pub const fn new(namespaces: &'static [&'static str]) -> Self {
        Self { namespaces }
    }

    /// The catalog the provider registers in production.
    pub const fn standard() -> Self {
        Self::new(STANDARD_NAMESPACES)
    }

    /// Iterate the namespaces in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &'static str> {
        self.namespaces.iter().copied()
    }

    /// Number of namespaces.
    pub fn len(&self) -> usize {
        self.namespaces.len()
    }

    /// Returns true for an empty catalog.
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }

    /// Returns true if `namespace` is part of the catalog.
    pub fn contains(&self, namespace: &str) -> bool {
        self.namespaces.iter().any(|ns| *ns == namespace)
    }
}

impl Default for RegistrationCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Why a single namespace failed to register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// The request never produced a response.
    Transport(String),
    /// The service answered but refused the registration.
    Rejected {
        /// HTTP status code, when known
        status: Option<u16>,
        /// Diagnostic returned by the service, when present
        message: Option<String>,
    },
    /// The registration task ended without reporting a result.
    Aborted(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport(message) => write!(
                f,
                "Cannot request provider registration for Azure Resource Manager: {}.",
                message
            ),
            FailureReason::Rejected { status, message } => {
                write!(
                    f,
                    "Credentials for accessing the Azure Resource Manager API are likely \
                     to be incorrect, or the service principal does not have permission \
                     to use the Azure Service Management API."
                )?;
                match (status, message) {
                    (Some(status), Some(message)) => write!(f, " ({}: {})", status, message),
                    (Some(status), None) => write!(f, " (status {})", status),
                    (None, Some(message)) => write!(f, " ({})", message),
                    (None, None) => Ok(()),
                }
            }
            FailureReason::Aborted(message) => {
                write!(f, "Provider registration did not complete: {}", message)
            }
        }
    }
}

/// A namespace that could not be registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFailure {
    /// The provider namespace
    pub namespace: String,
    /// Why it failed
    pub reason: FailureReason,
}

/// One or more namespaces failed to register.
///
/// Failures are listed in catalog order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_failures(.failures))]
pub struct RegistrationError {
    failures: Vec<NamespaceFailure>,
}

impl RegistrationError {
    /// The failed namespaces and their reasons.
    pub fn failures(&self) -> &[NamespaceFailure] {
        &self.failures
    }

    /// Names of the namespaces that failed.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.namespace.as_str())
    }
}

fn render_failures(failures: &[NamespaceFailure]) -> String {
    let mut out = format!(
        "failed to register {} Azure resource provider(s) with the subscription:",
        failures.len()
    );
    for failure in failures {
        out.push_str(&format!("\n\t* {}: {}", failure.namespace, failure.reason));
    }
    out
}

/// Result of a registration pass, shared by every caller.
pub type RegistrationOutcome = Result<(), RegistrationError>;

// ============================================================================
// Coordinator
// ============================================================================

enum RegistrationState {
    NotStarted,
    InProgress(watch::Receiver<Option<RegistrationOutcome>>),
    Done(RegistrationOutcome),
}

/// Registers a [`RegistrationCatalog`] at most once.
///
/// The first call starts the pass on a spawned task so that dropping the
/// caller's future cannot abandon it. Concurrent callers wait for that pass
/// and every later caller gets the stored outcome without any network calls.
///
/// A pass that never reports, because the runtime it was spawned on shut
/// down, is not an outcome. The next caller starts a fresh pass.
pub struct RegistrationCoordinator {
    catalog: RegistrationCatalog,
    state: Mutex<RegistrationState>,
}

static GLOBAL_COORDINATOR: Lazy<RegistrationCoordinator> =
    Lazy::new(|| RegistrationCoordinator::new(RegistrationCatalog::standard()));

impl RegistrationCoordinator {
    /// A coordinator that has not registered anything yet.
    pub fn new(catalog: RegistrationCatalog) -> Self {
        Self {
            catalog,
            state: Mutex::new(RegistrationState::NotStarted),
        }
    }

    /// The process-wide coordinator over the standard catalog.
    pub fn global() -> &'static RegistrationCoordinator {
        &GLOBAL_COORDINATOR
    }

    /// The catalog this coordinator registers.
    pub fn catalog(&self) -> RegistrationCatalog {
        self.catalog
    }

    /// The stored outcome, if a pass has finished and been observed.
    pub fn outcome(&self) -> Option<RegistrationOutcome> {
        match &*self.state.lock() {
            RegistrationState::Done(outcome) => Some(outcome.clone()),
            _ => None,
        }
    }

    /// Register every catalog namespace, or replay the earlier outcome.
    pub async fn register_all(&self, registrar: Arc<dyn ProviderRegistrar>) -> RegistrationOutcome {
        loop {
            if let Some(outcome) = self.attempt(&registrar).await {
                return outcome;
            }
        }
    }

    /// Join or start a pass. `None` means the pass died without reporting.
    async fn attempt(&self, registrar: &Arc<dyn ProviderRegistrar>) -> Option<RegistrationOutcome> {
        let mut rx = {
            let mut state = self.state.lock();
            match &*state {
                RegistrationState::Done(outcome) => return Some(outcome.clone()),
                RegistrationState::InProgress(rx) => {
                    debug!("Provider registration already in progress, waiting");
                    rx.clone()
                }
                RegistrationState::NotStarted => {
                    let (tx, rx) = watch::channel(None);
                    *state = RegistrationState::InProgress(rx.clone());

                    let catalog = self.catalog;
                    let registrar = Arc::clone(registrar);
                    tokio::spawn(async move {
                        let outcome = run_pass(catalog, registrar).await;
                        // Receivers live in the coordinator state, so this cannot fail
                        let _ = tx.send(Some(outcome));
                    });
                    rx
                }
            }
        };

        let reported = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };

        let mut state = self.state.lock();
        let Some(outcome) = reported else {
            if matches!(&*state, RegistrationState::InProgress(current) if current.same_channel(&rx)) {
                warn!("Provider registration pass stopped before reporting, restarting");
                *state = RegistrationState::NotStarted;
            }
            return None;
        };
        if let RegistrationState::Done(stored) = &*state {
            return Some(stored.clone());
        }
        *state = RegistrationState::Done(outcome.clone());
        Some(outcome)
    }
}

/// Register every namespace concurrently and reduce to one outcome.
async fn run_pass(
    catalog: RegistrationCatalog,
    registrar: Arc<dyn ProviderRegistrar>,
) -> RegistrationOutcome {
    info!(
        namespaces = catalog.len(),
        "Registering Azure resource providers with subscription"
    );

    let handles: Vec<_> = catalog
        .iter()
        .map(|namespace| {
            let registrar = Arc::clone(&registrar);
            tokio::spawn(async move { register_one(namespace, registrar.as_ref()).await })
        })
        .collect();

    let results = join_all(handles).await;

    let failures: Vec<NamespaceFailure> = catalog
        .iter()
        .zip(results)
        .filter_map(|(namespace, joined)| {
            let reason = match joined {
                Ok(Ok(())) => return None,
                Ok(Err(reason)) => reason,
                Err(e) => FailureReason::Aborted(e.to_string()),
            };
            warn!(namespace = %namespace, reason = %reason, "Resource provider registration failed");
            Some(NamespaceFailure {
                namespace: namespace.to_string(),
                reason,
            })
        })
        .collect();

    if failures.is_empty() {
        info!("All Azure resource providers registered");
        Ok(())
    } else {
        Err(RegistrationError { failures })
    }
}

async fn register_one(
    namespace: &str,
    registrar: &dyn ProviderRegistrar,
) -> Result<(), FailureReason> {
    match registrar.register_provider(namespace).await {
        Ok(RegistrationResponse::Registered) => {
            debug!(namespace = %namespace, "Resource provider registered");
            Ok(())
        }
        Ok(RegistrationResponse::AlreadyRegistered) => {
            debug!(namespace = %namespace, "Resource provider already registered");
            Ok(())
        }
        Ok(RegistrationResponse::Rejected { status, message }) => {
            Err(FailureReason::Rejected { status, message })
        }
        Err(e) => Err(FailureReason::Transport(e.0)),
    }
}
