//! Authenticated Azure Resource Manager client.
//!
//! [`ArmClientFactory`] exchanges a service principal's [`CredentialSet`] for a
//! bearer token against the Azure AD authority of the credential's tenant and
//! returns an [`ArmClient`] bound to the credential's subscription.
//!
//! ## Flow
//!
//! ```text
//! CredentialSet ──► POST {authority}/{tenant}/oauth2/token ──► access_token
//!                                                                   │
//!                   POST {management}/subscriptions/{sub}/          ▼
//!                        providers/Microsoft.Compute/register ◄── ArmClient
//! ```
//!
//! The factory never retries and never re-validates its input; both belong to
//! the caller.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::config::EndpointConfig;
use crate::credentials::{CredentialSet, SensitiveString};

/// API version used for resource provider registration calls.
pub const PROVIDERS_API_VERSION: &str = "2016-09-01";

/// Namespace registered while the client is being built.
pub const COMPUTE_NAMESPACE: &str = "Microsoft.Compute";

// ============================================================================
// Errors
// ============================================================================

/// Failure to exchange credentials for an authenticated client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The identity or management endpoint could not be reached.
    #[error("unable to reach {endpoint}: {message}")]
    Unreachable {
        /// The endpoint that was contacted
        endpoint: String,
        /// Transport error message
        message: String,
    },

    /// The endpoint refused the credentials.
    #[error("{endpoint} rejected the credentials ({status}): {message}")]
    Rejected {
        /// The endpoint that was contacted
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Diagnostic returned by the endpoint
        message: String,
    },

    /// The endpoint answered with something that is not a token.
    #[error("invalid token response from {endpoint}: {message}")]
    InvalidResponse {
        /// The endpoint that was contacted
        endpoint: String,
        /// What was wrong with the response
        message: String,
    },

    /// An endpoint URL cannot carry request paths.
    #[error("invalid endpoint URL '{endpoint}': {message}")]
    InvalidEndpoint {
        /// The configured endpoint
        endpoint: String,
        /// Why it was refused
        message: String,
    },

    /// The HTTP client could not be constructed.
    #[error("unable to build HTTP client: {0}")]
    Client(String),
}

/// A register-provider call that failed before a response was received.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        Self(e.to_string())
    }
}

// ============================================================================
// Registration seam
// ============================================================================

/// Outcome of a register-provider call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationResponse {
    /// The namespace is now registered (or registering).
    Registered,
    /// The namespace was registered before this call.
    AlreadyRegistered,
    /// The service refused to register the namespace.
    Rejected {
        /// HTTP status code, when known
        status: Option<u16>,
        /// Diagnostic returned by the service, when present
        message: Option<String>,
    },
}

impl RegistrationResponse {
    /// Returns true unless the service rejected the registration.
    pub fn is_successful(&self) -> bool {
        !matches!(self, RegistrationResponse::Rejected { .. })
    }
}

/// Something that can register a resource provider namespace with a
/// subscription.
///
/// [`ArmClient`] is the production implementation; tests substitute doubles.
#[async_trait]
pub trait ProviderRegistrar: Send + Sync {
    /// Register `namespace` with the bound subscription.
    async fn register_provider(
        &self,
        namespace: &str,
    ) -> Result<RegistrationResponse, TransportError>;
}

/// Exchanges a validated credential set for an authenticated client.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// The client handle produced by this factory.
    type Client: ProviderRegistrar + 'static;

    /// Perform the credential exchange.
    async fn build_client(&self, credentials: &CredentialSet) -> Result<Self::Client, AuthError>;
}

// ============================================================================
// Token
// ============================================================================

/// A bearer token issued by Azure AD.
#[derive(Clone)]
pub struct AccessToken {
    token: SensitiveString,
    obtained_at: Instant,
    expires_in: Option<Duration>,
}

impl AccessToken {
    /// Wrap a raw bearer token.
    pub fn new(token: impl Into<SensitiveString>, expires_in: Option<Duration>) -> Self {
        Self {
            token: token.into(),
            obtained_at: Instant::now(),
            expires_in,
        }
    }

    /// The raw token value.
    pub fn secret(&self) -> &SensitiveString {
        &self.token
    }

    /// Returns true once the token's lifetime has elapsed.
    pub fn is_expired(&self) -> bool {
        self.expires_in
            .map(|ttl| self.obtained_at.elapsed() >= ttl)
            .unwrap_or(false)
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &self.token)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Azure AD token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    // v1 endpoints send this as a string, v2 as a number
    expires_in: Option<serde_json::Value>,
}

impl TokenResponse {
    fn lifetime(&self) -> Option<Duration> {
        let secs = match self.expires_in.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64()?,
            serde_json::Value::String(s) => s.parse().ok()?,
            _ => return None,
        };
        Some(Duration::from_secs(secs))
    }
}

/// Azure AD error body.
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// Azure Resource Manager error body.
#[derive(Debug, Deserialize)]
struct ArmErrorResponse {
    error: ArmErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ArmErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

// ============================================================================
// Client
// ============================================================================

/// Authenticated handle bound to one subscription.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct ArmClient {
    http: Client,
    management_url: Url,
    subscription_id: String,
    token: AccessToken,
}

impl ArmClient {
    /// Assemble a client from an existing token.
    ///
    /// Fails if `management_url` cannot have path segments appended.
    pub fn new(
        http: Client,
        management_url: Url,
        subscription_id: impl Into<String>,
        token: AccessToken,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            http,
            management_url: base_url(management_url)?,
            subscription_id: subscription_id.into(),
            token,
        })
    }

    /// The subscription this client is bound to.
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// The management endpoint base URL.
    pub fn management_url(&self) -> &Url {
        &self.management_url
    }

    /// The bearer token used for management calls.
    pub fn token(&self) -> &AccessToken {
        &self.token
    }

    /// The underlying HTTP client, for resource handlers issuing their own
    /// management calls.
    pub fn http(&self) -> &Client {
        &self.http
    }

    /// URL of the register call for `namespace`.
    ///
    /// The subscription ID and namespace are percent-encoded as single path
    /// segments.
    pub fn register_url(&self, namespace: &str) -> Url {
        let mut url = append_segments(
            &self.management_url,
            &[
                "subscriptions",
                &self.subscription_id,
                "providers",
                namespace,
                "register",
            ],
        );
        url.query_pairs_mut()
            .append_pair("api-version", PROVIDERS_API_VERSION);
        url
    }
}

#[async_trait]
impl ProviderRegistrar for ArmClient {
    async fn register_provider(
        &self,
        namespace: &str,
    ) -> Result<RegistrationResponse, TransportError> {
        let url = self.register_url(namespace);
        debug!(namespace = %namespace, "Requesting resource provider registration");

        let response = self
            .http
            .post(url)
            .bearer_auth(self.token.secret().expose())
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(RegistrationResponse::Registered);
        }

        let body = response.text().await?;
        Ok(classify_registration_failure(status, &body))
    }
}

/// Check that `url` can take path segments.
fn base_url(url: Url) -> Result<Url, AuthError> {
    if url.cannot_be_a_base() {
        return Err(AuthError::InvalidEndpoint {
            endpoint: url.to_string(),
            message: "URL cannot carry a request path".to_string(),
        });
    }
    Ok(url)
}

fn parse_endpoint(endpoint: &str) -> Result<Url, AuthError> {
    let url = Url::parse(endpoint).map_err(|e| AuthError::InvalidEndpoint {
        endpoint: endpoint.to_string(),
        message: e.to_string(),
    })?;
    base_url(url)
}

/// Append `segments` to the path of `base`, encoding each one.
fn append_segments(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    // base_url() rejected cannot-be-a-base URLs at construction
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

/// Classify a non-2xx register-provider response.
fn classify_registration_failure(status: StatusCode, body: &str) -> RegistrationResponse {
    let detail = serde_json::from_str::<ArmErrorResponse>(body)
        .ok()
        .map(|r| r.error);

    // A 409 only means "already registered" when it names no other error code
    let already_registered = match detail.as_ref().and_then(|d| d.code.as_deref()) {
        Some(code) => code.eq_ignore_ascii_case("AlreadyRegistered"),
        None => status == StatusCode::CONFLICT,
    };
    if already_registered {
        return RegistrationResponse::AlreadyRegistered;
    }

    let message = match detail {
        Some(ArmErrorDetail {
            code: Some(code),
            message: Some(message),
        }) => Some(format!("{}: {}", code, message)),
        Some(ArmErrorDetail {
            message: Some(message),
            ..
        }) => Some(message),
        _ if !body.trim().is_empty() => Some(body.trim().to_string()),
        _ => None,
    };

    RegistrationResponse::Rejected {
        status: Some(status.as_u16()),
        message,
    }
}

// ============================================================================
// Factory
// ============================================================================

/// Builds [`ArmClient`]s through the OAuth2 client-credentials flow.
#[derive(Debug, Clone)]
pub struct ArmClientFactory {
    http: Client,
    endpoints: EndpointConfig,
    authority_url: Url,
    management_url: Url,
}

impl ArmClientFactory {
    /// Create a factory for the given endpoints.
    pub fn new(endpoints: EndpointConfig) -> Result<Self, AuthError> {
        let authority_url = parse_endpoint(&endpoints.authority_url)?;
        let management_url = parse_endpoint(&endpoints.management_url)?;
        let http = Client::builder()
            .timeout(endpoints.timeout)
            .user_agent(concat!("fixazurerm/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AuthError::Client(e.to_string()))?;

        Ok(Self {
            http,
            endpoints,
            authority_url,
            management_url,
        })
    }

    /// The endpoints this factory talks to.
    pub fn endpoints(&self) -> &EndpointConfig {
        &self.endpoints
    }

    fn token_url(&self, tenant_id: &str) -> Url {
        append_segments(&self.authority_url, &[tenant_id, "oauth2", "token"])
    }

    fn resource(&self) -> String {
        format!("{}/", self.endpoints.management_url.trim_end_matches('/'))
    }

    async fn acquire_token(&self, credentials: &CredentialSet) -> Result<AccessToken, AuthError> {
        let url = self.token_url(credentials.tenant_id());
        let endpoint = url.to_string();
        let resource = self.resource();
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", credentials.client_id()),
            ("client_secret", credentials.client_secret().expose()),
            ("resource", resource.as_str()),
        ];

        let response = self
            .http
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| AuthError::Unreachable {
            endpoint: endpoint.clone(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            let message = serde_json::from_str::<TokenErrorResponse>(&body)
                .ok()
                .and_then(|e| e.error_description.or(e.error))
                .unwrap_or_else(|| body.trim().to_string());
            return Err(AuthError::Rejected {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AuthError::InvalidResponse {
                endpoint: endpoint.clone(),
                message: e.to_string(),
            })?;

        let lifetime = parsed.lifetime();
        match parsed.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token, lifetime)),
            _ => Err(AuthError::InvalidResponse {
                endpoint,
                message: "response did not contain an access_token".to_string(),
            }),
        }
    }
}

#[async_trait]
impl ClientFactory for ArmClientFactory {
    type Client = ArmClient;

    async fn build_client(&self, credentials: &CredentialSet) -> Result<ArmClient, AuthError> {
        let token = self.acquire_token(credentials).await?;
        let client = ArmClient::new(
            self.http.clone(),
            self.management_url.clone(),
            credentials.subscription_id(),
            token,
        )?;

        let compute_url = client.register_url(COMPUTE_NAMESPACE).to_string();
        match client.register_provider(COMPUTE_NAMESPACE).await {
            Ok(RegistrationResponse::Rejected { status, message }) => {
                return Err(AuthError::Rejected {
                    endpoint: compute_url,
                    status: status.unwrap_or_default(),
                    message: message.unwrap_or_else(|| {
                        "the service principal may not use the subscription".to_string()
                    }),
                });
            }
            Ok(_) => {}
            Err(e) => {
                return Err(AuthError::Unreachable {
                    endpoint: compute_url,
                    message: e.0,
                });
            }
        }

        info!(
            subscription_id = %client.subscription_id(),
            "Authenticated against Azure Resource Manager"
        );

        Ok(client)
    }
}
