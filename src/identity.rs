// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Caller identity resolution.
//!
//! Authentication is an upgrade path: a verified credential lifts the
//! anonymous quota, but a missing, expired or rejected credential never
//! fails a request. It only degrades the caller to anonymous.
//!
//! Anonymous callers are keyed by [`derive_identity`], a best-effort
//! network origin taken from proxy headers. Those headers are client
//! controlled and trivially spoofed, so the result is a throttling
//! heuristic and never an authorization boundary.

use crate::config::IdentityConfig;
use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use serde::Deserialize;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Sentinel origin used when nothing identifies the connection.
pub const UNKNOWN_ORIGIN: &str = "unknown";

/// Credential verification failure. Internal only; never surfaced.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Credential rejected by identity provider (status {0})")]
    Rejected(u16),

    #[error("Identity provider returned an unreadable response: {0}")]
    MalformedResponse(String),

    #[error("Identity provider unreachable: {0}")]
    Transport(String),

    #[error("Identity provider timed out")]
    Timeout,
}

/// Outcome of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Authenticated { account_id: String },
    Anonymous,
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    pub fn account_id(&self) -> Option<&str> {
        match self {
            Identity::Authenticated { account_id } => Some(account_id),
            Identity::Anonymous => None,
        }
    }
}

/// Key used to scope rate limiting and request logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// Verified account identifier
    Account(String),
    /// Best-effort network origin
    Origin(String),
}

impl ClientIdentity {
    /// Identity for a request: the verified account when there is one,
    /// otherwise the derived network origin.
    pub fn for_request(
        identity: &Identity,
        headers: &HeaderMap,
        connection: Option<SocketAddr>,
    ) -> Self {
        match identity {
            Identity::Authenticated { account_id } => Self::Account(account_id.clone()),
            Identity::Anonymous => Self::Origin(derive_identity(headers, connection)),
        }
    }
}

impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Account(id) => write!(f, "account:{id}"),
            Self::Origin(origin) => write!(f, "origin:{origin}"),
        }
    }
}

/// Verifies an opaque credential and returns the account it belongs to.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<String, AuthError>;
}

/// Identity provider reached over HTTP.
///
/// The credential is forwarded as a bearer token to the verification
/// endpoint, which answers `{"accountId": "..."}` on success.
pub struct HttpIdentityProvider {
    verify_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponse {
    account_id: String,
}

impl HttpIdentityProvider {
    /// Create a provider for the given endpoint.
    pub fn new(verify_url: String, timeout: std::time::Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;
        Ok(Self { verify_url, client })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify(&self, credential: &str) -> Result<String, AuthError> {
        let response = self
            .client
            .post(&self.verify_url)
            .bearer_auth(credential)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AuthError::Timeout
                } else {
                    AuthError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Rejected(status.as_u16()));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AuthError::MalformedResponse(e.to_string()))?;

        if body.account_id.trim().is_empty() {
            return Err(AuthError::MalformedResponse("empty accountId".to_string()));
        }
        Ok(body.account_id)
    }
}

/// Resolves a request's identity without ever failing it.
#[derive(Clone, Default)]
pub struct IdentityResolver {
    provider: Option<Arc<dyn IdentityProvider>>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// Resolver with no identity provider: every caller is anonymous.
    pub fn anonymous_only() -> Self {
        Self { provider: None }
    }

    /// Build a resolver from configuration.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, AuthError> {
        match &config.verify_url {
            Some(url) => {
                let provider = HttpIdentityProvider::new(url.clone(), config.timeout())?;
                Ok(Self::new(Arc::new(provider)))
            }
            None => Ok(Self::anonymous_only()),
        }
    }

    /// Resolve an optional credential.
    pub async fn resolve(&self, credential: Option<&str>) -> Identity {
        let Some(credential) = credential else {
            return Identity::Anonymous;
        };

        let Some(provider) = &self.provider else {
            debug!("Credential presented but no identity provider configured");
            return Identity::Anonymous;
        };

        match provider.verify(credential).await {
            Ok(account_id) => {
                debug!(account_id = %account_id, "Credential verified");
                Identity::Authenticated { account_id }
            }
            Err(err) => {
                warn!(error = %err, "Credential verification failed, continuing as anonymous");
                Identity::Anonymous
            }
        }
    }
}

/// Extract a bearer credential from the `Authorization` header.
///
/// The token is returned as-is; its format is the provider's concern.
pub fn extract_credential(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Derive a best-effort client origin.
///
/// Order: first `X-Forwarded-For` entry, `X-Real-IP`, the connection
/// address, then [`UNKNOWN_ORIGIN`]. Spoofable; use for throttling only.
pub fn derive_identity(headers: &HeaderMap, connection: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(origin) = forwarded {
        return origin.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(origin) = real_ip {
        return origin.to_string();
    }

    connection
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}
