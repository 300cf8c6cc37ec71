//! Authentication orchestrator
//!
//! Chains credential extractors and identity providers: extractors are
//! tried in configured order and the first match wins; the extracted
//! credentials are then offered to each provider in order until one
//! authenticates them.
//!
//! No caching happens here: every call re-extracts credentials and re-runs
//! full provider authentication, including the OIDC discovery round-trip.
//! That is a deliberate simplicity/latency trade-off for low-QPS
//! administrative tooling.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tracing::debug;

use crate::credentials::{CredentialExtractor, Credentials};
use crate::error::{Error, Result};
use crate::session::Session;

/// An identity provider that can authenticate extracted credentials
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name from the configuration, used in logs
    fn name(&self) -> &str;

    /// Authenticate the extracted credentials, producing a session
    async fn authenticate(&self, credentials: &Credentials) -> Result<Session>;
}

/// Orchestrates credential extraction and provider authentication
pub struct Authenticator {
    /// Ordered credential extractors; first match wins
    extractors: Vec<Box<dyn CredentialExtractor>>,
    /// Ordered providers; first success wins
    providers: Vec<Arc<dyn Provider>>,
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("extractors", &self.extractors.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl Authenticator {
    /// Create an authenticator from already-constructed extractors and
    /// providers
    ///
    /// Use [`AuthenticationConfig::build`](crate::config::AuthenticationConfig::build)
    /// to construct one from a declarative configuration.
    pub fn new(
        extractors: Vec<Box<dyn CredentialExtractor>>,
        providers: Vec<Arc<dyn Provider>>,
    ) -> Self {
        Self {
            extractors,
            providers,
        }
    }

    /// Authenticate a request from its headers
    ///
    /// Tries extractors in order and uses the first that matches, then
    /// tries providers in order and returns the first success. When every
    /// provider fails, the last provider's error is surfaced.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Session> {
        let credentials = self
            .extractors
            .iter()
            .find_map(|extractor| extractor.extract(headers))
            .ok_or(Error::CredentialsNotFound)?;

        let mut last_error: Option<Error> = None;
        for provider in &self.providers {
            debug!(provider = %provider.name(), "Trying provider");
            match provider.authenticate(&credentials).await {
                Ok(session) => {
                    debug!(
                        provider = %provider.name(),
                        user = %session.user_name,
                        "Authentication succeeded"
                    );
                    return Ok(session);
                }
                Err(e) => {
                    debug!(
                        provider = %provider.name(),
                        error = %e,
                        "Provider rejected credentials"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(Error::Unauthenticated(
            last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no providers configured".to_string()),
        ))
    }
}
