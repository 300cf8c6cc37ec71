//! Credential extraction from request headers
//!
//! Each extractor pulls one style of raw credential out of an HTTP-like
//! header map. Extractors are tried in configured order and the first one
//! that reports a match wins, even if the values it extracted are empty --
//! "found" is a distinct signal from "non-empty".

use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Raw credentials pulled out of a request's headers
///
/// Only the fields the winning extractor is responsible for are populated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Username, when the extractor carries one
    pub username: Option<String>,
    /// Password, when the extractor carries one
    pub password: Option<String>,
    /// Bearer or opaque token, when the extractor carries one
    pub token: Option<String>,
}

impl Credentials {
    /// The value offered for token verification: the token field, falling
    /// back to the password field when the token is absent or empty
    pub fn token_or_password(&self) -> Option<&str> {
        self.token
            .as_deref()
            .filter(|t| !t.is_empty())
            .or_else(|| self.password.as_deref().filter(|p| !p.is_empty()))
    }
}

/// A strategy for pulling raw credentials out of request headers
pub trait CredentialExtractor: Send + Sync {
    /// Try to extract credentials from the request headers
    ///
    /// Returns `None` when this extractor does not match the request.
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials>;
}

/// Extracts `Authorization: Bearer <token>` headers
#[derive(Debug, Clone, Copy, Default)]
pub struct BearerTokenExtractor;

impl CredentialExtractor for BearerTokenExtractor {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        let token = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))?;

        if token.is_empty() {
            return None;
        }

        Some(Credentials {
            token: Some(token.to_string()),
            ..Credentials::default()
        })
    }
}

/// Extracts `Authorization: Basic <base64>` headers
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicAuthExtractor;

impl CredentialExtractor for BasicAuthExtractor {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        let encoded = headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Basic "))?;

        let decoded = STANDARD.decode(encoded).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;

        Some(Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
            ..Credentials::default()
        })
    }
}

/// Extracts credentials from operator-configured header names
///
/// Up to three header names can be configured, one each for username,
/// password, and token. The extractor matches when at least one of the
/// configured headers is present with a non-empty value, and populates only
/// the corresponding fields.
#[derive(Debug, Clone, Default)]
pub struct CustomHeaderExtractor {
    /// Header carrying the username, if configured
    username_header: Option<String>,
    /// Header carrying the password, if configured
    password_header: Option<String>,
    /// Header carrying the token, if configured
    token_header: Option<String>,
}

impl CustomHeaderExtractor {
    /// Create an extractor for the given header names
    pub fn new(
        username_header: Option<String>,
        password_header: Option<String>,
        token_header: Option<String>,
    ) -> Self {
        Self {
            username_header,
            password_header,
            token_header,
        }
    }
}

/// Read a non-empty header value by name
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
}

impl CredentialExtractor for CustomHeaderExtractor {
    fn extract(&self, headers: &HeaderMap) -> Option<Credentials> {
        let mut credentials = Credentials::default();
        let mut found = false;

        if let Some(name) = &self.username_header {
            if let Some(value) = header_value(headers, name) {
                credentials.username = Some(value);
                found = true;
            }
        }
        if let Some(name) = &self.password_header {
            if let Some(value) = header_value(headers, name) {
                credentials.password = Some(value);
                found = true;
            }
        }
        if let Some(name) = &self.token_header {
            if let Some(value) = header_value(headers, name) {
                credentials.token = Some(value);
                found = true;
            }
        }

        found.then_some(credentials)
    }
}
