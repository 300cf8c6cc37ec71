//! Error types for the authentication core
//!
//! Error messages are stage-prefixed so callers can tell which pipeline
//! stage failed (construction, extraction, verification, evaluation,
//! validation) without inspecting variants. Tests assert on these prefixes.

use thiserror::Error;

/// Result type for authentication operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for authentication operations
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid authentication configuration (startup-time, fatal)
    #[error("configuration error: {0}")]
    Config(String),

    /// No credential extractor matched the request
    #[error("failed to extract credentials from request")]
    CredentialsNotFound,

    /// Every configured provider rejected the request (carries the last
    /// provider's error)
    #[error("failed to authenticate request: {0}")]
    Unauthenticated(String),

    /// OIDC discovery or JWKS retrieval failed
    #[error("failed to create OIDC provider: {0}")]
    ProviderDiscovery(String),

    /// Token signature, audience, issuer, or expiry verification failed
    #[error("failed to verify token: {0}")]
    TokenVerification(String),

    /// A CEL expression failed to evaluate
    #[error("failed to evaluate expression {expression:?}: {cause}")]
    Evaluation {
        /// Source text of the failing expression
        expression: String,
        /// Underlying evaluation error
        cause: String,
    },

    /// A variable expression failed to evaluate against the claims
    #[error("failed to evaluate variable '{name}': {cause}")]
    VariableEvaluation {
        /// Name of the variable being bound
        name: String,
        /// Underlying evaluation error
        cause: String,
    },

    /// A validation expression failed to evaluate (as opposed to evaluating
    /// cleanly to false)
    #[error("failed to evaluate validation expression: {0}")]
    ValidationEvaluation(String),

    /// A validation expression evaluated cleanly to false; the message is
    /// the operator-supplied failure message
    #[error("validation failed: {0}")]
    ValidationFailed(String),

    /// The impersonation username expression failed to evaluate
    #[error("failed to evaluate impersonation username expression: {0}")]
    UsernameEvaluation(String),

    /// The impersonation groups expression failed to evaluate
    #[error("failed to evaluate impersonation groups expression: {0}")]
    GroupsEvaluation(String),

    /// The scopes expression failed to evaluate
    #[error("failed to evaluate scopes expression: {0}")]
    ScopesEvaluation(String),

    /// The session does not carry any of the scopes a tool requires
    #[error("at least one of the following scopes is required: {0}")]
    MissingScopes(String),
}
