//! Coxswain authentication core
//!
//! Claims-based authentication and authorization for the Coxswain MCP
//! server: pluggable credential extraction, OIDC token verification, and a
//! CEL-driven claims-to-session pipeline that derives a Kubernetes
//! impersonation identity and an authorization scope set.
//!
//! # Architecture
//!
//! ```text
//! request headers ──► Authenticator ──► Session ──► check_scopes ──► tool handler
//!                     (extractors +     (username,
//!                      providers)        groups, scopes)
//! ```
//!
//! The [`config::AuthenticationConfig`] document names an ordered list of
//! credential extractors and identity providers. It is validated once at
//! startup -- every CEL expression is compiled up front, and any error
//! prevents the server from starting. Per-request authentication then runs
//! with no shared mutable state: compiled providers are immutable and safe
//! for concurrent use.

#![deny(missing_docs)]

pub mod authenticator;
pub mod config;
pub mod credentials;
pub mod error;
pub mod expr;
pub mod oidc;
pub mod scopes;
pub mod session;

pub use authenticator::{Authenticator, Provider};
pub use config::AuthenticationConfig;
pub use credentials::{CredentialExtractor, Credentials};
pub use error::{Error, Result};
pub use oidc::OidcProvider;
pub use scopes::check_scopes;
pub use session::Session;
