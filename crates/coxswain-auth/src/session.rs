//! Authenticated session identity
//!
//! A `Session` is created fresh per authenticated request, attached to the
//! request's extensions by the transport middleware, and discarded at
//! request end. It is never mutated after creation and never shared across
//! requests.

use serde::{Deserialize, Serialize};

/// Per-request authenticated identity produced by a successful provider run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Kubernetes impersonation username (may be empty)
    pub user_name: String,
    /// Kubernetes impersonation groups
    ///
    /// `None` means no groups expression was configured; `Some(vec![])`
    /// means the expression was evaluated and yielded no groups. The two
    /// are distinguishable downstream.
    pub groups: Option<Vec<String>>,
    /// Authorization scopes granted to this session
    ///
    /// `None` means no scopes expression was configured and scope checking
    /// is disabled for this session; `Some(vec![])` means scopes were
    /// configured but none were granted, so any non-empty requirement
    /// fails.
    pub scopes: Option<Vec<String>>,
}
