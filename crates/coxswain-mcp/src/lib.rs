//! Coxswain MCP server shell
//!
//! Thin glue over the authentication core: an HTTP (axum) or stdio
//! transport carrying MCP JSON-RPC requests, an authentication middleware
//! that attaches the per-request [`coxswain_auth::Session`] to request
//! extensions, and a scope-gated tool registry.
//!
//! # Request flow
//!
//! ```text
//! POST /mcp ──► authenticate_request ──► rpc::handle ──► ToolRegistry::call
//!               (Session or failure        (tools/list,    (check_scopes,
//!                in extensions)             tools/call)     then backend)
//! ```

#![deny(missing_docs)]

pub mod backend;
pub mod cli;
pub mod error;
pub mod rpc;
pub mod server;
pub mod stdio;
pub mod tools;

pub use backend::{ClusterBackend, UnconfiguredBackend};
pub use cli::{Cli, Transport};
pub use error::{Error, Result};
pub use server::{router, start_server, AppState};
pub use tools::ToolRegistry;
