//! Error types for the MCP server shell

use thiserror::Error;

/// Result type for MCP server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for MCP server operations
#[derive(Debug, Error)]
pub enum Error {
    /// Authentication or authorization failure from the auth core
    #[error(transparent)]
    Auth(#[from] coxswain_auth::Error),

    /// The requested tool is not registered
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool arguments did not match the tool's input schema
    #[error("invalid tool arguments: {0}")]
    InvalidArguments(String),

    /// The cluster backend rejected or could not serve the request
    #[error("cluster backend error: {0}")]
    Backend(String),

    /// Transport-level failure
    #[error("server error: {0}")]
    Server(String),

    /// I/O failure on the stdio transport
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
