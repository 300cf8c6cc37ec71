//! Command-line interface
//!
//! Flags are limited to selecting the transport and the authentication
//! configuration; everything else is fixed at build time.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use coxswain_auth::AuthenticationConfig;
use tracing::{info, warn};

use crate::backend::UnconfiguredBackend;
use crate::error::Result;
use crate::server::{start_server, AppState};
use crate::stdio::serve_stdio;
use crate::tools::ToolRegistry;

/// MCP transports the server can speak
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Newline-delimited JSON-RPC over stdin/stdout
    Stdio,
    /// JSON-RPC over HTTP POST
    Http,
}

/// Coxswain - claims-aware MCP server for Kubernetes clusters
#[derive(Parser, Debug)]
#[command(name = "coxswain", version, about, long_about = None)]
pub struct Cli {
    /// Transport to serve MCP requests on
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    pub transport: Transport,

    /// Address to bind the HTTP transport
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub addr: SocketAddr,

    /// Path to the authentication configuration YAML
    ///
    /// When omitted, requests are served unauthenticated.
    #[arg(long = "auth-config", env = "COXSWAIN_AUTH_CONFIG")]
    pub auth_config: Option<PathBuf>,
}

impl Cli {
    /// Run the server with the selected transport
    ///
    /// The authentication configuration is loaded and validated before
    /// serving; any error here aborts startup.
    pub async fn run(self) -> Result<()> {
        let authenticator = match &self.auth_config {
            Some(path) => {
                let config = AuthenticationConfig::from_yaml_file(path)?;
                let authenticator = config.build()?;
                info!(
                    path = %path.display(),
                    credentials = config.credentials.len(),
                    providers = config.providers.len(),
                    "Loaded authentication configuration"
                );
                Some(Arc::new(authenticator))
            }
            None => None,
        };

        let tools = Arc::new(ToolRegistry::new(Arc::new(UnconfiguredBackend)));

        match self.transport {
            Transport::Http => {
                if authenticator.is_none() {
                    warn!("No authentication configured; HTTP requests will be unauthenticated");
                }
                start_server(
                    self.addr,
                    AppState {
                        authenticator,
                        tools,
                    },
                )
                .await
            }
            Transport::Stdio => serve_stdio(tools).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["coxswain"]);
        assert_eq!(cli.transport, Transport::Http);
        assert_eq!(cli.addr.port(), 8080);
        assert!(cli.auth_config.is_none());
    }

    #[test]
    fn test_cli_stdio_transport() {
        let cli = Cli::parse_from(["coxswain", "--transport", "stdio"]);
        assert_eq!(cli.transport, Transport::Stdio);
    }

    #[test]
    fn test_cli_auth_config_flag() {
        let cli = Cli::parse_from(["coxswain", "--auth-config", "/etc/coxswain/auth.yaml"]);
        assert_eq!(
            cli.auth_config.as_deref(),
            Some(std::path::Path::new("/etc/coxswain/auth.yaml"))
        );
    }
}
