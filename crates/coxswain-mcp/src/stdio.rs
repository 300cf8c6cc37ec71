//! Stdio transport for the MCP server
//!
//! Reads newline-delimited JSON-RPC requests from stdin and writes
//! responses to stdout. No authentication runs on this transport (there is
//! no header map); scope checking is a no-op for the unauthenticated
//! session by design.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::error::{Error, Result};
use crate::rpc::{self, RpcRequest, RpcResponse};
use crate::tools::ToolRegistry;

/// Serve MCP requests over stdin/stdout until stdin closes
pub async fn serve_stdio(tools: Arc<ToolRegistry>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    debug!("Serving MCP over stdio");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<RpcRequest>(line) {
            Ok(request) => rpc::handle(&tools, None, None, request).await,
            Err(e) => Some(RpcResponse::error(
                serde_json::Value::Null,
                rpc::CODE_PARSE_ERROR,
                format!("parse error: {e}"),
            )),
        };

        if let Some(response) = response {
            let mut payload =
                serde_json::to_vec(&response).map_err(|e| Error::Server(e.to_string()))?;
            payload.push(b'\n');
            stdout.write_all(&payload).await?;
            stdout.flush().await?;
        }
    }

    Ok(())
}
