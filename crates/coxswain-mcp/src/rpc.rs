//! MCP JSON-RPC request handling
//!
//! Transport-agnostic: both the HTTP and stdio transports feed parsed
//! requests through [`handle`]. Authentication failures are reported as MCP
//! tool errors (for `tools/call`) or JSON-RPC errors (for other methods),
//! never as transport-level failures.

use coxswain_auth::Session;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::tools::ToolRegistry;

/// MCP protocol version this server speaks
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC error code for a method the server does not implement
pub const CODE_METHOD_NOT_FOUND: i64 = -32601;

/// JSON-RPC error code for malformed requests
pub const CODE_INVALID_REQUEST: i64 = -32600;

/// JSON-RPC error code for unparsable payloads
pub const CODE_PARSE_ERROR: i64 = -32700;

/// JSON-RPC error code for authentication failures
pub const CODE_UNAUTHENTICATED: i64 = -32001;

/// A parsed JSON-RPC request
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    /// JSON-RPC version marker (always "2.0")
    #[serde(default)]
    pub jsonrpc: String,
    /// Request id; absent for notifications
    #[serde(default)]
    pub id: serde_json::Value,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: serde_json::Value,
}

impl RpcRequest {
    /// Whether this request is a notification (no response expected)
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }
}

/// A JSON-RPC response
#[derive(Debug, Serialize)]
pub struct RpcResponse {
    /// JSON-RPC version marker
    pub jsonrpc: &'static str,
    /// Id of the request being answered
    pub id: serde_json::Value,
    /// Successful result, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    /// Error, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

/// A JSON-RPC error object
#[derive(Debug, Serialize)]
pub struct RpcError {
    /// JSON-RPC error code
    pub code: i64,
    /// Human-readable message
    pub message: String,
}

impl RpcResponse {
    /// Build a success response
    pub fn result(id: serde_json::Value, result: serde_json::Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response
    pub fn error(id: serde_json::Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Build a tool-error result (an MCP tool response with `isError`)
    pub fn tool_error(id: serde_json::Value, message: &str) -> Self {
        Self::result(
            id,
            json!({
                "content": [{"type": "text", "text": message}],
                "isError": true,
            }),
        )
    }
}

/// Handle a single MCP request
///
/// `auth_failure` carries the authentication error captured by the
/// transport middleware, if any; it is surfaced per method as described in
/// the module docs. Returns `None` for notifications.
pub async fn handle(
    tools: &ToolRegistry,
    session: Option<&Session>,
    auth_failure: Option<&str>,
    request: RpcRequest,
) -> Option<RpcResponse> {
    if request.is_notification() {
        return None;
    }
    let id = request.id.clone();

    let response = match request.method.as_str() {
        "initialize" => match auth_failure {
            Some(message) => RpcResponse::error(id, CODE_UNAUTHENTICATED, message),
            None => RpcResponse::result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {"tools": {}},
                    "serverInfo": {
                        "name": "coxswain",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                }),
            ),
        },
        "ping" => RpcResponse::result(id, json!({})),
        "tools/list" => match auth_failure {
            Some(message) => RpcResponse::error(id, CODE_UNAUTHENTICATED, message),
            None => RpcResponse::result(id, json!({"tools": tools.descriptors()})),
        },
        "tools/call" => {
            if let Some(message) = auth_failure {
                return Some(RpcResponse::tool_error(id, message));
            }
            let name = match request.params.get("name").and_then(|v| v.as_str()) {
                Some(name) => name,
                None => {
                    return Some(RpcResponse::error(
                        id,
                        CODE_INVALID_REQUEST,
                        "missing tool name",
                    ));
                }
            };
            let arguments = request
                .params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));

            match tools.call(session, name, &arguments).await {
                Ok(value) => RpcResponse::result(
                    id,
                    json!({
                        "content": [{
                            "type": "text",
                            "text": serde_json::to_string_pretty(&value)
                                .unwrap_or_else(|_| value.to_string()),
                        }],
                        "isError": false,
                    }),
                ),
                Err(e) => RpcResponse::tool_error(id, &e.to_string()),
            }
        }
        other => RpcResponse::error(
            id,
            CODE_METHOD_NOT_FOUND,
            format!("method not found: {other}"),
        ),
    };

    Some(response)
}
