//! HTTP transport for the MCP server
//!
//! A thin axum shell: `POST /mcp` carries MCP JSON-RPC requests and
//! `GET /healthz` answers liveness probes. When authentication is
//! configured, a middleware authenticates every MCP request and attaches
//! the resulting [`Session`] to the request's extensions; failures are
//! captured and surfaced by the handler as MCP-level errors, never as
//! transport-level failures.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use coxswain_auth::{Authenticator, Session};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::rpc::{self, RpcRequest};
use crate::tools::ToolRegistry;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Authenticator built from the startup configuration; `None` when
    /// authentication is not configured for this transport
    pub authenticator: Option<Arc<Authenticator>>,
    /// Tool registry used for listing and dispatch
    pub tools: Arc<ToolRegistry>,
}

/// Authentication failure captured by the middleware
///
/// Carried through request extensions so the handler can report it with
/// the right JSON-RPC request id.
#[derive(Debug, Clone)]
struct AuthFailure(String);

/// Authenticate the request and attach the outcome to its extensions
///
/// The session (or failure) rides in the request's extensions; the
/// original extensions remain reachable.
async fn authenticate_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(authenticator) = &state.authenticator {
        match authenticator.authenticate(request.headers()).await {
            Ok(session) => {
                request.extensions_mut().insert(session);
            }
            Err(e) => {
                debug!(error = %e, "Authentication failed");
                request.extensions_mut().insert(AuthFailure(e.to_string()));
            }
        }
    }
    next.run(request).await
}

/// Handle a single MCP request
async fn mcp_handler(
    State(state): State<AppState>,
    session: Option<Extension<Session>>,
    failure: Option<Extension<AuthFailure>>,
    Json(request): Json<RpcRequest>,
) -> Response {
    let session = session.map(|Extension(session)| session);
    let failure = failure.map(|Extension(failure)| failure);

    match rpc::handle(
        &state.tools,
        session.as_ref(),
        failure.as_ref().map(|f| f.0.as_str()),
        request,
    )
    .await
    {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// Build the MCP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(mcp_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            authenticate_request,
        ))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Start the HTTP transport
pub async fn start_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = router(state);

    info!(addr = %addr, "Starting MCP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Server(e.to_string()))
}
