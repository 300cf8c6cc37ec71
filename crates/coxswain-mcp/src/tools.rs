//! Tool registry and scope-gated dispatch
//!
//! Every tool declares the scopes that may invoke it (any-of). Dispatch
//! checks the session against the tool's required scopes before running the
//! handler, so an unauthorized call never reaches the backend.

use std::sync::Arc;

use coxswain_auth::{check_scopes, Session};
use serde_json::json;
use tracing::debug;

use crate::backend::ClusterBackend;
use crate::error::{Error, Result};

/// Metadata for a registered tool
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Tool name as exposed over MCP
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Scopes that may invoke this tool; empty means unrestricted
    pub required_scopes: Vec<String>,
}

/// Registry of tools with scope-gated dispatch
pub struct ToolRegistry {
    /// Backend the handlers delegate to
    backend: Arc<dyn ClusterBackend>,
    /// Registered tool metadata, in listing order
    tools: Vec<ToolSpec>,
}

/// Build the scope list for a tool
fn scopes(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

impl ToolRegistry {
    /// Create the registry with the default tool set
    pub fn new(backend: Arc<dyn ClusterBackend>) -> Self {
        let tools = vec![
            ToolSpec {
                name: "whoami",
                description: "Report the authenticated identity of the current session",
                required_scopes: Vec::new(),
            },
            ToolSpec {
                name: "get_kubernetes_resources",
                description: "List Kubernetes resources of a kind, optionally namespace-scoped",
                required_scopes: scopes(&["read", "admin"]),
            },
            ToolSpec {
                name: "apply_kubernetes_manifest",
                description: "Apply a YAML manifest to the cluster",
                required_scopes: scopes(&["write", "admin"]),
            },
            ToolSpec {
                name: "delete_kubernetes_resource",
                description: "Delete a single named Kubernetes resource",
                required_scopes: scopes(&["admin"]),
            },
        ];

        Self { backend, tools }
    }

    /// MCP descriptors for every registered tool
    pub fn descriptors(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": {"type": "object"},
                })
            })
            .collect()
    }

    /// Dispatch a tool call, enforcing the tool's required scopes first
    pub async fn call(
        &self,
        session: Option<&Session>,
        name: &str,
        arguments: &serde_json::Value,
    ) -> Result<serde_json::Value> {
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        check_scopes(session, &tool.required_scopes)?;

        debug!(tool = %name, "Dispatching tool call");

        match tool.name {
            "whoami" => Ok(whoami(session)),
            "get_kubernetes_resources" => {
                let api_version = string_argument(arguments, "apiVersion")?;
                let kind = string_argument(arguments, "kind")?;
                let namespace = optional_string_argument(arguments, "namespace");
                self.backend
                    .get_resources(&api_version, &kind, namespace.as_deref())
                    .await
            }
            "apply_kubernetes_manifest" => {
                let manifest = string_argument(arguments, "manifest")?;
                self.backend.apply_manifest(&manifest).await
            }
            "delete_kubernetes_resource" => {
                let api_version = string_argument(arguments, "apiVersion")?;
                let kind = string_argument(arguments, "kind")?;
                let name = string_argument(arguments, "name")?;
                let namespace = optional_string_argument(arguments, "namespace");
                self.backend
                    .delete_resource(&api_version, &kind, namespace.as_deref(), &name)
                    .await
            }
            other => Err(Error::UnknownTool(other.to_string())),
        }
    }
}

/// Identity report for the `whoami` tool
fn whoami(session: Option<&Session>) -> serde_json::Value {
    match session {
        Some(session) => json!({
            "authenticated": true,
            "userName": session.user_name,
            "groups": session.groups,
            "scopes": session.scopes,
        }),
        None => json!({
            "authenticated": false,
        }),
    }
}

/// Read a required string argument
fn string_argument(arguments: &serde_json::Value, key: &str) -> Result<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| Error::InvalidArguments(format!("missing string argument '{key}'")))
}

/// Read an optional string argument
fn optional_string_argument(arguments: &serde_json::Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Backend that records calls and returns canned data
    struct FakeBackend;

    #[async_trait]
    impl ClusterBackend for FakeBackend {
        async fn get_resources(
            &self,
            api_version: &str,
            kind: &str,
            namespace: Option<&str>,
        ) -> Result<serde_json::Value> {
            Ok(json!({
                "apiVersion": api_version,
                "kind": format!("{kind}List"),
                "namespace": namespace,
                "items": [],
            }))
        }

        async fn apply_manifest(&self, _manifest: &str) -> Result<serde_json::Value> {
            Ok(json!({"applied": true}))
        }

        async fn delete_resource(
            &self,
            _api_version: &str,
            _kind: &str,
            _namespace: Option<&str>,
            name: &str,
        ) -> Result<serde_json::Value> {
            Ok(json!({"deleted": name}))
        }
    }

    fn registry() -> ToolRegistry {
        ToolRegistry::new(Arc::new(FakeBackend))
    }

    fn session(scopes: Option<Vec<&str>>) -> Session {
        Session {
            user_name: "jane".to_string(),
            groups: None,
            scopes: scopes.map(|s| s.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn test_descriptors_list_all_tools() {
        let descriptors = registry().descriptors();
        assert_eq!(descriptors.len(), 4);
        assert_eq!(descriptors[0]["name"], "whoami");
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let err = registry()
            .call(None, "does_not_exist", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_whoami_unauthenticated() {
        let result = registry().call(None, "whoami", &json!({})).await.unwrap();
        assert_eq!(result["authenticated"], false);
    }

    #[tokio::test]
    async fn test_whoami_reports_session() {
        let session = session(Some(vec!["read"]));
        let result = registry()
            .call(Some(&session), "whoami", &json!({}))
            .await
            .unwrap();
        assert_eq!(result["authenticated"], true);
        assert_eq!(result["userName"], "jane");
        assert_eq!(result["scopes"], json!(["read"]));
    }

    #[tokio::test]
    async fn test_read_tool_allowed_with_read_scope() {
        let session = session(Some(vec!["read"]));
        let result = registry()
            .call(
                Some(&session),
                "get_kubernetes_resources",
                &json!({"apiVersion": "v1", "kind": "Pod", "namespace": "default"}),
            )
            .await
            .unwrap();
        assert_eq!(result["kind"], "PodList");
    }

    #[tokio::test]
    async fn test_write_tool_denied_with_read_scope() {
        let session = session(Some(vec!["read"]));
        let err = registry()
            .call(
                Some(&session),
                "apply_kubernetes_manifest",
                &json!({"manifest": "kind: ConfigMap"}),
            )
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .contains("at least one of the following scopes is required:"));
    }

    #[tokio::test]
    async fn test_admin_scope_satisfies_any_of() {
        let session = session(Some(vec!["admin"]));
        assert!(registry()
            .call(
                Some(&session),
                "apply_kubernetes_manifest",
                &json!({"manifest": "kind: ConfigMap"}),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unrestricted_session_allows_everything() {
        // scopes == None means scope checking is disabled for the session
        let session = session(None);
        assert!(registry()
            .call(
                Some(&session),
                "delete_kubernetes_resource",
                &json!({"apiVersion": "v1", "kind": "Pod", "name": "web-0"}),
            )
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_argument() {
        let err = registry()
            .call(None, "get_kubernetes_resources", &json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing string argument"));
    }
}
