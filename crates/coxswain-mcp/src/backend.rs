//! Cluster backend abstraction
//!
//! Defines the `ClusterBackend` trait that decouples tool dispatch from any
//! specific Kubernetes client. Tool handlers only depend on this trait; the
//! actual resource semantics live behind it.

use async_trait::async_trait;

use crate::error::{Error, Result};

/// Abstraction over the Kubernetes operations the tools need
#[async_trait]
pub trait ClusterBackend: Send + Sync {
    /// List resources of a kind, optionally namespace-scoped
    async fn get_resources(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
    ) -> Result<serde_json::Value>;

    /// Apply a YAML manifest to the cluster
    async fn apply_manifest(&self, manifest: &str) -> Result<serde_json::Value>;

    /// Delete a single named resource
    async fn delete_resource(
        &self,
        api_version: &str,
        kind: &str,
        namespace: Option<&str>,
        name: &str,
    ) -> Result<serde_json::Value>;
}

/// Placeholder backend used until a cluster client is wired in
///
/// Every call reports that no backend is configured. Deployments embed this
/// crate with their own `ClusterBackend` implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredBackend;

#[async_trait]
impl ClusterBackend for UnconfiguredBackend {
    async fn get_resources(
        &self,
        _api_version: &str,
        _kind: &str,
        _namespace: Option<&str>,
    ) -> Result<serde_json::Value> {
        Err(Error::Backend("no cluster backend configured".to_string()))
    }

    async fn apply_manifest(&self, _manifest: &str) -> Result<serde_json::Value> {
        Err(Error::Backend("no cluster backend configured".to_string()))
    }

    async fn delete_resource(
        &self,
        _api_version: &str,
        _kind: &str,
        _namespace: Option<&str>,
        _name: &str,
    ) -> Result<serde_json::Value> {
        Err(Error::Backend("no cluster backend configured".to_string()))
    }
}
