//! Kubernetes client wrapper
//!
//! Wraps the kube-rs Client and implements the installer's collaborators:
//! server-side apply of whole manifests and dynamic reads of single objects.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use kube::api::{Api, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::discovery::{self, ApiCapabilities, ApiResource, Scope};
use kube::{Client, Config};
use serde_json::Value;
use tracing::{debug, trace};

use super::cluster::{ResourceApplier, ResourceReader};
use super::error::{ClusterError, ClusterResult};
use super::manifest::Manifest;
use super::types::ResourceRef;

/// Field manager used for server-side apply unless overridden
pub const DEFAULT_FIELD_MANAGER: &str = "installerset";

/// Wrapper around kube-rs Client with apply settings
#[derive(Clone)]
pub struct K8sClient {
    inner: Client,
    api_server: String,
    field_manager: String,
}

impl K8sClient {
    /// Create client from a kubeconfig file with optional context.
    ///
    /// Without a path, the kubeconfig is read from `KUBECONFIG` or
    /// `~/.kube/config`.
    pub async fn from_kubeconfig(path: Option<&Path>, context: Option<&str>) -> ClusterResult<Self> {
        let kubeconfig = match path {
            Some(path) => Kubeconfig::read_from(path).map_err(|e| {
                ClusterError::InvalidKubeconfig(format!(
                    "Failed to read kubeconfig {}: {}",
                    path.display(),
                    e
                ))
            })?,
            None => Kubeconfig::read().map_err(|e| {
                ClusterError::InvalidKubeconfig(format!("Failed to read kubeconfig: {}", e))
            })?,
        };

        let config = Config::from_custom_kubeconfig(
            kubeconfig,
            &KubeConfigOptions {
                context: context.map(String::from),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| ClusterError::InvalidKubeconfig(format!("Failed to create config: {}", e)))?;

        Self::from_config(config)
    }

    /// Create client from the environment: `KUBECONFIG`, `~/.kube/config`,
    /// then in-cluster configuration
    pub async fn infer() -> ClusterResult<Self> {
        let config = Config::infer().await.map_err(|e| {
            ClusterError::InvalidKubeconfig(format!("Failed to infer config: {}", e))
        })?;

        Self::from_config(config)
    }

    fn from_config(config: Config) -> ClusterResult<Self> {
        let api_server = config.cluster_url.to_string();

        let client = Client::try_from(config).map_err(|e| {
            ClusterError::InvalidKubeconfig(format!("Failed to create client: {}", e))
        })?;

        Ok(Self {
            inner: client,
            api_server,
            field_manager: DEFAULT_FIELD_MANAGER.to_string(),
        })
    }

    /// Use a different server-side apply field manager
    pub fn with_field_manager(mut self, field_manager: impl Into<String>) -> Self {
        self.field_manager = field_manager.into();
        self
    }

    /// Get API server URL
    pub fn api_server(&self) -> &str {
        &self.api_server
    }

    pub fn field_manager(&self) -> &str {
        &self.field_manager
    }

    /// Resolve the API resource and scope for a reference's group/version/kind
    async fn resolve(&self, resource: &ResourceRef) -> kube::Result<(ApiResource, ApiCapabilities)> {
        let (group, version) = resource.group_version();
        let gvk = GroupVersionKind::gvk(group, version, &resource.kind);
        discovery::pinned_kind(&self.inner, &gvk).await
    }

    /// Dynamic API handle for a resolved resource. Namespaced objects without
    /// a namespace go to the client's default namespace.
    fn dynamic_api(
        &self,
        resource: &ResourceRef,
        api_resource: &ApiResource,
        capabilities: &ApiCapabilities,
    ) -> Api<DynamicObject> {
        match (&capabilities.scope, resource.namespace.as_deref()) {
            (Scope::Cluster, _) => Api::all_with(self.inner.clone(), api_resource),
            (Scope::Namespaced, Some(ns)) => {
                Api::namespaced_with(self.inner.clone(), ns, api_resource)
            }
            (Scope::Namespaced, None) => {
                Api::default_namespaced_with(self.inner.clone(), api_resource)
            }
        }
    }
}

#[async_trait]
impl ResourceApplier for K8sClient {
    async fn apply(&self, manifest: &Manifest) -> ClusterResult<()> {
        let params = PatchParams::apply(&self.field_manager).force();
        let mut resolved: HashMap<(String, String), (ApiResource, ApiCapabilities)> =
            HashMap::new();

        for resource in manifest {
            let reference = resource.reference();
            let key = (reference.api_version.clone(), reference.kind.clone());
            if !resolved.contains_key(&key) {
                let found = self
                    .resolve(reference)
                    .await
                    .map_err(|e| discovery_error(e, reference))?;
                resolved.insert(key.clone(), found);
            }
            let Some((api_resource, capabilities)) = resolved.get(&key) else {
                continue;
            };

            let api = self.dynamic_api(reference, api_resource, capabilities);
            api.patch(resource.name(), &params, &Patch::Apply(resource.body()))
                .await?;

            trace!(resource = %reference, "applied resource");
        }

        debug!(resources = manifest.len(), api_server = %self.api_server, "manifest applied");
        Ok(())
    }
}

#[async_trait]
impl ResourceReader for K8sClient {
    async fn get(&self, resource: &ResourceRef) -> ClusterResult<Value> {
        let (api_resource, capabilities) = self
            .resolve(resource)
            .await
            .map_err(|e| read_error(e, resource))?;

        let api = self.dynamic_api(resource, &api_resource, &capabilities);
        let object = api
            .get(&resource.name)
            .await
            .map_err(|e| read_error(e, resource))?;

        serde_json::to_value(object)
            .map_err(|e| ClusterError::Internal(format!("Failed to encode {}: {}", resource, e)))
    }
}

/// Discovery failure while applying. An unknown group/version/kind means the
/// cluster cannot accept the resource at all.
fn discovery_error(error: kube::Error, resource: &ResourceRef) -> ClusterError {
    match error {
        kube::Error::Api(ref resp) if resp.code == 404 => ClusterError::Rejected(format!(
            "unknown resource type: {}/{}",
            resource.api_version, resource.kind
        )),
        other => ClusterError::Kube(other),
    }
}

/// Read failure, with HTTP 404 reported as `NotFound` for the resource
fn read_error(error: kube::Error, resource: &ResourceRef) -> ClusterError {
    match error {
        kube::Error::Api(ref resp) if resp.code == 404 => ClusterError::not_found(resource),
        other => ClusterError::Kube(other),
    }
}

impl std::fmt::Debug for K8sClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("K8sClient")
            .field("api_server", &self.api_server)
            .field("field_manager", &self.field_manager)
            .finish()
    }
}
