//! Collaborator interfaces used by the installer
//!
//! The installer never talks to the API server directly. It hands filtered
//! manifests to a [`ResourceApplier`] and reads live objects through a
//! [`ResourceReader`]. `K8sClient` implements both against a real cluster.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::error::ClusterResult;
use super::manifest::Manifest;
use super::types::ResourceRef;

/// Creates or updates every resource of a manifest on the cluster
#[async_trait]
pub trait ResourceApplier: Send + Sync {
    /// Apply all resources in manifest order. Resources applied before a
    /// failure stay applied.
    async fn apply(&self, manifest: &Manifest) -> ClusterResult<()>;
}

/// Reads the current state of a single resource
#[async_trait]
pub trait ResourceReader: Send + Sync {
    async fn get(&self, resource: &ResourceRef) -> ClusterResult<Value>;
}

#[async_trait]
impl<T: ResourceApplier + ?Sized> ResourceApplier for Arc<T> {
    async fn apply(&self, manifest: &Manifest) -> ClusterResult<()> {
        (**self).apply(manifest).await
    }
}

#[async_trait]
impl<T: ResourceReader + ?Sized> ResourceReader for Arc<T> {
    async fn get(&self, resource: &ResourceRef) -> ClusterResult<Value> {
        (**self).get(resource).await
    }
}
