//! Error types for manifest loading, cluster access and installation
//!
//! `ClusterError` is what the apply/read collaborators return.
//! `InstallError` is what the installer surfaces to its caller; collaborator
//! errors are carried unchanged as the `source`.

use thiserror::Error;

use super::phase::Phase;
use super::types::ResourceRef;

/// Errors returned by the apply and read collaborators
#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes resource not found
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    /// Error from kube-rs client
    #[cfg(feature = "kubernetes")]
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Invalid kubeconfig or client configuration
    #[error("Invalid kubeconfig: {0}")]
    InvalidKubeconfig(String),

    /// The cluster refused a resource
    #[error("Rejected: {0}")]
    Rejected(String),

    /// Internal system error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClusterError {
    pub fn not_found(resource: &ResourceRef) -> Self {
        Self::NotFound {
            kind: resource.kind.clone(),
            name: resource.name.clone(),
            namespace: resource.namespace.clone().unwrap_or_default(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            #[cfg(feature = "kubernetes")]
            Self::Kube(kube::Error::Api(e)) => e.code == 404,
            _ => false,
        }
    }
}

/// Errors raised while loading a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Document lacks apiVersion, kind or metadata.name
    #[error("Resource #{index} is missing {field}")]
    MissingField { index: usize, field: &'static str },
}

/// Installer errors
#[derive(Debug, Error)]
pub enum InstallError {
    /// The applier failed for a phase's subset
    #[error("failed to apply {phase} resources: {source}")]
    Apply {
        phase: Phase,
        #[source]
        source: ClusterError,
    },

    /// Reading live state for a readiness check failed
    #[error("failed to read {resource}: {source}")]
    Read {
        resource: ResourceRef,
        #[source]
        source: ClusterError,
    },

    /// A matched Deployment lacks the Available=True condition
    #[error("deployment not available: {resource}")]
    NotReady { resource: ResourceRef },

    /// Live state could not be decoded as a Deployment
    #[error("failed to decode {resource}: {source}")]
    Decode {
        resource: ResourceRef,
        #[source]
        source: serde_json::Error,
    },
}

impl InstallError {
    /// True for the "not ready yet" signal, false for transport and apply failures
    pub fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady { .. })
    }
}

/// Result type alias for collaborator operations
pub type ClusterResult<T> = std::result::Result<T, ClusterError>;

/// Result type alias for installer operations
pub type InstallResult<T> = std::result::Result<T, InstallError>;
