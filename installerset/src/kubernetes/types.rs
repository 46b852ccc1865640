//! Kubernetes types for Installerset
//!
//! Identity and reporting types shared by the installer, its collaborators
//! and the CLI.

use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Identity of a single resource in a manifest or on the cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRef {
    /// API version (e.g., "apps/v1")
    pub api_version: String,
    /// Resource kind (e.g., "Deployment")
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Namespace, `None` for cluster-scoped resources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl ResourceRef {
    pub fn new(
        api_version: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: Option<String>,
    ) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
            name: name.into(),
            namespace,
        }
    }

    /// Split the API version into (group, version). The core group is "".
    pub fn group_version(&self) -> (&str, &str) {
        match self.api_version.split_once('/') {
            Some((group, version)) => (group, version),
            None => ("", self.api_version.as_str()),
        }
    }
}

impl std::fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{} in namespace {}", self.kind, self.name, ns),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Stage of an installation run.
///
/// Stages advance monotonically as the caller runs phases in `Phase::ALL`
/// order. The installer itself does not track or enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InstallStage {
    Uninstalled,
    CrdsApplied,
    ClusterScopedApplied,
    NamespaceScopedApplied,
    DeploymentApplied,
    Ready,
    NotReady,
}

impl InstallStage {
    /// Stage reached once `phase` has been applied successfully
    pub fn after(phase: Phase) -> Self {
        match phase {
            Phase::Crds => Self::CrdsApplied,
            Phase::ClusterScoped => Self::ClusterScopedApplied,
            Phase::NamespaceScoped => Self::NamespaceScopedApplied,
            Phase::Deployment => Self::DeploymentApplied,
        }
    }
}

impl Default for InstallStage {
    fn default() -> Self {
        Self::Uninstalled
    }
}

impl std::fmt::Display for InstallStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninstalled => write!(f, "uninstalled"),
            Self::CrdsApplied => write!(f, "crds-applied"),
            Self::ClusterScopedApplied => write!(f, "cluster-scoped-applied"),
            Self::NamespaceScopedApplied => write!(f, "namespace-scoped-applied"),
            Self::DeploymentApplied => write!(f, "deployment-applied"),
            Self::Ready => write!(f, "ready"),
            Self::NotReady => write!(f, "not-ready"),
        }
    }
}

/// Outcome of a single applied phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub phase: Phase,
    /// Number of resources handed to the applier
    pub applied: usize,
    pub stage: InstallStage,
}
