//! Installation phases and the kind classification table
//!
//! Every phase owns a fixed set of kinds. Kinds never appear in more than one
//! phase, and kinds that appear in no phase are never applied by the installer.

use serde::{Deserialize, Serialize};

use super::predicate::{self, Predicate, CRD_KIND};

/// A stage of installation scoped to specific resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// CustomResourceDefinitions, so custom resources are admitted later
    Crds,
    /// Resources without namespace affinity
    ClusterScoped,
    /// Identity, permissions and configuration consumed by workloads
    NamespaceScoped,
    /// The running workload and its Services
    Deployment,
}

/// Phase to kinds, in apply order
pub const PHASE_KINDS: [(Phase, &[&str]); 4] = [
    (Phase::Crds, &[CRD_KIND]),
    (
        Phase::ClusterScoped,
        &[
            "Namespace",
            "ClusterRole",
            "PodSecurityPolicy",
            "ValidatingWebhookConfiguration",
            "MutatingWebhookConfiguration",
        ],
    ),
    (
        Phase::NamespaceScoped,
        &[
            "ServiceAccount",
            "ClusterRoleBinding",
            "Role",
            "RoleBinding",
            "ConfigMap",
            "Secret",
            "HorizontalPodAutoscaler",
        ],
    ),
    (Phase::Deployment, &["Deployment", "Service"]),
];

impl Phase {
    /// All phases in the order they must be applied
    pub const ALL: [Phase; 4] = [
        Phase::Crds,
        Phase::ClusterScoped,
        Phase::NamespaceScoped,
        Phase::Deployment,
    ];

    /// Kinds selected by this phase
    pub fn kinds(self) -> &'static [&'static str] {
        PHASE_KINDS
            .iter()
            .find(|(phase, _)| *phase == self)
            .map(|(_, kinds)| *kinds)
            .unwrap_or(&[])
    }

    /// OR of one kind predicate per kind in this phase's row
    pub fn selector(self) -> Predicate {
        predicate::any(self.kinds().iter().copied().map(predicate::by_kind))
    }

    /// Phase that applies resources of `kind`, if any
    pub fn for_kind(kind: &str) -> Option<Phase> {
        PHASE_KINDS
            .iter()
            .find(|(_, kinds)| kinds.contains(&kind))
            .map(|(phase, _)| *phase)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crds => "crds",
            Self::ClusterScoped => "cluster-scoped",
            Self::NamespaceScoped => "namespace-scoped",
            Self::Deployment => "deployment",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Phase::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                format!(
                    "unknown phase '{}' (expected one of: crds, cluster-scoped, namespace-scoped, deployment)",
                    s
                )
            })
    }
}
