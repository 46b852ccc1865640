//! Installerset Library
//!
//! Phased installation of Kubernetes manifests. Resources are applied in a
//! fixed kind-based order (CRDs, cluster-scoped, namespace-scoped, workloads)
//! and workload readiness is answered from live Deployment conditions.

// Kubernetes integration
pub mod kubernetes;

// Logging setup for binaries embedding the installer
pub mod logging;

pub use kubernetes::error::{ClusterError, InstallError, InstallResult, ManifestError};
pub use kubernetes::installer::Installer;
pub use kubernetes::manifest::{Manifest, Resource};
pub use kubernetes::phase::Phase;
pub use kubernetes::types::{InstallStage, ResourceRef};
