//! Phased installer
//!
//! Applies a manifest one phase at a time and answers readiness probes for
//! the Deployments it contains.
//!
//! Phases must be run in `Phase::ALL` order: CRDs, cluster-scoped,
//! namespace-scoped, then deployments. Sequencing is the caller's
//! responsibility; the installer keeps no state between calls and re-reads
//! the cluster on every probe.

use tracing::{debug, info, warn};

use super::cluster::{ResourceApplier, ResourceReader};
use super::error::{InstallError, InstallResult};
use super::manifest::Manifest;
use super::phase::Phase;
use super::predicate;
use super::readiness::{self, CONTROLLER_NAME, DEPLOYMENT_KIND, WEBHOOK_NAME};
use super::types::{InstallStage, PhaseReport};

/// Installs one manifest through an applier and probes it through a reader
pub struct Installer<A, R> {
    manifest: Manifest,
    applier: A,
    reader: R,
}

impl<A, R> Installer<A, R>
where
    A: ResourceApplier,
    R: ResourceReader,
{
    pub fn new(manifest: Manifest, applier: A, reader: R) -> Self {
        Self {
            manifest,
            applier,
            reader,
        }
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Apply the CustomResourceDefinitions
    pub async fn ensure_crds(&self) -> InstallResult<PhaseReport> {
        self.ensure_phase(Phase::Crds).await
    }

    /// Apply Namespaces, ClusterRoles, PodSecurityPolicies and webhook configurations
    pub async fn ensure_cluster_scoped_resources(&self) -> InstallResult<PhaseReport> {
        self.ensure_phase(Phase::ClusterScoped).await
    }

    /// Apply ServiceAccounts, RBAC bindings, ConfigMaps, Secrets and HPAs
    pub async fn ensure_namespace_scoped_resources(&self) -> InstallResult<PhaseReport> {
        self.ensure_phase(Phase::NamespaceScoped).await
    }

    /// Apply Deployments and Services
    pub async fn ensure_deployment_resources(&self) -> InstallResult<PhaseReport> {
        self.ensure_phase(Phase::Deployment).await
    }

    /// Apply the subset of the manifest selected by `phase`.
    ///
    /// The whole subset goes to the applier in one call, even when empty.
    /// A failure is returned as-is; nothing is retried or rolled back.
    pub async fn ensure_phase(&self, phase: Phase) -> InstallResult<PhaseReport> {
        let subset = self.manifest.filter(&phase.selector());
        debug!(%phase, resources = subset.len(), "applying phase");

        self.applier
            .apply(&subset)
            .await
            .map_err(|source| InstallError::Apply { phase, source })?;

        info!(%phase, resources = subset.len(), "phase applied");
        Ok(PhaseReport {
            phase,
            applied: subset.len(),
            stage: InstallStage::after(phase),
        })
    }

    /// Readiness of the Deployment(s) whose name contains "controller"
    pub async fn is_controller_ready(&self) -> InstallResult<()> {
        self.is_deployment_ready(CONTROLLER_NAME).await
    }

    /// Readiness of the Deployment(s) whose name contains "webhook"
    pub async fn is_webhook_ready(&self) -> InstallResult<()> {
        self.is_deployment_ready(WEBHOOK_NAME).await
    }

    /// Check every Deployment whose name contains `name`, in manifest order.
    ///
    /// Matching is by substring, so "controller" also selects
    /// "foo-controller-v2"; prefer distinctive names. Stops at the first
    /// Deployment that cannot be read or is not available. Succeeds when no
    /// Deployment matches.
    pub async fn is_deployment_ready(&self, name: &str) -> InstallResult<()> {
        let deployments = self.manifest.filter(&predicate::by_kind(DEPLOYMENT_KIND));

        for resource in deployments.iter().filter(|r| r.name().contains(name)) {
            let reference = resource.reference();

            let live = self
                .reader
                .get(reference)
                .await
                .map_err(|source| InstallError::Read {
                    resource: reference.clone(),
                    source,
                })?;

            let status = readiness::decode_status(reference, &live)?;
            if !readiness::is_available(&status) {
                warn!(deployment = %reference, "deployment not available");
                return Err(InstallError::NotReady {
                    resource: reference.clone(),
                });
            }

            debug!(deployment = %reference, "deployment available");
        }

        Ok(())
    }
}

impl<C> Installer<C, C>
where
    C: ResourceApplier + ResourceReader + Clone,
{
    /// Use one cluster handle for both applying and reading
    pub fn for_cluster(manifest: Manifest, cluster: C) -> Self {
        Self::new(manifest, cluster.clone(), cluster)
    }
}
