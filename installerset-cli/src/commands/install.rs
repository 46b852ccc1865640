use crate::commands::ready::{wait_until_ready, WaitOptions};
use crate::output::{self, Mark, OutputFormat};
use anyhow::{Context, Result};
use installerset::kubernetes::cluster::{ResourceApplier, ResourceReader};
use installerset::kubernetes::readiness::{CONTROLLER_NAME, WEBHOOK_NAME};
use installerset::kubernetes::types::PhaseReport;
use installerset::{InstallStage, Installer, Phase};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Serialize, Tabled)]
struct PhaseRow {
    #[tabled(rename = "PHASE")]
    phase: Phase,
    #[tabled(rename = "RESOURCES")]
    applied: usize,
    #[tabled(rename = "STAGE")]
    stage: InstallStage,
}

impl From<PhaseReport> for PhaseRow {
    fn from(report: PhaseReport) -> Self {
        Self {
            phase: report.phase,
            applied: report.applied,
            stage: report.stage,
        }
    }
}

/// Apply `phases` in the given order, stopping at the first failure
pub async fn run_phases<A, R>(
    installer: &Installer<A, R>,
    phases: &[Phase],
    format: OutputFormat,
) -> Result<Vec<PhaseReport>>
where
    A: ResourceApplier,
    R: ResourceReader,
{
    let mut reports = Vec::with_capacity(phases.len());
    for &phase in phases {
        let report = installer
            .ensure_phase(phase)
            .await
            .with_context(|| format!("installation stopped at {} phase", phase))?;

        if format.is_table() {
            output::print_mark(
                Mark::Done,
                &format!("{} phase applied ({} resources)", phase, report.applied),
            );
        }
        reports.push(report);
    }
    Ok(reports)
}

pub async fn handle_install_command<A, R>(
    installer: &Installer<A, R>,
    phase: Option<Phase>,
    wait: Option<WaitOptions>,
    format: OutputFormat,
) -> Result<()>
where
    A: ResourceApplier,
    R: ResourceReader,
{
    let phases = match phase {
        Some(phase) => vec![phase],
        None => Phase::ALL.to_vec(),
    };

    let reports = run_phases(installer, &phases, format).await?;

    if let Some(options) = wait {
        for name in [CONTROLLER_NAME, WEBHOOK_NAME] {
            wait_until_ready(installer, name, options).await?;
            if format.is_table() {
                output::print_mark(Mark::Done, &format!("{} deployments are ready", name));
            }
        }
    }

    if !format.is_table() {
        let rows: Vec<PhaseRow> = reports.into_iter().map(PhaseRow::from).collect();
        output::print_rows(rows, format, "No phases were run")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use installerset::kubernetes::error::{ClusterError, ClusterResult};
    use installerset::{InstallError, Manifest, ResourceRef};
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        applied: Mutex<Vec<usize>>,
        fail_on_call: Option<usize>,
    }

    #[async_trait]
    impl ResourceApplier for Recorder {
        async fn apply(&self, manifest: &Manifest) -> ClusterResult<()> {
            let mut applied = self.applied.lock().unwrap();
            if self.fail_on_call == Some(applied.len()) {
                return Err(ClusterError::Rejected("quota exceeded".into()));
            }
            applied.push(manifest.len());
            Ok(())
        }
    }

    #[async_trait]
    impl ResourceReader for Recorder {
        async fn get(&self, resource: &ResourceRef) -> ClusterResult<Value> {
            Err(ClusterError::not_found(resource))
        }
    }

    fn manifest() -> Manifest {
        Manifest::from_yaml_str(
            r#"
apiVersion: v1
kind: Namespace
metadata: { name: ns }
---
apiVersion: v1
kind: ServiceAccount
metadata: { name: controller, namespace: ns }
---
apiVersion: v1
kind: ConfigMap
metadata: { name: defaults, namespace: ns }
---
apiVersion: apps/v1
kind: Deployment
metadata: { name: controller, namespace: ns }
"#,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_run_all_phases_in_order() {
        let cluster = Arc::new(Recorder::default());
        let installer = Installer::for_cluster(manifest(), cluster.clone());

        let reports = run_phases(&installer, &Phase::ALL, OutputFormat::Json)
            .await
            .unwrap();

        let phases: Vec<Phase> = reports.iter().map(|r| r.phase).collect();
        assert_eq!(phases, Phase::ALL.to_vec());
        assert_eq!(*cluster.applied.lock().unwrap(), vec![0, 1, 2, 1]);
        assert_eq!(reports.last().map(|r| r.stage), Some(InstallStage::DeploymentApplied));
    }

    #[tokio::test]
    async fn test_failed_phase_stops_the_run() {
        let cluster = Arc::new(Recorder {
            fail_on_call: Some(2),
            ..Default::default()
        });
        let installer = Installer::for_cluster(manifest(), cluster.clone());

        let err = run_phases(&installer, &Phase::ALL, OutputFormat::Json)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("namespace-scoped"));
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Apply { phase: Phase::NamespaceScoped, .. })
        ));
        // The deployment phase never ran
        assert_eq!(*cluster.applied.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_single_phase() {
        let cluster = Arc::new(Recorder::default());
        let installer = Installer::for_cluster(manifest(), cluster.clone());

        handle_install_command(&installer, Some(Phase::NamespaceScoped), None, OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(*cluster.applied.lock().unwrap(), vec![2]);
    }
}
