use crate::output::{self, OutputFormat};
use anyhow::Result;
use installerset::kubernetes::cluster::{ResourceApplier, ResourceReader};
use installerset::{InstallError, InstallStage, Installer};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How to poll a readiness probe until it passes
#[derive(Debug, Clone, Copy)]
pub struct WaitOptions {
    pub interval: Duration,
    pub timeout: Duration,
    /// Give up on the first read failure instead of retrying it
    pub fail_fast: bool,
}

#[derive(Debug, Serialize)]
struct ReadyStatus<'a> {
    name: &'a str,
    ready: bool,
    /// Set when the deployments were read; absent on read failures
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<InstallStage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl<'a> ReadyStatus<'a> {
    fn new(name: &'a str, result: &Result<()>) -> Self {
        match result {
            Ok(()) => Self {
                name,
                ready: true,
                stage: Some(InstallStage::Ready),
                reason: None,
            },
            Err(e) => Self {
                name,
                ready: false,
                stage: is_not_ready(e).then_some(InstallStage::NotReady),
                reason: Some(format!("{:#}", e)),
            },
        }
    }

    /// Line printed in table mode. Failures are left to the caller, which
    /// reports the returned error.
    fn table_line(&self) -> Option<String> {
        self.ready
            .then(|| format!("deployments matching '{}' are ready", self.name))
    }
}

/// Poll `is_deployment_ready(name)` until it succeeds or the timeout expires.
///
/// Not-ready results are always retried. Read failures are retried unless
/// `fail_fast` is set, since Deployments may not exist right after apply.
pub async fn wait_until_ready<A, R>(
    installer: &Installer<A, R>,
    name: &str,
    options: WaitOptions,
) -> Result<()>
where
    A: ResourceApplier,
    R: ResourceReader,
{
    let start = Instant::now();

    loop {
        let last_error = match installer.is_deployment_ready(name).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_not_ready() => {
                trace!(name, "deployments not ready yet, retrying");
                e
            }
            Err(e) if options.fail_fast => return Err(e.into()),
            Err(e) => {
                debug!(name, error = %e, "readiness check failed, retrying");
                e
            }
        };

        if start.elapsed() >= options.timeout {
            return Err(anyhow::Error::from(last_error).context(format!(
                "timed out after {:?} waiting for deployments matching '{}'",
                options.timeout, name
            )));
        }

        tokio::time::sleep(options.interval).await;
    }
}

/// Probe (or wait for) each name in turn, stopping at the first failure
pub async fn handle_ready_command<A, R>(
    installer: &Installer<A, R>,
    names: &[String],
    wait: Option<WaitOptions>,
    format: OutputFormat,
) -> Result<()>
where
    A: ResourceApplier,
    R: ResourceReader,
{
    for name in names {
        let result = match wait {
            Some(options) => wait_until_ready(installer, name, options).await,
            None => installer
                .is_deployment_ready(name)
                .await
                .map_err(anyhow::Error::from),
        };

        let status = ReadyStatus::new(name, &result);
        if format.is_table() {
            if let Some(line) = status.table_line() {
                output::print_mark(output::Mark::Done, &line);
            }
        } else {
            output::print_structured(&status, format)?;
        }

        result?;
    }
    Ok(())
}

/// True when the error chain ends in a not-ready signal
pub fn is_not_ready(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<InstallError>()
        .is_some_and(InstallError::is_not_ready)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use installerset::kubernetes::error::{ClusterError, ClusterResult};
    use installerset::{Manifest, ResourceRef};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Reports the Deployment as missing, then unavailable, then available
    /// after the given number of reads
    struct Rollout {
        reads: AtomicUsize,
        missing_until: usize,
        available_after: usize,
    }

    impl Rollout {
        fn new(missing_until: usize, available_after: usize) -> Arc<Self> {
            Arc::new(Self {
                reads: AtomicUsize::new(0),
                missing_until,
                available_after,
            })
        }

        fn reads(&self) -> usize {
            self.reads.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ResourceApplier for Rollout {
        async fn apply(&self, _manifest: &Manifest) -> ClusterResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ResourceReader for Rollout {
        async fn get(&self, resource: &ResourceRef) -> ClusterResult<Value> {
            let read = self.reads.fetch_add(1, Ordering::SeqCst) + 1;
            if read <= self.missing_until {
                return Err(ClusterError::not_found(resource));
            }
            let status = if read > self.available_after { "True" } else { "False" };
            Ok(json!({ "status": { "conditions": [{ "type": "Available", "status": status }] } }))
        }
    }

    fn installer(cluster: Arc<Rollout>) -> Installer<Arc<Rollout>, Arc<Rollout>> {
        let manifest = Manifest::from_yaml_str(
            "apiVersion: apps/v1\nkind: Deployment\nmetadata:\n  name: abc-controller\n  namespace: ns\n",
        )
        .unwrap();
        Installer::for_cluster(manifest, cluster)
    }

    fn options(fail_fast: bool) -> WaitOptions {
        WaitOptions {
            interval: Duration::from_millis(5),
            timeout: Duration::from_secs(5),
            fail_fast,
        }
    }

    #[tokio::test]
    async fn test_wait_retries_until_available() {
        let cluster = Rollout::new(1, 3);
        wait_until_ready(&installer(cluster.clone()), "controller", options(false))
            .await
            .unwrap();
        assert_eq!(cluster.reads(), 4);
    }

    #[tokio::test]
    async fn test_wait_fail_fast_stops_on_read_failure() {
        let cluster = Rollout::new(1, 0);
        let err = wait_until_ready(&installer(cluster.clone()), "controller", options(true))
            .await
            .unwrap_err();
        assert!(!is_not_ready(&err));
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Read { .. })
        ));
        assert_eq!(cluster.reads(), 1);
    }

    #[tokio::test]
    async fn test_wait_fail_fast_still_retries_not_ready() {
        let cluster = Rollout::new(0, 2);
        wait_until_ready(&installer(cluster.clone()), "controller", options(true))
            .await
            .unwrap();
        assert_eq!(cluster.reads(), 3);
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let cluster = Rollout::new(0, usize::MAX);
        let err = wait_until_ready(
            &installer(cluster.clone()),
            "controller",
            WaitOptions {
                interval: Duration::from_millis(5),
                timeout: Duration::from_millis(30),
                fail_fast: false,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("timed out"));
        assert!(cluster.reads() >= 2);
    }

    #[tokio::test]
    async fn test_timeout_keeps_not_ready_signal() {
        let cluster = Rollout::new(0, usize::MAX);
        let err = wait_until_ready(
            &installer(cluster),
            "controller",
            WaitOptions {
                interval: Duration::from_millis(1),
                timeout: Duration::from_millis(5),
                fail_fast: false,
            },
        )
        .await
        .unwrap_err();

        assert!(is_not_ready(&err));
        let message = format!("{:#}", err);
        assert!(message.starts_with("timed out after 5ms waiting for deployments matching 'controller'"));
        assert!(message.contains("deployment not available: Deployment/abc-controller"));
    }

    #[tokio::test]
    async fn test_timeout_on_missing_deployment_is_a_read_failure() {
        let cluster = Rollout::new(usize::MAX, usize::MAX);
        let err = wait_until_ready(
            &installer(cluster),
            "controller",
            WaitOptions {
                interval: Duration::from_millis(1),
                timeout: Duration::from_millis(5),
                fail_fast: false,
            },
        )
        .await
        .unwrap_err();

        assert!(!is_not_ready(&err));
        assert!(matches!(
            err.downcast_ref::<InstallError>(),
            Some(InstallError::Read { .. })
        ));
    }

    #[test]
    fn test_status_reports_stage() {
        let ready = ReadyStatus::new("controller", &Ok(()));
        assert_eq!(ready.stage, Some(InstallStage::Ready));
        assert_eq!(
            ready.table_line().as_deref(),
            Some("deployments matching 'controller' are ready")
        );

        let resource = ResourceRef::new("apps/v1", "Deployment", "abc-webhook", Some("ns".into()));
        let not_ready: Result<()> = Err(InstallError::NotReady {
            resource: resource.clone(),
        }
        .into());
        let status = ReadyStatus::new("webhook", &not_ready);
        assert_eq!(status.stage, Some(InstallStage::NotReady));
        assert!(!status.ready);
        // Failures are printed once, by whoever handles the returned error
        assert_eq!(status.table_line(), None);

        let missing: Result<()> = Err(InstallError::Read {
            source: ClusterError::not_found(&resource),
            resource,
        }
        .into());
        let status = ReadyStatus::new("webhook", &missing);
        assert_eq!(status.stage, None);
        assert!(status.reason.is_some_and(|r| r.contains("Resource not found")));

        let json = serde_json::to_value(ReadyStatus::new("controller", &Ok(()))).unwrap();
        assert_eq!(json["stage"], "ready");
        assert!(json.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_single_probe_reports_not_ready() {
        let cluster = Rollout::new(0, usize::MAX);
        let err = handle_ready_command(
            &installer(cluster.clone()),
            &["controller".to_string()],
            None,
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert!(is_not_ready(&err));
        assert_eq!(cluster.reads(), 1);
    }
}
