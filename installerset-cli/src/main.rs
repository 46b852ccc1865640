//! Installerset CLI
//!
//! Applies a manifest to a Kubernetes cluster phase by phase and waits for
//! its workloads to become available.

mod commands;
mod config;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::ready::WaitOptions;
use installerset::kubernetes::client::K8sClient;
use installerset::kubernetes::readiness::{CONTROLLER_NAME, WEBHOOK_NAME};
use installerset::logging::LoggingConfig;
use installerset::{Installer, Manifest, Phase};
use output::OutputFormat;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

/// Exit code for a probe that completed but found deployments not ready
const EXIT_NOT_READY: u8 = 2;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to kubeconfig (defaults to KUBECONFIG, ~/.kube/config, then in-cluster)
    #[arg(long, global = true)]
    kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use
    #[arg(long, global = true)]
    context: Option<String>,

    /// Output format (table, json, yaml)
    #[arg(short, long, global = true)]
    output: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Config file (defaults to ~/.config/installerset/cli.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a manifest phase by phase
    Install {
        /// Manifest file or directory
        path: PathBuf,
        /// Apply only this phase (crds, cluster-scoped, namespace-scoped, deployment)
        #[arg(short, long)]
        phase: Option<Phase>,
        /// Wait for controller and webhook deployments afterwards
        #[arg(short, long)]
        wait: bool,
        /// Readiness timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Check whether deployments in a manifest are available
    Ready {
        /// Manifest file or directory
        path: PathBuf,
        /// Deployment name substrings to check (defaults to controller and webhook)
        #[arg(short, long)]
        name: Vec<String>,
        /// Poll until ready or timeout
        #[arg(short, long)]
        wait: bool,
        /// Readiness timeout in seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Stop waiting on the first read failure
        #[arg(long)]
        fail_fast: bool,
    },
    /// Show which phase applies each resource
    Phases {
        /// Manifest file or directory
        path: PathBuf,
    },
    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::print_mark(output::Mark::Failed, &format!("{:#}", e));
            if commands::ready::is_not_ready(&e) {
                ExitCode::from(EXIT_NOT_READY)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    // An explicit --config must parse; the default file falls back to defaults
    // with a warning once logging is up.
    let (config, config_error) = match &cli.config {
        Some(path) => (config::Config::load_from(path)?, None),
        None => match config::Config::load() {
            Ok(config) => (config, None),
            Err(e) => (config::Config::default(), Some(e)),
        },
    };

    let _log_guard = LoggingConfig {
        level: cli.log_level.clone().unwrap_or_else(|| config.log_level.clone()),
        file_dir: config.log_dir.clone(),
        ..Default::default()
    }
    .init()
    .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    if let Some(e) = config_error {
        tracing::warn!(error = %format!("{:#}", e), "ignoring unreadable config file, using defaults");
    }

    let format = OutputFormat::parse(cli.output.as_deref().unwrap_or(&config.default_output));

    match cli.command {
        Commands::Install {
            ref path,
            phase,
            wait,
            timeout,
        } => {
            let manifest = load_manifest(path)?;
            let client = connect(&cli, &config).await?;
            let installer = Installer::for_cluster(manifest, client);
            let wait = wait.then(|| wait_options(&config, timeout, false));
            commands::install::handle_install_command(&installer, phase, wait, format).await?
        }
        Commands::Ready {
            ref path,
            ref name,
            wait,
            timeout,
            fail_fast,
        } => {
            let manifest = load_manifest(path)?;
            let client = connect(&cli, &config).await?;
            let installer = Installer::for_cluster(manifest, client);
            let names = if name.is_empty() {
                vec![CONTROLLER_NAME.to_string(), WEBHOOK_NAME.to_string()]
            } else {
                name.clone()
            };
            let wait = wait.then(|| wait_options(&config, timeout, fail_fast));
            commands::ready::handle_ready_command(&installer, &names, wait, format).await?
        }
        Commands::Phases { ref path } => {
            let manifest = load_manifest(path)?;
            commands::phases::handle_phases_command(&manifest, format)?
        }
        Commands::Completions { shell } => {
            generate_completions(shell);
        }
    }

    Ok(())
}

fn load_manifest(path: &Path) -> Result<Manifest> {
    let manifest = Manifest::from_path(path)
        .with_context(|| format!("failed to load manifest from {}", path.display()))?;
    tracing::info!(path = %path.display(), resources = manifest.len(), "manifest loaded");
    Ok(manifest)
}

/// Build a client from flags, then config file, then the environment
async fn connect(cli: &Cli, config: &config::Config) -> Result<K8sClient> {
    let kubeconfig = cli.kubeconfig.as_deref().or(config.kubeconfig.as_deref());
    let context = cli.context.as_deref().or(config.context.as_deref());

    let client = if kubeconfig.is_some() || context.is_some() {
        K8sClient::from_kubeconfig(kubeconfig, context).await?
    } else {
        K8sClient::infer().await?
    };

    tracing::debug!(api_server = client.api_server(), "connected to cluster");
    Ok(client.with_field_manager(config.field_manager.clone()))
}

fn wait_options(config: &config::Config, timeout: Option<u64>, fail_fast: bool) -> WaitOptions {
    WaitOptions {
        interval: config.poll_interval(),
        timeout: timeout.map(Duration::from_secs).unwrap_or_else(|| config.timeout()),
        fail_fast,
    }
}

/// Generate shell completions
fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    generate(shell, &mut cmd, name, &mut io::stdout());
}
