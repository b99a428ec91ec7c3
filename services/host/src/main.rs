//! ---------------------------------------------------------------------------
//! Log Track Host Shell binary
//! ---------------------------------------------------------------------------
//! `serve` (the default) binds the HTTP listener right away, runs the remote
//! probes in the background and switches from the interim page to the real
//! shell once the availability registry is built. `check` runs the probes
//! once and reports the verdicts on stdout.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use logtrack_common::config::HostConfig;
use logtrack_common::logging::{init_cli_tracing, init_tracing, LogFormat};
use logtrack_host::{run_check, spawn_bootstrap, spawn_host, HostState};
use logtrack_remotes::{
    new_registry, HttpModuleLoader, HttpProbe, RegistryBuilder, RegistrySlot, RemoteCatalog,
    RemoteMetrics,
};
use tokio::signal;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(author, version, about = "Log Track micro-frontend host shell", long_about = None)]
struct Cli {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to configuration file (takes precedence over LOGTRACK_CONFIG)"
    )]
    config: Option<PathBuf>,

    #[arg(long, value_name = "ADDR", help = "Override the listen address")]
    bind: Option<SocketAddr>,

    #[arg(long, value_enum, help = "Override the stdout log format")]
    log_format: Option<CliLogFormat>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliLogFormat {
    Json,
    Pretty,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Json => LogFormat::StructuredJson,
            CliLogFormat::Pretty => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Probe remotes and serve the host shell")]
    Serve,
    #[command(about = "Probe every remote once, print the verdicts and exit")]
    Check {
        #[arg(long, help = "Emit the verdicts as JSON")]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let candidates = [PathBuf::from("configs/host.toml")];
    let loaded = HostConfig::load_from(cli.config.as_deref(), &candidates)?;
    let mut config = loaded.config;
    if let Some(bind) = cli.bind {
        config.server.bind = bind;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format.into();
    }
    let catalog = RemoteCatalog::from_config(&config).context("invalid remote catalog")?;
    let probe = Arc::new(HttpProbe::new()?);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            init_tracing("logtrack-host", &config.logging)?;
            info!(
                source = %loaded.source.as_ref().map(|p| p.display().to_string()).unwrap_or_else(|| "built-in defaults".into()),
                bind = %config.server.bind,
                probe_timeout_ms = config.probe.timeout.as_millis() as u64,
                "host configuration loaded"
            );
            warn_if_env_path_ignored(loaded.overridden_env_path.as_deref());
            for remote in catalog.iter() {
                info!(remote = %remote.id, manifest = %remote.manifest_url, entry = %remote.entry_url, route = %remote.route, "remote configured");
            }
            serve(config, catalog, probe).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { json } => {
            // stdout carries the verdicts; diagnostics go to stderr only.
            init_cli_tracing("logtrack-host")?;
            warn_if_env_path_ignored(loaded.overridden_env_path.as_deref());
            let builder = RegistryBuilder::new(probe).with_timeout(config.probe.timeout);
            let summary = run_check(&catalog, &builder, json).await?;
            print!("{}", summary.output);
            if json {
                println!();
            }
            if summary.healthy {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

async fn serve(config: HostConfig, catalog: RemoteCatalog, probe: Arc<HttpProbe>) -> Result<()> {
    let exporter = new_registry();
    let metrics = RemoteMetrics::new(exporter.clone())?;
    let loader = Arc::new(HttpModuleLoader::new(config.loader.timeout)?);
    let slot = RegistrySlot::new();

    let state = HostState::new(catalog.clone(), slot.clone(), loader)
        .with_metrics(exporter, metrics.clone());
    let server = spawn_host(state, config.server.bind)?;

    let builder = RegistryBuilder::new(probe)
        .with_timeout(config.probe.timeout)
        .with_metrics(metrics);
    let bootstrap = spawn_bootstrap(catalog, builder, slot);

    shutdown_signal().await;
    bootstrap.abort();
    server.shutdown().await
}

fn warn_if_env_path_ignored(ignored: Option<&Path>) {
    if let Some(ignored) = ignored {
        warn!(
            ignored = %ignored.display(),
            "--config takes precedence over {}",
            HostConfig::ENV_CONFIG_PATH
        );
    }
}

/// Waits for either CTRL+C or SIGTERM to trigger graceful shutdown.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut sigterm = unix_signal(SignalKind::terminate()).expect("install SIGTERM handler");

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("received ctrl_c; shutting down");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM; shutting down");
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    let _ = signal::ctrl_c().await;
    info!("received ctrl_c; shutting down");
}
