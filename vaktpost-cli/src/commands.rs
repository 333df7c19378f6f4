use std::path::PathBuf;

use anyhow::{anyhow, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info, warn};
use vaktpost_config::VaktpostConfig;
use vaktpost_engine::{Collaborators, EngineError, Supervisor};
use vaktpost_telemetry::EventLogger;

use crate::signal::wait_for_stop_signal;

#[derive(Parser)]
#[command(name = "vaktpost", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ingest the configured stream until SIGINT or SIGTERM
    Run(ConfigArgs),
    /// Validate the configuration and print the effective values
    Check(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Configuration file; defaults to config/vaktpost.yaml when present
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<VaktpostConfig> {
    let config = match &args.config {
        Some(path) => VaktpostConfig::load_from_path(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => VaktpostConfig::load()?,
    };
    Ok(config)
}

pub fn check(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let api_key = if config.detection.api_key.is_empty() {
        "unset"
    } else {
        "set"
    };
    print!("{}", serde_yaml::to_string(&config)?);
    println!("# detection.api_key: {api_key}");
    println!("# configuration OK");
    Ok(())
}

pub async fn run(args: ConfigArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    EventLogger::init(&config.telemetry.log_level)
        .map_err(|e| anyhow!("logging setup failed: {e}"))?;

    let status_interval = config.supervisor.status_interval();
    // The HTTP detector's blocking client must be built and dropped off the
    // async runtime.
    let supervisor = tokio::task::spawn_blocking(move || -> Result<Supervisor, EngineError> {
        let collaborators = Collaborators::from_config(&config)?;
        Supervisor::start(config, collaborators)
    })
    .await??;

    let mut ticker = tokio::time::interval(status_interval);
    ticker.tick().await;
    let shutdown = wait_for_stop_signal();
    tokio::pin!(shutdown);

    let reason = loop {
        tokio::select! {
            signal = &mut shutdown => break signal?,
            _ = ticker.tick() => {
                let status = supervisor.status();
                info!(
                    active = status.active,
                    chunk_queue_depth = status.chunk_queue_depth,
                    alert_queue_depth = status.alert_queue_depth,
                    "Pipeline status"
                );
                match supervisor.metrics().gather_metrics() {
                    Ok(text) => debug!("Metrics:\n{text}"),
                    Err(e) => warn!(error = %e, "Gathering metrics failed"),
                }
                if !status.active {
                    warn!("Ingest is no longer running");
                    break "ingest stopped";
                }
            }
        }
    };

    info!(reason, "Shutting down");
    let report = tokio::task::spawn_blocking(move || supervisor.stop()).await?;
    if report.is_clean() {
        Ok(())
    } else {
        Err(anyhow!(
            "workers did not stop in time: {}",
            report.stragglers.join(", ")
        ))
    }
}
