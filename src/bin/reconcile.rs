//! Waits on already-submitted jobs and publishes their artifacts, without the HTTP server.

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use transcript_relay::config::settings::AppConfig;
use transcript_relay::modules::transcript::model::{JobId, Outcome};
use transcript_relay::state::AppState;

#[derive(Parser)]
#[command(name = "reconcile")]
#[command(about = "Wait for transcription jobs to finish and publish their artifacts")]
struct Cli {
    /// Provider job ids to reconcile
    #[arg(required = true)]
    job_ids: Vec<String>,

    /// Give up on every remaining job after this many seconds
    #[arg(long, env = "RECONCILE_DEADLINE_SECS")]
    deadline_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let job_ids = cli
        .job_ids
        .iter()
        .map(|raw| JobId::parse(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let config = AppConfig::new().context("Invalid configuration")?;
    let state = AppState::from_config(config).await?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling outstanding waits");
                cancel.cancel();
            }
        });
    }
    if let Some(secs) = cli.deadline_secs {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(secs)).await;
            warn!("Deadline of {}s reached", secs);
            cancel.cancel();
        });
    }

    let mut failures = 0usize;
    for job_id in &job_ids {
        match state.reconciler.wait_for_completion(job_id, &cancel).await {
            Ok(Outcome::Ready(key)) => {
                info!("{} -> {}", job_id, state.keys.completion_location(&key))
            }
            Ok(Outcome::Failed(message)) => {
                failures += 1;
                error!("{} failed: {}", job_id, message);
            }
            Ok(Outcome::Pending) => {
                failures += 1;
                warn!("{} still pending", job_id);
            }
            Err(e) => {
                failures += 1;
                error!("{}: {}", job_id, e);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} jobs did not publish an artifact", failures, job_ids.len());
    }
    Ok(())
}
