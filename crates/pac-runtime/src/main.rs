//! # PAC Runtime
//!
//! Command-line entry point: load a profile, bootstrap the shards and run
//! the demonstration. Exits non-zero when a phase fails unexpectedly.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use pac_runtime::{demo, Deployment, Profile};
use pac_telemetry::{init_telemetry, TelemetryConfig};

/// Cross-shard atomic commit demonstration.
#[derive(Debug, Parser)]
#[command(name = "pac-runtime", version, about)]
struct Cli {
    /// TOML profile describing the shards.
    #[arg(short, long, default_value = "profiles/two-shards.toml")]
    profile: PathBuf,

    /// Also run the abort demonstration.
    #[arg(long)]
    abort_demo: bool,

    /// Override the label of the demo transaction.
    #[arg(long)]
    label: Option<String>,
}

async fn run(cli: Cli) -> Result<()> {
    let mut profile = Profile::load(&cli.profile)?;
    profile.apply_env_overrides();
    let label = cli.label.unwrap_or_else(|| profile.demo.label.clone());

    let deployment = Deployment::from_profile(&profile);
    let result = async {
        demo::init_ledgers(&deployment).await?;

        let transfer = demo::run_transfer(&deployment, &label).await?;
        info!(
            "Transfer {} committed: asset4 owner={}, account4 balance={}",
            transfer.tx_id, transfer.asset_owner, transfer.account_balance
        );

        if cli.abort_demo {
            let aborted = demo::run_abort(&deployment).await?;
            info!(
                "Abort {} done: asset1 owner={}",
                aborted.tx_id, aborted.asset_owner
            );
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    deployment.close();
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry).context("Failed to initialise logging")?;

    info!("============ PAC runtime v{} starts ============", pac_runtime::VERSION);
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("PAC runtime failed: {err:#}");
        return Err(err);
    }
    info!("============ PAC runtime ends ============");
    Ok(())
}
