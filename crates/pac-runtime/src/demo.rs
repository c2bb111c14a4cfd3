//! # Transfer Demonstration
//!
//! Moves asset4 from Max to Ivan on the asset shard while the account shard
//! records account4's new balance, phase by phase, with a deliberately
//! repeated PREPARE in between. The optional abort run shows that an
//! aborted transaction leaves its keys free for the next writer.

use crate::bootstrap::Deployment;
use crate::profile::ContractKind;
use anyhow::{anyhow, bail, ensure, Context, Result};
use pac_02_coordinator::{CoordinatorApi, PhaseReport, ShardOperation};
use pac_telemetry::log_tx_event;
use shared_types::{GlobalTxId, ShardId};
use std::collections::BTreeMap;
use tracing::info;

/// What the transfer demo left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferSummary {
    /// Global transaction.
    pub tx_id: GlobalTxId,
    /// Owner of asset4 after DECIDE.
    pub asset_owner: String,
    /// Balance of account4 after DECIDE.
    pub account_balance: String,
}

/// What the abort demo left behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbortSummary {
    /// Aborted global transaction.
    pub tx_id: GlobalTxId,
    /// Owner of asset1 after the follow-up plain transfer.
    pub asset_owner: String,
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn shard_for(deployment: &Deployment, kind: ContractKind) -> Result<ShardId> {
    deployment
        .first_of(kind)
        .ok_or_else(|| anyhow!("the profile has no {kind} shard"))
}

/// Submit a plain transaction and fail on refusal.
async fn submit(deployment: &Deployment, shard: &ShardId, op: &str, values: &[&str]) -> Result<()> {
    let response = deployment
        .coordinator
        .invoke(shard, op, &args(values))
        .await
        .with_context(|| format!("{op} on {shard}"))?;
    if let Some(rejection) = response.rejection() {
        bail!("{op} on {shard} refused: {rejection}");
    }
    info!("{} on {}: ok", op, shard);
    Ok(())
}

/// Evaluate a read and decode its JSON payload.
async fn read_json(
    deployment: &Deployment,
    shard: &ShardId,
    op: &str,
    values: &[&str],
) -> Result<serde_json::Value> {
    let response = deployment
        .coordinator
        .query(shard, op, &args(values))
        .await
        .with_context(|| format!("{op} on {shard}"))?;
    if let Some(rejection) = response.rejection() {
        bail!("{op} on {shard} refused: {rejection}");
    }
    serde_json::from_slice(&response.payload).with_context(|| format!("{op} payload on {shard}"))
}

async fn show_ledger(deployment: &Deployment, shard: &ShardId, op: &str) -> Result<()> {
    let all = read_json(deployment, shard, op, &[]).await?;
    info!("{} {}:\n{}", shard, op, serde_json::to_string_pretty(&all)?);
    Ok(())
}

fn show_report(tx_id: &GlobalTxId, report: &PhaseReport) {
    log_tx_event!(
        info,
        "runtime",
        "phase done",
        tx_id,
        phase = %report.phase,
        applied = report.applied.len(),
        refused = report.tolerated.len()
    );
}

/// Initialise both ledgers and print them.
pub async fn init_ledgers(deployment: &Deployment) -> Result<()> {
    let assets = shard_for(deployment, ContractKind::Asset)?;
    let accounts = shard_for(deployment, ContractKind::Account)?;

    submit(deployment, &assets, "InitLedger", &[]).await?;
    show_ledger(deployment, &assets, "GetAllAssets").await?;
    submit(deployment, &accounts, "InitLedger", &[]).await?;
    show_ledger(deployment, &accounts, "GetAllAccounts").await?;
    Ok(())
}

/// Run the cross-shard transfer, one phase at a time.
pub async fn run_transfer(deployment: &Deployment, label: &str) -> Result<TransferSummary> {
    let assets = shard_for(deployment, ContractKind::Asset)?;
    let accounts = shard_for(deployment, ContractKind::Account)?;
    let coordinator = &deployment.coordinator;

    let tx_id = coordinator
        .begin(
            label,
            vec![
                ShardOperation::new(assets.clone(), "TransferAsset", ["asset4", "Ivan"]),
                ShardOperation::new(
                    accounts.clone(),
                    "UpdateAccount",
                    ["account4", "Max", "666.192"],
                ),
            ],
            BTreeMap::new(),
        )
        .await?;
    log_tx_event!(info, "runtime", "transfer asset4 from Max to Ivan", tx_id);

    show_report(&tx_id, &coordinator.propose(&tx_id).await?);
    if let Some(tx) = coordinator.transaction(&tx_id) {
        for (shard, (certificate, local)) in tx.certificates() {
            info!("{}: certificate {} local tx {}", shard, certificate, local);
        }
    }
    show_report(&tx_id, &coordinator.spread_certificates(&tx_id).await?);
    show_report(&tx_id, &coordinator.prepare(&tx_id).await?);

    let repeated = coordinator.prepare(&tx_id).await?;
    show_report(&tx_id, &repeated);
    ensure!(
        repeated.applied.is_empty() && !repeated.tolerated.is_empty(),
        "repeated PREPARE was not refused"
    );

    show_report(&tx_id, &coordinator.decide(&tx_id).await?);

    show_ledger(deployment, &assets, "GetAllAssets").await?;
    show_ledger(deployment, &accounts, "GetAllAccounts").await?;

    let asset = read_json(deployment, &assets, "ReadAsset", &["asset4"]).await?;
    let account = read_json(deployment, &accounts, "ReadAccount", &["account4"]).await?;
    let locked: usize = deployment.locked_keys().values().sum();
    ensure!(locked == 0, "{locked} key(s) still locked after DECIDE");

    Ok(TransferSummary {
        tx_id,
        asset_owner: asset["owner"].as_str().unwrap_or_default().to_string(),
        account_balance: account["balance"].as_str().unwrap_or_default().to_string(),
    })
}

/// Propose a transfer of asset1, abort it, then move asset1 with a plain
/// transaction to show the lock is gone.
pub async fn run_abort(deployment: &Deployment) -> Result<AbortSummary> {
    let assets = shard_for(deployment, ContractKind::Asset)?;
    let coordinator = &deployment.coordinator;

    let tx_id = coordinator
        .begin(
            "Abort attempt",
            vec![ShardOperation::new(
                assets.clone(),
                "TransferAsset",
                ["asset1", "John"],
            )],
            BTreeMap::new(),
        )
        .await?;
    log_tx_event!(info, "runtime", "transfer asset1 from Tomoko to John", tx_id);

    show_report(&tx_id, &coordinator.propose(&tx_id).await?);
    show_report(&tx_id, &coordinator.spread_certificates(&tx_id).await?);
    show_report(&tx_id, &coordinator.abort(&tx_id).await?);

    submit(deployment, &assets, "TransferAsset", &["asset1", "Pet"]).await?;
    let asset = read_json(deployment, &assets, "ReadAsset", &["asset1"]).await?;
    show_ledger(deployment, &assets, "GetAllAssets").await?;

    Ok(AbortSummary {
        tx_id,
        asset_owner: asset["owner"].as_str().unwrap_or_default().to_string(),
    })
}
