//! # Domain Invariants
//!
//! Rules every global transaction obeys.

use super::entities::GlobalTransaction;
use super::errors::CoordinatorError;
use super::value_objects::ShardStage;

/// Invariant: DECIDE is only sent after every participant prepared.
pub fn invariant_unanimous_prepare(tx: &GlobalTransaction) -> Result<(), CoordinatorError> {
    for (shard, progress) in &tx.shards {
        if !matches!(progress.stage, ShardStage::Prepared | ShardStage::Decided) {
            return Err(CoordinatorError::InvariantViolation(format!(
                "DECIDE for {} while {} is {:?}",
                tx.id, shard, progress.stage
            )));
        }
    }
    Ok(())
}

/// Invariant: no shard applies a transaction another shard aborted.
pub fn invariant_no_partial_commit(tx: &GlobalTransaction) -> Result<(), CoordinatorError> {
    let decided = tx
        .shards
        .values()
        .any(|p| p.stage == ShardStage::Decided);
    let aborted = tx
        .shards
        .values()
        .any(|p| p.stage == ShardStage::Aborted);
    if decided && aborted {
        return Err(CoordinatorError::InvariantViolation(format!(
            "transaction {} decided on some shards and aborted on others",
            tx.id
        )));
    }
    Ok(())
}
