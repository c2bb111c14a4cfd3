//! # Domain Entities
//!
//! The coordinator-side record of one global transaction.

use super::errors::CoordinatorError;
use super::value_objects::{GlobalPhase, ShardOperation, ShardStage, TxOutcome};
use shared_types::{DependencyMap, GlobalTxId, HashPair, LocalTxId, ShardId};
use std::collections::BTreeMap;

/// What the coordinator knows about one participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardProgress {
    /// Operation the shard executes.
    pub operation: ShardOperation,
    /// Certificate returned at PROPOSE.
    pub certificate: Option<HashPair>,
    /// Local tx id returned at PROPOSE.
    pub local_tx_id: Option<LocalTxId>,
    /// Last confirmed stage.
    pub stage: ShardStage,
}

impl ShardProgress {
    fn new(operation: ShardOperation) -> Self {
        Self {
            operation,
            certificate: None,
            local_tx_id: None,
            stage: ShardStage::Pending,
        }
    }
}

/// A global (cross-shard) transaction.
#[derive(Clone, Debug)]
pub struct GlobalTransaction {
    /// Global id; owns every lock taken for the transaction.
    pub id: GlobalTxId,
    /// Human-readable label.
    pub label: String,
    /// Participants in the order they were listed.
    pub participants: Vec<ShardId>,
    /// Coordinator-side phase.
    pub phase: GlobalPhase,
    /// Per-shard progress.
    pub shards: BTreeMap<ShardId, ShardProgress>,
    /// Decision, once taken.
    pub outcome: TxOutcome,
    /// PROPOSE-phase dependency map (label, id, participants, metadata).
    pub base_map: DependencyMap,
}

impl GlobalTransaction {
    /// Create a transaction in phase `Proposed`.
    pub fn new(
        label: &str,
        operations: Vec<ShardOperation>,
        metadata: &BTreeMap<String, Vec<u8>>,
    ) -> Result<Self, CoordinatorError> {
        if operations.is_empty() {
            return Err(CoordinatorError::NoParticipants);
        }
        let id = GlobalTxId::new();
        let participants: Vec<ShardId> = operations.iter().map(|op| op.shard.clone()).collect();

        let mut base_map = DependencyMap::initial(label, &id, &participants)?;
        for (key, value) in metadata {
            base_map = base_map.with_metadata(key, value.clone())?;
        }

        let mut shards = BTreeMap::new();
        for op in operations {
            shards.insert(op.shard.clone(), ShardProgress::new(op));
        }

        Ok(Self {
            id,
            label: label.to_string(),
            participants,
            phase: GlobalPhase::Proposed,
            shards,
            outcome: TxOutcome::Pending,
            base_map,
        })
    }

    /// Move to `next`, enforcing the phase state machine.
    pub fn transition(&mut self, next: GlobalPhase) -> Result<(), CoordinatorError> {
        if !self.phase.can_transition_to(next) {
            return Err(CoordinatorError::InvalidTransition {
                id: self.id,
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Progress of one shard.
    pub fn progress(&self, shard: &ShardId) -> Option<&ShardProgress> {
        self.shards.get(shard)
    }

    /// Shards that might hold locks and therefore need an ABORT.
    pub fn lock_holders(&self) -> Vec<ShardId> {
        self.participants
            .iter()
            .filter(|shard| {
                self.shards
                    .get(*shard)
                    .is_some_and(|p| p.stage.may_hold_locks())
            })
            .cloned()
            .collect()
    }

    /// Every certificate and local tx id collected at PROPOSE.
    pub fn certificates(&self) -> BTreeMap<ShardId, (HashPair, LocalTxId)> {
        self.shards
            .iter()
            .filter_map(|(shard, p)| match (&p.certificate, &p.local_tx_id) {
                (Some(certificate), Some(local)) => {
                    Some((shard.clone(), (*certificate, local.clone())))
                }
                _ => None,
            })
            .collect()
    }

    /// Does every shard stand at `stage`?
    pub fn all_at(&self, stage: ShardStage) -> bool {
        self.shards.values().all(|p| p.stage == stage)
    }
}
