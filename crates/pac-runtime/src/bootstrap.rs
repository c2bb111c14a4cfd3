//! # Shard Bootstrap
//!
//! Builds one ledger and one connection handle per profile shard and
//! registers the handles with a fresh coordinator. Nothing here is global:
//! the [`Deployment`] is created by the caller and lives for one run.

use crate::profile::{ContractKind, Profile};
use pac_01_shard_contract::{
    AccountContract, AssetContract, InProcessShardConnection, ShardLedger, ShardLedgerApi,
};
use pac_02_coordinator::Coordinator;
use shared_types::ShardId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// One bootstrapped shard.
pub struct ShardHandle {
    /// Hosted contract.
    pub kind: ContractKind,
    /// Ledger behind the connection.
    pub ledger: Arc<dyn ShardLedgerApi>,
    /// Connection registered with the coordinator.
    pub connection: Arc<InProcessShardConnection>,
}

/// Shards and coordinator of one run.
pub struct Deployment {
    /// Coordinator wired to every shard.
    pub coordinator: Coordinator,
    shards: BTreeMap<ShardId, ShardHandle>,
}

impl Deployment {
    /// Bootstrap every shard of `profile`.
    pub fn from_profile(profile: &Profile) -> Self {
        let coordinator = Coordinator::new(profile.coordinator.clone());
        let mut shards = BTreeMap::new();

        for shard in &profile.shards {
            let id = ShardId::new(shard.name.clone());
            let ledger: Arc<dyn ShardLedgerApi> = match shard.contract {
                ContractKind::Asset => Arc::new(ShardLedger::new(id.clone(), AssetContract)),
                ContractKind::Account => Arc::new(ShardLedger::new(id.clone(), AccountContract)),
            };
            let connection = Arc::new(InProcessShardConnection::new(Arc::clone(&ledger)));
            coordinator.register_shard(connection.clone());
            info!("Bootstrapped shard {} ({} contract)", id, shard.contract);

            shards.insert(
                id,
                ShardHandle {
                    kind: shard.contract,
                    ledger,
                    connection,
                },
            );
        }

        Self {
            coordinator,
            shards,
        }
    }

    /// Handle of one shard.
    pub fn shard(&self, id: &ShardId) -> Option<&ShardHandle> {
        self.shards.get(id)
    }

    /// First shard (by name) hosting `kind`.
    pub fn first_of(&self, kind: ContractKind) -> Option<ShardId> {
        self.shards
            .iter()
            .find(|(_, handle)| handle.kind == kind)
            .map(|(id, _)| id.clone())
    }

    /// Every shard and the keys it currently has locked.
    pub fn locked_keys(&self) -> BTreeMap<ShardId, usize> {
        self.shards
            .iter()
            .map(|(id, handle)| (id.clone(), handle.ledger.locked_keys().len()))
            .collect()
    }

    /// Close every connection handle.
    pub fn close(&self) {
        for (id, handle) in &self.shards {
            handle.connection.close();
            info!("Closed connection to {}", id);
        }
    }
}
