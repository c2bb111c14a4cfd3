//! Shared test fixtures.

use pac_01_shard_contract::{
    AccountContract, AssetContract, InProcessShardConnection, ShardLedger, ShardLedgerApi,
};
use pac_02_coordinator::{Coordinator, CoordinatorApi, CoordinatorConfig, ShardOperation};
use shared_types::{ShardId, ShardInvoker};
use std::sync::Arc;

/// Asset shard name.
pub const ASSETS: &str = "mychannel1";
/// Balance shard name.
pub const ACCOUNTS: &str = "mychannel2";

/// Two initialised shards and a coordinator wired to both.
pub struct TwoShards {
    /// Coordinator under test.
    pub coordinator: Coordinator,
    /// Asset ledger.
    pub assets: Arc<ShardLedger<AssetContract>>,
    /// Balance ledger.
    pub accounts: Arc<ShardLedger<AccountContract>>,
}

/// Fresh, initialised ledgers.
pub async fn ledgers() -> (Arc<ShardLedger<AssetContract>>, Arc<ShardLedger<AccountContract>>) {
    let assets = Arc::new(ShardLedger::new(ShardId::from(ASSETS), AssetContract));
    let accounts = Arc::new(ShardLedger::new(ShardId::from(ACCOUNTS), AccountContract));
    assets.submit("InitLedger", &[]).await.unwrap();
    accounts.submit("InitLedger", &[]).await.unwrap();
    (assets, accounts)
}

impl TwoShards {
    /// In-process connections on both shards.
    pub async fn new() -> Self {
        let (assets, accounts) = ledgers().await;
        let coordinator = Coordinator::new(CoordinatorConfig::for_testing());
        coordinator.register_shard(Arc::new(InProcessShardConnection::new(assets.clone())));
        coordinator.register_shard(Arc::new(InProcessShardConnection::new(accounts.clone())));
        Self {
            coordinator,
            assets,
            accounts,
        }
    }

    /// Custom handle in front of the balance shard.
    pub async fn with_account_invoker(
        wrap: impl FnOnce(InProcessShardConnection) -> Arc<dyn ShardInvoker>,
    ) -> Self {
        let (assets, accounts) = ledgers().await;
        let coordinator = Coordinator::new(CoordinatorConfig::for_testing());
        coordinator.register_shard(Arc::new(InProcessShardConnection::new(assets.clone())));
        coordinator.register_shard(wrap(InProcessShardConnection::new(accounts.clone())));
        Self {
            coordinator,
            assets,
            accounts,
        }
    }

    /// Keys locked on either shard.
    pub fn locked(&self) -> usize {
        self.assets.locked_keys().len() + self.accounts.locked_keys().len()
    }

    /// Decoded JSON of a read on one shard.
    pub async fn read(&self, shard: &str, op: &str, id: &str) -> serde_json::Value {
        let response = self
            .coordinator
            .query(&ShardId::from(shard), op, &[id.to_string()])
            .await
            .unwrap();
        assert!(response.is_valid(), "{op} {id} refused: {:?}", response.rejection());
        serde_json::from_slice(&response.payload).unwrap()
    }

    /// Owner of an asset.
    pub async fn owner(&self, asset: &str) -> String {
        self.read(ASSETS, "ReadAsset", asset).await["owner"]
            .as_str()
            .unwrap()
            .to_string()
    }

    /// Balance of an account, as its decimal string.
    pub async fn balance(&self, account: &str) -> String {
        self.read(ACCOUNTS, "ReadAccount", account).await["balance"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

/// TransferAsset(asset4 -> Ivan) with UpdateAccount(account4, Max, 666.192).
pub fn transfer_scenario() -> Vec<ShardOperation> {
    vec![
        ShardOperation::new(ASSETS, "TransferAsset", ["asset4", "Ivan"]),
        ShardOperation::new(ACCOUNTS, "UpdateAccount", ["account4", "Max", "666.192"]),
    ]
}

/// String arguments.
pub fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
