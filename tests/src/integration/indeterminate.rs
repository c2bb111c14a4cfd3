//! # Indeterminate Results
//!
//! A connection that loses requests or responses. The coordinator must
//! never read a connectivity error as success or failure.

use async_trait::async_trait;
use pac_01_shard_contract::InProcessShardConnection;
use parking_lot::Mutex;
use shared_types::{
    ConnectivityError, GlobalTxId, InvokeRequest, InvokeResponse, PacPhase, ShardId,
    ShardInvoker, ShardTxStatus,
};

/// Connection that can go offline or lose one phase response.
pub struct Unreliable {
    inner: InProcessShardConnection,
    offline: Mutex<bool>,
    lose_response: Mutex<Option<PacPhase>>,
}

impl Unreliable {
    /// Wrap a working connection.
    pub fn new(inner: InProcessShardConnection) -> Self {
        Self {
            inner,
            offline: Mutex::new(false),
            lose_response: Mutex::new(None),
        }
    }

    /// Drop every request and status query while set.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock() = offline;
    }

    /// Deliver the next request of `phase` but lose its response.
    pub fn lose_next_response(&self, phase: PacPhase) {
        *self.lose_response.lock() = Some(phase);
    }

    fn unavailable(&self) -> ConnectivityError {
        ConnectivityError::Unavailable {
            shard: self.inner.shard_id().clone(),
            reason: "link down".to_string(),
        }
    }
}

#[async_trait]
impl ShardInvoker for Unreliable {
    fn shard_id(&self) -> &ShardId {
        self.inner.shard_id()
    }

    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, ConnectivityError> {
        if *self.offline.lock() {
            return Err(self.unavailable());
        }
        let lose = {
            let mut pending = self.lose_response.lock();
            if request.phase.is_some() && *pending == request.phase {
                pending.take();
                true
            } else {
                false
            }
        };
        let response = self.inner.invoke(request).await;
        if lose {
            return Err(self.unavailable());
        }
        response
    }

    async fn query(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<InvokeResponse, ConnectivityError> {
        if *self.offline.lock() {
            return Err(self.unavailable());
        }
        self.inner.query(operation, args).await
    }

    async fn transaction_status(
        &self,
        global_id: &GlobalTxId,
    ) -> Result<ShardTxStatus, ConnectivityError> {
        if *self.offline.lock() {
            return Err(self.unavailable());
        }
        self.inner.transaction_status(global_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{transfer_scenario, TwoShards, ACCOUNTS};
    use pac_01_shard_contract::ShardLedgerApi;
    use pac_02_coordinator::{
        AbortReason, CoordinatorApi, CoordinatorError, TransactionLog, TxOutcome,
    };
    use std::collections::BTreeMap;
    use std::sync::Arc;

    async fn unreliable_accounts() -> (TwoShards, Arc<Unreliable>) {
        let mut handle = None;
        let f = TwoShards::with_account_invoker(|connection| {
            let unreliable = Arc::new(Unreliable::new(connection));
            handle = Some(unreliable.clone());
            let invoker: Arc<dyn ShardInvoker> = unreliable;
            invoker
        })
        .await;
        let handle = handle.unwrap();
        (f, handle)
    }

    #[tokio::test]
    async fn test_lost_decide_response_counts_as_applied() {
        let (f, link) = unreliable_accounts().await;
        link.lose_next_response(PacPhase::Decide);

        let (id, outcome) = f
            .coordinator
            .execute("Test attempt", transfer_scenario())
            .await
            .unwrap();
        assert_eq!(outcome, TxOutcome::Committed);
        assert_eq!(f.accounts.transaction_status(&id), ShardTxStatus::Committed);
        assert_eq!(f.balance("account4").await, "666.192");
    }

    #[tokio::test]
    async fn test_lost_spread_response_is_resent() {
        let (f, link) = unreliable_accounts().await;
        link.lose_next_response(PacPhase::SpreadCertificates);

        let (_, outcome) = f
            .coordinator
            .execute("Test attempt", transfer_scenario())
            .await
            .unwrap();
        assert_eq!(outcome, TxOutcome::Committed);
        assert_eq!(f.locked(), 0);
    }

    #[tokio::test]
    async fn test_unreachable_shard_aborts_before_commit_point() {
        let (f, link) = unreliable_accounts().await;
        link.set_offline(true);

        let (id, outcome) = f
            .coordinator
            .execute("Test attempt", transfer_scenario())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            TxOutcome::Aborted(AbortReason::Indeterminate {
                shard: ShardId::from(ACCOUNTS),
                phase: PacPhase::Propose,
            })
        );
        assert_eq!(f.coordinator.log().decision(&id), Some(outcome));
        assert!(f.assets.locked_keys().is_empty());
        assert_eq!(f.owner("asset4").await, "Max");
    }

    #[tokio::test]
    async fn test_outage_after_prepare_is_in_doubt_until_decide_succeeds() {
        let (f, link) = unreliable_accounts().await;
        let id = f
            .coordinator
            .begin("Test attempt", transfer_scenario(), BTreeMap::new())
            .await
            .unwrap();
        f.coordinator.propose(&id).await.unwrap();
        f.coordinator.spread_certificates(&id).await.unwrap();
        f.coordinator.prepare(&id).await.unwrap();

        link.set_offline(true);
        let err = f.coordinator.decide(&id).await.unwrap_err();
        assert!(matches!(err, CoordinatorError::InDoubt { .. }));
        assert_eq!(
            f.coordinator.abort(&id).await.unwrap_err(),
            CoordinatorError::CommitPointPassed(id)
        );
        // the asset side is committed; the balance side still holds its lock
        assert_eq!(f.owner("asset4").await, "Ivan");
        assert_eq!(f.accounts.transaction_status(&id), ShardTxStatus::Prepared);
        assert_eq!(f.accounts.locked_keys().len(), 1);
        assert_eq!(f.coordinator.log().undecided(), vec![id]);

        link.set_offline(false);
        f.coordinator.decide(&id).await.unwrap();
        assert_eq!(f.balance("account4").await, "666.192");
        assert_eq!(f.locked(), 0);
        assert!(f.coordinator.log().undecided().is_empty());
    }
}
