//! # Transfer Scenario
//!
//! asset4 moves from Max to Ivan on the asset shard while account4 is set
//! to 666.192 on the balance shard. Both commit or neither does.

#[cfg(test)]
mod tests {
    use crate::fixtures::{transfer_scenario, TwoShards, ACCOUNTS, ASSETS};
    use pac_01_shard_contract::ShardLedgerApi;
    use pac_02_coordinator::{
        AbortReason, CoordinatorApi, GlobalPhase, ShardOperation, ShardStage, TxOutcome,
    };
    use shared_types::{PacPhase, RejectionKind, ShardId, ShardTxStatus};
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_scenario_commits_on_both_shards() {
        let f = TwoShards::new().await;
        let (id, outcome) = f
            .coordinator
            .execute("Test attempt", transfer_scenario())
            .await
            .unwrap();

        assert_eq!(outcome, TxOutcome::Committed);
        assert_eq!(f.owner("asset4").await, "Ivan");
        assert_eq!(f.balance("account4").await, "666.192");
        assert_eq!(f.locked(), 0);
        assert_eq!(f.assets.transaction_status(&id), ShardTxStatus::Committed);
        assert_eq!(f.accounts.transaction_status(&id), ShardTxStatus::Committed);
    }

    #[tokio::test]
    async fn test_step_by_step_with_repeated_prepare() {
        let f = TwoShards::new().await;
        let id = f
            .coordinator
            .begin("Test attempt", transfer_scenario(), BTreeMap::new())
            .await
            .unwrap();

        f.coordinator.propose(&id).await.unwrap();
        // tentative writes are invisible until DECIDE
        assert_eq!(f.owner("asset4").await, "Max");
        assert_eq!(f.locked(), 2);

        f.coordinator.spread_certificates(&id).await.unwrap();
        let tx = f.coordinator.transaction(&id).unwrap();
        assert_eq!(tx.phase, GlobalPhase::CertificatesSpread);
        assert!(tx.all_at(ShardStage::CertificatesSpread));

        f.coordinator.prepare(&id).await.unwrap();
        let repeated = f.coordinator.prepare(&id).await.unwrap();
        assert_eq!(repeated.tolerated.len(), 2);
        assert!(repeated
            .tolerated
            .iter()
            .all(|(_, r)| r.kind == RejectionKind::AlreadyPrepared));

        f.coordinator.decide(&id).await.unwrap();
        assert_eq!(f.owner("asset4").await, "Ivan");
        assert_eq!(f.locked(), 0);
    }

    #[tokio::test]
    async fn test_one_refusal_aborts_everywhere() {
        let f = TwoShards::new().await;
        let (id, outcome) = f
            .coordinator
            .execute(
                "Test attempt",
                vec![
                    ShardOperation::new(ASSETS, "TransferAsset", ["asset4", "Ivan"]),
                    ShardOperation::new(ACCOUNTS, "UpdateAccount", ["account404", "Max", "1"]),
                ],
            )
            .await
            .unwrap();

        match outcome {
            TxOutcome::Aborted(AbortReason::Rejected {
                shard, phase, kind, ..
            }) => {
                assert_eq!(shard, ShardId::from(ACCOUNTS));
                assert_eq!(phase, PacPhase::Propose);
                assert_eq!(kind, RejectionKind::Validation);
            }
            other => panic!("expected a refusal, got {other:?}"),
        }
        assert_eq!(f.owner("asset4").await, "Max");
        assert_eq!(f.locked(), 0);
        assert_eq!(f.assets.transaction_status(&id), ShardTxStatus::Aborted);
    }

    #[tokio::test]
    async fn test_driver_abort_between_phases() {
        let f = TwoShards::new().await;
        let id = f
            .coordinator
            .begin("Test attempt", transfer_scenario(), BTreeMap::new())
            .await
            .unwrap();
        f.coordinator.propose(&id).await.unwrap();

        let report = f.coordinator.abort(&id).await.unwrap();
        assert_eq!(report.applied.len(), 2);
        assert_eq!(
            f.coordinator.outcome(&id),
            Some(TxOutcome::Aborted(AbortReason::Cancelled))
        );
        assert_eq!(f.locked(), 0);
        assert_eq!(f.balance("account4").await, "6.192");

        // the keys are free for the next writer
        let response = f
            .coordinator
            .invoke(
                &ShardId::from(ASSETS),
                "TransferAsset",
                &["asset4".to_string(), "Pet".to_string()],
            )
            .await
            .unwrap();
        assert!(response.is_valid());
        assert_eq!(f.owner("asset4").await, "Pet");
    }

    #[tokio::test]
    async fn test_plain_write_to_locked_key_refused() {
        let f = TwoShards::new().await;
        let id = f
            .coordinator
            .begin("Test attempt", transfer_scenario(), BTreeMap::new())
            .await
            .unwrap();
        f.coordinator.propose(&id).await.unwrap();

        let response = f
            .coordinator
            .invoke(
                &ShardId::from(ASSETS),
                "TransferAsset",
                &["asset4".to_string(), "Pet".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(
            response.rejection().map(|r| r.kind),
            Some(RejectionKind::LockConflict)
        );
        // reads are never blocked
        assert_eq!(f.owner("asset4").await, "Max");

        f.coordinator.abort(&id).await.unwrap();
    }
}
