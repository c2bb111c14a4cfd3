//! # Protocol Properties
//!
//! Mutual exclusion, idempotent abort, certificate stability and the
//! non-negative balance rule, checked through the coordinator and directly
//! on the ledgers.

#[cfg(test)]
mod tests {
    use crate::fixtures::{args, ledgers, transfer_scenario, TwoShards, ACCOUNTS, ASSETS};
    use futures::future::join_all;
    use pac_01_shard_contract::ShardLedgerApi;
    use pac_02_coordinator::{AbortReason, CoordinatorApi, ShardOperation, TxOutcome};
    use rust_decimal::Decimal;
    use shared_types::{DependencyMap, GlobalTxId, RejectionKind, ShardId, ShardTxStatus};
    use std::collections::BTreeMap;
    use std::str::FromStr;

    fn lock_conflict(outcome: &TxOutcome) -> bool {
        matches!(
            outcome,
            TxOutcome::Aborted(AbortReason::Rejected {
                kind: RejectionKind::LockConflict,
                ..
            })
        )
    }

    #[tokio::test]
    async fn test_overlapping_keys_are_mutually_exclusive() {
        let f = TwoShards::new().await;
        let first = f
            .coordinator
            .begin("first", transfer_scenario(), BTreeMap::new())
            .await
            .unwrap();
        f.coordinator.propose(&first).await.unwrap();

        let contender = vec![ShardOperation::new(ACCOUNTS, "Transfer", ["account4", "account1", "1"])];
        let (_, outcome) = f
            .coordinator
            .execute("second", contender.clone())
            .await
            .unwrap();
        assert!(lock_conflict(&outcome), "got {outcome:?}");

        f.coordinator.spread_certificates(&first).await.unwrap();
        f.coordinator.prepare(&first).await.unwrap();
        f.coordinator.decide(&first).await.unwrap();

        // once the holder decided, the same request goes through
        let (_, outcome) = f.coordinator.execute("third", contender).await.unwrap();
        assert_eq!(outcome, TxOutcome::Committed);
        assert_eq!(f.balance("account4").await, "665.192");
    }

    #[tokio::test]
    async fn test_read_only_key_is_isolated_until_decide() {
        let f = TwoShards::new().await;
        let ops = vec![
            ShardOperation::new(ASSETS, "TransferAsset", ["asset4", "Ivan"]),
            ShardOperation::new(ACCOUNTS, "ReadAccount", ["account4"]),
        ];
        let id = f
            .coordinator
            .begin("read only", ops, BTreeMap::new())
            .await
            .unwrap();
        f.coordinator.propose(&id).await.unwrap();
        assert_eq!(f.accounts.locked_keys().get("account4"), Some(&id));

        let contender = vec![ShardOperation::new(ACCOUNTS, "UpdateAccount", ["account4", "Max", "1"])];
        let (_, outcome) = f.coordinator.execute("contender", contender).await.unwrap();
        assert!(lock_conflict(&outcome), "got {outcome:?}");

        f.coordinator.spread_certificates(&id).await.unwrap();
        f.coordinator.prepare(&id).await.unwrap();

        let update = args(&["account4", "Max", "1"]);
        let response = f
            .coordinator
            .invoke(&ShardId::from(ACCOUNTS), "UpdateAccount", &update)
            .await
            .unwrap();
        assert_eq!(
            response.rejection().map(|r| r.kind),
            Some(RejectionKind::LockConflict)
        );
        assert_eq!(f.balance("account4").await, "6.192");

        f.coordinator.decide(&id).await.unwrap();
        assert_eq!(f.coordinator.outcome(&id), Some(TxOutcome::Committed));
        assert_eq!(f.assets.transaction_status(&id), ShardTxStatus::Committed);
        assert_eq!(f.accounts.transaction_status(&id), ShardTxStatus::Committed);
        assert_eq!(f.owner("asset4").await, "Ivan");
        assert_eq!(f.locked(), 0);

        let response = f
            .coordinator
            .invoke(&ShardId::from(ACCOUNTS), "UpdateAccount", &update)
            .await
            .unwrap();
        assert!(response.is_valid());
        assert_eq!(f.balance("account4").await, "1");
    }

    #[tokio::test]
    async fn test_range_scan_cannot_join_transaction() {
        let f = TwoShards::new().await;
        let ops = vec![
            ShardOperation::new(ASSETS, "TransferAsset", ["asset4", "Ivan"]),
            ShardOperation::new(ACCOUNTS, "GetAllAccounts", Vec::<String>::new()),
        ];
        let (_, outcome) = f.coordinator.execute("scan", ops).await.unwrap();
        assert!(
            matches!(
                outcome,
                TxOutcome::Aborted(AbortReason::Rejected {
                    kind: RejectionKind::Validation,
                    ..
                })
            ),
            "got {outcome:?}"
        );
        assert_eq!(f.owner("asset4").await, "Max");
        assert_eq!(f.locked(), 0);
    }

    #[tokio::test]
    async fn test_disjoint_transactions_run_concurrently() {
        let f = TwoShards::new().await;
        let batches: Vec<Vec<ShardOperation>> = (1..=5)
            .map(|i| {
                let asset = format!("asset{i}");
                let account = format!("account{i}");
                vec![
                    ShardOperation::new(ASSETS, "TransferAsset", [asset, "Ivan".to_string()]),
                    ShardOperation::new(ACCOUNTS, "UpdateAccount", [account, "Ivan".to_string(), "1".to_string()]),
                ]
            })
            .collect();

        let results = join_all(
            batches
                .into_iter()
                .enumerate()
                .map(|(i, ops)| {
                    let label = format!("batch {i}");
                    let coordinator = &f.coordinator;
                    async move { coordinator.execute(&label, ops).await }
                }),
        )
        .await;

        for result in results {
            assert_eq!(result.unwrap().1, TxOutcome::Committed);
        }
        for i in 1..=5 {
            assert_eq!(f.owner(&format!("asset{i}")).await, "Ivan");
        }
        assert_eq!(f.locked(), 0);
    }

    #[tokio::test]
    async fn test_abort_twice_on_a_shard_is_a_no_op() {
        let (assets, _) = ledgers().await;
        let id = GlobalTxId::new();
        let map = DependencyMap::initial("t", &id, &[ShardId::from(ASSETS)]).unwrap();
        let receipt = assets
            .propose("TransferAsset", &args(&["asset4", "Ivan"]), &map)
            .await
            .unwrap();
        let map = map.addressed_to(&receipt.local_tx_id);

        assert!(assets.abort(&map).await.unwrap());
        assert!(!assets.abort(&map).await.unwrap());
        assert!(assets.locked_keys().is_empty());
    }

    #[tokio::test]
    async fn test_abort_before_propose_fences_the_transaction() {
        let (assets, _) = ledgers().await;
        let id = GlobalTxId::new();
        let map = DependencyMap::initial("t", &id, &[ShardId::from(ASSETS)]).unwrap();

        assert!(!assets.abort(&map).await.unwrap());
        let late = assets
            .propose("TransferAsset", &args(&["asset4", "Ivan"]), &map)
            .await
            .unwrap_err();
        assert_eq!(late.rejection_kind(), RejectionKind::PhaseOrder);
        assert!(assets.locked_keys().is_empty());
    }

    #[tokio::test]
    async fn test_certificate_stable_from_propose_to_prepare() {
        let (assets, _) = ledgers().await;
        let shard = ShardId::from(ASSETS);
        let id = GlobalTxId::new();
        let initial = DependencyMap::initial("t", &id, &[shard.clone()]).unwrap();
        let op = args(&["asset4", "Ivan"]);

        let receipt = assets.propose("TransferAsset", &op, &initial).await.unwrap();
        let mut certs = BTreeMap::new();
        certs.insert(shard, (receipt.certificate, receipt.local_tx_id.clone()));
        let spread = initial
            .with_certificates(&certs)
            .unwrap()
            .addressed_to(&receipt.local_tx_id);

        assets
            .spread_certificates("TransferAsset", &op, &spread)
            .await
            .unwrap();
        let recomputed = assets.prepare("TransferAsset", &op, &spread).await.unwrap();
        assert_eq!(recomputed, receipt.certificate);
        assert_eq!(recomputed.to_bytes().len(), 64);

        assets.decide("TransferAsset", &op, &spread).await.unwrap();
    }

    #[tokio::test]
    async fn test_same_state_same_certificate_on_independent_ledgers() {
        let (left, _) = ledgers().await;
        let (right, _) = ledgers().await;
        let op = args(&["asset4", "Ivan"]);

        let mut certificates = Vec::new();
        for ledger in [&left, &right] {
            let id = GlobalTxId::new();
            let map = DependencyMap::initial("t", &id, &[ShardId::from(ASSETS)]).unwrap();
            let receipt = ledger.propose("TransferAsset", &op, &map).await.unwrap();
            certificates.push(receipt.certificate);
        }
        assert_eq!(certificates[0], certificates[1]);
    }

    #[tokio::test]
    async fn test_overdraft_rejected_without_mutation_or_lock() {
        let f = TwoShards::new().await;
        let before = f.balance("account1").await;

        let (_, outcome) = f
            .coordinator
            .execute(
                "overdraft",
                vec![
                    ShardOperation::new(ASSETS, "TransferAsset", ["asset1", "Ivan"]),
                    ShardOperation::new(ACCOUNTS, "Transfer", ["account1", "account2", "1000"]),
                ],
            )
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            TxOutcome::Aborted(AbortReason::Rejected {
                kind: RejectionKind::Validation,
                ..
            })
        ));
        assert_eq!(f.balance("account1").await, before);
        assert_eq!(f.owner("asset1").await, "Tomoko");
        assert_eq!(f.locked(), 0);
    }

    #[tokio::test]
    async fn test_negative_balance_never_stored() {
        let f = TwoShards::new().await;
        let (_, outcome) = f
            .coordinator
            .execute(
                "negative",
                vec![ShardOperation::new(ACCOUNTS, "UpdateAccount", ["account4", "Max", "-666.192"])],
            )
            .await
            .unwrap();

        assert!(matches!(outcome, TxOutcome::Aborted(_)));
        let balance = Decimal::from_str(&f.balance("account4").await).unwrap();
        assert!(balance >= Decimal::ZERO);
        assert_eq!(f.accounts.locked_keys().len(), 0);
    }
}
