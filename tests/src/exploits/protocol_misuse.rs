//! Attacks on the shard's phase bookkeeping.

use crate::fixtures::{args, ASSETS};
use pac_01_shard_contract::{AssetContract, ProposalReceipt, ShardLedger, ShardLedgerApi};
use shared_types::{DependencyMap, GlobalTxId, HashPair, ShardId};
use std::collections::BTreeMap;

/// One proposed transfer of asset4 and the maps a driver would build for it.
pub struct Proposed {
    /// Global transaction.
    pub id: GlobalTxId,
    /// PROPOSE-phase map.
    pub initial: DependencyMap,
    /// What the shard issued.
    pub receipt: ProposalReceipt,
}

impl Proposed {
    /// Propose TransferAsset(asset4, Ivan) on `ledger`.
    pub async fn transfer(ledger: &ShardLedger<AssetContract>) -> Self {
        let id = GlobalTxId::new();
        let initial = DependencyMap::initial("t", &id, &[ShardId::from(ASSETS)]).unwrap();
        let receipt = ledger
            .propose("TransferAsset", &Self::op(), &initial)
            .await
            .unwrap();
        Self {
            id,
            initial,
            receipt,
        }
    }

    /// Operation arguments.
    pub fn op() -> Vec<String> {
        args(&["asset4", "Ivan"])
    }

    /// SPREAD map carrying `certificate` for the shard.
    pub fn spread_with(&self, certificate: HashPair) -> DependencyMap {
        let mut certs = BTreeMap::new();
        certs.insert(
            ShardId::from(ASSETS),
            (certificate, self.receipt.local_tx_id.clone()),
        );
        self.initial
            .with_certificates(&certs)
            .unwrap()
            .addressed_to(&self.receipt.local_tx_id)
    }

    /// Honest SPREAD map.
    pub fn spread(&self) -> DependencyMap {
        self.spread_with(self.receipt.certificate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ledgers;
    use pac_01_shard_contract::ContractError;
    use shared_types::{LocalTxId, RejectionKind, ShardTxStatus};

    async fn asset_ledger() -> std::sync::Arc<ShardLedger<AssetContract>> {
        ledgers().await.0
    }

    async fn owner(ledger: &ShardLedger<AssetContract>) -> String {
        let bytes = ledger
            .evaluate("ReadAsset", &args(&["asset4"]))
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["owner"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_forged_own_certificate_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;

        let err = ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &tx.spread_with(HashPair::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::ForeignCertificate { .. }));
        assert_eq!(err.rejection_kind(), RejectionKind::CertificateMismatch);
    }

    #[tokio::test]
    async fn test_spread_without_certificates_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;

        let bare = tx.initial.addressed_to(&tx.receipt.local_tx_id);
        let err = ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &bare)
            .await
            .unwrap_err();
        assert_eq!(err, ContractError::MissingCertificate(ShardId::from(ASSETS)));
    }

    #[tokio::test]
    async fn test_prepare_before_spread_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;

        let err = ledger
            .prepare("TransferAsset", &Proposed::op(), &tx.spread())
            .await
            .unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::PhaseOrder);
        assert_eq!(ledger.transaction_status(&tx.id), ShardTxStatus::Proposed);
    }

    #[tokio::test]
    async fn test_decide_before_prepare_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;
        let map = tx.spread();
        ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();

        let err = ledger
            .decide("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::PhaseOrder);
        assert_eq!(owner(&ledger).await, "Max");
    }

    #[tokio::test]
    async fn test_replayed_local_tx_id_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;

        let forged = LocalTxId::new("mychannel1-forged");
        let map = tx.spread().addressed_to(&forged);
        let err = ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::LocalTxIdMismatch { .. }));
        assert_eq!(err.rejection_kind(), RejectionKind::UnknownTransaction);
    }

    #[tokio::test]
    async fn test_swapped_operation_refused_at_prepare() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;
        let map = tx.spread();
        ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();

        let err = ledger
            .prepare("TransferAsset", &args(&["asset4", "Mallory"]), &map)
            .await
            .unwrap_err();
        assert!(matches!(err, ContractError::OperationMismatch { .. }));
        assert_eq!(ledger.transaction_status(&tx.id), ShardTxStatus::Proposed);
    }

    #[tokio::test]
    async fn test_decide_after_abort_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;
        let map = tx.spread();
        ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();
        ledger
            .prepare("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();
        assert!(ledger.abort(&map).await.unwrap());

        let err = ledger
            .decide("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::DecisionConflict);
        assert_eq!(owner(&ledger).await, "Max");
    }

    #[tokio::test]
    async fn test_abort_after_decide_refused() {
        let ledger = asset_ledger().await;
        let tx = Proposed::transfer(&ledger).await;
        let map = tx.spread();
        ledger
            .spread_certificates("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();
        ledger
            .prepare("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();
        ledger
            .decide("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap();

        let err = ledger.abort(&map).await.unwrap_err();
        assert_eq!(err.rejection_kind(), RejectionKind::DecisionConflict);
        assert_eq!(owner(&ledger).await, "Ivan");
    }

    #[tokio::test]
    async fn test_non_participant_cannot_be_proposed_to() {
        let ledger = asset_ledger().await;
        let id = GlobalTxId::new();
        let map = DependencyMap::initial("t", &id, &[ShardId::from("mychannel9")]).unwrap();

        let err = ledger
            .propose("TransferAsset", &Proposed::op(), &map)
            .await
            .unwrap_err();
        assert_eq!(err, ContractError::NotParticipant(ShardId::from(ASSETS)));
        assert!(ledger.locked_keys().is_empty());
    }
}
