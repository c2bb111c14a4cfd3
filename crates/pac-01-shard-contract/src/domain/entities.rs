//! # Domain Entities
//!
//! Business objects, the versioned world state and the shard-side record of
//! an in-flight PAC transaction.

use super::errors::ContractError;
use super::value_objects::RwSet;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared_types::{GlobalTxId, HashPair, LocalTxId, ShardId, ShardTxStatus};
use std::collections::BTreeMap;

/// An asset stored on the asset shard.
///
/// JSON field names follow the ledger's existing documents.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique key.
    #[serde(rename = "ID")]
    pub id: String,
    /// Colour attribute.
    pub color: String,
    /// Size attribute.
    pub size: i64,
    /// Current owner.
    pub owner: String,
    /// Appraised value.
    #[serde(rename = "appraisedValue")]
    pub appraised_value: i64,
}

/// An account stored on the balance shard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique key.
    #[serde(rename = "ID")]
    pub id: String,
    /// Account owner.
    pub owner: String,
    /// Balance, never negative.
    pub balance: Decimal,
}

/// A committed value and the version it was written at.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VersionedValue {
    /// Raw value bytes.
    pub value: Vec<u8>,
    /// Starts at 1; bumped by every committed write.
    pub version: u64,
}

/// Committed key-value state of one shard.
#[derive(Clone, Debug, Default)]
pub struct WorldState {
    entries: BTreeMap<String, VersionedValue>,
}

impl WorldState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed entry for `key`.
    pub fn get(&self, key: &str) -> Option<&VersionedValue> {
        self.entries.get(key)
    }

    /// Committed version of `key` (`None` when absent).
    pub fn version(&self, key: &str) -> Option<u64> {
        self.entries.get(key).map(|v| v.version)
    }

    /// Committed entries with `start <= key < end`; empty bounds are open.
    pub fn range<'a>(
        &'a self,
        start: &'a str,
        end: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a VersionedValue)> + 'a {
        self.entries
            .iter()
            .filter(move |(key, _)| key.as_str() >= start && (end.is_empty() || key.as_str() < end))
    }

    /// Number of committed keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Apply the writes of a read/write set, bumping versions.
    pub fn apply(&mut self, rw_set: &RwSet) {
        for (key, write) in &rw_set.writes {
            match write {
                Some(value) => {
                    let version = self.version(key).map_or(1, |v| v + 1);
                    self.entries.insert(
                        key.clone(),
                        VersionedValue {
                            value: value.clone(),
                            version,
                        },
                    );
                }
                None => {
                    self.entries.remove(key);
                }
            }
        }
    }

    /// Check that every read of `rw_set` still sees the same version.
    pub fn check_reads(&self, rw_set: &RwSet) -> Result<(), ContractError> {
        for (key, read) in &rw_set.reads {
            let current = self.version(key);
            if current != *read {
                return Err(ContractError::StateDrift {
                    key: key.clone(),
                    read: *read,
                    current,
                });
            }
        }
        Ok(())
    }
}

/// Progress of a PAC transaction on this shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacStage {
    /// PROPOSE accepted; locks held.
    Proposed,
    /// Certificates spread and verified.
    CertificatesVerified,
    /// PREPARE accepted.
    Prepared,
}

impl PacStage {
    /// Status reported to the coordinator.
    pub fn status(&self) -> ShardTxStatus {
        match self {
            Self::Proposed | Self::CertificatesVerified => ShardTxStatus::Proposed,
            Self::Prepared => ShardTxStatus::Prepared,
        }
    }
}

/// Shard-side record of an in-flight PAC transaction.
#[derive(Clone, Debug)]
pub struct PendingTransaction {
    /// Global transaction.
    pub global_id: GlobalTxId,
    /// Id this shard issued at PROPOSE.
    pub local_tx_id: LocalTxId,
    /// Proposed operation.
    pub operation: String,
    /// Proposed arguments.
    pub args: Vec<String>,
    /// Tentative read/write set.
    pub rw_set: RwSet,
    /// Operation result computed at PROPOSE.
    pub payload: Vec<u8>,
    /// Certificate issued at PROPOSE.
    pub certificate: HashPair,
    /// Certificates of the other participants, learnt at SPREAD.
    pub peer_certificates: BTreeMap<ShardId, HashPair>,
    /// Where the transaction stands.
    pub stage: PacStage,
}
