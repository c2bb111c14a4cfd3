//! # Domain Value Objects
//!
//! Immutable results of simulating a contract operation.

use serde::{Deserialize, Serialize};
use shared_types::{HashPair, LocalTxId};
use std::collections::BTreeMap;

/// Read/write set produced by simulating one operation.
///
/// Reads record the committed version observed (`None` = key absent).
/// Writes record the new value (`None` = delete). Both are ordered by key,
/// which is what makes certificates deterministic. Ranges record every
/// `[start, end)` scan; a key inserted into a scanned range later changes
/// neither digest.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RwSet {
    /// Key -> version read.
    pub reads: BTreeMap<String, Option<u64>>,
    /// Key -> value written.
    pub writes: BTreeMap<String, Option<Vec<u8>>>,
    /// Scanned key ranges.
    #[serde(default)]
    pub ranges: Vec<(String, String)>,
}

impl RwSet {
    /// Keys the set would write.
    pub fn write_keys(&self) -> impl Iterator<Item = &str> {
        self.writes.keys().map(String::as_str)
    }

    /// Every key read or written, sorted and without repeats.
    pub fn touched_keys(&self) -> impl Iterator<Item = &str> + Clone {
        let mut keys: Vec<&str> = self
            .reads
            .keys()
            .chain(self.writes.keys())
            .map(String::as_str)
            .collect();
        keys.sort_unstable();
        keys.dedup();
        keys.into_iter()
    }

    /// Did the operation scan a key range?
    pub fn has_range_reads(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// True when the operation writes nothing.
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }
}

/// What a shard hands back from a successful PROPOSE.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProposalReceipt {
    /// Certificate over the tentative read/write set.
    pub certificate: HashPair,
    /// Shard-local transaction id.
    pub local_tx_id: LocalTxId,
    /// Operation result as it would be returned on commit.
    pub payload: Vec<u8>,
}

/// Result of a phase call on the shard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// PROPOSE accepted.
    Proposed(ProposalReceipt),
    /// Certificates checked and stored.
    CertificatesAccepted,
    /// PREPARE accepted; carries the recomputed certificate.
    Prepared(HashPair),
    /// Write applied, locks released; carries the operation result.
    Decided(Vec<u8>),
    /// Locks released; `false` when the abort was a repeat no-op.
    Aborted {
        /// Did this call release anything?
        released: bool,
    },
}
