//! In-memory transaction log.

use crate::ports::{LogEntry, LogEvent, TransactionLog};
use parking_lot::RwLock;
use shared_types::GlobalTxId;
use std::collections::BTreeSet;

/// Transaction log kept in process memory.
#[derive(Default)]
pub struct InMemoryTransactionLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryTransactionLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry, oldest first.
    pub fn all(&self) -> Vec<LogEntry> {
        self.entries.read().clone()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl TransactionLog for InMemoryTransactionLog {
    fn record(&self, entry: LogEntry) {
        self.entries.write().push(entry);
    }

    fn entries(&self, tx: &GlobalTxId) -> Vec<LogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|entry| entry.tx_id == *tx)
            .cloned()
            .collect()
    }

    fn undecided(&self) -> Vec<GlobalTxId> {
        let entries = self.entries.read();
        let decided: BTreeSet<GlobalTxId> = entries
            .iter()
            .filter(|e| matches!(e.event, LogEvent::Decided(_)))
            .map(|e| e.tx_id)
            .collect();
        let mut seen = BTreeSet::new();
        entries
            .iter()
            .filter(|e| matches!(e.event, LogEvent::Begun { .. }))
            .map(|e| e.tx_id)
            .filter(|id| !decided.contains(id) && seen.insert(*id))
            .collect()
    }
}
