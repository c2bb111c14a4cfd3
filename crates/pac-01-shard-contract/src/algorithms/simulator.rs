//! # Transaction Simulator
//!
//! Executes a contract operation against a read-only view of the world state,
//! recording the versions it read and buffering the values it wrote. Nothing
//! reaches the world state until the ledger applies the resulting [`RwSet`].

use crate::domain::{RwSet, WorldState};
use std::collections::BTreeMap;

/// Recording view over a [`WorldState`].
pub struct TxSimulator<'a> {
    state: &'a WorldState,
    reads: BTreeMap<String, Option<u64>>,
    writes: BTreeMap<String, Option<Vec<u8>>>,
    ranges: Vec<(String, String)>,
}

impl<'a> TxSimulator<'a> {
    /// Start a simulation over `state`.
    pub fn new(state: &'a WorldState) -> Self {
        Self {
            state,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
            ranges: Vec::new(),
        }
    }

    /// Read a key. Own buffered writes are visible; committed reads are
    /// recorded with their version.
    pub fn get_state(&mut self, key: &str) -> Option<Vec<u8>> {
        if let Some(buffered) = self.writes.get(key) {
            return buffered.clone();
        }
        let committed = self.state.get(key);
        self.reads
            .entry(key.to_string())
            .or_insert_with(|| committed.map(|v| v.version));
        committed.map(|v| v.value.clone())
    }

    /// Buffer a write.
    pub fn put_state(&mut self, key: &str, value: Vec<u8>) {
        self.writes.insert(key.to_string(), Some(value));
    }

    /// Buffer a delete.
    pub fn del_state(&mut self, key: &str) {
        self.writes.insert(key.to_string(), None);
    }

    /// Every key in `[start, end)` (empty bounds are open), merged with own
    /// buffered writes. Committed keys returned are recorded as reads and
    /// the bounds are recorded as a scanned range.
    pub fn range(&mut self, start: &str, end: &str) -> Vec<(String, Vec<u8>)> {
        self.ranges.push((start.to_string(), end.to_string()));
        let mut merged: BTreeMap<String, Vec<u8>> = BTreeMap::new();
        for (key, versioned) in self.state.range(start, end) {
            self.reads
                .entry(key.clone())
                .or_insert(Some(versioned.version));
            merged.insert(key.clone(), versioned.value.clone());
        }
        for (key, write) in &self.writes {
            let in_range =
                key.as_str() >= start && (end.is_empty() || key.as_str() < end);
            if !in_range {
                continue;
            }
            match write {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        merged.into_iter().collect()
    }

    /// Finish the simulation.
    pub fn into_rw_set(self) -> RwSet {
        RwSet {
            reads: self.reads,
            writes: self.writes,
            ranges: self.ranges,
        }
    }
}
