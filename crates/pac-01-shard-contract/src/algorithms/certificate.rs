//! # Certificate Computation
//!
//! A certificate is a pair of SHA-256 digests over a read/write set:
//!
//! - write digest: sorted `(key, new value | delete marker)`
//! - read digest: sorted `(key, committed version | absent marker)`
//!
//! Every field is length-prefixed so no two different sets share an
//! encoding. The same set always yields the same certificate, byte for byte.

use crate::domain::RwSet;
use sha2::{Digest, Sha256};
use shared_types::{Hash, HashPair};

const ABSENT: u8 = 0;
const PRESENT: u8 = 1;

/// Compute the certificate of a read/write set.
pub fn compute_certificate(rw_set: &RwSet) -> HashPair {
    HashPair::new(write_set_digest(rw_set), read_set_digest(rw_set))
}

/// Digest of the write set.
pub fn write_set_digest(rw_set: &RwSet) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((rw_set.writes.len() as u64).to_be_bytes());
    for (key, value) in &rw_set.writes {
        update_bytes(&mut hasher, key.as_bytes());
        match value {
            Some(value) => {
                hasher.update([PRESENT]);
                update_bytes(&mut hasher, value);
            }
            None => hasher.update([ABSENT]),
        }
    }
    hasher.finalize().into()
}

/// Digest of the read set.
pub fn read_set_digest(rw_set: &RwSet) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update((rw_set.reads.len() as u64).to_be_bytes());
    for (key, version) in &rw_set.reads {
        update_bytes(&mut hasher, key.as_bytes());
        match version {
            Some(version) => {
                hasher.update([PRESENT]);
                hasher.update(version.to_be_bytes());
            }
            None => hasher.update([ABSENT]),
        }
    }
    hasher.finalize().into()
}

fn update_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
