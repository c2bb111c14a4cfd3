//! # Certificate (HashPair)
//!
//! A shard's hashed summary of what it is prepared to commit: one digest over
//! the write set and one over the read set (keys and the versions they were
//! read at).
//!
//! Wire form is a fixed 64 bytes, write digest first. Over text-safe channels
//! (the response message of an invocation) it is base64 wrapped.

use crate::entities::Hash;
use crate::errors::CertificateError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoded certificate length in bytes.
pub const CERTIFICATE_LEN: usize = 64;

/// Write-set and read-set digests of one shard for one transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct HashPair {
    /// Digest over `(key, new value | delete)` for every written key.
    pub write_set_digest: Hash,
    /// Digest over `(key, committed version | absent)` for every read key.
    pub read_set_digest: Hash,
}

impl HashPair {
    /// Create a certificate from its two digests.
    pub fn new(write_set_digest: Hash, read_set_digest: Hash) -> Self {
        Self {
            write_set_digest,
            read_set_digest,
        }
    }

    /// Fixed-size binary encoding.
    pub fn to_bytes(&self) -> [u8; CERTIFICATE_LEN] {
        let mut out = [0u8; CERTIFICATE_LEN];
        out[..32].copy_from_slice(&self.write_set_digest);
        out[32..].copy_from_slice(&self.read_set_digest);
        out
    }

    /// Decode the binary encoding.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CertificateError> {
        if bytes.len() != CERTIFICATE_LEN {
            return Err(CertificateError::InvalidLength {
                expected: CERTIFICATE_LEN,
                got: bytes.len(),
            });
        }
        let mut write_set_digest = [0u8; 32];
        let mut read_set_digest = [0u8; 32];
        write_set_digest.copy_from_slice(&bytes[..32]);
        read_set_digest.copy_from_slice(&bytes[32..]);
        Ok(Self::new(write_set_digest, read_set_digest))
    }

    /// Text-safe encoding.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    /// Decode the text-safe encoding.
    pub fn from_base64(text: &str) -> Result<Self, CertificateError> {
        let bytes = STANDARD
            .decode(text.trim())
            .map_err(|e| CertificateError::InvalidBase64(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for HashPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashPair")
            .field("write", &hex::encode(self.write_set_digest))
            .field("read", &hex::encode(self.read_set_digest))
            .finish()
    }
}

impl fmt::Display for HashPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "w:{}.. r:{}..",
            hex::encode(&self.write_set_digest[..4]),
            hex::encode(&self.read_set_digest[..4])
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashPair {
        HashPair::new([0xAB; 32], [0x01; 32])
    }

    #[test]
    fn test_bytes_layout_is_write_then_read() {
        let bytes = sample().to_bytes();
        assert_eq!(bytes.len(), CERTIFICATE_LEN);
        assert_eq!(bytes[0], 0xAB);
        assert_eq!(bytes[31], 0xAB);
        assert_eq!(bytes[32], 0x01);
    }

    #[test]
    fn test_base64_decodes_to_same_pair() {
        let text = sample().to_base64();
        assert_eq!(HashPair::from_base64(&text).unwrap(), sample());
    }

    #[test]
    fn test_short_bytes_rejected() {
        let err = HashPair::from_bytes(&[0u8; 10]).unwrap_err();
        assert_eq!(
            err,
            CertificateError::InvalidLength {
                expected: 64,
                got: 10
            }
        );
    }

    #[test]
    fn test_bad_base64_rejected() {
        assert!(matches!(
            HashPair::from_base64("%%%not base64%%%"),
            Err(CertificateError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_display_is_short() {
        assert_eq!(sample().to_string(), "w:abababab.. r:01010101..");
    }
}
