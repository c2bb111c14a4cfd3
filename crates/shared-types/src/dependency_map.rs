//! # Dependency Map
//!
//! Correlation payload handed to every shard on every phase of a global
//! transaction. It is a plain `string -> bytes` map so it survives any
//! transport; the protocol reserves the keys listed in [`keys`], everything
//! else is business metadata passed through untouched.
//!
//! A map is never mutated after it has been handed to a phase call. Each
//! `with_*` / `addressed_to` call derives a new map.

use crate::certificate::HashPair;
use crate::entities::{GlobalTxId, LocalTxId, ShardId};
use crate::errors::DependencyMapError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Reserved keys of the dependency map.
pub mod keys {
    /// Human-readable transaction label.
    pub const LABEL: &str = "pac";
    /// Global transaction id (UUID text).
    pub const GLOBAL_ID: &str = "pacid";
    /// Present (empty) once certificates have been spread.
    pub const CERTIFICATES_SPREAD: &str = "pacHP";
    /// Local tx id of the shard the map is addressed to.
    pub const OWN_TX_ID: &str = "pactxid";
    /// Prefix of every per-participant key.
    pub const PARTICIPANT_PREFIX: &str = "pacpart";

    /// Key holding the name of the `index`-th participant (1-based).
    pub fn participant(index: usize) -> String {
        format!("{PARTICIPANT_PREFIX}{index}")
    }

    /// Key holding the certificate of the `index`-th participant.
    pub fn participant_certificate(index: usize) -> String {
        format!("{PARTICIPANT_PREFIX}{index}HP")
    }

    /// Key holding the local tx id of the `index`-th participant.
    pub fn participant_tx_id(index: usize) -> String {
        format!("{PARTICIPANT_PREFIX}{index}txid")
    }

    /// Is `key` owned by the protocol?
    pub fn is_reserved(key: &str) -> bool {
        key == LABEL
            || key == GLOBAL_ID
            || key == CERTIFICATES_SPREAD
            || key == OWN_TX_ID
            || key.starts_with(PARTICIPANT_PREFIX)
    }
}

/// Per-transaction correlation data.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DependencyMap {
    entries: BTreeMap<String, Vec<u8>>,
}

impl DependencyMap {
    /// Build the PROPOSE-phase map naming the label, the global id and all
    /// participants.
    pub fn initial(
        label: &str,
        global_id: &GlobalTxId,
        participants: &[ShardId],
    ) -> Result<Self, DependencyMapError> {
        let mut seen = BTreeSet::new();
        let mut entries = BTreeMap::new();
        entries.insert(keys::LABEL.to_string(), label.as_bytes().to_vec());
        entries.insert(
            keys::GLOBAL_ID.to_string(),
            global_id.to_string().into_bytes(),
        );
        for (i, shard) in participants.iter().enumerate() {
            if !seen.insert(shard) {
                return Err(DependencyMapError::DuplicateParticipant(shard.clone()));
            }
            entries.insert(keys::participant(i + 1), shard.as_str().as_bytes().to_vec());
        }
        Ok(Self { entries })
    }

    /// Wrap raw entries received over the wire.
    pub fn from_entries(entries: BTreeMap<String, Vec<u8>>) -> Self {
        Self { entries }
    }

    /// Raw entries, for transport.
    pub fn entries(&self) -> &BTreeMap<String, Vec<u8>> {
        &self.entries
    }

    /// Raw value of any key.
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Derive a map with one extra business metadata entry.
    pub fn with_metadata(
        &self,
        key: &str,
        value: impl Into<Vec<u8>>,
    ) -> Result<Self, DependencyMapError> {
        if keys::is_reserved(key) {
            return Err(DependencyMapError::ReservedKey(key.to_string()));
        }
        let mut next = self.clone();
        next.entries.insert(key.to_string(), value.into());
        Ok(next)
    }

    /// Transaction label.
    pub fn label(&self) -> Result<String, DependencyMapError> {
        self.utf8(keys::LABEL)
    }

    /// Global transaction id.
    pub fn global_id(&self) -> Result<GlobalTxId, DependencyMapError> {
        let text = self.utf8(keys::GLOBAL_ID)?;
        text.parse()
            .map_err(|_| DependencyMapError::InvalidGlobalId(text))
    }

    /// Participating shards, in the order the coordinator listed them.
    pub fn participants(&self) -> Result<Vec<ShardId>, DependencyMapError> {
        let mut out = Vec::new();
        let mut index = 1;
        while self.entries.contains_key(&keys::participant(index)) {
            out.push(ShardId::new(self.utf8(&keys::participant(index))?));
            index += 1;
        }
        if out.is_empty() {
            return Err(DependencyMapError::MissingKey(keys::participant(1)));
        }
        Ok(out)
    }

    /// Is `shard` listed as a participant?
    pub fn is_participant(&self, shard: &ShardId) -> bool {
        self.index_of(shard).is_ok()
    }

    /// Derive a map carrying the given certificates and local tx ids, with the
    /// spread marker set.
    pub fn with_certificates(
        &self,
        certificates: &BTreeMap<ShardId, (HashPair, LocalTxId)>,
    ) -> Result<Self, DependencyMapError> {
        let mut next = self.clone();
        for (shard, (certificate, local_tx_id)) in certificates {
            let index = self.index_of(shard)?;
            next.entries.insert(
                keys::participant_certificate(index),
                certificate.to_bytes().to_vec(),
            );
            next.entries.insert(
                keys::participant_tx_id(index),
                local_tx_id.as_str().as_bytes().to_vec(),
            );
        }
        next.entries
            .insert(keys::CERTIFICATES_SPREAD.to_string(), Vec::new());
        Ok(next)
    }

    /// Has the coordinator spread certificates in this map?
    pub fn certificates_spread(&self) -> bool {
        self.entries.contains_key(keys::CERTIFICATES_SPREAD)
    }

    /// Certificate of one participant, if present.
    pub fn certificate_of(&self, shard: &ShardId) -> Result<Option<HashPair>, DependencyMapError> {
        let index = self.index_of(shard)?;
        match self.entries.get(&keys::participant_certificate(index)) {
            Some(bytes) => HashPair::from_bytes(bytes).map(Some).map_err(|source| {
                DependencyMapError::InvalidCertificate {
                    shard: shard.clone(),
                    source,
                }
            }),
            None => Ok(None),
        }
    }

    /// Every certificate present in the map.
    pub fn certificates(&self) -> Result<BTreeMap<ShardId, HashPair>, DependencyMapError> {
        let mut out = BTreeMap::new();
        for shard in self.participants()? {
            if let Some(certificate) = self.certificate_of(&shard)? {
                out.insert(shard, certificate);
            }
        }
        Ok(out)
    }

    /// Local tx id of one participant, if present.
    pub fn local_tx_id_of(&self, shard: &ShardId) -> Result<Option<LocalTxId>, DependencyMapError> {
        let index = self.index_of(shard)?;
        let key = keys::participant_tx_id(index);
        if self.entries.contains_key(&key) {
            Ok(Some(LocalTxId::new(self.utf8(&key)?)))
        } else {
            Ok(None)
        }
    }

    /// Derive the copy sent to one shard, carrying that shard's local tx id.
    pub fn addressed_to(&self, local_tx_id: &LocalTxId) -> Self {
        let mut next = self.clone();
        next.entries.insert(
            keys::OWN_TX_ID.to_string(),
            local_tx_id.as_str().as_bytes().to_vec(),
        );
        next
    }

    /// Local tx id of the shard the map is addressed to.
    pub fn own_local_tx_id(&self) -> Result<Option<LocalTxId>, DependencyMapError> {
        if self.entries.contains_key(keys::OWN_TX_ID) {
            Ok(Some(LocalTxId::new(self.utf8(keys::OWN_TX_ID)?)))
        } else {
            Ok(None)
        }
    }

    /// Business metadata entries (non-reserved keys).
    pub fn metadata(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries
            .iter()
            .filter(|(key, _)| !keys::is_reserved(key))
            .map(|(key, value)| (key.as_str(), value.as_slice()))
    }

    fn index_of(&self, shard: &ShardId) -> Result<usize, DependencyMapError> {
        let mut index = 1;
        while let Some(name) = self.entries.get(&keys::participant(index)) {
            if name.as_slice() == shard.as_str().as_bytes() {
                return Ok(index);
            }
            index += 1;
        }
        Err(DependencyMapError::UnknownParticipant(shard.clone()))
    }

    fn utf8(&self, key: &str) -> Result<String, DependencyMapError> {
        let bytes = self
            .entries
            .get(key)
            .ok_or_else(|| DependencyMapError::MissingKey(key.to_string()))?;
        String::from_utf8(bytes.clone()).map_err(|_| DependencyMapError::InvalidUtf8(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shards() -> Vec<ShardId> {
        vec![ShardId::from("mychannel1"), ShardId::from("mychannel2")]
    }

    fn initial() -> (GlobalTxId, DependencyMap) {
        let id = GlobalTxId::new();
        let map = DependencyMap::initial("Test attempt", &id, &shards()).unwrap();
        (id, map)
    }

    #[test]
    fn test_initial_map_uses_reserved_keys() {
        let (id, map) = initial();
        assert_eq!(map.get("pac"), Some("Test attempt".as_bytes()));
        assert_eq!(map.get("pacpart1"), Some("mychannel1".as_bytes()));
        assert_eq!(map.get("pacpart2"), Some("mychannel2".as_bytes()));
        assert_eq!(map.global_id().unwrap(), id);
        assert_eq!(map.participants().unwrap(), shards());
        assert!(!map.certificates_spread());
    }

    #[test]
    fn test_duplicate_participant_rejected() {
        let shard = ShardId::from("mychannel1");
        let err = DependencyMap::initial("x", &GlobalTxId::new(), &[shard.clone(), shard.clone()])
            .unwrap_err();
        assert_eq!(err, DependencyMapError::DuplicateParticipant(shard));
    }

    #[test]
    fn test_with_certificates_derives_new_map() {
        let (_, map) = initial();
        let mut certs = BTreeMap::new();
        certs.insert(
            ShardId::from("mychannel2"),
            (HashPair::new([2; 32], [3; 32]), LocalTxId::new("tx-b")),
        );
        let spread = map.with_certificates(&certs).unwrap();

        assert!(!map.certificates_spread());
        assert!(spread.certificates_spread());
        assert_eq!(spread.get("pacpart2HP").map(<[u8]>::len), Some(64));
        assert_eq!(
            spread.certificate_of(&ShardId::from("mychannel2")).unwrap(),
            Some(HashPair::new([2; 32], [3; 32]))
        );
        assert_eq!(spread.certificate_of(&ShardId::from("mychannel1")).unwrap(), None);
        assert_eq!(
            spread.local_tx_id_of(&ShardId::from("mychannel2")).unwrap(),
            Some(LocalTxId::new("tx-b"))
        );
    }

    #[test]
    fn test_certificate_for_non_participant_rejected() {
        let (_, map) = initial();
        let mut certs = BTreeMap::new();
        certs.insert(
            ShardId::from("elsewhere"),
            (HashPair::default(), LocalTxId::new("tx")),
        );
        assert!(matches!(
            map.with_certificates(&certs),
            Err(DependencyMapError::UnknownParticipant(_))
        ));
    }

    #[test]
    fn test_addressed_to_sets_own_tx_id() {
        let (_, map) = initial();
        assert_eq!(map.own_local_tx_id().unwrap(), None);
        let addressed = map.addressed_to(&LocalTxId::new("abc"));
        assert_eq!(addressed.own_local_tx_id().unwrap(), Some(LocalTxId::new("abc")));
    }

    #[test]
    fn test_metadata_passes_through_and_reserved_keys_are_refused() {
        let (_, map) = initial();
        let with_meta = map.with_metadata("desk", b"emea".to_vec()).unwrap();
        let meta: Vec<_> = with_meta.metadata().collect();
        assert_eq!(meta, vec![("desk", "emea".as_bytes())]);

        assert_eq!(
            map.with_metadata("pacpart9", b"x".to_vec()).unwrap_err(),
            DependencyMapError::ReservedKey("pacpart9".to_string())
        );
        assert!(map.with_metadata("pactxid", b"x".to_vec()).is_err());
    }

    #[test]
    fn test_missing_global_id() {
        let map = DependencyMap::from_entries(BTreeMap::new());
        assert_eq!(
            map.global_id().unwrap_err(),
            DependencyMapError::MissingKey("pacid".to_string())
        );
        assert!(map.participants().is_err());
    }

    #[test]
    fn test_malformed_certificate_entry() {
        let (_, map) = initial();
        let mut entries = map.entries().clone();
        entries.insert("pacpart1HP".to_string(), vec![1, 2, 3]);
        let broken = DependencyMap::from_entries(entries);
        assert!(matches!(
            broken.certificate_of(&ShardId::from("mychannel1")),
            Err(DependencyMapError::InvalidCertificate { .. })
        ));
    }
}
