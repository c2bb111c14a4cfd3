//! # Shard Ledger Service
//!
//! Hosts one [`Contract`] over one shard's world state and implements the
//! [`ShardLedgerApi`] port.
//!
//! ## PAC bookkeeping
//!
//! | Phase | Requires | Effect |
//! |-------|----------|--------|
//! | PROPOSE | participant, not seen before, no range scan | lock every key read or written, issue certificate |
//! | SPREAD_CERTIFICATES | proposed, matching `pactxid` | store peer certificates |
//! | PREPARE | certificates spread | recompute certificate, confirm locks, mark prepared |
//! | DECIDE | prepared | apply write set, release locks |
//! | ABORT | not committed | drop write set, release locks |
//!
//! All state sits behind one `parking_lot::RwLock`, so every call is atomic
//! with respect to every other call on the same shard. Read keys are locked
//! like written ones, so nothing a prepared transaction depends on can change
//! before DECIDE.
//!
//! Terminal outcomes are kept until [`ShardLedger::forget`] drops them; pruning
//! is left to whoever reconciles finished transactions.

use crate::algorithms::{compute_certificate, LockTable, TxSimulator};
use crate::domain::{
    ContractError, PacStage, PendingTransaction, ProposalReceipt, RwSet, WorldState,
};
use crate::ports::{Contract, ShardLedgerApi};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DependencyMap, GlobalTxId, HashPair, LocalTxId, PacPhase, ShardId, ShardTxStatus,
};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// Mutable state of one shard.
#[derive(Default)]
struct LedgerState {
    world: WorldState,
    locks: LockTable,
    pending: HashMap<GlobalTxId, PendingTransaction>,
    /// Terminal outcomes, kept so repeated or late phase calls are answered
    /// deterministically. Grows until `forget` is called.
    finished: HashMap<GlobalTxId, ShardTxStatus>,
    sequence: u64,
}

/// One shard's ledger.
pub struct ShardLedger<C: Contract> {
    shard_id: ShardId,
    contract: C,
    state: RwLock<LedgerState>,
}

impl<C: Contract> ShardLedger<C> {
    /// Create a ledger with empty state.
    pub fn new(shard_id: ShardId, contract: C) -> Self {
        info!(
            "[pac-01] Shard {} hosting contract {}",
            shard_id,
            contract.name()
        );
        Self {
            shard_id,
            contract,
            state: RwLock::new(LedgerState::default()),
        }
    }

    /// The hosted contract.
    pub fn contract(&self) -> &C {
        &self.contract
    }

    /// Committed version of `key`.
    pub fn version_of(&self, key: &str) -> Option<u64> {
        self.state.read().world.version(key)
    }

    /// Drop the terminal record of a finished transaction.
    ///
    /// Returns `false` when the transaction is unknown or still in flight.
    /// Once forgotten, a late PROPOSE for the id is no longer refused, so
    /// only call this for transactions whose coordinator has finished.
    pub fn forget(&self, global_id: &GlobalTxId) -> bool {
        let mut state = self.state.write();
        let forgotten = state.finished.remove(global_id).is_some();
        if forgotten {
            debug!("[pac-01] {} forgot {}", self.shard_id, global_id);
        }
        forgotten
    }

    /// Number of terminal records kept.
    pub fn finished_len(&self) -> usize {
        self.state.read().finished.len()
    }

    /// Number of PAC transactions currently holding locks.
    pub fn in_flight(&self) -> usize {
        self.state.read().pending.len()
    }

    fn simulate(
        &self,
        world: &WorldState,
        operation: &str,
        args: &[String],
    ) -> Result<(Vec<u8>, RwSet), ContractError> {
        let mut sim = TxSimulator::new(world);
        let payload = self.contract.execute(&mut sim, operation, args)?;
        Ok((payload, sim.into_rw_set()))
    }

    fn check_participant(&self, map: &DependencyMap) -> Result<(), ContractError> {
        if map.is_participant(&self.shard_id) {
            Ok(())
        } else {
            Err(ContractError::NotParticipant(self.shard_id.clone()))
        }
    }
}

/// Find the pending record a SPREAD/PREPARE/DECIDE call refers to and check
/// that the call matches what was proposed.
fn pending_for<'s>(
    pending: &'s mut HashMap<GlobalTxId, PendingTransaction>,
    finished: &HashMap<GlobalTxId, ShardTxStatus>,
    global_id: &GlobalTxId,
    phase: PacPhase,
    operation: &str,
    args: &[String],
    map: &DependencyMap,
) -> Result<&'s mut PendingTransaction, ContractError> {
    if let Some(status) = finished.get(global_id) {
        return Err(ContractError::PhaseOrder {
            tx: *global_id,
            phase,
            status: *status,
        });
    }
    let tx = pending
        .get_mut(global_id)
        .ok_or(ContractError::UnknownTransaction(*global_id))?;

    let carried = map.own_local_tx_id()?;
    if carried.as_ref() != Some(&tx.local_tx_id) {
        return Err(ContractError::LocalTxIdMismatch {
            issued: tx.local_tx_id.clone(),
            got: carried,
        });
    }
    if tx.operation != operation || tx.args != args {
        return Err(ContractError::OperationMismatch {
            tx: *global_id,
            proposed: tx.operation.clone(),
            got: operation.to_string(),
        });
    }
    Ok(tx)
}

#[async_trait]
impl<C: Contract> ShardLedgerApi for ShardLedger<C> {
    fn shard_id(&self) -> &ShardId {
        &self.shard_id
    }

    async fn submit(&self, operation: &str, args: &[String]) -> Result<Vec<u8>, ContractError> {
        let mut state = self.state.write();
        let (payload, rw_set) = self.simulate(&state.world, operation, args)?;
        state.locks.check_unlocked(rw_set.write_keys())?;
        state.world.apply(&rw_set);
        debug!(
            "[pac-01] {} committed {} ({} writes)",
            self.shard_id,
            operation,
            rw_set.writes.len()
        );
        Ok(payload)
    }

    async fn evaluate(
        &self,
        operation: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        let state = self.state.read();
        let (payload, _) = self.simulate(&state.world, operation, args)?;
        Ok(payload)
    }

    async fn propose(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<ProposalReceipt, ContractError> {
        let global_id = map.global_id()?;
        self.check_participant(map)?;

        let mut state = self.state.write();
        if state.pending.contains_key(&global_id) || state.finished.contains_key(&global_id) {
            return Err(ContractError::DuplicateProposal(global_id));
        }

        let (payload, rw_set) = self.simulate(&state.world, operation, args)?;
        if rw_set.has_range_reads() {
            return Err(ContractError::RangeRead(operation.to_string()));
        }
        let touched: Vec<&str> = rw_set.touched_keys().collect();
        state.locks.acquire(touched.iter().copied(), &global_id)?;

        let certificate = compute_certificate(&rw_set);
        state.sequence += 1;
        let local_tx_id = LocalTxId::derive(&self.shard_id, &global_id, state.sequence);

        info!(
            "[pac-01] {} PROPOSE {} for {}: locked {} keys, certificate {}",
            self.shard_id,
            operation,
            global_id,
            touched.len(),
            certificate
        );

        state.pending.insert(
            global_id,
            PendingTransaction {
                global_id,
                local_tx_id: local_tx_id.clone(),
                operation: operation.to_string(),
                args: args.to_vec(),
                rw_set,
                payload: payload.clone(),
                certificate,
                peer_certificates: BTreeMap::new(),
                stage: PacStage::Proposed,
            },
        );

        Ok(ProposalReceipt {
            certificate,
            local_tx_id,
            payload,
        })
    }

    async fn spread_certificates(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<(), ContractError> {
        let global_id = map.global_id()?;
        let mut guard = self.state.write();
        let LedgerState {
            pending, finished, ..
        } = &mut *guard;
        let tx = pending_for(
            pending,
            finished,
            &global_id,
            PacPhase::SpreadCertificates,
            operation,
            args,
            map,
        )?;

        if tx.stage == PacStage::Prepared {
            return Err(ContractError::PhaseOrder {
                tx: global_id,
                phase: PacPhase::SpreadCertificates,
                status: ShardTxStatus::Prepared,
            });
        }

        let mut peers = BTreeMap::new();
        for participant in map.participants()? {
            let carried = map
                .certificate_of(&participant)?
                .ok_or_else(|| ContractError::MissingCertificate(participant.clone()))?;
            if participant == self.shard_id {
                if carried != tx.certificate {
                    return Err(ContractError::ForeignCertificate {
                        shard: participant,
                        issued: tx.certificate,
                        carried,
                    });
                }
                continue;
            }
            if let Some(known) = tx.peer_certificates.get(&participant) {
                if *known != carried {
                    return Err(ContractError::ForeignCertificate {
                        shard: participant,
                        issued: *known,
                        carried,
                    });
                }
            }
            peers.insert(participant, carried);
        }

        debug!(
            "[pac-01] {} SPREAD_CERTIFICATES for {}: {} peer certificates",
            self.shard_id,
            global_id,
            peers.len()
        );
        tx.peer_certificates = peers;
        tx.stage = PacStage::CertificatesVerified;
        Ok(())
    }

    async fn prepare(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<HashPair, ContractError> {
        let global_id = map.global_id()?;
        let mut guard = self.state.write();
        let LedgerState {
            world,
            locks,
            pending,
            finished,
            ..
        } = &mut *guard;
        let tx = pending_for(
            pending,
            finished,
            &global_id,
            PacPhase::Prepare,
            operation,
            args,
            map,
        )?;

        match tx.stage {
            PacStage::Prepared => {
                warn!(
                    "[pac-01] {} refusing repeated PREPARE for {}",
                    self.shard_id, global_id
                );
                return Err(ContractError::AlreadyPrepared(global_id));
            }
            PacStage::Proposed => {
                return Err(ContractError::PhaseOrder {
                    tx: global_id,
                    phase: PacPhase::Prepare,
                    status: ShardTxStatus::Proposed,
                });
            }
            PacStage::CertificatesVerified => {}
        }

        match map.certificate_of(&self.shard_id)? {
            Some(carried) if carried == tx.certificate => {}
            Some(carried) => {
                return Err(ContractError::ForeignCertificate {
                    shard: self.shard_id.clone(),
                    issued: tx.certificate,
                    carried,
                });
            }
            None => return Err(ContractError::MissingCertificate(self.shard_id.clone())),
        }

        let (_, rw_set) = self.simulate(world, operation, args)?;
        let recomputed = compute_certificate(&rw_set);
        if recomputed != tx.certificate {
            warn!(
                "[pac-01] {} certificate mismatch for {}: issued {}, recomputed {}",
                self.shard_id, global_id, tx.certificate, recomputed
            );
            return Err(ContractError::CertificateMismatch {
                issued: tx.certificate,
                recomputed,
            });
        }

        locks.acquire(tx.rw_set.touched_keys(), &global_id)?;

        tx.stage = PacStage::Prepared;
        info!(
            "[pac-01] {} PREPARE {} for {}: certificate confirmed",
            self.shard_id, operation, global_id
        );
        Ok(recomputed)
    }

    async fn decide(
        &self,
        operation: &str,
        args: &[String],
        map: &DependencyMap,
    ) -> Result<Vec<u8>, ContractError> {
        let global_id = map.global_id()?;
        let mut guard = self.state.write();

        match guard.finished.get(&global_id) {
            Some(ShardTxStatus::Committed) => {
                debug!(
                    "[pac-01] {} DECIDE for {} already applied",
                    self.shard_id, global_id
                );
                return Ok(Vec::new());
            }
            Some(status) => {
                return Err(ContractError::DecisionConflict {
                    tx: global_id,
                    status: *status,
                });
            }
            None => {}
        }

        let LedgerState {
            world,
            locks,
            pending,
            finished,
            ..
        } = &mut *guard;
        let tx = pending_for(
            pending,
            finished,
            &global_id,
            PacPhase::Decide,
            operation,
            args,
            map,
        )?;
        if tx.stage != PacStage::Prepared {
            return Err(ContractError::PhaseOrder {
                tx: global_id,
                phase: PacPhase::Decide,
                status: tx.stage.status(),
            });
        }

        locks.check(tx.rw_set.touched_keys(), &global_id)?;
        world.check_reads(&tx.rw_set)?;

        world.apply(&tx.rw_set);
        let released = locks.release_all(&global_id);
        let payload = std::mem::take(&mut tx.payload);
        pending.remove(&global_id);
        finished.insert(global_id, ShardTxStatus::Committed);

        info!(
            "[pac-01] {} DECIDE {} for {}: applied, released {} locks",
            self.shard_id, operation, global_id, released
        );
        Ok(payload)
    }

    async fn abort(&self, map: &DependencyMap) -> Result<bool, ContractError> {
        let global_id = map.global_id()?;
        let mut guard = self.state.write();

        match guard.finished.get(&global_id) {
            Some(ShardTxStatus::Aborted) => {
                debug!(
                    "[pac-01] {} ABORT for {} already done",
                    self.shard_id, global_id
                );
                return Ok(false);
            }
            Some(status) => {
                return Err(ContractError::DecisionConflict {
                    tx: global_id,
                    status: *status,
                });
            }
            None => {}
        }

        let LedgerState {
            locks,
            pending,
            finished,
            ..
        } = &mut *guard;

        let released = match pending.get(&global_id) {
            Some(tx) => {
                let carried = map.own_local_tx_id()?;
                if let Some(carried) = carried {
                    if carried != tx.local_tx_id {
                        return Err(ContractError::LocalTxIdMismatch {
                            issued: tx.local_tx_id.clone(),
                            got: Some(carried),
                        });
                    }
                }
                pending.remove(&global_id);
                locks.release_all(&global_id);
                true
            }
            None => false,
        };
        // An unknown transaction is remembered as aborted so a late PROPOSE
        // cannot lock anything for it.
        finished.insert(global_id, ShardTxStatus::Aborted);

        info!(
            "[pac-01] {} ABORT for {}: released={}",
            self.shard_id, global_id, released
        );
        Ok(released)
    }

    fn transaction_status(&self, global_id: &GlobalTxId) -> ShardTxStatus {
        let state = self.state.read();
        if let Some(tx) = state.pending.get(global_id) {
            return tx.stage.status();
        }
        state
            .finished
            .get(global_id)
            .copied()
            .unwrap_or(ShardTxStatus::Unknown)
    }

    fn locked_keys(&self) -> BTreeMap<String, GlobalTxId> {
        self.state.read().locks.snapshot()
    }
}
