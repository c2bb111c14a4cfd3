//! JSON helpers shared by the contracts.

use crate::algorithms::TxSimulator;
use crate::domain::ContractError;
use serde::de::DeserializeOwned;
use serde::Serialize;

pub(crate) fn expect_args(
    operation: &str,
    args: &[String],
    expected: usize,
) -> Result<(), ContractError> {
    if args.len() != expected {
        return Err(ContractError::ArgumentCount {
            operation: operation.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

pub(crate) fn read_object<T: DeserializeOwned>(
    sim: &mut TxSimulator<'_>,
    kind: &'static str,
    id: &str,
) -> Result<T, ContractError> {
    let bytes = sim.get_state(id).ok_or_else(|| ContractError::NotFound {
        kind,
        id: id.to_string(),
    })?;
    decode(id, &bytes)
}

pub(crate) fn decode<T: DeserializeOwned>(key: &str, bytes: &[u8]) -> Result<T, ContractError> {
    serde_json::from_slice(bytes).map_err(|e| ContractError::CorruptState {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn write_object<T: Serialize>(
    sim: &mut TxSimulator<'_>,
    id: &str,
    object: &T,
) -> Result<(), ContractError> {
    let bytes = encode(id, object)?;
    sim.put_state(id, bytes);
    Ok(())
}

pub(crate) fn encode<T: Serialize + ?Sized>(key: &str, object: &T) -> Result<Vec<u8>, ContractError> {
    serde_json::to_vec(object).map_err(|e| ContractError::CorruptState {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn exists(sim: &mut TxSimulator<'_>, id: &str) -> bool {
    sim.get_state(id).is_some()
}
