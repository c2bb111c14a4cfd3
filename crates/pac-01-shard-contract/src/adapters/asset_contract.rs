//! Asset contract: coloured, sized, owned, appraised assets.

use super::codec::{decode, encode, exists, expect_args, read_object, write_object};
use crate::algorithms::TxSimulator;
use crate::domain::{Asset, ContractError};
use crate::ports::Contract;

const KIND: &str = "asset";

/// Asset contract.
///
/// Operations: `InitLedger`, `CreateAsset`, `ReadAsset`, `UpdateAsset`,
/// `DeleteAsset`, `AssetExists`, `TransferAsset`, `GetAllAssets`.
#[derive(Clone, Copy, Debug, Default)]
pub struct AssetContract;

impl AssetContract {
    /// Assets written by `InitLedger`.
    pub fn seed() -> Vec<Asset> {
        [
            ("asset1", "blue", 5, "Tomoko", 300),
            ("asset2", "red", 5, "Brad", 400),
            ("asset3", "green", 10, "Jin Soo", 500),
            ("asset4", "yellow", 10, "Max", 600),
            ("asset5", "black", 15, "Adriana", 700),
            ("asset6", "white", 15, "Michel", 800),
        ]
        .into_iter()
        .map(|(id, color, size, owner, value)| Asset {
            id: id.to_string(),
            color: color.to_string(),
            size,
            owner: owner.to_string(),
            appraised_value: value,
        })
        .collect()
    }

    fn parse_asset(args: &[String]) -> Result<Asset, ContractError> {
        Ok(Asset {
            id: args[0].clone(),
            color: args[1].clone(),
            size: parse_int("size", &args[2])?,
            owner: args[3].clone(),
            appraised_value: parse_int("appraisedValue", &args[4])?,
        })
    }
}

fn parse_int(field: &str, value: &str) -> Result<i64, ContractError> {
    value
        .parse()
        .map_err(|_| ContractError::InvalidArgument(format!("{field} must be an integer: {value}")))
}

impl Contract for AssetContract {
    fn name(&self) -> &'static str {
        "asset-transfer"
    }

    fn execute(
        &self,
        sim: &mut TxSimulator<'_>,
        operation: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        match operation {
            "InitLedger" => {
                expect_args(operation, args, 0)?;
                for asset in Self::seed() {
                    write_object(sim, &asset.id, &asset)?;
                }
                Ok(Vec::new())
            }
            "CreateAsset" => {
                expect_args(operation, args, 5)?;
                if exists(sim, &args[0]) {
                    return Err(ContractError::AlreadyExists {
                        kind: KIND,
                        id: args[0].clone(),
                    });
                }
                let asset = Self::parse_asset(args)?;
                write_object(sim, &asset.id, &asset)?;
                Ok(Vec::new())
            }
            "ReadAsset" => {
                expect_args(operation, args, 1)?;
                let asset: Asset = read_object(sim, KIND, &args[0])?;
                encode(&args[0], &asset)
            }
            "UpdateAsset" => {
                expect_args(operation, args, 5)?;
                if !exists(sim, &args[0]) {
                    return Err(ContractError::NotFound {
                        kind: KIND,
                        id: args[0].clone(),
                    });
                }
                let asset = Self::parse_asset(args)?;
                write_object(sim, &asset.id, &asset)?;
                Ok(Vec::new())
            }
            "DeleteAsset" => {
                expect_args(operation, args, 1)?;
                if !exists(sim, &args[0]) {
                    return Err(ContractError::NotFound {
                        kind: KIND,
                        id: args[0].clone(),
                    });
                }
                sim.del_state(&args[0]);
                Ok(Vec::new())
            }
            "AssetExists" => {
                expect_args(operation, args, 1)?;
                let found = exists(sim, &args[0]);
                encode(&args[0], &found)
            }
            "TransferAsset" => {
                expect_args(operation, args, 2)?;
                let mut asset: Asset = read_object(sim, KIND, &args[0])?;
                let old_owner = std::mem::replace(&mut asset.owner, args[1].clone());
                write_object(sim, &asset.id, &asset)?;
                Ok(old_owner.into_bytes())
            }
            "GetAllAssets" => {
                expect_args(operation, args, 0)?;
                let assets = sim
                    .range("", "")
                    .into_iter()
                    .map(|(key, bytes)| decode::<Asset>(&key, &bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                encode("", &assets)
            }
            other => Err(ContractError::UnknownOperation(other.to_string())),
        }
    }
}
