//! Account contract: owned accounts with exact decimal balances.

use super::codec::{decode, encode, exists, expect_args, read_object, write_object};
use crate::algorithms::TxSimulator;
use crate::domain::{invariant_non_negative_balance, Account, ContractError};
use crate::ports::Contract;
use rust_decimal::Decimal;
use std::str::FromStr;

const KIND: &str = "account";

/// Account contract.
///
/// Operations: `InitLedger`, `CreateAccount`, `ReadAccount`,
/// `UpdateAccount`, `DeleteAccount`, `AccountExists`, `Transfer`,
/// `GetAllAccounts`. No operation ever stores a negative balance.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccountContract;

impl AccountContract {
    /// Accounts written by `InitLedger`.
    pub fn seed() -> Vec<Account> {
        [
            ("account1", "Alice", Decimal::new(3087, 2)),
            ("account2", "Bob", Decimal::new(43, 1)),
            ("account3", "Carol", Decimal::new(10, 0)),
            ("account4", "Max", Decimal::new(6192, 3)),
            ("account5", "Adriana", Decimal::new(7, 0)),
            ("account6", "Michel", Decimal::new(1, 0)),
        ]
        .into_iter()
        .map(|(id, owner, balance)| Account {
            id: id.to_string(),
            owner: owner.to_string(),
            balance,
        })
        .collect()
    }

    fn store(sim: &mut TxSimulator<'_>, account: &Account) -> Result<(), ContractError> {
        invariant_non_negative_balance(&account.id, account.balance)?;
        write_object(sim, &account.id, account)
    }
}

fn parse_amount(value: &str) -> Result<Decimal, ContractError> {
    Decimal::from_str(value.trim())
        .map_err(|_| ContractError::InvalidArgument(format!("not a decimal amount: {value}")))
}

impl Contract for AccountContract {
    fn name(&self) -> &'static str {
        "value-transfer"
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
                for account in Self::seed() {
                    Self::store(sim, &account)?;
                }
                Ok(Vec::new())
            }
            "CreateAccount" => {
                expect_args(operation, args, 3)?;
                if exists(sim, &args[0]) {
                    return Err(ContractError::AlreadyExists {
                        kind: KIND,
                        id: args[0].clone(),
                    });
                }
                let account = Account {
                    id: args[0].clone(),
                    owner: args[1].clone(),
                    balance: parse_amount(&args[2])?,
                };
                Self::store(sim, &account)?;
                Ok(Vec::new())
            }
            "ReadAccount" => {
                expect_args(operation, args, 1)?;
                let account: Account = read_object(sim, KIND, &args[0])?;
                encode(&args[0], &account)
            }
            "UpdateAccount" => {
                expect_args(operation, args, 3)?;
                if !exists(sim, &args[0]) {
                    return Err(ContractError::NotFound {
                        kind: KIND,
                        id: args[0].clone(),
                    });
                }
                let account = Account {
                    id: args[0].clone(),
                    owner: args[1].clone(),
                    balance: parse_amount(&args[2])?,
                };
                Self::store(sim, &account)?;
                Ok(Vec::new())
            }
            "DeleteAccount" => {
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
            "AccountExists" => {
                expect_args(operation, args, 1)?;
                let found = exists(sim, &args[0]);
                encode(&args[0], &found)
            }
            "Transfer" => {
                expect_args(operation, args, 3)?;
                let value = parse_amount(&args[2])?;
                if value.is_sign_negative() && !value.is_zero() {
                    return Err(ContractError::InvalidArgument(format!(
                        "transfer value must not be negative: {value}"
                    )));
                }

                let mut from: Account = read_object(sim, KIND, &args[0])?;
                if from.balance < value {
                    return Err(ContractError::InsufficientBalance {
                        id: from.id,
                        balance: from.balance,
                        requested: value,
                    });
                }
                from.balance -= value;
                Self::store(sim, &from)?;

                // Read after the debit so a self-transfer nets to zero.
                let mut to: Account = read_object(sim, KIND, &args[1])?;
                to.balance += value;
                Self::store(sim, &to)?;
                Ok(Vec::new())
            }
            "GetAllAccounts" => {
                expect_args(operation, args, 0)?;
                let accounts = sim
                    .range("", "")
                    .into_iter()
                    .map(|(key, bytes)| decode::<Account>(&key, &bytes))
                    .collect::<Result<Vec<_>, _>>()?;
                encode("", &accounts)
            }
            other => Err(ContractError::UnknownOperation(other.to_string())),
        }
    }
}
