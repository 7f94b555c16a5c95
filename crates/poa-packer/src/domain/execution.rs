//! Transaction execution without a virtual machine.
//!
//! 1. The origin prepays `gas * gas_price`; failure rejects the transaction.
//! 2. Clauses move value in order under an inner checkpoint. If any clause
//!    cannot be funded, every clause is rolled back and the receipt is
//!    marked reverted. The transaction is still included.
//! 3. Unused gas is refunded and the beneficiary is credited its share of
//!    the fee.

use crate::error::AdoptionError;
use poa_state::{State, StateError};
use shared_crypto::Blake3Hasher;
use shared_types::constants::{BASE_GAS_PRICE, REWARD_PERCENT};
use shared_types::{Address, Hash, Receipt, Transaction};

/// Address credited by a contract-creation clause.
pub fn created_address(tx_id: &Hash, clause_index: usize) -> Address {
    let mut hasher = Blake3Hasher::new();
    hasher
        .update(tx_id)
        .update(&(clause_index as u32).to_be_bytes());
    let hash = hasher.finalize();
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    address
}

/// Execute `tx` against `state`.
///
/// On `Err` the caller must revert to a checkpoint taken before the call;
/// partial prepayment may have been applied.
pub fn execute(
    state: &mut State,
    tx: &Transaction,
    tx_id: &Hash,
    origin: Address,
    intrinsic_gas: u64,
    beneficiary: Address,
) -> Result<Receipt, AdoptionError> {
    let price = tx.gas_price(BASE_GAS_PRICE);
    let prepaid = u128::from(tx.gas) * price;

    state.sub_balance(origin, prepaid).map_err(|err| match err {
        StateError::InsufficientBalance {
            required,
            available,
            ..
        } => AdoptionError::InsufficientFunds {
            required,
            available,
        },
        other => AdoptionError::State(other),
    })?;

    let clauses_checkpoint = state.checkpoint();
    let mut reverted = false;
    for (index, clause) in tx.clauses.iter().enumerate() {
        let to = clause
            .to
            .unwrap_or_else(|| created_address(tx_id, index));
        let moved = state
            .sub_balance(origin, clause.value)
            .and_then(|_| state.add_balance(to, clause.value));
        if moved.is_err() {
            state.revert_to(clauses_checkpoint)?;
            reverted = true;
            break;
        }
    }

    let gas_used = intrinsic_gas;
    let refund = u128::from(tx.gas - gas_used) * price;
    state.add_balance(origin, refund)?;

    let paid = u128::from(gas_used) * price;
    let reward = paid * REWARD_PERCENT / 100;
    state.add_balance(beneficiary, reward)?;

    Ok(Receipt {
        gas_used,
        gas_payer: origin,
        paid,
        reward,
        reverted,
    })
}
