use crate::gas::intrinsic_gas;
use fork_config::ForkConfig;
use primitive_types::U256;
use primitives::{Address, Transaction, ValidationError};
use state::State;
use trie::KvStore;

/// Pre-execution checks a transaction must pass before the interpreter
/// ever runs (spec §4.5 step 2). Each failure is independent of the
/// others: the first one found is returned, since later checks may not
/// even be meaningful (e.g. a missing sender has no nonce to compare).
pub fn validate<S: KvStore + Clone>(
    state: &State<S>,
    sender: Address,
    tx: &Transaction,
    fork: &ForkConfig,
    block_gas_limit: u64,
    block_gas_used: u64,
) -> Result<(), ValidationError> {
    let account = state
        .get_account(sender)
        .ok()
        .flatten()
        .ok_or(ValidationError::MissingAccount(sender))?;

    if account.nonce != tx.nonce {
        return Err(ValidationError::NonceMismatch { account: account.nonce, transaction: tx.nonce });
    }

    let required = intrinsic_gas(tx, fork);
    if tx.gas_limit < required {
        return Err(ValidationError::InsufficientIntrinsicGas { required, limit: tx.gas_limit });
    }

    let upfront_cost = U256::from(tx.gas_limit)
        .saturating_mul(tx.gas_price)
        .saturating_add(tx.value);
    if account.balance < upfront_cost {
        return Err(ValidationError::InsufficientBalance {
            balance: account.balance.to_string(),
            cost: upfront_cost.to_string(),
        });
    }

    let remaining = block_gas_limit.saturating_sub(block_gas_used);
    if tx.gas_limit > remaining {
        return Err(ValidationError::OverGasLimit { limit: tx.gas_limit, remaining });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fork_config::ChainConfig;
    use primitives::Account;
    use trie::MemoryStore;

    fn tx(nonce: u64, gas_limit: u64, gas_price: u64, value: u64, payload: Vec<u8>) -> Transaction {
        Transaction {
            nonce,
            gas_price: U256::from(gas_price),
            gas_limit,
            to: Some(Address::ZERO),
            value: U256::from(value),
            payload,
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        }
    }

    fn fork() -> ForkConfig {
        let chain = ChainConfig::mainnet();
        ForkConfig::for_block(&chain, chain.spurious_dragon_block)
    }

    #[test]
    fn well_formed_transaction_against_a_funded_sender_passes() {
        let mut state = State::new(MemoryStore::new());
        let sender = Address([9; 20]);
        state
            .put_account(sender, &Account { nonce: 5, balance: U256::from(1_000_000u64), ..Account::new_empty() })
            .unwrap();

        let transaction = tx(5, 21_000, 1, 0, Vec::new());
        assert!(validate(&state, sender, &transaction, &fork(), 8_000_000, 0).is_ok());
    }

    #[test]
    fn missing_sender_account_is_rejected() {
        let state: State<MemoryStore> = State::new(MemoryStore::new());
        let sender = Address([9; 20]);
        let transaction = tx(0, 21_000, 1, 0, Vec::new());
        assert_eq!(
            validate(&state, sender, &transaction, &fork(), 8_000_000, 0),
            Err(ValidationError::MissingAccount(sender))
        );
    }

    #[test]
    fn wrong_nonce_is_rejected() {
        let mut state = State::new(MemoryStore::new());
        let sender = Address([9; 20]);
        state.put_account(sender, &Account { nonce: 5, ..Account::new_empty() }).unwrap();

        let transaction = tx(6, 21_000, 1, 0, Vec::new());
        assert_eq!(
            validate(&state, sender, &transaction, &fork(), 8_000_000, 0),
            Err(ValidationError::NonceMismatch { account: 5, transaction: 6 })
        );
    }

    #[test]
    fn insufficient_balance_for_upfront_cost_is_rejected() {
        let mut state = State::new(MemoryStore::new());
        let sender = Address([9; 20]);
        state.put_account(sender, &Account { nonce: 0, balance: U256::from(100u64), ..Account::new_empty() }).unwrap();

        let transaction = tx(0, 21_000, 1, 0, Vec::new());
        assert!(matches!(
            validate(&state, sender, &transaction, &fork(), 8_000_000, 0),
            Err(ValidationError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn gas_limit_beyond_remaining_block_gas_is_rejected() {
        let mut state = State::new(MemoryStore::new());
        let sender = Address([9; 20]);
        state.put_account(sender, &Account { nonce: 0, balance: U256::from(1_000_000u64), ..Account::new_empty() }).unwrap();

        let transaction = tx(0, 21_000, 1, 0, Vec::new());
        assert_eq!(
            validate(&state, sender, &transaction, &fork(), 8_000_000, 7_990_000),
            Err(ValidationError::OverGasLimit { limit: 21_000, remaining: 10_000 })
        );
    }
}
