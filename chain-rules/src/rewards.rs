use fork_config::{Fork, ForkConfig};
use primitive_types::U256;
use primitives::Header;
use state::State;
use trie::KvStore;

const WEI_PER_ETHER: u64 = 1_000_000_000_000_000_000;

/// The base block reward at the active fork (spec §4.6): 5 ETH before
/// Byzantium, 3 ETH from Byzantium, 2 ETH from Constantinople.
#[must_use]
pub fn base_block_reward(fork: &ForkConfig) -> U256 {
    let ether = if fork.fork >= Fork::Constantinople {
        2
    } else if fork.fork >= Fork::Byzantium {
        3
    } else {
        5
    };
    U256::from(ether) * U256::from(WEI_PER_ETHER)
}

/// Credit the block beneficiary and each uncle's beneficiary their
/// share of the block reward (spec §4.6): the miner gets the base
/// reward plus 1/32 of it per uncle; each uncle's beneficiary gets
/// `base * (8 - (B.number - U.number)) / 8`.
pub fn apply_block_reward<S: KvStore + Clone>(
    state: &mut State<S>,
    header: &Header,
    uncles: &[Header],
    fork: &ForkConfig,
) -> Result<(), state::StateError> {
    let base = base_block_reward(fork);

    let mut miner_reward = base;
    for uncle in uncles {
        let distance = header.number.saturating_sub(uncle.number);
        let uncle_reward = base * U256::from(8u64.saturating_sub(distance)) / U256::from(8u64);
        state.add_balance(uncle.beneficiary, uncle_reward)?;
        state.mark_touched(uncle.beneficiary);
        miner_reward += base / U256::from(32u64);
    }

    state.add_balance(header.beneficiary, miner_reward)?;
    state.mark_touched(header.beneficiary);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fork_config::ChainConfig;
    use primitives::{Address, Bloom, Hash};
    use trie::MemoryStore;

    fn header(number: u64, beneficiary: Address) -> Header {
        Header {
            parent_hash: Hash::ZERO,
            ommers_hash: Hash::ZERO,
            beneficiary,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::zero(),
            number,
            gas_limit: 5_000_000,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    #[test]
    fn frontier_reward_is_five_ether() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 0);
        assert_eq!(base_block_reward(&fork), U256::from(5u64) * U256::from(WEI_PER_ETHER));
    }

    #[test]
    fn constantinople_reward_is_two_ether() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, chain.constantinople_block);
        assert_eq!(base_block_reward(&fork), U256::from(2u64) * U256::from(WEI_PER_ETHER));
    }

    #[test]
    fn miner_and_uncle_beneficiaries_are_both_credited() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 0);
        let mut state = State::new(MemoryStore::new());

        let miner = Address([1; 20]);
        let uncle_miner = Address([2; 20]);
        let block_header = header(10, miner);
        let uncle = header(9, uncle_miner);

        apply_block_reward(&mut state, &block_header, &[uncle], &fork).unwrap();

        let base = base_block_reward(&fork);
        let expected_miner = base + base / U256::from(32u64);
        let expected_uncle = base * U256::from(7u64) / U256::from(8u64);

        assert_eq!(state.get_account(miner).unwrap().unwrap().balance, expected_miner);
        assert_eq!(state.get_account(uncle_miner).unwrap().unwrap().balance, expected_uncle);
    }
}
