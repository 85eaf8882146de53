use fork_config::{Fork, ForkConfig};
use primitive_types::U256;
use primitives::{Hash, Header, ValidationError, MAX_EXTRA_DATA_SIZE};
use rlp::{Encodable, Item};

/// The canonical RLP encoding of a header (spec §3): all fifteen fields
/// in declaration order, bit-exact so two peers that agree on a header
/// agree on its hash.
#[must_use]
pub fn encode_header(header: &Header) -> Vec<u8> {
    rlp::encode_struct(vec![
        Item::Bytes(header.parent_hash.as_bytes().to_vec()),
        Item::Bytes(header.ommers_hash.as_bytes().to_vec()),
        Item::Bytes(header.beneficiary.as_bytes().to_vec()),
        Item::Bytes(header.state_root.as_bytes().to_vec()),
        Item::Bytes(header.transactions_root.as_bytes().to_vec()),
        Item::Bytes(header.receipts_root.as_bytes().to_vec()),
        Item::Bytes(header.logs_bloom.0.to_vec()),
        header.difficulty.rlp_item(),
        header.number.rlp_item(),
        header.gas_limit.rlp_item(),
        header.gas_used.rlp_item(),
        header.timestamp.rlp_item(),
        Item::Bytes(header.extra_data.clone()),
        Item::Bytes(header.mix_hash.as_bytes().to_vec()),
        Item::Bytes(header.nonce.to_vec()),
    ])
}

/// `Keccak(RLP(header))` (spec §3, §4.6): every header's own identity,
/// and what a child's `parent_hash` must equal.
#[must_use]
pub fn header_hash(header: &Header) -> Hash {
    crypto::keccak256(&encode_header(header))
}

/// `Keccak(RLP(ommers))` (spec §3): a block's `ommers_hash` field.
#[must_use]
pub fn ommers_hash(ommers: &[Header]) -> Hash {
    let encoded: Vec<Item> = ommers.iter().map(|h| Item::Bytes(encode_header(h))).collect();
    crypto::keccak256(&rlp::encode(&Item::List(encoded)))
}

/// The difficulty a child block must carry, computed from its parent
/// under the active fork's adjustment formula (spec §4.6). Byzantium's
/// EIP-100 factors in whether the child has uncles; earlier forks
/// ignore that parameter.
#[must_use]
pub fn compute_difficulty(parent: &Header, child_number: u64, child_timestamp: u64, child_has_uncles: bool, fork: &ForkConfig) -> U256 {
    let time_delta = child_timestamp.saturating_sub(parent.timestamp) as i64;

    let adjustment_factor: i64 = if fork.fork >= Fork::Byzantium {
        let y = if child_has_uncles { 2 } else { 1 };
        (y - time_delta / 9).max(-99)
    } else if fork.fork >= Fork::Homestead {
        (1 - time_delta / 10).max(-99)
    } else if time_delta < 13 {
        1
    } else {
        -1
    };

    let step = parent.difficulty / U256::from(2048);
    let mut difficulty = if adjustment_factor >= 0 {
        parent.difficulty + step * U256::from(adjustment_factor as u64)
    } else {
        parent.difficulty.saturating_sub(step * U256::from((-adjustment_factor) as u64))
    };

    let fake_block_number = child_number.saturating_sub(fork.difficulty_bomb_delay);
    let periods = fake_block_number / 100_000;
    if periods >= 2 {
        difficulty += U256::from(1u64) << ((periods - 2).min(255) as usize);
    }

    difficulty
}

/// Header validation of `header` against its immediate parent `parent`
/// (spec §4.6). Proof-of-work (mix hash / nonce under Ethash) is
/// deliberately not checked here: it is delegated to an external
/// verifier the sync engine consults before a header enters the queue.
pub fn validate_header(header: &Header, parent: &Header, child_has_uncles: bool, fork: &ForkConfig) -> Result<(), ValidationError> {
    let expected_parent_hash = header_hash(parent);
    if header.parent_hash != expected_parent_hash {
        return Err(ValidationError::InvalidParentHash { expected: expected_parent_hash, found: header.parent_hash });
    }

    if header.number != parent.number + 1 {
        return Err(ValidationError::InvalidBlockNumber { parent: parent.number, found: header.number });
    }

    if header.timestamp <= parent.timestamp {
        return Err(ValidationError::InvalidTimestamp { parent: parent.timestamp, found: header.timestamp });
    }

    let lower_bound = parent.gas_limit - parent.gas_limit / 1024 + 1;
    let upper_bound = parent.gas_limit + parent.gas_limit / 1024 - 1;
    if header.gas_limit < lower_bound || header.gas_limit > upper_bound || header.gas_limit < 5_000 {
        return Err(ValidationError::InvalidGasLimit { parent: parent.gas_limit, found: header.gas_limit });
    }

    if header.extra_data.len() > MAX_EXTRA_DATA_SIZE {
        return Err(ValidationError::ExtraDataTooLarge { len: header.extra_data.len(), max: MAX_EXTRA_DATA_SIZE });
    }

    let expected_difficulty = compute_difficulty(parent, header.number, header.timestamp, child_has_uncles, fork);
    if header.difficulty != expected_difficulty {
        return Err(ValidationError::InvalidDifficulty {
            expected: expected_difficulty.to_string(),
            found: header.difficulty.to_string(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fork_config::ChainConfig;
    use primitives::{Address, Bloom};

    fn genesis() -> Header {
        Header {
            parent_hash: Hash::ZERO,
            ommers_hash: ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::from(131_072u64),
            number: 0,
            gas_limit: 5_000_000,
            gas_used: 0,
            timestamp: 0,
            extra_data: Vec::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    #[test]
    fn child_with_matching_parent_hash_and_number_is_accepted() {
        let parent = genesis();
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 1);
        let difficulty = compute_difficulty(&parent, 1, 20, false, &fork);

        let mut child = genesis();
        child.parent_hash = header_hash(&parent);
        child.number = 1;
        child.timestamp = 20;
        child.difficulty = difficulty;

        assert!(validate_header(&child, &parent, false, &fork).is_ok());
    }

    #[test]
    fn wrong_parent_hash_is_rejected() {
        let parent = genesis();
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 1);

        let mut child = genesis();
        child.parent_hash = Hash([0xaa; 32]);
        child.number = 1;
        child.timestamp = 20;

        assert!(matches!(
            validate_header(&child, &parent, false, &fork),
            Err(ValidationError::InvalidParentHash { .. })
        ));
    }

    #[test]
    fn non_sequential_number_is_rejected() {
        let parent = genesis();
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 1);

        let mut child = genesis();
        child.parent_hash = header_hash(&parent);
        child.number = 2;
        child.timestamp = 20;

        assert!(matches!(
            validate_header(&child, &parent, false, &fork),
            Err(ValidationError::InvalidBlockNumber { .. })
        ));
    }

    #[test]
    fn gas_limit_outside_adjustment_range_is_rejected() {
        let parent = genesis();
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, 1);

        let mut child = genesis();
        child.parent_hash = header_hash(&parent);
        child.number = 1;
        child.timestamp = 20;
        child.gas_limit = parent.gas_limit * 2;
        child.difficulty = compute_difficulty(&parent, 1, 20, false, &fork);

        assert!(matches!(
            validate_header(&child, &parent, false, &fork),
            Err(ValidationError::InvalidGasLimit { .. })
        ));
    }
}
