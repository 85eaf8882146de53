use crate::header::{header_hash, validate_header};
use fork_config::ForkConfig;
use primitives::{Hash, Header, ValidationError};
use std::collections::HashSet;

/// Maximum number of ommers a block may declare (spec §4.6).
pub const MAX_UNCLES: usize = 2;
/// An uncle's parent must be within this many generations of `B` (spec §4.6).
const MAX_UNCLE_GENERATION: u64 = 7;

/// Validate `header`'s ommer list (spec §4.6): at most two uncles, each
/// independently a valid header whose own parent is a recent ancestor
/// of `header` not already credited as an uncle elsewhere in the chain.
///
/// `ancestors` must contain every header within the last
/// [`MAX_UNCLE_GENERATION`] generations of `header`'s parent (so an
/// uncle's parent can be looked up by hash), and `already_included`
/// every ommer hash already credited by an earlier block on this chain.
pub fn validate_uncles(
    header: &Header,
    uncles: &[Header],
    ancestors: &[Header],
    already_included: &HashSet<Hash>,
    fork: &ForkConfig,
) -> Result<(), ValidationError> {
    if uncles.len() > MAX_UNCLES {
        return Err(ValidationError::InvalidOmmers(format!(
            "block declares {} uncles, at most {MAX_UNCLES} are allowed",
            uncles.len()
        )));
    }

    let mut seen_this_block = HashSet::new();
    for uncle in uncles {
        let uncle_hash = header_hash(uncle);

        if !seen_this_block.insert(uncle_hash) {
            return Err(ValidationError::InvalidOmmers(format!("uncle {uncle_hash:?} is duplicated within the block")));
        }
        if already_included.contains(&uncle_hash) {
            return Err(ValidationError::InvalidOmmers(format!("uncle {uncle_hash:?} was already credited by an earlier block")));
        }

        let Some(uncle_parent) = ancestors.iter().find(|candidate| header_hash(candidate) == uncle.parent_hash) else {
            return Err(ValidationError::InvalidOmmers(format!(
                "uncle {uncle_hash:?}'s parent is not among the last {MAX_UNCLE_GENERATION} ancestors"
            )));
        };

        let generation = header.number.saturating_sub(uncle_parent.number);
        if generation == 0 || generation > MAX_UNCLE_GENERATION {
            return Err(ValidationError::InvalidOmmers(format!(
                "uncle {uncle_hash:?}'s parent is {generation} generations back, outside the {MAX_UNCLE_GENERATION}-generation window"
            )));
        }

        let uncle_has_uncles = false;
        validate_header(uncle, uncle_parent, uncle_has_uncles, fork)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::compute_difficulty;
    use fork_config::ChainConfig;
    use primitive_types::U256;
    use primitives::{Address, Bloom};

    fn header(number: u64, timestamp: u64, parent_hash: Hash, difficulty: U256) -> Header {
        Header {
            parent_hash,
            ommers_hash: crate::header::ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root: Hash::ZERO,
            transactions_root: Hash::ZERO,
            receipts_root: Hash::ZERO,
            logs_bloom: Bloom::ZERO,
            difficulty,
            number,
            gas_limit: 5_000_000,
            gas_used: 0,
            timestamp,
            extra_data: Vec::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    #[test]
    fn more_than_two_uncles_is_rejected() {
        let fork = ForkConfig::for_block(&ChainConfig::mainnet(), 1);
        let genesis = header(0, 0, Hash::ZERO, U256::from(131_072u64));
        let child = header(1, 20, header_hash(&genesis), compute_difficulty(&genesis, 1, 20, false, &fork));

        let uncles = vec![genesis.clone(), genesis.clone(), genesis.clone()];
        assert!(matches!(
            validate_uncles(&child, &uncles, &[genesis], &HashSet::new(), &fork),
            Err(ValidationError::InvalidOmmers(_))
        ));
    }

    #[test]
    fn uncle_whose_parent_is_too_far_back_is_rejected() {
        let fork = ForkConfig::for_block(&ChainConfig::mainnet(), 1);
        let ancient = header(0, 0, Hash::ZERO, U256::from(131_072u64));

        let mut ancestor = ancient.clone();
        for n in 1..=8u64 {
            let next = header(n, n * 15, header_hash(&ancestor), compute_difficulty(&ancestor, n, n * 15, false, &fork));
            ancestor = next;
        }
        let header_b = header(9, 9 * 15 + 15, header_hash(&ancestor), compute_difficulty(&ancestor, 9, 9 * 15 + 15, false, &fork));

        let stray_uncle = header(1, 15, header_hash(&ancient), compute_difficulty(&ancient, 1, 15, false, &fork));

        assert!(matches!(
            validate_uncles(&header_b, &[stray_uncle], &[ancient], &HashSet::new(), &fork),
            Err(ValidationError::InvalidOmmers(_))
        ));
    }
}
