//! Block-tree canonical selection (spec §8 scenario 4): given two
//! generations of competing siblings, the canonical head must be the
//! tip of whichever branch accumulates the greatest total difficulty,
//! not the deepest or most-recently-inserted branch.
//!
//! The scenario's illustrative difficulty values (100, 110, 109, ...)
//! don't type-check against `chain-rules::validate_header`'s difficulty
//! check, which recomputes and enforces the real difficulty-adjustment
//! formula for every header — so this reproduces the same two-level
//! branching shape with real, validator-accepted difficulties instead,
//! driving the divergence through each sibling's timestamp gap.

#[cfg(test)]
mod tests {
    use block_tree::{AddBlockOutcome, BlockTree, BlockTreeError};
    use chain_rules::{header_hash, ommers_hash, BlockError};
    use fork_config::{ChainConfig, ForkConfig};
    use primitive_types::U256;
    use primitives::{Address, Block, Bloom, Hash, Header, ValidationError};
    use state::{SharedStore, State};
    use trie::{KvStore, MemoryStore};

    fn header(number: u64, parent_hash: Hash, difficulty: U256, timestamp: u64, state_root: Hash) -> Header {
        Header {
            parent_hash,
            ommers_hash: ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root,
            transactions_root: primitives::EMPTY_TRIE_ROOT,
            receipts_root: primitives::EMPTY_TRIE_ROOT,
            logs_bloom: Bloom::ZERO,
            difficulty,
            number,
            gas_limit: 8_000_000,
            gas_used: 0,
            timestamp,
            extra_data: Vec::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    /// A child of `parent`, `gap` seconds later, with its difficulty
    /// recomputed from that gap by the real adjustment formula — a
    /// small gap nudges difficulty up, a large one nudges it down.
    fn child(parent: &Header, gap: u64, fork: &ForkConfig) -> Header {
        let timestamp = parent.timestamp + gap;
        let difficulty = chain_rules::compute_difficulty(parent, parent.number + 1, timestamp, false, fork);
        header(parent.number + 1, header_hash(parent), difficulty, timestamp, parent.state_root)
    }

    /// Submit a header with a placeholder state root, read back the
    /// root `execute_block` actually produced (the block reward changes
    /// it), then resubmit — the same two-pass approach used elsewhere
    /// in this workspace for a block that pays a reward but carries no
    /// transactions of its own.
    fn insert<S: KvStore + Clone>(tree: &mut BlockTree<S>, mut candidate: Header, chain_id: u64, fork: &ForkConfig) -> (Header, AddBlockOutcome) {
        match tree.add_block(Block::new(candidate.clone(), Vec::new(), Vec::new()), chain_id, fork) {
            Err(BlockTreeError::Invalid(BlockError::Invalid(ValidationError::InvalidStateRoot { expected, .. }))) => {
                candidate.state_root = expected;
            }
            other => panic!("expected a state-root mismatch on the first pass, got {other:?}"),
        }
        let outcome = tree.add_block(Block::new(candidate.clone(), Vec::new(), Vec::new()), chain_id, fork).unwrap();
        (candidate, outcome)
    }

    #[test]
    fn canonical_head_is_the_tip_of_the_greatest_total_difficulty_branch() {
        let store = SharedStore::new(MemoryStore::new());
        let mut state = State::new(store.clone());
        let genesis_root = state.commit().unwrap();

        let chain_cfg = ChainConfig::mainnet();
        // Byzantium's difficulty adjustment scales with the timestamp
        // gap (`(y - time_delta / 9)`), unlike the flat +/-1 used
        // pre-Homestead — needed here so a 15s sibling and a 900s
        // sibling actually end up with different difficulties.
        let fork = ForkConfig::for_block(&chain_cfg, chain_cfg.byzantium_block);
        let chain_id = chain_cfg.chain_id.unwrap();

        let genesis_header = header(chain_cfg.byzantium_block, Hash::ZERO, U256::from(131_072u64), 0, genesis_root);
        let mut tree = BlockTree::new(Block::new(genesis_header.clone(), Vec::new(), Vec::new()), store);

        // First generation: two siblings at block 6. The 15s-gap child
        // (normal block time) gets a difficulty bump; the 900s-gap
        // sibling gets a difficulty cut, so the first branch leads.
        let (winning_6, outcome) = insert(&mut tree, child(&genesis_header, 15, &fork), chain_id, &fork);
        assert!(matches!(outcome, AddBlockOutcome::Valid { head_changed: true, .. }));
        let (losing_6, _) = insert(&mut tree, child(&genesis_header, 900, &fork), chain_id, &fork);
        assert!(tree.total_difficulty(header_hash(&winning_6)).unwrap() > tree.total_difficulty(header_hash(&losing_6)).unwrap());
        assert_eq!(tree.canonical_head(), header_hash(&winning_6));

        // Second generation: two more siblings at block 7, both
        // children of `winning_6`. Same shape — the short-gap sibling
        // wins locally, and because it is already ahead at block 6 its
        // tip's total difficulty leads the whole tree.
        let (winning_7, outcome) = insert(&mut tree, child(&winning_6, 15, &fork), chain_id, &fork);
        assert!(matches!(outcome, AddBlockOutcome::Valid { head_changed: true, .. }));
        let (losing_7, _) = insert(&mut tree, child(&winning_6, 900, &fork), chain_id, &fork);
        assert!(tree.total_difficulty(header_hash(&winning_7)).unwrap() > tree.total_difficulty(header_hash(&losing_7)).unwrap());
        assert_eq!(tree.canonical_head(), header_hash(&winning_7));

        // A third generation extending the winning branch must keep it
        // canonical and keep accumulating difficulty.
        let (tip, outcome) = insert(&mut tree, child(&winning_7, 15, &fork), chain_id, &fork);
        assert!(matches!(outcome, AddBlockOutcome::Valid { head_changed: true, .. }));
        assert_eq!(tree.canonical_head(), header_hash(&tip));
        assert_eq!(tree.path_to_root(header_hash(&tip)).len(), 4);
        assert!(tree.total_difficulty(header_hash(&tip)).unwrap() > tree.total_difficulty(header_hash(&losing_7)).unwrap());

        // Resubmitting an already-known block is a no-op, not an error.
        let outcome = tree.add_block(Block::new(losing_7, Vec::new(), Vec::new()), chain_id, &fork).unwrap();
        assert_eq!(outcome, AddBlockOutcome::AlreadyKnown);
    }
}
