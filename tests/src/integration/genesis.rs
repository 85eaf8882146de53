//! Genesis reproduction (spec §8 scenario 1): building the same chain
//! spec twice against independent stores must yield identical genesis
//! blocks, and an allocation must be reflected in the state root rather
//! than silently dropped.

#[cfg(test)]
mod tests {
    use node::ChainSpec;
    use node::chain_spec::GenesisAccount;
    use state::SharedStore;
    use trie::MemoryStore;

    #[test]
    fn mainnet_shaped_genesis_is_deterministic_across_independent_stores() {
        let spec = ChainSpec::mainnet_shape();

        let (first, _) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();
        let (second, _) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();

        assert_eq!(first.header.state_root, second.header.state_root);
        assert_eq!(chain_rules::header_hash(&first.header), chain_rules::header_hash(&second.header));
        assert_eq!(first.header.state_root, primitives::EMPTY_TRIE_ROOT);
    }

    #[test]
    fn an_allocated_account_survives_into_the_genesis_state_root() {
        let mut spec = ChainSpec::mainnet_shape();
        spec.genesis.alloc.insert(
            "0x2222222222222222222222222222222222222222".to_string(),
            GenesisAccount { balance: "500000000000000000".to_string(), nonce: 3, code: None },
        );

        let (first, _) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();
        let (second, _) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();

        assert_eq!(first.header.state_root, second.header.state_root);
        assert_ne!(first.header.state_root, primitives::EMPTY_TRIE_ROOT);
    }
}
