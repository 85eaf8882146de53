//! Single-transaction state transition (spec §8 scenario 3): a signed
//! contract-creation transaction run through `tx-pipeline::validate`
//! and `tx-pipeline::apply_transaction` against a freshly seeded
//! account, checked against every postcondition the scenario names.

#[cfg(test)]
mod tests {
    use evm::BlockContext;
    use fork_config::{ChainConfig, ForkConfig};
    use primitive_types::U256;
    use primitives::{Account, Address, Bloom, Hash, Header, Transaction};
    use state::{SharedStore, State};
    use trie::MemoryStore;

    fn secret_key() -> [u8; 32] {
        let mut bytes = [0u8; 32];
        bytes[31] = 7;
        bytes
    }

    fn sender_address() -> Address {
        let public_key = crypto::public_key_from_secret(&secret_key()).unwrap();
        crypto::address_from_public_key(&public_key)
    }

    fn beneficiary() -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = 5;
        Address::new(bytes)
    }

    /// `PUSH1 3 PUSH1 5 ADD PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN`:
    /// adds 3 and 5, stores the sum as a 32-byte word, and returns it.
    fn init_code() -> Vec<u8> {
        vec![0x60, 0x03, 0x60, 0x05, 0x01, 0x60, 0x00, 0x52, 0x60, 0x20, 0x60, 0x00, 0xf3]
    }

    fn signed_transaction() -> Transaction {
        let unsigned = Transaction {
            nonce: 5,
            gas_price: U256::from(3u64),
            gas_limit: 100_000,
            to: None,
            value: U256::from(5u64),
            payload: init_code(),
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        };
        let digest = tx_pipeline::signing_hash(&unsigned);
        let signature = crypto::sign(&secret_key(), &digest).unwrap();
        Transaction { v: u64::from(signature.recovery_id) + 27, r: signature.r, s: signature.s, ..unsigned }
    }

    fn block_header() -> Header {
        Header {
            parent_hash: Hash::ZERO,
            ommers_hash: chain_rules::ommers_hash(&[]),
            beneficiary: beneficiary(),
            state_root: Hash::ZERO,
            transactions_root: primitives::EMPTY_TRIE_ROOT,
            receipts_root: primitives::EMPTY_TRIE_ROOT,
            logs_bloom: Bloom::ZERO,
            difficulty: U256::from(131_072u64),
            number: 1,
            gas_limit: 8_000_000,
            gas_used: 0,
            timestamp: 15,
            extra_data: Vec::new(),
            mix_hash: Hash::ZERO,
            nonce: [0u8; 8],
        }
    }

    #[test]
    fn contract_creation_pays_gas_credits_beneficiary_and_deploys_code() {
        let store = SharedStore::new(MemoryStore::new());
        let mut state = State::new(store);
        state
            .put_account(sender_address(), &Account { nonce: 5, balance: U256::from(400_000u64), ..Account::new_empty() })
            .unwrap();

        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, chain.byzantium_block);
        let tx = signed_transaction();

        tx_pipeline::validate(&state, sender_address(), &tx, &fork, 8_000_000, 0).unwrap();

        let header = block_header();
        let block_ctx = BlockContext::new(&header, chain.chain_id.unwrap());
        let applied = tx_pipeline::apply_transaction(&mut state, &block_ctx, &fork, &tx, 0).unwrap();

        let sender_account = state.get_account(sender_address()).unwrap().unwrap();
        assert_eq!(sender_account.nonce, 6);

        let new_contract = evm::create_address(sender_address(), 5);
        let contract_account = state.get_account(new_contract).unwrap().unwrap();
        assert_eq!(contract_account.balance, U256::from(5u64));

        let returned_code = state.get_code(contract_account.code_hash).unwrap();
        assert_eq!(crypto::keccak256(&returned_code), contract_account.code_hash);
        // the init code computes 3 + 5 and returns it as a 32-byte word.
        let mut expected = [0u8; 32];
        expected[31] = 8;
        assert_eq!(returned_code, expected.to_vec());

        let beneficiary_account = state.get_account(beneficiary()).unwrap().unwrap();
        assert_eq!(beneficiary_account.balance, U256::from(applied.gas_used) * U256::from(3u64));
    }

    /// A zero-value `CALL` to an address with no account behind it still
    /// touches that address, the same as if value had moved. Pushes, in
    /// the order `CALL` pops them off the stack: retSize, retOffset,
    /// argsSize, argsOffset, value, target, gas.
    fn call_forwarder_code(target: Address) -> Vec<u8> {
        let mut code = vec![
            0x60, 0x00, // retSize
            0x60, 0x00, // retOffset
            0x60, 0x00, // argsSize
            0x60, 0x00, // argsOffset
            0x60, 0x00, // value
            0x73, // PUSH20
        ];
        code.extend_from_slice(target.as_bytes());
        code.extend_from_slice(&[0x61, 0x27, 0x10]); // PUSH2 0x2710 (gas)
        code.push(0xf1); // CALL
        code.push(0x00); // STOP
        code
    }

    fn caller_contract() -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xaa;
        Address::new(bytes)
    }

    fn empty_target() -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = 0xbb;
        Address::new(bytes)
    }

    #[test]
    fn zero_value_call_touches_an_empty_account_deleted_only_post_spurious_dragon() {
        let chain = ChainConfig::mainnet();
        let fork = ForkConfig::for_block(&chain, chain.tangerine_whistle_block);
        assert!(!fork.clean_touched_accounts, "tangerine whistle predates EIP-161 cleanup");

        let unsigned = Transaction {
            nonce: 5,
            gas_price: U256::from(3u64),
            gas_limit: 100_000,
            to: Some(caller_contract()),
            value: U256::zero(),
            payload: Vec::new(),
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        };
        let digest = tx_pipeline::signing_hash(&unsigned);
        let signature = crypto::sign(&secret_key(), &digest).unwrap();
        let tx = Transaction { v: u64::from(signature.recovery_id) + 27, r: signature.r, s: signature.s, ..unsigned };

        let header = block_header();
        let block_ctx = BlockContext::new(&header, chain.chain_id.unwrap());

        let mut state = State::new(SharedStore::new(MemoryStore::new()));
        state
            .put_account(sender_address(), &Account { nonce: 5, balance: U256::from(400_000u64), ..Account::new_empty() })
            .unwrap();
        state.put_code(caller_contract(), call_forwarder_code(empty_target())).unwrap();
        state.put_account(empty_target(), &Account::new_empty()).unwrap();

        tx_pipeline::validate(&state, sender_address(), &tx, &fork, 8_000_000, 0).unwrap();
        tx_pipeline::apply_transaction(&mut state, &block_ctx, &fork, &tx, 0).unwrap();

        // Pre-Spurious-Dragon: touching an empty account does not delete it.
        assert_eq!(state.get_account(empty_target()).unwrap(), Some(Account::new_empty()));

        let post_fork = ForkConfig::for_block(&chain, chain.spurious_dragon_block);
        assert!(post_fork.clean_touched_accounts);

        let mut state = State::new(SharedStore::new(MemoryStore::new()));
        state
            .put_account(sender_address(), &Account { nonce: 5, balance: U256::from(400_000u64), ..Account::new_empty() })
            .unwrap();
        state.put_code(caller_contract(), call_forwarder_code(empty_target())).unwrap();
        state.put_account(empty_target(), &Account::new_empty()).unwrap();

        tx_pipeline::validate(&state, sender_address(), &tx, &post_fork, 8_000_000, 0).unwrap();
        tx_pipeline::apply_transaction(&mut state, &block_ctx, &post_fork, &tx, 0).unwrap();

        // Post-Spurious-Dragon: the same zero-value CALL leaves the empty
        // target touched, and EIP-161 cleanup deletes it.
        assert_eq!(state.get_account(empty_target()).unwrap(), None);
    }
}
