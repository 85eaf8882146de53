use crate::account_codec::{decode_account, encode_account};
use crate::error::StateError;
use crate::store::SharedStore;
use crypto::keccak256;
use fork_config::ForkConfig;
use primitive_types::U256;
use primitives::{Account, Address, Hash};
use rlp::{decode_exact, Decodable, Encodable};
use std::collections::HashSet;
use trie::{KvStore, Trie};

/// World state: the account trie plus, on demand, each account's
/// storage subtrie — all sharing one backing [`KvStore`] (spec §4.3).
///
/// Storage keys use the "secure trie" convention: both account
/// addresses and storage keys are Keccak-hashed before becoming trie
/// paths, so an adversary cannot choose addresses/keys that grind the
/// trie into a deep, unbalanced shape.
#[derive(Clone)]
pub struct State<S: KvStore + Clone> {
    store: SharedStore<S>,
    world: Trie<SharedStore<S>>,
    touched: HashSet<Address>,
}

impl<S: KvStore + Clone> State<S> {
    /// A fresh, empty world state (used to build genesis).
    #[must_use]
    pub fn new(store: S) -> Self {
        let shared = SharedStore::new(store);
        Self {
            world: Trie::new(shared.clone()),
            store: shared,
            touched: HashSet::new(),
        }
    }

    /// Reopen a previously committed world state by its root hash.
    #[must_use]
    pub fn from_root(store: S, root: Hash) -> Self {
        let shared = SharedStore::new(store);
        Self {
            world: Trie::from_root(shared.clone(), root),
            store: shared,
            touched: HashSet::new(),
        }
    }

    /// Flush every pending write and return the new state root.
    pub fn commit(&mut self) -> Result<Hash, StateError> {
        Ok(self.world.commit()?)
    }

    pub fn get_account(&self, address: Address) -> Result<Option<Account>, StateError> {
        let key = keccak256(address.as_bytes());
        match self.world.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(decode_account(address, &bytes)?)),
            None => Ok(None),
        }
    }

    pub fn put_account(&mut self, address: Address, account: &Account) -> Result<(), StateError> {
        let key = keccak256(address.as_bytes());
        self.world.put(key.as_bytes(), encode_account(account))?;
        self.touched.insert(address);
        Ok(())
    }

    pub fn del_account(&mut self, address: Address) -> Result<(), StateError> {
        let key = keccak256(address.as_bytes());
        self.world.delete(key.as_bytes())?;
        Ok(())
    }

    /// Read one 256-bit storage slot. Unset slots read as zero (spec §4.3).
    pub fn get_storage(&self, address: Address, key: U256) -> Result<U256, StateError> {
        let Some(account) = self.get_account(address)? else {
            return Ok(U256::zero());
        };
        let storage = Trie::from_root(self.store.clone(), account.storage_root);
        let trie_key = keccak256(&u256_to_be_bytes(key));
        match storage.get(trie_key.as_bytes())? {
            Some(bytes) => {
                let item = decode_exact(&bytes).map_err(|source| StateError::CorruptAccount {
                    address,
                    source,
                })?;
                Ok(U256::from_item(&item).map_err(|source| StateError::CorruptAccount {
                    address,
                    source,
                })?)
            }
            None => Ok(U256::zero()),
        }
    }

    /// Write a storage slot. Writing zero deletes it (spec §4.3, §7):
    /// `put_storage(t, a, k, 0) == del_storage(t, a, k)`.
    pub fn put_storage(&mut self, address: Address, key: U256, value: U256) -> Result<(), StateError> {
        let mut account = self.get_account(address)?.unwrap_or_default();
        let mut storage = Trie::from_root(self.store.clone(), account.storage_root);
        let trie_key = keccak256(&u256_to_be_bytes(key));

        if value.is_zero() {
            storage.delete(trie_key.as_bytes())?;
        } else {
            storage.put(trie_key.as_bytes(), value.rlp_bytes())?;
        }

        account.storage_root = storage.commit()?;
        self.put_account(address, &account)?;
        self.touched.insert(address);
        Ok(())
    }

    /// Store a contract's code, content-addressed by its own Keccak
    /// hash, and point `address`'s account at it.
    pub fn put_code(&mut self, address: Address, code: Vec<u8>) -> Result<(), StateError> {
        let code_hash = keccak256(&code);
        self.store.put(code_hash, code);
        let mut account = self.get_account(address)?.unwrap_or_default();
        account.code_hash = code_hash;
        self.put_account(address, &account)?;
        Ok(())
    }

    #[must_use]
    pub fn get_code(&self, code_hash: Hash) -> Option<Vec<u8>> {
        if code_hash == primitives::EMPTY_CODE_HASH {
            return Some(Vec::new());
        }
        self.store.get(&code_hash)
    }

    pub fn increment_nonce(&mut self, address: Address) -> Result<(), StateError> {
        let mut account = self.get_account(address)?.unwrap_or_default();
        account.nonce += 1;
        self.put_account(address, &account)
    }

    pub fn add_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let mut account = self.get_account(address)?.unwrap_or_default();
        account.balance += amount;
        self.put_account(address, &account)
    }

    pub fn sub_balance(&mut self, address: Address, amount: U256) -> Result<(), StateError> {
        let mut account = self.get_account(address)?.unwrap_or_default();
        if account.balance < amount {
            return Err(StateError::InsufficientBalance {
                address,
                available: account.balance,
                required: amount,
            });
        }
        account.balance -= amount;
        self.put_account(address, &account)
    }

    /// Record that `address` was the subject of a read or value
    /// transfer this transaction, per the touched-account list in
    /// spec §4.3 (`BALANCE`, `EXTCODE*`, the `CALL` family,
    /// `SELFDESTRUCT`, and plain value transfers).
    pub fn mark_touched(&mut self, address: Address) {
        self.touched.insert(address);
    }

    /// EIP-161 cleanup (spec §4.3): after a transaction, delete every
    /// touched account that is now empty. A no-op before Spurious
    /// Dragon (`fork.clean_touched_accounts == false`).
    pub fn clean_touched_accounts(&mut self, fork: &ForkConfig) -> Result<(), StateError> {
        if !fork.clean_touched_accounts {
            self.touched.clear();
            return Ok(());
        }
        for address in self.touched.drain().collect::<Vec<_>>() {
            if let Some(account) = self.get_account(address)? {
                if account.is_empty() {
                    self.del_account(address)?;
                }
            }
        }
        Ok(())
    }
}

fn u256_to_be_bytes(value: U256) -> [u8; 32] {
    let mut buf = [0u8; 32];
    value.to_big_endian(&mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;
    use trie::MemoryStore;

    fn new_state() -> State<MemoryStore> {
        State::new(MemoryStore::new())
    }

    #[test]
    fn unknown_account_reads_as_absent() {
        let state = new_state();
        assert_eq!(state.get_account(Address::ZERO).unwrap(), None);
    }

    #[test]
    fn put_then_get_account_roundtrips() {
        let mut state = new_state();
        let address = Address([1u8; 20]);
        let account = Account {
            nonce: 3,
            balance: U256::from(500u64),
            ..Account::new_empty()
        };
        state.put_account(address, &account).unwrap();
        assert_eq!(state.get_account(address).unwrap(), Some(account));
    }

    #[test]
    fn balance_and_nonce_helpers_mutate_in_place() {
        let mut state = new_state();
        let address = Address([2u8; 20]);
        state.add_balance(address, U256::from(100u64)).unwrap();
        state.increment_nonce(address).unwrap();
        let account = state.get_account(address).unwrap().unwrap();
        assert_eq!(account.balance, U256::from(100u64));
        assert_eq!(account.nonce, 1);

        state.sub_balance(address, U256::from(40u64)).unwrap();
        assert_eq!(
            state.get_account(address).unwrap().unwrap().balance,
            U256::from(60u64)
        );
    }

    #[test]
    fn sub_balance_rejects_overdraft() {
        let mut state = new_state();
        let address = Address([3u8; 20]);
        assert!(state.sub_balance(address, U256::from(1u64)).is_err());
    }

    #[test]
    fn storage_write_then_read_roundtrips_and_zero_deletes() {
        let mut state = new_state();
        let address = Address([4u8; 20]);
        let key = U256::from(7u64);
        assert_eq!(state.get_storage(address, key).unwrap(), U256::zero());

        state.put_storage(address, key, U256::from(42u64)).unwrap();
        assert_eq!(state.get_storage(address, key).unwrap(), U256::from(42u64));

        state.put_storage(address, key, U256::zero()).unwrap();
        assert_eq!(state.get_storage(address, key).unwrap(), U256::zero());
    }

    #[test]
    fn deleting_one_account_does_not_disturb_another_with_equal_storage_root() {
        let mut state = new_state();
        let a = Address([5u8; 20]);
        let b = Address([6u8; 20]);
        state.put_storage(a, U256::from(1u64), U256::from(11u64)).unwrap();
        state.put_storage(b, U256::from(1u64), U256::from(11u64)).unwrap();

        let account_a = state.get_account(a).unwrap().unwrap();
        let account_b = state.get_account(b).unwrap().unwrap();
        assert_eq!(account_a.storage_root, account_b.storage_root);

        state.del_account(a).unwrap();
        assert_eq!(state.get_account(a).unwrap(), None);
        assert_eq!(
            state.get_storage(b, U256::from(1u64)).unwrap(),
            U256::from(11u64)
        );
    }

    #[test]
    fn code_is_content_addressed_by_its_own_hash() {
        let mut state = new_state();
        let address = Address([7u8; 20]);
        let code = vec![0x60, 0x00, 0x60, 0x00];
        state.put_code(address, code.clone()).unwrap();

        let account = state.get_account(address).unwrap().unwrap();
        assert!(account.has_code());
        assert_eq!(state.get_code(account.code_hash), Some(code));
    }

    #[test]
    fn empty_code_hash_resolves_without_a_store_lookup() {
        let state = new_state();
        assert_eq!(state.get_code(primitives::EMPTY_CODE_HASH), Some(Vec::new()));
    }

    #[test]
    fn touched_empty_accounts_are_deleted_only_post_spurious_dragon() {
        let chain = fork_config::ChainConfig::mainnet();
        let pre = ForkConfig::for_block(&chain, 0);
        let post = ForkConfig::for_block(&chain, chain.spurious_dragon_block);

        let address = Address([8u8; 20]);

        let mut state = new_state();
        state.put_account(address, &Account::new_empty()).unwrap();
        state.mark_touched(address);
        state.clean_touched_accounts(&pre).unwrap();
        assert!(state.get_account(address).unwrap().is_some());

        state.mark_touched(address);
        state.clean_touched_accounts(&post).unwrap();
        assert_eq!(state.get_account(address).unwrap(), None);
    }
}
