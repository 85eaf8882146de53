//! Chain-spec genesis builder (spec §6, §8 scenario 1): turns a
//! declarative `ChainSpec` — fork activation heights plus a genesis
//! allocation — into `fork_config::ChainConfig` and a genesis `Block`
//! whose state root actually reflects the allocated accounts.
//!
//! Follows a config-struct-plus-builder shape for turning a genesis
//! description into a header, and the parity-style
//! `alloc: { address -> balance/nonce/code }` genesis shape.

use crate::error::NodeError;
use fork_config::ChainConfig;
use primitive_types::U256;
use primitives::{Account, Address, Block, Bloom, Hash, Header};
use serde::{Deserialize, Serialize};
use state::{SharedStore, State};
use std::collections::BTreeMap;
use std::path::Path;
use trie::KvStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    pub balance: String,
    #[serde(default)]
    pub nonce: u64,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisSpec {
    pub timestamp: u64,
    #[serde(default)]
    pub extra_data: String,
    pub gas_limit: u64,
    pub difficulty: String,
    #[serde(default = "zero_hash_hex")]
    pub mix_hash: String,
    #[serde(default = "zero_nonce_hex")]
    pub nonce: String,
    #[serde(default)]
    pub alloc: BTreeMap<String, GenesisAccount>,
}

fn zero_hash_hex() -> String {
    format!("0x{}", hex::encode([0u8; 32]))
}

fn zero_nonce_hex() -> String {
    "0x0000000000000000".to_string()
}

/// A full chain specification (spec §6): fork schedule plus genesis
/// allocation, enough to reproduce a network's genesis state root and
/// drive `ForkConfig::for_block` for every later block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSpec {
    pub chain_id: u64,
    #[serde(default)]
    pub homestead_block: u64,
    #[serde(default)]
    pub tangerine_whistle_block: u64,
    #[serde(default)]
    pub spurious_dragon_block: u64,
    #[serde(default)]
    pub byzantium_block: u64,
    #[serde(default)]
    pub constantinople_block: u64,
    #[serde(default)]
    pub byzantium_bomb_delay: u64,
    #[serde(default)]
    pub constantinople_bomb_delay: u64,
    pub genesis: GenesisSpec,
}

impl ChainSpec {
    /// Ethereum mainnet's own fork schedule and well-known genesis
    /// allocation is deliberately not reproduced here in full (it is
    /// thousands of accounts) — callers wanting an exact mainnet replay
    /// load it from a spec file; this is the fork schedule plus an
    /// empty allocation, useful for devnets and tests.
    #[must_use]
    pub fn mainnet_shape() -> Self {
        let chain = ChainConfig::mainnet();
        Self {
            chain_id: chain.chain_id.unwrap_or(1),
            homestead_block: chain.homestead_block,
            tangerine_whistle_block: chain.tangerine_whistle_block,
            spurious_dragon_block: chain.spurious_dragon_block,
            byzantium_block: chain.byzantium_block,
            constantinople_block: chain.constantinople_block,
            byzantium_bomb_delay: chain.byzantium_bomb_delay,
            constantinople_bomb_delay: chain.constantinople_bomb_delay,
            genesis: GenesisSpec {
                timestamp: 0,
                extra_data: String::new(),
                gas_limit: 5_000_000,
                difficulty: "0x20000".to_string(),
                mix_hash: zero_hash_hex(),
                nonce: zero_nonce_hex(),
                alloc: BTreeMap::new(),
            },
        }
    }

    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| NodeError::ConfigRead { path: path.display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| NodeError::ChainSpecParse { path: path.display().to_string(), source })
    }

    #[must_use]
    pub fn chain_config(&self) -> ChainConfig {
        ChainConfig {
            homestead_block: self.homestead_block,
            tangerine_whistle_block: self.tangerine_whistle_block,
            spurious_dragon_block: self.spurious_dragon_block,
            byzantium_block: self.byzantium_block,
            constantinople_block: self.constantinople_block,
            chain_id: Some(self.chain_id),
            byzantium_bomb_delay: self.byzantium_bomb_delay,
            constantinople_bomb_delay: self.constantinople_bomb_delay,
        }
    }

    /// Build the genesis block against `store`, writing every allocated
    /// account into its world state first so the resulting state root
    /// is reproducible (spec §8 scenario 1), and hand the same store
    /// back for the block tree to keep using. `store` must already be
    /// a [`SharedStore`] — cloning it shares the underlying backing
    /// store rather than forking it, which is what lets the genesis
    /// writes made here stay visible through the handle returned to
    /// the caller.
    pub fn genesis_block<S: KvStore + Clone>(&self, store: SharedStore<S>) -> Result<(Block, SharedStore<S>), NodeError> {
        let mut state = State::new(store.clone());
        for (addr_hex, account) in &self.genesis.alloc {
            let address = parse_address(addr_hex)?;
            let balance = parse_u256(&account.balance)?;
            state.put_account(
                address,
                &Account { nonce: account.nonce, balance, storage_root: primitives::EMPTY_TRIE_ROOT, code_hash: primitives::EMPTY_CODE_HASH },
            )?;
            if let Some(code_hex) = &account.code {
                let code = parse_hex_bytes(code_hex)?;
                if !code.is_empty() {
                    state.put_code(address, code)?;
                }
            }
        }
        let state_root = state.commit()?;

        let header = Header {
            parent_hash: Hash::ZERO,
            ommers_hash: chain_rules::ommers_hash(&[]),
            beneficiary: Address::ZERO,
            state_root,
            transactions_root: primitives::EMPTY_TRIE_ROOT,
            receipts_root: primitives::EMPTY_TRIE_ROOT,
            logs_bloom: Bloom::ZERO,
            difficulty: parse_u256(&self.genesis.difficulty)?,
            number: 0,
            gas_limit: self.genesis.gas_limit,
            gas_used: 0,
            timestamp: self.genesis.timestamp,
            extra_data: parse_hex_bytes(&self.genesis.extra_data)?,
            mix_hash: parse_hash(&self.genesis.mix_hash)?,
            nonce: parse_nonce8(&self.genesis.nonce)?,
        };
        Ok((Block::new(header, Vec::new(), Vec::new()), store))
    }
}

fn strip_0x(value: &str) -> &str {
    value.strip_prefix("0x").unwrap_or(value)
}

fn parse_hex_bytes(value: &str) -> Result<Vec<u8>, NodeError> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(strip_0x(value)).map_err(|_| NodeError::MalformedHex(value.to_string()))
}

fn parse_address(value: &str) -> Result<Address, NodeError> {
    let bytes = parse_hex_bytes(value)?;
    Address::from_slice(&bytes).ok_or_else(|| NodeError::MalformedAddress(value.to_string()))
}

fn parse_hash(value: &str) -> Result<Hash, NodeError> {
    let bytes = parse_hex_bytes(value)?;
    Hash::from_slice(&bytes).ok_or_else(|| NodeError::MalformedHash(value.to_string()))
}

fn parse_nonce8(value: &str) -> Result<[u8; 8], NodeError> {
    let bytes = parse_hex_bytes(value)?;
    if bytes.len() != 8 {
        return Err(NodeError::MalformedNonce(value.to_string()));
    }
    let mut nonce = [0u8; 8];
    nonce.copy_from_slice(&bytes);
    Ok(nonce)
}

fn parse_u256(value: &str) -> Result<U256, NodeError> {
    if let Some(hex_digits) = value.strip_prefix("0x") {
        U256::from_str_radix(hex_digits, 16).map_err(|_| NodeError::MalformedHex(value.to_string()))
    } else {
        U256::from_dec_str(value).map_err(|_| NodeError::MalformedHex(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trie::MemoryStore;

    #[test]
    fn genesis_with_no_allocation_matches_the_empty_trie_root() {
        let spec = ChainSpec::mainnet_shape();
        let (block, _store) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();
        assert_eq!(block.header.state_root, primitives::EMPTY_TRIE_ROOT);
        assert_eq!(block.header.number, 0);
    }

    #[test]
    fn allocated_balance_changes_the_state_root() {
        let mut spec = ChainSpec::mainnet_shape();
        spec.genesis.alloc.insert(
            "0x1111111111111111111111111111111111111111".to_string(),
            GenesisAccount { balance: "1000000000000000000".to_string(), nonce: 0, code: None },
        );
        let (block, _store) = spec.genesis_block(SharedStore::new(MemoryStore::new())).unwrap();
        assert_ne!(block.header.state_root, primitives::EMPTY_TRIE_ROOT);
    }
}
