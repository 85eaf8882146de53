use crate::{Address, Bloom, Hash};

/// A single EVM log entry (spec §3): the emitting contract's address,
/// up to four indexed 32-byte topics, and an opaque data payload.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Hash>,
    pub data: Vec<u8>,
}

/// The post-transaction state indicator (spec §3, §4.5).
///
/// Pre-Byzantium receipts carry the intermediate state root; Byzantium
/// onward they carry a 0/1 execution status instead (EIP-658).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PostState {
    Root(Hash),
    Status(bool),
}

/// A transaction receipt (spec §3): post-state indicator, cumulative
/// gas used through this transaction in its block, a bloom filter over
/// its logs, and the logs themselves.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Receipt {
    pub post_state: PostState,
    pub cumulative_gas_used: u64,
    pub bloom: Bloom,
    pub logs: Vec<Log>,
}

impl Receipt {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        match self.post_state {
            PostState::Status(ok) => ok,
            PostState::Root(_) => true,
        }
    }
}
