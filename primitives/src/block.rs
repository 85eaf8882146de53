use crate::{Address, Bloom, Hash, Transaction};
use primitive_types::U256;

/// Maximum size of a header's `extra_data` field, in bytes (spec §3).
pub const MAX_EXTRA_DATA_SIZE: usize = 32;

/// A block header (spec §3). Every field is consensus-significant and
/// bit-exact in its RLP encoding — two headers with the same fields
/// hash identically regardless of which peer produced them.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Header {
    pub parent_hash: Hash,
    pub ommers_hash: Hash,
    pub beneficiary: Address,
    pub state_root: Hash,
    pub transactions_root: Hash,
    pub receipts_root: Hash,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Vec<u8>,
    pub mix_hash: Hash,
    pub nonce: [u8; 8],
}

/// A full block (spec §3): header, ordered transaction list, and the
/// ommer (uncle) headers it includes for partial reward.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub ommers: Vec<Header>,
}

impl Block {
    #[must_use]
    pub fn new(header: Header, transactions: Vec<Transaction>, ommers: Vec<Header>) -> Self {
        Self {
            header,
            transactions,
            ommers,
        }
    }
}
