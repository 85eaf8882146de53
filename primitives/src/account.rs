use crate::Hash;
use primitive_types::U256;

/// The Keccak-256 hash of the RLP encoding of the empty string, `""`.
/// The code hash of every externally-owned account (spec §3).
pub const EMPTY_CODE_HASH: Hash = Hash([
    0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7, 0x03, 0xc0,
    0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04, 0x5d, 0x85, 0xa4, 0x70,
]);

/// The root of the empty Merkle-Patricia trie: `Keccak(RLP(""))` (spec §4.1).
pub const EMPTY_TRIE_ROOT: Hash = Hash([
    0x56, 0xe8, 0x1f, 0x17, 0x1b, 0xcc, 0x55, 0xa6, 0xff, 0x83, 0x45, 0xe6, 0x92, 0xc0, 0xf8, 0x6e,
    0x5b, 0x48, 0xe0, 0x1b, 0x99, 0x6c, 0xad, 0xc0, 0x01, 0x62, 0x2f, 0xb5, 0xe3, 0x63, 0xb4, 0x21,
]);

/// An Ethereum account record (spec §3): nonce, balance, storage root,
/// and code hash. `storage_root`/`code_hash` reference the account's
/// storage subtrie and code blob respectively.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Account {
    pub nonce: u64,
    pub balance: U256,
    pub storage_root: Hash,
    pub code_hash: Hash,
}

impl Account {
    /// A freshly created externally-owned account: zero nonce and
    /// balance, empty storage, no code.
    #[must_use]
    pub fn new_empty() -> Self {
        Self {
            nonce: 0,
            balance: U256::zero(),
            storage_root: EMPTY_TRIE_ROOT,
            code_hash: EMPTY_CODE_HASH,
        }
    }

    /// An account is "empty" iff nonce=0, balance=0, and it has no code
    /// (spec §3; drives touched-account cleanup in §4.3).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nonce == 0 && self.balance.is_zero() && self.code_hash == EMPTY_CODE_HASH
    }

    #[must_use]
    pub fn has_code(&self) -> bool {
        self.code_hash != EMPTY_CODE_HASH
    }
}

impl Default for Account {
    fn default() -> Self {
        Self::new_empty()
    }
}
