//! Secondary-index key scheme for the backing store (spec §6):
//! `"b:"`/`"n:"`/`"current_block_tree"`/`"t:"`/`"r:"`. Distinct from the
//! content-addressed `trie::KvStore` used for world-state nodes — these
//! keys are arbitrary byte strings naming a block, a height, a
//! transaction, or the whole tree snapshot.

use primitives::Hash;

pub const CURRENT_BLOCK_TREE_KEY: &[u8] = b"current_block_tree";

#[must_use]
pub fn block_key(hash: Hash) -> Vec<u8> {
    [b"b:".as_slice(), hash.as_bytes()].concat()
}

#[must_use]
pub fn number_key(number: u64) -> Vec<u8> {
    [b"n:".as_slice(), &number.to_be_bytes()].concat()
}

#[must_use]
pub fn transaction_key(tx_hash: Hash) -> Vec<u8> {
    [b"t:".as_slice(), tx_hash.as_bytes()].concat()
}

#[must_use]
pub fn receipts_key(block_hash: Hash) -> Vec<u8> {
    [b"r:".as_slice(), block_hash.as_bytes()].concat()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_prefix_namespaces_its_own_keys() {
        let hash = Hash([7u8; 32]);
        assert!(block_key(hash).starts_with(b"b:"));
        assert!(number_key(5).starts_with(b"n:"));
        assert!(transaction_key(hash).starts_with(b"t:"));
        assert!(receipts_key(hash).starts_with(b"r:"));
    }
}
