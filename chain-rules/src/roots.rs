use primitives::{Hash, Log, PostState, Receipt, Transaction};
use rlp::{Encodable, Item};
use trie::{MemoryStore, Trie, TrieError};

/// A transaction's full signed RLP encoding (spec §3): the six
/// unsigned fields plus the `(v, r, s)` signature triplet, as stored in
/// the transactions trie and hashed for the transaction's own identity.
#[must_use]
pub fn encode_transaction(tx: &Transaction) -> Vec<u8> {
    let to_item = match tx.to {
        Some(address) => Item::Bytes(address.as_bytes().to_vec()),
        None => Item::Bytes(Vec::new()),
    };
    rlp::encode_struct(vec![
        tx.nonce.rlp_item(),
        tx.gas_price.rlp_item(),
        tx.gas_limit.rlp_item(),
        to_item,
        tx.value.rlp_item(),
        tx.payload.rlp_item(),
        tx.v.rlp_item(),
        tx.r.rlp_item(),
        tx.s.rlp_item(),
    ])
}

#[must_use]
pub fn transaction_hash(tx: &Transaction) -> Hash {
    crypto::keccak256(&encode_transaction(tx))
}

fn encode_log(log: &Log) -> Item {
    Item::List(vec![
        Item::Bytes(log.address.as_bytes().to_vec()),
        Item::List(log.topics.iter().map(|topic| Item::Bytes(topic.as_bytes().to_vec())).collect()),
        Item::Bytes(log.data.clone()),
    ])
}

/// A receipt's RLP encoding (spec §3): the fork-dependent post-state
/// field, cumulative gas, bloom, and logs.
#[must_use]
pub fn encode_receipt(receipt: &Receipt) -> Vec<u8> {
    let post_state_item = match receipt.post_state {
        PostState::Root(hash) => Item::Bytes(hash.as_bytes().to_vec()),
        PostState::Status(true) => Item::Bytes(vec![1]),
        PostState::Status(false) => Item::Bytes(Vec::new()),
    };
    rlp::encode_struct(vec![
        post_state_item,
        receipt.cumulative_gas_used.rlp_item(),
        Item::Bytes(receipt.bloom.0.to_vec()),
        Item::List(receipt.logs.iter().map(encode_log).collect()),
    ])
}

/// Build a fresh trie mapping `RLP(index) -> bytes` and return its root
/// (spec §4.6): the shared shape of both the transactions root and the
/// receipts root.
fn indexed_root(items: Vec<Vec<u8>>) -> Result<Hash, TrieError> {
    let mut trie = Trie::new(MemoryStore::new());
    for (index, bytes) in items.into_iter().enumerate() {
        trie.put(&(index as u64).rlp_bytes(), bytes)?;
    }
    trie.commit()
}

#[must_use = "the root must be compared against the header's declared field"]
pub fn transactions_root(transactions: &[Transaction]) -> Result<Hash, TrieError> {
    indexed_root(transactions.iter().map(encode_transaction).collect())
}

#[must_use = "the root must be compared against the header's declared field"]
pub fn receipts_root(receipts: &[Receipt]) -> Result<Hash, TrieError> {
    indexed_root(receipts.iter().map(encode_receipt).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use primitive_types::U256;
    use primitives::Bloom;

    #[test]
    fn empty_transaction_list_has_the_empty_trie_root() {
        assert_eq!(transactions_root(&[]).unwrap(), primitives::EMPTY_TRIE_ROOT);
    }

    #[test]
    fn single_transaction_root_is_deterministic() {
        let tx = Transaction {
            nonce: 0,
            gas_price: U256::from(1u64),
            gas_limit: 21_000,
            to: Some(primitives::Address::ZERO),
            value: U256::zero(),
            payload: Vec::new(),
            v: 27,
            r: U256::one(),
            s: U256::one(),
        };
        let a = transactions_root(&[tx.clone()]).unwrap();
        let b = transactions_root(&[tx]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn receipts_root_changes_with_cumulative_gas() {
        let base = Receipt {
            post_state: PostState::Status(true),
            cumulative_gas_used: 21_000,
            bloom: Bloom::ZERO,
            logs: Vec::new(),
        };
        let mut other = base.clone();
        other.cumulative_gas_used = 42_000;
        assert_ne!(receipts_root(&[base]).unwrap(), receipts_root(&[other]).unwrap());
    }
}
