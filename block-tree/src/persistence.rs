//! Disk persistence for recent blocks and the tree shape itself (save
//! every 100 blocks): an arbitrary-key get/put/delete/batch interface,
//! separate from the content-addressed `trie::KvStore` used for
//! world-state nodes.

use crate::keys;
use crate::node::BlockNode;
use crate::tree::BlockTree;
use primitives::{Block, Hash, Receipt};
use std::collections::HashMap;
use trie::KvStore;

/// A single write in a [`BackingStore::batch_write`] call.
pub struct Write {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

impl Write {
    #[must_use]
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self { key, value }
    }
}

/// Abstract key-value interface for everything that is not a
/// content-addressed trie node (spec §6): block bodies, the
/// height index, transaction locations, receipts, and the serialized
/// tree snapshot.
pub trait BackingStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn put(&mut self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&mut self, key: &[u8]);

    fn batch_write(&mut self, writes: Vec<Write>) {
        for write in writes {
            self.put(write.key, write.value);
        }
    }
}

/// In-memory [`BackingStore`] used by tests and before a disk-backed
/// implementation is wired in by the node binary.
#[derive(Default, Debug, Clone)]
pub struct MemoryBackingStore {
    entries: HashMap<Vec<u8>, Vec<u8>>,
}

impl MemoryBackingStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl BackingStore for MemoryBackingStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        self.entries.remove(key);
    }
}

/// A serialized tree snapshot (spec §6's `"current_block_tree"` key):
/// every known node plus the current canonical head, independent of
/// the RLP encoding used for consensus hashing (spec §9's ambient
/// serialization split).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TreeSnapshot {
    pub nodes: Vec<(Hash, BlockNode)>,
    pub canonical_head: Hash,
}

/// Persist one validated block: its body under `"b:"`, its height
/// index under `"n:"`, each transaction's location under `"t:"`, and
/// its receipts under `"r:"`.
pub fn persist_block<B: BackingStore>(store: &mut B, hash: Hash, block: &Block, receipts: &[Receipt]) {
    let body = bincode::serialize(block).expect("Block serialization is infallible");
    store.put(keys::block_key(hash), body);
    store.put(keys::number_key(block.header.number), hash.as_bytes().to_vec());

    for (index, tx) in block.transactions.iter().enumerate() {
        let tx_hash = chain_rules::transaction_hash(tx);
        let location = bincode::serialize(&(hash, index as u64)).expect("tuple serialization is infallible");
        store.put(keys::transaction_key(tx_hash), location);
    }

    let receipts_bytes = bincode::serialize(receipts).expect("Receipt serialization is infallible");
    store.put(keys::receipts_key(hash), receipts_bytes);
}

/// Persist the tree's current shape so a restart can resume without
/// replaying every block from genesis (spec §4.10).
pub fn persist_snapshot<S: KvStore + Clone, B: BackingStore>(store: &mut B, tree: &BlockTree<S>) {
    let snapshot = tree.snapshot();
    let bytes = bincode::serialize(&snapshot).expect("snapshot serialization is infallible");
    store.put(keys::CURRENT_BLOCK_TREE_KEY.to_vec(), bytes);
}

/// Load a previously persisted tree snapshot, if one exists.
pub fn load_snapshot<B: BackingStore>(store: &B) -> Option<TreeSnapshot> {
    let bytes = store.get(keys::CURRENT_BLOCK_TREE_KEY)?;
    bincode::deserialize(&bytes).ok()
}
