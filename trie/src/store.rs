use primitives::Hash;
use std::collections::HashMap;

/// Content-addressed backing store for committed trie nodes: RLP bytes
/// keyed by their own Keccak-256 hash. `state` persists world-state
/// tries this way; `block-tree` persists headers the same way so both
/// share one storage abstraction.
pub trait KvStore {
    fn get(&self, key: &Hash) -> Option<Vec<u8>>;
    fn put(&mut self, key: Hash, value: Vec<u8>);
}

/// In-memory [`KvStore`], used by tests and as the default store before
/// a disk-backed implementation is wired in by the node binary.
#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    nodes: HashMap<Hash, Vec<u8>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &Hash) -> Option<Vec<u8>> {
        self.nodes.get(key).cloned()
    }

    fn put(&mut self, key: Hash, value: Vec<u8>) {
        self.nodes.insert(key, value);
    }
}
