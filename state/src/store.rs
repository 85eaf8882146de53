use parking_lot::Mutex;
use primitives::Hash;
use std::sync::Arc;
use trie::KvStore;

/// A [`KvStore`] shared by clone across the world-state trie and every
/// per-account storage trie, so they all write into the same backing
/// database without each holding their own handle to it.
#[derive(Clone)]
pub struct SharedStore<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> SharedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }
}

impl<S: KvStore> KvStore for SharedStore<S> {
    fn get(&self, key: &Hash) -> Option<Vec<u8>> {
        self.inner.lock().get(key)
    }

    fn put(&mut self, key: Hash, value: Vec<u8>) {
        self.inner.lock().put(key, value);
    }
}
