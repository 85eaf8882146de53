//! Disk-backed [`KvStore`]: one file per trie node, named by its
//! 32-byte key, each prefixed with a CRC32 checksum of its payload so
//! a truncated or corrupted write is caught on read rather than fed
//! silently into the trie, the same way `crc32fast` is used to guard
//! block storage elsewhere in this workspace.

use crate::error::NodeError;
use primitives::Hash;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use trie::KvStore;

const CHECKSUM_LEN: usize = 4;

/// A [`KvStore`] backed by one file per key under `root`, split into
/// 256 subdirectories keyed by the first byte of the hash so no single
/// directory accumulates every node in the trie.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, NodeError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &Hash) -> PathBuf {
        let hex = hex::encode(key.0);
        self.root.join(&hex[0..2]).join(&hex[2..])
    }

    fn read_checked(&self, path: &Path) -> Result<Option<Vec<u8>>, NodeError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(source.into()),
        };
        if bytes.len() < CHECKSUM_LEN {
            return Err(NodeError::CorruptRecord { key: bytes });
        }
        let (checksum_bytes, payload) = bytes.split_at(CHECKSUM_LEN);
        let stored_checksum = u32::from_le_bytes(checksum_bytes.try_into().expect("4 bytes"));
        if crc32fast::hash(payload) != stored_checksum {
            return Err(NodeError::CorruptRecord { key: payload.to_vec() });
        }
        Ok(Some(payload.to_vec()))
    }

    fn write_checked(&self, path: &Path, value: &[u8]) -> Result<(), NodeError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let checksum = crc32fast::hash(value);
        let mut file = fs::File::create(path)?;
        file.write_all(&checksum.to_le_bytes())?;
        file.write_all(value)?;
        Ok(())
    }

    /// Fallible counterpart to [`KvStore::get`], surfacing checksum
    /// failures instead of treating them as a missing key.
    pub fn try_get(&self, key: &Hash) -> Result<Option<Vec<u8>>, NodeError> {
        self.read_checked(&self.path_for(key))
    }

    /// Fallible counterpart to [`KvStore::put`].
    pub fn try_put(&self, key: Hash, value: Vec<u8>) -> Result<(), NodeError> {
        self.write_checked(&self.path_for(&key), &value)
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &Hash) -> Option<Vec<u8>> {
        self.try_get(key).unwrap_or(None)
    }

    fn put(&mut self, key: Hash, value: Vec<u8>) {
        let _ = self.try_put(key, value);
    }
}

/// A [`block_tree::BackingStore`] backed by the same checksummed-file
/// scheme as [`FileStore`], keyed by an arbitrary byte string (block
/// hashes, block numbers, the current-head marker) rather than a trie
/// node hash.
pub struct FileBackingStore {
    root: PathBuf,
}

impl FileBackingStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, NodeError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, key: &[u8]) -> PathBuf {
        let hex = hex::encode(key);
        self.root.join(&hex)
    }
}

impl block_tree::BackingStore for FileBackingStore {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let path = self.path_for(key);
        let bytes = fs::read(path).ok()?;
        if bytes.len() < CHECKSUM_LEN {
            return None;
        }
        let (checksum_bytes, payload) = bytes.split_at(CHECKSUM_LEN);
        let stored_checksum = u32::from_le_bytes(checksum_bytes.try_into().expect("4 bytes"));
        if crc32fast::hash(payload) != stored_checksum {
            return None;
        }
        Some(payload.to_vec())
    }

    fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        let path = self.path_for(&key);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        let checksum = crc32fast::hash(&value);
        if let Ok(mut file) = fs::File::create(path) {
            let _ = file.write_all(&checksum.to_le_bytes());
            let _ = file.write_all(&value);
        }
    }

    fn delete(&mut self, key: &[u8]) {
        let _ = fs::remove_file(self.path_for(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_value() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(dir.path()).unwrap();
        let key = Hash([7u8; 32]);
        store.put(key, vec![1, 2, 3]);
        assert_eq!(store.get(&key), Some(vec![1, 2, 3]));
    }

    #[test]
    fn detects_a_corrupted_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let key = Hash([9u8; 32]);
        store.try_put(key, vec![4, 5, 6]).unwrap();

        let path = store.path_for(&key);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, bytes).unwrap();

        let result = store.try_get(&key);
        assert!(matches!(result, Err(NodeError::CorruptRecord { .. })));
    }

    #[test]
    fn missing_key_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.try_get(&Hash([1u8; 32])).unwrap(), None);
    }

    #[test]
    fn backing_store_round_trips_and_deletes() {
        use block_tree::BackingStore;

        let dir = tempfile::tempdir().unwrap();
        let mut store = FileBackingStore::open(dir.path()).unwrap();
        store.put(b"head".to_vec(), b"value".to_vec());
        assert_eq!(store.get(b"head"), Some(b"value".to_vec()));

        store.delete(b"head");
        assert_eq!(store.get(b"head"), None);
    }
}
