//! The node's static secp256k1 keypair: persisted to a file under the
//! data directory on first run, loaded on every run after. The same
//! key serves as both the discovery `NodeId` and the RLPx static
//! identity — they are the same 64-byte uncompressed public key
//! (spec §4.8, §4.9), so one key file is enough.

use crate::error::NodeError;
use discovery::NodeId;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const KEY_FILE_NAME: &str = "node.key";

/// The node's static identity: a secp256k1 secret key and its derived
/// public key, usable directly as a discovery `NodeId`.
pub struct Identity {
    pub secret_key: [u8; 32],
    pub public_key: NodeId,
}

impl Identity {
    fn from_secret(secret_key: [u8; 32]) -> Result<Self, NodeError> {
        let public_key = crypto::public_key_from_secret(&secret_key)?;
        Ok(Self { secret_key, public_key })
    }

    fn generate() -> Result<Self, NodeError> {
        loop {
            let candidate: [u8; 32] = rand::random();
            if let Ok(identity) = Self::from_secret(candidate) {
                return Ok(identity);
            }
        }
    }

    /// Load the key file at `path`, or generate and persist a fresh one
    /// if `allow_generate` and the file doesn't exist yet.
    pub fn load_or_generate(path: &Path, allow_generate: bool) -> Result<Self, NodeError> {
        match std::fs::read(path) {
            Ok(bytes) => {
                if bytes.len() != 32 {
                    return Err(NodeError::MalformedHex(path.display().to_string()));
                }
                let mut secret_key = [0u8; 32];
                secret_key.copy_from_slice(&bytes);
                Self::from_secret(secret_key)
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                if !allow_generate {
                    return Err(NodeError::MissingIdentity(path.display().to_string()));
                }
                let identity = Self::generate()?;
                identity.persist(path)?;
                Ok(identity)
            }
            Err(source) => Err(NodeError::ConfigRead { path: path.display().to_string(), source }),
        }
    }

    fn persist(&self, path: &Path) -> Result<(), NodeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(path)?;
        file.write_all(&self.secret_key)?;
        Ok(())
    }
}

#[must_use]
pub fn key_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join(KEY_FILE_NAME)
}

/// Parse a bootnode's hex-encoded 64-byte public key into a `NodeId`.
pub fn decode_node_id(hex_value: &str) -> Result<NodeId, NodeError> {
    let bytes = hex::decode(hex_value.strip_prefix("0x").unwrap_or(hex_value))
        .map_err(|_| NodeError::MalformedHex(hex_value.to_string()))?;
    if bytes.len() != 64 {
        return Err(NodeError::MalformedHex(hex_value.to_string()));
    }
    let mut node_id = [0u8; 64];
    node_id.copy_from_slice(&bytes);
    Ok(node_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_reloads_the_same_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = key_file_path(dir.path());

        let first = Identity::load_or_generate(&path, true).unwrap();
        let second = Identity::load_or_generate(&path, true).unwrap();
        assert_eq!(first.secret_key, second.secret_key);
        assert_eq!(first.public_key, second.public_key);
    }

    #[test]
    fn refuses_to_generate_when_not_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = key_file_path(dir.path());
        let result = Identity::load_or_generate(&path, false);
        assert!(matches!(result, Err(NodeError::MissingIdentity(_))));
    }
}
