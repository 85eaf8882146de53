//! Everything that can go wrong wiring a node together or running its
//! background tasks. `main` collapses all of this into `anyhow::Error`
//! at the top level; every library module here returns a typed error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to read config file {path}: {source}")]
    ConfigRead { path: String, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse { path: String, source: toml::de::Error },
    #[error("failed to parse chain spec {path}: {source}")]
    ChainSpecParse { path: String, source: toml::de::Error },
    #[error("malformed hex value {0:?}")]
    MalformedHex(String),
    #[error("malformed address {0:?}, expected 20 bytes")]
    MalformedAddress(String),
    #[error("malformed hash {0:?}, expected 32 bytes")]
    MalformedHash(String),
    #[error("malformed nonce {0:?}, expected 8 bytes")]
    MalformedNonce(String),
    #[error(transparent)]
    State(#[from] state::StateError),
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    #[error(transparent)]
    Rlpx(#[from] rlpx::RlpxError),
    #[error(transparent)]
    Rlp(#[from] rlp::RlpError),
    #[error(transparent)]
    BlockTree(#[from] block_tree::BlockTreeError),
    #[error(transparent)]
    Sync(#[from] sync::SyncError),
    #[error("no identity key found at {0} and generation was not requested")]
    MissingIdentity(String),
    #[error("storage record at key {key:?} failed its checksum")]
    CorruptRecord { key: Vec<u8> },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
