//! Node configuration: data directory, listen addresses, bootnodes,
//! and peer caps, loaded via `serde` + `toml` — one struct per concern,
//! all `Default`, threaded through constructors rather than read from
//! a singleton.

use crate::error::NodeError;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// One bootstrap peer: its UDP discovery endpoint and the 64-byte
/// uncompressed public key identifying it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootNode {
    pub addr: SocketAddr,
    pub node_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub p2p_addr: SocketAddr,
    pub discovery_addr: SocketAddr,
    pub max_peers: usize,
    pub bootnodes: Vec<BootNode>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            p2p_addr: "0.0.0.0:30303".parse().expect("static address"),
            discovery_addr: "0.0.0.0:30303".parse().expect("static address"),
            max_peers: 50,
            bootnodes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: PathBuf::from("./data") }
    }
}

/// Complete node configuration (spec §9's `NodeConfig`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Path to the chain spec TOML file; `None` falls back to the
    /// built-in mainnet spec.
    #[serde(default)]
    pub chain_spec_path: Option<PathBuf>,
}

impl NodeConfig {
    /// Load from a TOML file on disk.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let text = std::fs::read_to_string(path)
            .map_err(|source| NodeError::ConfigRead { path: path.display().to_string(), source })?;
        toml::from_str(&text).map_err(|source| NodeError::ConfigParse { path: path.display().to_string(), source })
    }

    /// Load from `path` if given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, NodeError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }
}
