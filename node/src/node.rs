//! Wires every crate in the workspace into one running process: loads
//! configuration and the chain spec, opens disk storage, loads or
//! generates the node's identity, builds the genesis block tree, and
//! spawns the discovery, RLPx listener/dialer, and sync tasks.

use crate::chain_spec::ChainSpec;
use crate::config::NodeConfig;
use crate::error::NodeError;
use crate::identity::Identity;
use crate::network::{discovery_io::DiscoveryService, rlpx_io};
use block_tree::BlockTree;
use state::SharedStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub struct Node {
    config: NodeConfig,
    chain_spec: ChainSpec,
}

impl Node {
    pub fn new(config: NodeConfig, chain_spec: ChainSpec) -> Self {
        Self { config, chain_spec }
    }

    pub fn from_config(config: NodeConfig) -> Result<Self, NodeError> {
        let chain_spec = match &config.chain_spec_path {
            Some(path) => ChainSpec::load(path)?,
            None => ChainSpec::mainnet_shape(),
        };
        Ok(Self::new(config, chain_spec))
    }

    /// Run the node until a fatal error or the process is asked to
    /// shut down. Spawns discovery, the RLPx listener, and the sync
    /// engine as concurrent tasks and waits on all of them.
    pub async fn run(self) -> Result<(), NodeError> {
        std::fs::create_dir_all(&self.config.storage.data_dir)?;

        let key_path = crate::identity::key_file_path(&self.config.storage.data_dir);
        let identity = Arc::new(Identity::load_or_generate(&key_path, true)?);
        info!(node_id = %hex::encode(identity.public_key), "node identity loaded");

        let trie_dir = self.config.storage.data_dir.join("state");
        let chain_dir = self.config.storage.data_dir.join("chain");
        let trie_store = SharedStore::new(crate::storage::FileStore::open(trie_dir)?);
        let mut backing_store = crate::storage::FileBackingStore::open(chain_dir)?;

        let (genesis_block, trie_store) = self.chain_spec.genesis_block(trie_store)?;
        info!(state_root = %hex::encode(genesis_block.header.state_root.0), "genesis block ready");

        let tree = match block_tree::load_snapshot(&backing_store) {
            Some(snapshot) => {
                let genesis_hash = chain_rules::header_hash(&genesis_block.header);
                BlockTree::from_snapshot(snapshot, genesis_hash, trie_store)
            }
            None => BlockTree::new(genesis_block, trie_store),
        };

        let chain_config = self.chain_spec.chain_config();
        let (peer_events_tx, peer_events_rx) = mpsc::unbounded_channel();

        let sync_handle = tokio::spawn(crate::sync_task::run(
            tree,
            backing_store,
            chain_config,
            self.chain_spec.chain_id,
            peer_events_rx,
        ));

        let discovery_handle = {
            let listen_addr = self.config.network.discovery_addr;
            let tcp_port = self.config.network.p2p_addr.port();
            let secret_key = identity.secret_key;
            let node_id = identity.public_key;
            let bootnodes = self.config.network.bootnodes.clone();
            tokio::spawn(async move {
                let service = DiscoveryService::bind(listen_addr, node_id, secret_key, tcp_port).await?;
                service.run(bootnodes).await
            })
        };

        let listener_handle = {
            let listen_addr = self.config.network.p2p_addr;
            let identity = identity.clone();
            let events = peer_events_tx.clone();
            tokio::spawn(async move { run_listener(listen_addr, identity, events).await })
        };

        let bootnode_dial_handle = {
            let identity = identity.clone();
            let listen_port = self.config.network.p2p_addr.port();
            let bootnodes = self.config.network.bootnodes.clone();
            let events = peer_events_tx;
            tokio::spawn(async move { dial_bootnodes(bootnodes, identity, listen_port, events).await })
        };

        tokio::select! {
            result = sync_handle => log_join_result("sync", result),
            result = discovery_handle => log_join_result("discovery", result),
            result = listener_handle => log_join_result("rlpx listener", result),
            result = bootnode_dial_handle => log_join_result("bootnode dialer", result),
            _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
        }
        Ok(())
    }
}

fn log_join_result(task: &str, result: Result<Result<(), NodeError>, tokio::task::JoinError>) {
    match result {
        Ok(Ok(())) => info!(task, "task finished"),
        Ok(Err(error)) => error!(task, %error, "task failed"),
        Err(error) => error!(task, %error, "task panicked"),
    }
}

async fn run_listener(
    listen_addr: std::net::SocketAddr,
    identity: Arc<Identity>,
    events: mpsc::UnboundedSender<rlpx_io::PeerEvent>,
) -> Result<(), NodeError> {
    let listener = TcpListener::bind(listen_addr).await?;
    info!(%listen_addr, "rlpx listener bound");
    loop {
        let (stream, remote_addr) = listener.accept().await?;
        let identity = identity.clone();
        let events = events.clone();
        let listen_port = listen_addr.port();
        tokio::spawn(async move {
            if let Err(error) = rlpx_io::accept_inbound(stream, &identity, listen_port, events).await {
                warn!(%remote_addr, %error, "inbound peer session ended");
            }
        });
    }
}

async fn dial_bootnodes(
    bootnodes: Vec<crate::config::BootNode>,
    identity: Arc<Identity>,
    listen_port: u16,
    events: mpsc::UnboundedSender<rlpx_io::PeerEvent>,
) -> Result<(), NodeError> {
    for bootnode in bootnodes {
        let remote_static_public_key = crate::identity::decode_node_id(&bootnode.node_id)?;
        let identity = identity.clone();
        let events = events.clone();
        let addr = bootnode.addr;
        tokio::spawn(async move {
            if let Err(error) = rlpx_io::connect_outbound(addr, &identity, remote_static_public_key, listen_port, events).await {
                warn!(%addr, %error, "outbound peer session ended");
            }
        });
    }
    std::future::pending::<()>().await;
    Ok(())
}
