//! Drives `sync::SyncEngine` against the set of currently connected
//! peers: issues header/body requests on a timer, files replies as
//! they arrive, serves other peers' requests against the block tree,
//! and drains completed blocks into it.

use crate::error::NodeError;
use crate::network::rlpx_io::{OutboundRequest, PeerEvent, PeerId};
use block_tree::{BackingStore, BlockTree};
use fork_config::ChainConfig;
use primitives::Header;
use std::collections::HashMap;
use std::time::Duration;
use sync::messages::BlockHeaders;
use sync::SyncEngine;
use tokio::sync::mpsc;
use tokio::time::interval;
use trie::KvStore;
use tracing::{info, warn};

const REQUEST_INTERVAL: Duration = Duration::from_secs(2);

pub async fn run<S, B>(
    mut tree: BlockTree<S>,
    mut backing_store: B,
    chain_config: ChainConfig,
    chain_id: u64,
    mut peer_events: mpsc::UnboundedReceiver<PeerEvent>,
) -> Result<(), NodeError>
where
    S: KvStore + Clone,
    B: BackingStore,
{
    let mut engine = SyncEngine::new();
    let mut peers: HashMap<PeerId, mpsc::UnboundedSender<OutboundRequest>> = HashMap::new();
    let mut ticker = interval(REQUEST_INTERVAL);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                request_more_headers(&engine, &tree, &peers);
                match engine.drain_into_tree(&mut tree, &mut backing_store, &chain_config, chain_id) {
                    Ok(outcomes) => {
                        for outcome in &outcomes {
                            info!(?outcome, "block tree updated");
                        }
                    }
                    Err(error) => warn!(%error, "failed to drain sync queue into block tree"),
                }
            }
            event = peer_events.recv() => {
                let Some(event) = event else { break };
                handle_event(event, &mut engine, &tree, &mut peers);
            }
        }
    }
    Ok(())
}

fn active_peer_ids(peers: &HashMap<PeerId, mpsc::UnboundedSender<OutboundRequest>>) -> Vec<PeerId> {
    peers.keys().copied().collect()
}

fn request_more_headers<S: KvStore + Clone>(
    engine: &SyncEngine,
    tree: &BlockTree<S>,
    peers: &HashMap<PeerId, mpsc::UnboundedSender<OutboundRequest>>,
) {
    let head_number = tree.get_by_hash(tree.canonical_head()).map(|block| block.header.number).unwrap_or(0);
    let ids = active_peer_ids(peers);
    if let Some((peer, request)) = engine.next_headers_request(head_number, &ids) {
        send_to(peers, peer, OutboundRequest::GetHeaders(request));
    }
}

fn send_to(peers: &HashMap<PeerId, mpsc::UnboundedSender<OutboundRequest>>, peer: PeerId, message: OutboundRequest) {
    if let Some(sender) = peers.get(&peer) {
        let _ = sender.send(message);
    }
}

fn handle_event<S: KvStore + Clone>(
    event: PeerEvent,
    engine: &mut SyncEngine,
    tree: &BlockTree<S>,
    peers: &mut HashMap<PeerId, mpsc::UnboundedSender<OutboundRequest>>,
) {
    match event {
        PeerEvent::Connected { node_id, outbound } => {
            info!(peer = %hex::encode(node_id), "peer session active");
            peers.insert(node_id, outbound);
        }
        PeerEvent::Disconnected { node_id } => {
            peers.remove(&node_id);
        }
        PeerEvent::Headers { node_id: _, reply } => {
            let ids = active_peer_ids(peers);
            if let Some((peer, request)) = engine.handle_block_headers(reply, &ids) {
                send_to(peers, peer, OutboundRequest::GetBodies(request));
            }
        }
        PeerEvent::Bodies { node_id: _, reply } => {
            if let Err(error) = engine.handle_block_bodies(reply) {
                warn!(%error, "rejected unrequested block bodies reply");
            }
        }
        PeerEvent::GetHeaders { node_id, request } => {
            let headers = collect_headers(tree, &request);
            send_to(peers, node_id, OutboundRequest::Headers(BlockHeaders { headers }));
        }
        PeerEvent::GetBodies { node_id, request } => {
            let bodies = request
                .hashes
                .iter()
                .map(|hash| {
                    tree.get_by_hash(*hash)
                        .map(|block| (block.transactions.clone(), block.ommers.clone()))
                        .unwrap_or_default()
                })
                .collect();
            send_to(peers, node_id, OutboundRequest::Bodies(sync::messages::BlockBodies { bodies }));
        }
    }
}

fn collect_headers<S: KvStore + Clone>(tree: &BlockTree<S>, request: &sync::messages::GetBlockHeaders) -> Vec<Header> {
    let mut headers = Vec::new();
    let mut number = request.start;
    for _ in 0..request.count {
        let Some(block) = tree.get_by_number(number) else { break };
        headers.push(block.header.clone());
        let step = request.skip + 1;
        if request.reverse {
            let Some(next) = number.checked_sub(step) else { break };
            number = next;
        } else {
            number += step;
        }
    }
    headers
}
