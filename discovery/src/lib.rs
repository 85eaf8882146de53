//! Kademlia-style UDP discovery (spec §4.9): signed Ping/Pong/
//! FindNeighbours/Neighbours packets (`message`) verified and routed
//! through a 256-bucket table (`node`, `bucket`, `table`). This crate
//! is pure protocol logic — no socket — the same split RLPx uses, so
//! the UDP event loop and timers live with the rest of the async
//! wiring in the node binary.

mod bucket;
mod error;
mod message;
mod node;
mod table;

pub use bucket::{KBucket, PendingInsertion, K};
pub use error::DiscoveryError;
pub use message::{
    build_find_neighbours, build_neighbours, build_ping, build_pong, packet_hash, parse_packet,
    FindNeighbours, Neighbours, Packet, Ping, Pong, MAX_PACKET_SIZE, PACKET_FIND_NEIGHBOURS,
    PACKET_NEIGHBOURS, PACKET_PING, PACKET_PONG,
};
pub use node::{bucket_index, Endpoint, NodeId, PeerInfo};
pub use table::{PendingPeer, RoutingTable, ALPHA};

use std::time::Duration;

/// How long a node waits for a Pong/Neighbours reply before treating
/// the request as failed (spec §4.9's eviction/verification timeouts).
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a signed packet's `expiration` field may lag behind now
/// before it is rejected outright.
pub const PACKET_EXPIRATION_TOLERANCE: Duration = Duration::from_secs(20);

/// Check a packet's `expiration` field against the current unix time.
#[must_use]
pub fn is_expired(expiration: u64, now_unix: u64) -> bool {
    expiration < now_unix
}

/// The effect an inbound packet should have on the caller — a
/// diff-style result so the (async, socket-owning) caller can decide
/// what bytes to send and what table mutations to apply, while this
/// crate stays synchronous and testable without a network.
#[derive(Debug)]
pub enum Action {
    /// Send this datagram back to the sender.
    Reply(Vec<u8>),
    /// Send this datagram, then also reply (used for "ping back an
    /// unknown peer" alongside the Pong itself).
    ReplyAnd(Vec<u8>, Vec<u8>),
    /// No datagram to send; the table was (or wasn't) updated.
    None,
}

/// Handle one verified inbound packet against the routing table,
/// implementing spec §4.9's per-message-type protocol:
/// - `Ping`: reply with `Pong`; if the sender is unknown, also ping it
///   back so it can be verified and staged.
/// - `Pong`: mark the sender verified if it was pending.
/// - `FindNeighbours`: reply with the closest verified peers to the
///   requested target.
/// - `Neighbours`: handled by the caller (each entry becomes a new
///   pending peer to ping), so this returns `Action::None`.
pub fn handle_packet(
    table: &mut RoutingTable,
    local_secret_key: &[u8; 32],
    local_endpoint: Endpoint,
    sender_id: NodeId,
    packet: &Packet,
    raw_datagram: &[u8],
    now_unix: u64,
    now: Duration,
) -> Action {
    match packet {
        Packet::Ping(ping) => {
            if is_expired(ping.expiration, now_unix) {
                return Action::None;
            }
            let pong = build_pong(
                local_secret_key,
                &Pong { to: ping.from, ping_hash: packet_hash(raw_datagram), expiration: now_unix + 20 },
            );
            if table.contains(&sender_id) {
                table.touch(&sender_id, now);
                Action::Reply(pong)
            } else if table.is_pending(&sender_id) {
                Action::Reply(pong)
            } else {
                table.mark_pending(sender_id, ping.from, now);
                let ping_back = build_ping(
                    local_secret_key,
                    &Ping { from: local_endpoint, to: ping.from, expiration: now_unix + 20 },
                );
                Action::ReplyAnd(pong, ping_back)
            }
        }
        Packet::Pong(pong) => {
            if is_expired(pong.expiration, now_unix) {
                return Action::None;
            }
            if table.is_pending(&sender_id) {
                table.mark_verified(&sender_id, now);
            } else if table.contains(&sender_id) {
                table.touch(&sender_id, now);
            }
            Action::None
        }
        Packet::FindNeighbours(find) => {
            if is_expired(find.expiration, now_unix) {
                return Action::None;
            }
            let closest = table.closest(&find.target, K);
            let nodes = closest.into_iter().map(|peer| (peer.endpoint, peer.node_id)).collect();
            let datagram = build_neighbours(
                local_secret_key,
                &Neighbours { nodes, expiration: now_unix + 20 },
            );
            Action::Reply(datagram)
        }
        Packet::Neighbours(_) => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn endpoint() -> Endpoint {
        Endpoint { ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), udp_port: 30303, tcp_port: 30303 }
    }

    #[test]
    fn ping_from_unknown_peer_replies_pong_and_pings_back() {
        let local_secret = [0x10u8; 32];
        let local_id = crypto::public_key_from_secret(&local_secret).unwrap();
        let mut table = RoutingTable::new(local_id);

        let remote_secret = [0x20u8; 32];
        let remote_id = crypto::public_key_from_secret(&remote_secret).unwrap();
        let ping = Ping { from: endpoint(), to: endpoint(), expiration: 1_000_000_020 };
        let datagram = build_ping(&remote_secret, &ping);

        let action = handle_packet(
            &mut table, &local_secret, endpoint(), remote_id, &Packet::Ping(ping), &datagram,
            1_000_000_000, Duration::from_secs(1),
        );
        assert!(matches!(action, Action::ReplyAnd(_, _)));
        assert!(table.is_pending(&remote_id));
    }

    #[test]
    fn pong_from_pending_peer_verifies_it() {
        let local_secret = [0x30u8; 32];
        let local_id = crypto::public_key_from_secret(&local_secret).unwrap();
        let mut table = RoutingTable::new(local_id);

        let remote_secret = [0x40u8; 32];
        let remote_id = crypto::public_key_from_secret(&remote_secret).unwrap();
        table.mark_pending(remote_id, endpoint(), Duration::ZERO);

        let pong = Pong { to: endpoint(), ping_hash: primitives::Hash([0u8; 32]), expiration: 1_000_000_020 };
        let action = handle_packet(
            &mut table, &local_secret, endpoint(), remote_id, &Packet::Pong(pong), &[],
            1_000_000_000, Duration::from_secs(2),
        );
        assert!(matches!(action, Action::None));
        assert!(table.contains(&remote_id));
    }

    #[test]
    fn expired_ping_is_ignored() {
        let local_secret = [0x50u8; 32];
        let local_id = crypto::public_key_from_secret(&local_secret).unwrap();
        let mut table = RoutingTable::new(local_id);
        let remote_id = [9u8; 64];

        let ping = Ping { from: endpoint(), to: endpoint(), expiration: 5 };
        let action = handle_packet(
            &mut table, &local_secret, endpoint(), remote_id, &Packet::Ping(ping), &[],
            1_000_000_000, Duration::from_secs(1),
        );
        assert!(matches!(action, Action::None));
    }
}
