//! A single Kademlia bucket: up to `K` verified peers, plus the
//! eviction-on-failure challenge described in spec §4.9 — "when a
//! bucket is full, ping the least-recently-seen entry and replace it
//! only if it fails to respond in time".

use crate::node::{NodeId, PeerInfo};
use std::time::Duration;

/// Maximum verified peers held in one bucket (spec §4.9).
pub const K: usize = 16;

/// A bucket entry staged for replacement while its challenge ping is
/// outstanding.
#[derive(Debug, Clone)]
pub struct PendingInsertion {
    pub candidate: PeerInfo,
    pub challenged_at: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct KBucket {
    peers: Vec<PeerInfo>,
    pending: Option<PendingInsertion>,
}

impl KBucket {
    #[must_use]
    pub fn new() -> Self {
        Self { peers: Vec::new(), pending: None }
    }

    #[must_use]
    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.peers.len() >= K
    }

    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.peers.iter().any(|p| &p.node_id == node_id)
    }

    /// Record activity from an already-known peer, moving it to the
    /// most-recently-seen end (spec §4.9's LRU-style eviction order).
    pub fn touch(&mut self, node_id: &NodeId, seen_at: Duration) {
        if let Some(pos) = self.peers.iter().position(|p| &p.node_id == node_id) {
            let mut peer = self.peers.remove(pos);
            peer.last_seen = seen_at;
            self.peers.push(peer);
        }
    }

    /// Insert a newly verified peer. Returns the least-recently-seen
    /// peer that must now be challenged with a ping if the bucket was
    /// already full, or `None` if the peer was inserted directly.
    pub fn insert(&mut self, peer: PeerInfo, challenged_at: Duration) -> Option<PeerInfo> {
        if self.contains(&peer.node_id) {
            self.touch(&peer.node_id, peer.last_seen);
            return None;
        }
        if !self.is_full() {
            self.peers.push(peer);
            return None;
        }
        let oldest = self.peers[0].clone();
        self.pending = Some(PendingInsertion { candidate: peer, challenged_at });
        Some(oldest)
    }

    /// The challenge ping to the oldest peer was answered: keep it,
    /// move it to the back, and drop the pending candidate.
    pub fn challenge_succeeded(&mut self, seen_at: Duration) {
        if !self.peers.is_empty() {
            let mut oldest = self.peers.remove(0);
            oldest.last_seen = seen_at;
            self.peers.push(oldest);
        }
        self.pending = None;
    }

    /// The challenge ping to the oldest peer timed out: evict it and
    /// admit the pending candidate in its place.
    pub fn challenge_failed(&mut self) {
        let Some(pending) = self.pending.take() else { return };
        if !self.peers.is_empty() {
            self.peers.remove(0);
        }
        self.peers.push(pending.candidate);
    }

    #[must_use]
    pub fn pending(&self) -> Option<&PendingInsertion> {
        self.pending.as_ref()
    }

    #[must_use]
    pub fn least_recently_seen(&self) -> Option<&PeerInfo> {
        self.peers.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn peer(byte: u8, seen: u64) -> PeerInfo {
        PeerInfo {
            node_id: [byte; 64],
            endpoint: crate::node::Endpoint {
                ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
                udp_port: 30303,
                tcp_port: 30303,
            },
            last_seen: Duration::from_secs(seen),
        }
    }

    #[test]
    fn inserts_up_to_k_peers_directly() {
        let mut bucket = KBucket::new();
        for i in 0..K {
            assert!(bucket.insert(peer(i as u8, i as u64), Duration::ZERO).is_none());
        }
        assert!(bucket.is_full());
    }

    #[test]
    fn full_bucket_stages_a_challenge_instead_of_evicting_immediately() {
        let mut bucket = KBucket::new();
        for i in 0..K {
            bucket.insert(peer(i as u8, i as u64), Duration::ZERO);
        }
        let challenge = bucket.insert(peer(200, 99), Duration::from_secs(100));
        assert!(challenge.is_some());
        assert_eq!(bucket.peers().len(), K);
        assert!(bucket.pending().is_some());
    }

    #[test]
    fn failed_challenge_evicts_oldest_and_admits_candidate() {
        let mut bucket = KBucket::new();
        for i in 0..K {
            bucket.insert(peer(i as u8, i as u64), Duration::ZERO);
        }
        bucket.insert(peer(200, 99), Duration::from_secs(100));
        let oldest_id = bucket.peers()[0].node_id;
        bucket.challenge_failed();
        assert!(!bucket.contains(&oldest_id));
        assert!(bucket.contains(&[200u8; 64]));
        assert!(bucket.pending().is_none());
    }

    #[test]
    fn successful_challenge_keeps_oldest_and_drops_candidate() {
        let mut bucket = KBucket::new();
        for i in 0..K {
            bucket.insert(peer(i as u8, i as u64), Duration::ZERO);
        }
        bucket.insert(peer(200, 99), Duration::from_secs(100));
        let oldest_id = bucket.peers()[0].node_id;
        bucket.challenge_succeeded(Duration::from_secs(101));
        assert!(bucket.contains(&oldest_id));
        assert!(!bucket.contains(&[200u8; 64]));
        assert!(bucket.pending().is_none());
    }
}
