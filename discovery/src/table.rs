//! The 256-bucket routing table (spec §4.9) plus the staging area for
//! peers that have not yet completed a Ping/Pong handshake — only
//! verified peers are admitted into a bucket.

use crate::bucket::KBucket;
use crate::node::{bucket_index, Endpoint, NodeId, PeerInfo};
use std::collections::HashMap;
use std::time::Duration;

/// Discovery round concurrency parameter (spec §4.9).
pub const ALPHA: usize = 3;

const NUM_BUCKETS: usize = 256;

/// A peer that has been pinged but has not yet ponged back, or that
/// pinged us and is waiting on our own verification round.
#[derive(Debug, Clone)]
pub struct PendingPeer {
    pub node_id: NodeId,
    pub endpoint: Endpoint,
    pub pinged_at: Duration,
}

pub struct RoutingTable {
    local_id: NodeId,
    buckets: Vec<KBucket>,
    pending_verification: HashMap<NodeId, PendingPeer>,
}

impl RoutingTable {
    #[must_use]
    pub fn new(local_id: NodeId) -> Self {
        Self {
            local_id,
            buckets: (0..NUM_BUCKETS).map(|_| KBucket::new()).collect(),
            pending_verification: HashMap::new(),
        }
    }

    fn bucket_for(&self, node_id: &NodeId) -> Option<usize> {
        let index = bucket_index(&self.local_id, node_id);
        if index == 0 {
            return None; // node_id is us
        }
        Some(index - 1)
    }

    /// Stage a peer as awaiting verification before it can enter a
    /// bucket (spec §4.9: "verified after Ping/Pong handshake").
    pub fn mark_pending(&mut self, node_id: NodeId, endpoint: Endpoint, pinged_at: Duration) {
        self.pending_verification.insert(node_id, PendingPeer { node_id, endpoint, pinged_at });
    }

    #[must_use]
    pub fn is_pending(&self, node_id: &NodeId) -> bool {
        self.pending_verification.contains_key(node_id)
    }

    /// Promote a verified peer (its Pong arrived) from staging into
    /// its bucket. Returns the peer that must now be challenged if the
    /// target bucket was already full.
    pub fn mark_verified(&mut self, node_id: &NodeId, seen_at: Duration) -> Option<PeerInfo> {
        let pending = self.pending_verification.remove(node_id)?;
        let Some(bucket_idx) = self.bucket_for(node_id) else { return None };
        let peer = PeerInfo { node_id: pending.node_id, endpoint: pending.endpoint, last_seen: seen_at };
        self.buckets[bucket_idx].insert(peer, seen_at)
    }

    pub fn touch(&mut self, node_id: &NodeId, seen_at: Duration) {
        if let Some(bucket_idx) = self.bucket_for(node_id) {
            self.buckets[bucket_idx].touch(node_id, seen_at);
        }
    }

    pub fn challenge_succeeded(&mut self, node_id: &NodeId, seen_at: Duration) {
        if let Some(bucket_idx) = self.bucket_for(node_id) {
            self.buckets[bucket_idx].challenge_succeeded(seen_at);
        }
    }

    pub fn challenge_failed(&mut self, node_id: &NodeId) {
        if let Some(bucket_idx) = self.bucket_for(node_id) {
            self.buckets[bucket_idx].challenge_failed();
        }
    }

    #[must_use]
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.bucket_for(node_id).is_some_and(|idx| self.buckets[idx].contains(node_id))
    }

    /// The `count` verified peers closest to `target` by XOR distance,
    /// for answering a `FindNeighbours` request or picking discovery
    /// round recipients (spec §4.9).
    #[must_use]
    pub fn closest(&self, target: &NodeId, count: usize) -> Vec<PeerInfo> {
        let mut all: Vec<PeerInfo> = self.buckets.iter().flat_map(|b| b.peers().iter().cloned()).collect();
        all.sort_by_key(|peer| bucket_index(target, &peer.node_id));
        all.truncate(count);
        all
    }

    /// The α verified peers closest to `target`, used to seed one
    /// discovery round.
    #[must_use]
    pub fn alpha_closest(&self, target: &NodeId) -> Vec<PeerInfo> {
        self.closest(target, ALPHA)
    }

    #[must_use]
    pub fn least_recently_seen(&self, node_id: &NodeId) -> Option<PeerInfo> {
        let bucket_idx = self.bucket_for(node_id)?;
        self.buckets[bucket_idx].least_recently_seen().cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.peers().len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
