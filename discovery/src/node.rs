use primitives::Hash;
use std::net::IpAddr;
use std::time::Duration;

/// A node's identity on the discovery network: the 64-byte uncompressed
/// secp256k1 public key (spec §4.9), never an address — addresses are
/// an execution-layer concept, not a networking one.
pub type NodeId = [u8; 64];

/// Where to reach a node: its UDP (discovery) and TCP (RLPx) ports on
/// one IP (spec §4.9's Ping/Pong/Neighbours endpoint fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub udp_port: u16,
    pub tcp_port: u16,
}

/// A routing-table entry: identity, endpoint, and enough bookkeeping to
/// drive the eviction policy (spec §4.9: "ping the least-recently-seen
/// entry").
#[derive(Debug, Clone)]
pub struct PeerInfo {
    pub node_id: NodeId,
    pub endpoint: Endpoint,
    pub last_seen: Duration,
}

/// XOR distance between two node ids, expressed as its bit length
/// (spec §4.9: "256 buckets indexed by the XOR-distance bit-length").
/// A bit length of 0 means the ids are identical.
#[must_use]
pub fn bucket_index(local: &NodeId, other: &NodeId) -> usize {
    let local_hash = Hash(crypto::keccak256(local).0);
    let other_hash = Hash(crypto::keccak256(other).0);
    for byte_index in 0..32 {
        let xor = local_hash.0[byte_index] ^ other_hash.0[byte_index];
        if xor != 0 {
            let leading_zeros_in_byte = xor.leading_zeros() as usize;
            return 256 - byte_index * 8 - leading_zeros_in_byte;
        }
    }
    0
}
