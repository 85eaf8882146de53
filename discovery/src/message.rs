//! Wire format for the four discovery packet types (spec §4.9): a
//! signed envelope — `Keccak(signature‖type‖body)` ‖ signature ‖ type
//! ‖ RLP(fields) — wrapping a small, packet-specific RLP body.

use crate::error::DiscoveryError;
use crate::node::{Endpoint, NodeId};
use crypto::{keccak256, keccak256_concat, recover_public_key, sign, RecoverableSignature};
use primitives::Hash;
use rlp::{decode_exact, encode, Item};
use std::net::IpAddr;

pub const PACKET_PING: u8 = 0x01;
pub const PACKET_PONG: u8 = 0x02;
pub const PACKET_FIND_NEIGHBOURS: u8 = 0x03;
pub const PACKET_NEIGHBOURS: u8 = 0x04;

/// Maximum size of one UDP discovery datagram (spec §6).
pub const MAX_PACKET_SIZE: usize = 1280;

#[derive(Debug, Clone)]
pub struct Ping {
    pub from: Endpoint,
    pub to: Endpoint,
    pub expiration: u64,
}

#[derive(Debug, Clone)]
pub struct Pong {
    pub to: Endpoint,
    pub ping_hash: Hash,
    pub expiration: u64,
}

#[derive(Debug, Clone)]
pub struct FindNeighbours {
    pub target: NodeId,
    pub expiration: u64,
}

#[derive(Debug, Clone)]
pub struct Neighbours {
    pub nodes: Vec<(Endpoint, NodeId)>,
    pub expiration: u64,
}

/// A decoded, signature-verified packet and the sender's identity
/// recovered from that signature — discovery never learns a peer's
/// node id any other way (spec §4.9).
#[derive(Debug, Clone)]
pub enum Packet {
    Ping(Ping),
    Pong(Pong),
    FindNeighbours(FindNeighbours),
    Neighbours(Neighbours),
}

/// Sign and frame a packet body for UDP transmission.
pub fn build_packet(secret_key: &[u8; 32], packet_type: u8, body: &Item) -> Vec<u8> {
    let mut type_and_body = vec![packet_type];
    type_and_body.extend(encode(body));

    let digest = keccak256(&type_and_body);
    let signature = sign(secret_key, &digest).expect("caller-supplied secret key is well-formed");

    let mut sig_bytes = [0u8; 65];
    signature.r.to_big_endian(&mut sig_bytes[0..32]);
    signature.s.to_big_endian(&mut sig_bytes[32..64]);
    sig_bytes[64] = signature.recovery_id;

    let hash = keccak256_concat(&[&sig_bytes, &type_and_body]);

    let mut out = Vec::with_capacity(32 + 65 + type_and_body.len());
    out.extend_from_slice(&hash.0);
    out.extend_from_slice(&sig_bytes);
    out.extend_from_slice(&type_and_body);
    out
}

/// Verify the envelope and decode into a typed [`Packet`], returning
/// the sender's recovered node id alongside it.
pub fn parse_packet(datagram: &[u8]) -> Result<(Packet, NodeId), DiscoveryError> {
    if datagram.len() < 32 + 65 + 1 {
        return Err(DiscoveryError::PacketTooShort);
    }

    let (claimed_hash, rest) = datagram.split_at(32);
    let (sig_bytes, type_and_body) = rest.split_at(65);

    let actual_hash = keccak256_concat(&[sig_bytes, type_and_body]);
    if actual_hash.0 != claimed_hash {
        return Err(DiscoveryError::HashMismatch);
    }

    let signature = RecoverableSignature {
        r: primitive_types::U256::from_big_endian(&sig_bytes[0..32]),
        s: primitive_types::U256::from_big_endian(&sig_bytes[32..64]),
        recovery_id: sig_bytes[64],
    };
    let digest = keccak256(type_and_body);
    let sender_id = recover_public_key(&digest, &signature)?;

    let packet_type = type_and_body[0];
    let body = decode_exact(&type_and_body[1..])?;

    let packet = match packet_type {
        PACKET_PING => Packet::Ping(decode_ping(&body)?),
        PACKET_PONG => Packet::Pong(decode_pong(&body)?),
        PACKET_FIND_NEIGHBOURS => Packet::FindNeighbours(decode_find_neighbours(&body)?),
        PACKET_NEIGHBOURS => Packet::Neighbours(decode_neighbours(&body)?),
        other => return Err(DiscoveryError::UnknownPacketType(other)),
    };
    Ok((packet, sender_id))
}

fn encode_endpoint(endpoint: &Endpoint) -> Item {
    let ip_bytes = match endpoint.ip {
        IpAddr::V4(v4) => v4.octets().to_vec(),
        IpAddr::V6(v6) => v6.octets().to_vec(),
    };
    Item::List(vec![
        Item::Bytes(ip_bytes),
        Item::Bytes(encode_uint(u64::from(endpoint.udp_port))),
        Item::Bytes(encode_uint(u64::from(endpoint.tcp_port))),
    ])
}

fn decode_endpoint(item: &Item) -> Result<Endpoint, DiscoveryError> {
    let fields = item.as_list()?;
    let [ip_item, udp_item, tcp_item] = fields else {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    };
    let ip_bytes = ip_item.as_bytes()?;
    let ip = match ip_bytes.len() {
        4 => IpAddr::from(<[u8; 4]>::try_from(ip_bytes).unwrap()),
        16 => IpAddr::from(<[u8; 16]>::try_from(ip_bytes).unwrap()),
        _ => return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof)),
    };
    Ok(Endpoint {
        ip,
        udp_port: decode_uint(udp_item.as_bytes()?) as u16,
        tcp_port: decode_uint(tcp_item.as_bytes()?) as u16,
    })
}

fn ping_item(ping: &Ping) -> Item {
    Item::List(vec![encode_endpoint(&ping.from), encode_endpoint(&ping.to), Item::Bytes(encode_uint(ping.expiration))])
}

fn decode_ping(item: &Item) -> Result<Ping, DiscoveryError> {
    let fields = item.as_list()?;
    let [from, to, expiration] = fields else {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    };
    Ok(Ping { from: decode_endpoint(from)?, to: decode_endpoint(to)?, expiration: decode_uint(expiration.as_bytes()?) })
}

fn pong_item(pong: &Pong) -> Item {
    Item::List(vec![encode_endpoint(&pong.to), Item::Bytes(pong.ping_hash.0.to_vec()), Item::Bytes(encode_uint(pong.expiration))])
}

fn decode_pong(item: &Item) -> Result<Pong, DiscoveryError> {
    let fields = item.as_list()?;
    let [to, ping_hash, expiration] = fields else {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    };
    let hash_bytes = ping_hash.as_bytes()?;
    if hash_bytes.len() != 32 {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(hash_bytes);
    Ok(Pong { to: decode_endpoint(to)?, ping_hash: Hash(hash), expiration: decode_uint(expiration.as_bytes()?) })
}

fn find_neighbours_item(find: &FindNeighbours) -> Item {
    Item::List(vec![Item::Bytes(find.target.to_vec()), Item::Bytes(encode_uint(find.expiration))])
}

fn decode_find_neighbours(item: &Item) -> Result<FindNeighbours, DiscoveryError> {
    let fields = item.as_list()?;
    let [target, expiration] = fields else {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    };
    let target_bytes = target.as_bytes()?;
    if target_bytes.len() != 64 {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    }
    let mut target_id = [0u8; 64];
    target_id.copy_from_slice(target_bytes);
    Ok(FindNeighbours { target: target_id, expiration: decode_uint(expiration.as_bytes()?) })
}

fn neighbours_item(neighbours: &Neighbours) -> Item {
    let nodes = neighbours
        .nodes
        .iter()
        .map(|(endpoint, id)| Item::List(vec![encode_endpoint(endpoint), Item::Bytes(id.to_vec())]))
        .collect();
    Item::List(vec![Item::List(nodes), Item::Bytes(encode_uint(neighbours.expiration))])
}

fn decode_neighbours(item: &Item) -> Result<Neighbours, DiscoveryError> {
    let fields = item.as_list()?;
    let [nodes_item, expiration] = fields else {
        return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
    };
    let nodes = nodes_item
        .as_list()?
        .iter()
        .map(|entry| {
            let parts = entry.as_list()?;
            let [endpoint, id] = parts else { return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof)) };
            let id_bytes = id.as_bytes()?;
            if id_bytes.len() != 64 {
                return Err(DiscoveryError::Rlp(rlp::RlpError::UnexpectedEof));
            }
            let mut node_id = [0u8; 64];
            node_id.copy_from_slice(id_bytes);
            Ok((decode_endpoint(endpoint)?, node_id))
        })
        .collect::<Result<Vec<_>, DiscoveryError>>()?;
    Ok(Neighbours { nodes, expiration: decode_uint(expiration.as_bytes()?) })
}

/// Build a signed [`PACKET_PING`] datagram.
#[must_use]
pub fn build_ping(secret_key: &[u8; 32], ping: &Ping) -> Vec<u8> {
    build_packet(secret_key, PACKET_PING, &ping_item(ping))
}

/// Build a signed [`PACKET_PONG`] datagram.
#[must_use]
pub fn build_pong(secret_key: &[u8; 32], pong: &Pong) -> Vec<u8> {
    build_packet(secret_key, PACKET_PONG, &pong_item(pong))
}

/// Build a signed [`PACKET_FIND_NEIGHBOURS`] datagram.
#[must_use]
pub fn build_find_neighbours(secret_key: &[u8; 32], find: &FindNeighbours) -> Vec<u8> {
    build_packet(secret_key, PACKET_FIND_NEIGHBOURS, &find_neighbours_item(find))
}

/// Build a signed [`PACKET_NEIGHBOURS`] datagram.
#[must_use]
pub fn build_neighbours(secret_key: &[u8; 32], neighbours: &Neighbours) -> Vec<u8> {
    build_packet(secret_key, PACKET_NEIGHBOURS, &neighbours_item(neighbours))
}

/// The hash a `Ping`'s sender can expect to see echoed back in the
/// matching `Pong` (spec §4.9: "respond Pong (echoing the ping hash)").
#[must_use]
pub fn packet_hash(datagram: &[u8]) -> Hash {
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&datagram[..32]);
    Hash(hash)
}

fn encode_uint(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(7);
    bytes[first_nonzero..].to_vec()
}

fn decode_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn endpoint() -> Endpoint {
        Endpoint { ip: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)), udp_port: 30303, tcp_port: 30303 }
    }

    #[test]
    fn ping_roundtrips_and_recovers_sender_id() {
        let secret = [0x09u8; 32];
        let expected_id = crypto::public_key_from_secret(&secret).unwrap();
        let ping = Ping { from: endpoint(), to: endpoint(), expiration: 1234 };
        let datagram = build_ping(&secret, &ping);
        assert!(datagram.len() <= MAX_PACKET_SIZE);

        let (packet, sender_id) = parse_packet(&datagram).unwrap();
        assert_eq!(sender_id, expected_id);
        match packet {
            Packet::Ping(decoded) => assert_eq!(decoded.expiration, 1234),
            other => panic!("expected Ping, got {other:?}"),
        }
    }

    #[test]
    fn tampered_payload_fails_hash_check() {
        let secret = [0x0au8; 32];
        let ping = Ping { from: endpoint(), to: endpoint(), expiration: 1 };
        let mut datagram = build_ping(&secret, &ping);
        let last = datagram.len() - 1;
        datagram[last] ^= 0xff;
        assert!(matches!(parse_packet(&datagram), Err(DiscoveryError::HashMismatch)));
    }

    #[test]
    fn neighbours_carries_multiple_nodes() {
        let secret = [0x0bu8; 32];
        let nodes = vec![([4u8; 64]), ([5u8; 64])]
            .into_iter()
            .map(|id| (endpoint(), id))
            .collect();
        let neighbours = Neighbours { nodes, expiration: 99 };
        let datagram = build_neighbours(&secret, &neighbours);
        let (packet, _) = parse_packet(&datagram).unwrap();
        match packet {
            Packet::Neighbours(decoded) => assert_eq!(decoded.nodes.len(), 2),
            other => panic!("expected Neighbours, got {other:?}"),
        }
    }
}
