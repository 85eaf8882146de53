//! DEVp2p `Hello` packet and capability negotiation (spec §4.8): once
//! both sides have exchanged Hello, the set of (name, highest-common-
//! version) pairs determines the packet-id offset map every later
//! packet is addressed through.

use rlp::{decode_exact, encode, Item};
use std::collections::BTreeMap;

const BASE_PROTOCOL_VERSION: u64 = 5;

/// A single advertised sub-protocol, e.g. `("eth", 63)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Capability {
    pub name: String,
    pub version: u64,
}

/// The DEVp2p `Hello` message body (spec §4.8): protocol version,
/// client id, advertised capabilities, listen port, and node id.
#[derive(Debug, Clone)]
pub struct Hello {
    pub protocol_version: u64,
    pub client_id: String,
    pub capabilities: Vec<Capability>,
    pub listen_port: u16,
    pub node_id: [u8; 64],
}

impl Hello {
    #[must_use]
    pub fn new(client_id: impl Into<String>, capabilities: Vec<Capability>, listen_port: u16, node_id: [u8; 64]) -> Self {
        Self { protocol_version: BASE_PROTOCOL_VERSION, client_id: client_id.into(), capabilities, listen_port, node_id }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let caps = Item::List(
            self.capabilities
                .iter()
                .map(|c| Item::List(vec![Item::Bytes(c.name.clone().into_bytes()), Item::Bytes(encode_uint(c.version))]))
                .collect(),
        );
        encode(&Item::List(vec![
            Item::Bytes(encode_uint(self.protocol_version)),
            Item::Bytes(self.client_id.clone().into_bytes()),
            caps,
            Item::Bytes(encode_uint(u64::from(self.listen_port))),
            Item::Bytes(self.node_id.to_vec()),
        ]))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, rlp::RlpError> {
        let items = decode_exact(bytes)?.into_list()?;
        let mut iter = items.into_iter();
        let mut next = || iter.next().ok_or(rlp::RlpError::UnexpectedEof);

        let protocol_version = decode_uint(next()?.as_bytes()?);
        let client_id = String::from_utf8_lossy(next()?.as_bytes()?).into_owned();
        let capabilities = next()?
            .into_list()?
            .into_iter()
            .map(|item| {
                let fields = item.into_list()?;
                let mut it = fields.into_iter();
                let name = String::from_utf8_lossy(it.next().ok_or(rlp::RlpError::UnexpectedEof)?.as_bytes()?).into_owned();
                let version = decode_uint(it.next().ok_or(rlp::RlpError::UnexpectedEof)?.as_bytes()?);
                Ok(Capability { name, version })
            })
            .collect::<Result<Vec<_>, rlp::RlpError>>()?;
        let listen_port = decode_uint(next()?.as_bytes()?) as u16;
        let node_id_bytes = next()?.as_bytes()?.to_vec();
        if node_id_bytes.len() != 64 {
            return Err(rlp::RlpError::UnexpectedEof);
        }
        let mut node_id = [0u8; 64];
        node_id.copy_from_slice(&node_id_bytes);

        Ok(Self { protocol_version, client_id, capabilities, listen_port, node_id })
    }
}

/// Group two peers' capability lists by name and keep, for each shared
/// name, the highest version either side advertises for it in common
/// (spec §4.8: "pick the highest common version").
#[must_use]
pub fn negotiate(local: &[Capability], remote: &[Capability]) -> Vec<Capability> {
    let mut remote_by_name: BTreeMap<&str, Vec<u64>> = BTreeMap::new();
    for cap in remote {
        remote_by_name.entry(cap.name.as_str()).or_default().push(cap.version);
    }

    let mut agreed = Vec::new();
    for local_cap in local {
        let Some(remote_versions) = remote_by_name.get(local_cap.name.as_str()) else { continue };
        if let Some(&highest_common) = remote_versions.iter().filter(|&&v| v == local_cap.version).max() {
            agreed.push(Capability { name: local_cap.name.clone(), version: highest_common });
        }
    }
    agreed.sort();
    agreed
}

/// The packet-id offset map a negotiated capability set produces (spec
/// §4.8): each capability after the base DEVp2p protocol (ids 0x00-0x0f)
/// is assigned a contiguous block of packet ids sized by its own
/// message count, in the order the capabilities were agreed.
#[must_use]
pub fn packet_id_offsets(agreed: &[Capability], message_counts: impl Fn(&str) -> u8) -> BTreeMap<String, u8> {
    const BASE_PROTOCOL_MESSAGE_COUNT: u8 = 0x10;
    let mut offsets = BTreeMap::new();
    let mut next_offset = BASE_PROTOCOL_MESSAGE_COUNT;
    for cap in agreed {
        offsets.insert(cap.name.clone(), next_offset);
        next_offset += message_counts(&cap.name);
    }
    offsets
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

    #[test]
    fn hello_roundtrips_through_rlp() {
        let hello = Hello::new(
            "ethcore/0.1.0",
            vec![Capability { name: "eth".into(), version: 63 }],
            30303,
            [7u8; 64],
        );
        let encoded = hello.encode();
        let decoded = Hello::decode(&encoded).unwrap();
        assert_eq!(decoded.client_id, "ethcore/0.1.0");
        assert_eq!(decoded.capabilities, hello.capabilities);
        assert_eq!(decoded.listen_port, 30303);
        assert_eq!(decoded.node_id, [7u8; 64]);
    }

    #[test]
    fn negotiation_keeps_only_versions_present_on_both_sides() {
        let local = vec![
            Capability { name: "eth".into(), version: 62 },
            Capability { name: "eth".into(), version: 63 },
        ];
        let remote = vec![Capability { name: "eth".into(), version: 63 }];
        let agreed = negotiate(&local, &remote);
        assert_eq!(agreed, vec![Capability { name: "eth".into(), version: 63 }]);
    }

    #[test]
    fn no_shared_capability_name_yields_empty_set() {
        let local = vec![Capability { name: "les".into(), version: 2 }];
        let remote = vec![Capability { name: "eth".into(), version: 63 }];
        assert!(negotiate(&local, &remote).is_empty());
    }
}
