//! Post-handshake session state machine (spec §4.8): tracks whether
//! both Hellos have been exchanged and at least one capability agreed,
//! and dispatches base DEVp2p packets (Hello, Disconnect, Ping, Pong)
//! per the packet handling contract every packet type's handler obeys.

use crate::capability::{negotiate, packet_id_offsets, Capability, Hello};
use crate::error::RlpxError;
use std::collections::BTreeMap;

pub const PACKET_HELLO: u8 = 0x00;
pub const PACKET_DISCONNECT: u8 = 0x01;
pub const PACKET_PING: u8 = 0x02;
pub const PACKET_PONG: u8 = 0x03;

/// Why a connection is being torn down (spec §4.8's `{disconnect,
/// reason}` outcome).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    RequestedByPeer,
    TcpSubsystemError,
    ProtocolBreach,
    UselessPeer,
    TooManyPeers,
    AlreadyConnected,
    IncompatibleProtocolVersion,
    PingTimeout,
}

/// What handling one inbound packet produces (spec §4.8's packet
/// handling contract): every handler — base protocol or capability —
/// returns exactly one of these.
#[derive(Debug, Clone)]
pub enum PacketOutcome {
    Ok,
    Send(Vec<u8>),
    Disconnect(DisconnectReason),
    PeerDisconnect,
    Activate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionState {
    AwaitingHello,
    Active,
}

/// One negotiated RLPx connection above the framed byte stream: owns
/// the Hello exchange and, once active, the agreed capability set and
/// packet-id offset map later layers (the `eth` capability) address
/// their own packets through.
pub struct Session {
    local_hello: Hello,
    state: SessionState,
    agreed_capabilities: Vec<Capability>,
    offsets: BTreeMap<String, u8>,
}

impl Session {
    #[must_use]
    pub fn new(local_hello: Hello) -> Self {
        Self { local_hello, state: SessionState::AwaitingHello, agreed_capabilities: Vec::new(), offsets: BTreeMap::new() }
    }

    /// The Hello this side sends immediately after the frame secrets
    /// are ready, before any packet is received.
    #[must_use]
    pub fn outbound_hello(&self) -> Vec<u8> {
        self.local_hello.encode()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    #[must_use]
    pub fn agreed_capabilities(&self) -> &[Capability] {
        &self.agreed_capabilities
    }

    #[must_use]
    pub fn packet_offset(&self, capability_name: &str) -> Option<u8> {
        self.offsets.get(capability_name).copied()
    }

    /// Dispatch one decoded frame payload (`packet_type` is the first
    /// RLP item per spec §4.8; the remaining payload is packet-specific
    /// RLP). Base-protocol packet types are fully handled here;
    /// anything else is returned as `Ok` for a capability-specific
    /// handler (owned by `sync`) to interpret using `packet_offset`.
    pub fn handle_packet(
        &mut self,
        packet_type: u8,
        payload: &[u8],
        message_counts: impl Fn(&str) -> u8,
    ) -> Result<PacketOutcome, RlpxError> {
        match packet_type {
            PACKET_HELLO => self.handle_hello(payload, message_counts),
            PACKET_DISCONNECT => Ok(PacketOutcome::PeerDisconnect),
            PACKET_PING => Ok(PacketOutcome::Send(vec![PACKET_PONG])),
            PACKET_PONG => Ok(PacketOutcome::Ok),
            _ if self.state == SessionState::Active => Ok(PacketOutcome::Ok),
            _ => Ok(PacketOutcome::Disconnect(DisconnectReason::ProtocolBreach)),
        }
    }

    fn handle_hello(&mut self, payload: &[u8], message_counts: impl Fn(&str) -> u8) -> Result<PacketOutcome, RlpxError> {
        let remote_hello = Hello::decode(payload)?;
        let agreed = negotiate(&self.local_hello.capabilities, &remote_hello.capabilities);
        if agreed.is_empty() {
            return Ok(PacketOutcome::Disconnect(DisconnectReason::UselessPeer));
        }

        self.offsets = packet_id_offsets(&agreed, message_counts);
        self.agreed_capabilities = agreed;
        self.state = SessionState::Active;
        Ok(PacketOutcome::Activate)
    }
}
