use thiserror::Error;

/// Reasons a UDP datagram is rejected before it ever reaches the
/// routing table (spec §4.9).
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("packet shorter than the 32-byte hash + 65-byte signature prefix")]
    PacketTooShort,
    #[error("packet hash does not match Keccak(signature || type || body)")]
    HashMismatch,
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    #[error(transparent)]
    Rlp(#[from] rlp::RlpError),
    #[error("unknown packet type byte {0:#04x}")]
    UnknownPacketType(u8),
    #[error("packet has expired")]
    Expired,
}
