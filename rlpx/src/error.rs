use thiserror::Error;

/// Everything that drops an RLPx connection (spec §4.8's failure
/// model): bad MAC, malformed framing, or a handshake that never
/// completes. There is no retry path here — the caller reconnects.
#[derive(Debug, Error)]
pub enum RlpxError {
    #[error("ECIES payload too short to contain the expected prefix")]
    EciesTooShort,
    #[error("ECIES MAC did not match")]
    EciesBadMac,
    #[error(transparent)]
    Crypto(#[from] crypto::CryptoError),
    #[error(transparent)]
    Rlp(#[from] rlp::RlpError),
    #[error("auth/ack message is missing field {0}")]
    MissingField(&'static str),
    #[error("frame header MAC did not match")]
    BadFrameHeaderMac,
    #[error("frame body MAC did not match")]
    BadFrameBodyMac,
    #[error("frame declares a payload length that overflows the protocol limit")]
    FrameTooLarge,
    #[error("peer disconnected during handshake: {0}")]
    HandshakeDisconnected(String),
    #[error("no capability in common with peer")]
    NoCommonCapability,
}
