//! RLPx: the encrypted, framed, capability-negotiated transport every
//! TCP peer connection runs (spec §4.8). Two phases: an ECIES-wrapped
//! key exchange (`handshake`, `ecies`) that derives per-direction frame
//! secrets, then a framed byte stream (`frame`) carrying DEVp2p packets
//! whose first is always `Hello` (`capability`, `session`).

mod capability;
mod ecies;
mod error;
mod frame;
mod handshake;
mod session;

pub use capability::{negotiate, packet_id_offsets, Capability, Hello};
pub use error::RlpxError;
pub use frame::FrameCodec;
pub use handshake::{build_ack, build_auth, derive_frame_secrets, process_ack, process_auth, FrameSecrets, LocalIdentity, RecoveredAuth};
pub use session::{DisconnectReason, PacketOutcome, Session, PACKET_DISCONNECT, PACKET_HELLO, PACKET_PING, PACKET_PONG};
