//! Socket wiring for the two protocol crates that don't own a socket
//! themselves: UDP discovery and TCP RLPx. Both `discovery` and `rlpx`
//! are synchronous protocol logic with no `tokio` dependency, so the
//! event loops that actually own a socket live here.

pub mod discovery_io;
pub mod rlpx_io;
