//! Canonical RLP (Recursive Length Prefix) encoding and decoding
//! (spec §4.2). RLP is the wire and hashing format for every consensus
//! structure in the node: transactions, headers, receipts, trie nodes,
//! and discovery/RLPx packets.
//!
//! Decoding rejects non-canonical (non-minimal) length prefixes, since
//! `Keccak(RLP(x))` must be a deterministic function of `x` for every
//! peer on the network — accepting two different byte strings as the
//! same logical item would let two honest nodes disagree on a header's
//! hash.

mod codec;
mod error;
mod item;

pub use codec::{encode_struct, Decodable, Encodable};
pub use error::RlpError;
pub use item::{decode_exact, decode_one, encode, encode_bytes, encode_list_payload, Item};
