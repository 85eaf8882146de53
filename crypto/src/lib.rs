//! Keccak-256 hashing and secp256k1 ECDSA sign/recover/verify.
//!
//! Everything consensus-critical in this node — addresses, block and
//! transaction hashes, trie node references, signature recovery — comes
//! down to the two primitives in this crate. Kept deliberately small and
//! dependency-free beyond `sha3`/`k256` so it can be audited in
//! isolation.

mod bloom;
mod ecdh;
mod ecdsa;
mod keccak;

pub use bloom::{bloom_insert, bloom_of_log, bloom_of_logs};
pub use ecdh::{ecdh_x, public_key_from_sec1, public_key_to_sec1};
pub use ecdsa::{
    address_from_public_key, public_key_from_secret, recover_public_key, sign, verify,
    CryptoError, RecoverableSignature,
};
pub use keccak::{keccak256, keccak256_concat};
