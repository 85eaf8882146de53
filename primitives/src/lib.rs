//! Core Ethereum domain entities shared by every other crate in the
//! workspace: `Hash`, `Address`, `Word` (the EVM's 256-bit native type),
//! `Account`, `Transaction`, `Block`/`Header`, `Receipt`/`Log`, and the
//! structured validation-error taxonomy of spec §7.
//!
//! This crate holds data only — no hashing, signing, RLP, or trie logic.
//! See `crypto`, `rlp`, and `trie` respectively.

mod account;
mod address;
mod block;
mod bloom;
mod error;
mod hash;
mod receipt;
mod transaction;

pub use account::{Account, EMPTY_CODE_HASH, EMPTY_TRIE_ROOT};
pub use address::Address;
pub use block::{Block, Header, MAX_EXTRA_DATA_SIZE};
pub use bloom::Bloom;
pub use error::{FatalError, TransientError, ValidationError};
pub use hash::Hash;
pub use receipt::{Log, PostState, Receipt};
pub use transaction::{Payload, Transaction};

/// The EVM's native 256-bit unsigned integer (spec §3).
pub type Word = primitive_types::U256;
