//! Account and per-account storage API over the world-state trie
//! (spec §4.3): account reads/writes, 256-bit storage slots, a
//! content-addressed code store, and EIP-161 touched-account cleanup.

mod account_codec;
mod error;
mod state;
mod store;

pub use account_codec::{decode_account, encode_account};
pub use error::StateError;
pub use state::State;
pub use store::SharedStore;
