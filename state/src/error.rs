use primitives::Address;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("trie error: {0}")]
    Trie(#[from] trie::TrieError),

    #[error("corrupt account encoding for {address:?}: {source}")]
    CorruptAccount {
        address: Address,
        #[source]
        source: rlp::RlpError,
    },

    #[error("balance underflow for {address:?}: has {available}, needs {required}")]
    InsufficientBalance {
        address: Address,
        available: primitive_types::U256,
        required: primitive_types::U256,
    },
}
