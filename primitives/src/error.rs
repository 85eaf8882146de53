use thiserror::Error;

/// Validation errors (spec §7): every one of these rejects the block or
/// transaction under review and is returned as a structured value, never
/// raised as a panic. The sync engine drops the offending block/peer on
/// receiving one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("sender nonce {account} does not match transaction nonce {transaction}")]
    NonceMismatch { account: u64, transaction: u64 },

    #[error("sender balance {balance} insufficient for upfront cost {cost}")]
    InsufficientBalance { balance: String, cost: String },

    #[error("intrinsic gas {required} exceeds transaction gas limit {limit}")]
    InsufficientIntrinsicGas { required: u64, limit: u64 },

    #[error("transaction gas limit {limit} exceeds remaining block gas {remaining}")]
    OverGasLimit { limit: u64, remaining: u64 },

    #[error("could not recover a sender address from the transaction signature")]
    InvalidSender,

    #[error("sender account {0:?} does not exist")]
    MissingAccount(crate::Address),

    #[error("header parent hash {found:?} does not match the actual parent {expected:?}")]
    InvalidParentHash { expected: crate::Hash, found: crate::Hash },

    #[error("header number {found} does not follow parent number {parent}")]
    InvalidBlockNumber { parent: u64, found: u64 },

    #[error("header extra_data is {len} bytes, exceeding the {max}-byte limit")]
    ExtraDataTooLarge { len: usize, max: usize },

    #[error("header difficulty {found} does not match computed difficulty {expected}")]
    InvalidDifficulty { expected: String, found: String },

    #[error("header gas limit {found} is out of the allowed adjustment range of parent {parent}")]
    InvalidGasLimit { parent: u64, found: u64 },

    #[error("header timestamp {found} is not after parent timestamp {parent}")]
    InvalidTimestamp { parent: u64, found: u64 },

    #[error("computed state root {expected:?} does not match header state root {found:?}")]
    InvalidStateRoot {
        expected: crate::Hash,
        found: crate::Hash,
    },

    #[error("computed receipts root {expected:?} does not match header receipts root {found:?}")]
    InvalidReceiptsRoot {
        expected: crate::Hash,
        found: crate::Hash,
    },

    #[error(
        "computed transactions root {expected:?} does not match header transactions root {found:?}"
    )]
    InvalidTransactionsRoot {
        expected: crate::Hash,
        found: crate::Hash,
    },

    #[error("ommer validation failed: {0}")]
    InvalidOmmers(String),

    #[error("proof-of-work verification failed for header {0:?}")]
    InvalidPow(crate::Hash),

    #[error("header gas_used {found} does not match the sum of transaction gas used {expected}")]
    InvalidGasUsed { expected: u64, found: u64 },

    #[error("computed logs bloom does not match the header's declared bloom")]
    InvalidLogsBloom,
}

/// Transient, non-consensus errors (spec §7): the offending connection
/// is closed; the peer may be retried later. Never rejects a block by
/// itself.
#[derive(Debug, Error)]
pub enum TransientError {
    #[error("connection reset")]
    ConnectionReset,
    #[error("handshake timed out")]
    HandshakeTimeout,
    #[error("frame or handshake MAC mismatch")]
    MacMismatch,
    #[error("malformed packet: {0}")]
    MalformedPacket(String),
}

/// Fatal, process-ending inconsistencies (spec §7): a corrupt backing
/// store or a missing trie node that should be unreachable under the
/// content-addressed storage invariant. Callers should fail fast rather
/// than attempt to continue.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("backing store is corrupt: {0}")]
    CorruptStore(String),
    #[error("referenced trie node {0:?} is missing from the backing store")]
    MissingTrieNode(crate::Hash),
}
