use thiserror::Error;

/// Everything that can go wrong while filling the block queue (spec
/// §4.10): a malformed wire message, or a block the tree itself
/// rejects once assembled.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Rlp(#[from] rlp::RlpError),
    #[error("a BlockBodies entry does not match any header awaiting a body")]
    UnrequestedBody,
    #[error(transparent)]
    BlockTree(#[from] block_tree::BlockTreeError),
}
