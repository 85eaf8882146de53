use thiserror::Error;

/// Every way applying or validating a block can fail (spec §4.6, §7): a
/// structured consensus rejection, or a lower-layer state/transaction
/// error surfaced unchanged.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error(transparent)]
    Invalid(#[from] primitives::ValidationError),
    #[error(transparent)]
    Tx(#[from] tx_pipeline::TxError),
    #[error(transparent)]
    State(#[from] state::StateError),
    #[error(transparent)]
    Trie(#[from] trie::TrieError),
}
