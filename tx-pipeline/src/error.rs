use thiserror::Error;

/// Every way applying one transaction can fail (spec §7): a structured
/// validation rejection the caller reports and moves on from, or a
/// state-layer inconsistency that should not be reachable given the
/// trie's own invariants.
#[derive(Debug, Error)]
pub enum TxError {
    #[error(transparent)]
    Invalid(#[from] primitives::ValidationError),
    #[error(transparent)]
    State(#[from] state::StateError),
}
