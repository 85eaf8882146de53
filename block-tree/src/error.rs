use thiserror::Error;

/// Everything that can make `add_block` reject a candidate outright
/// (spec §4.7's `{:invalid, reason}` contract). The "already known" and
/// "parent not yet seen" outcomes are not errors — they are returned as
/// [`crate::AddBlockOutcome`] variants, since neither represents a rule
/// violation.
#[derive(Debug, Error)]
pub enum BlockTreeError {
    #[error(transparent)]
    Invalid(#[from] chain_rules::BlockError),
}
