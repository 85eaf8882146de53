use primitives::Hash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrieError {
    #[error("trie node {0} referenced but missing from the backing store")]
    MissingNode(Hash),

    #[error("corrupt trie node encoding: {0}")]
    CorruptNode(#[from] rlp::RlpError),

    #[error("trie node has an unexpected shape for its RLP item count")]
    MalformedNode,
}
